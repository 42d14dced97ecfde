//! Per-run compilation metrics
//!
//! A `CompileMetrics` value is created for each compilation run, passed
//! explicitly to the passes that record into it and returned with the
//! compiled module. There is no process-wide counter.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompileMetrics {
    pub scopes: u32,
    pub bindings: u32,
    pub captured_bindings: u32,
    pub callables: u32,
    /// Callables that receive or read an ancestor scope chain
    pub chained_callables: u32,
    /// Generator and async callables lowered to state machines
    pub resumable_callables: u32,
    pub yield_points: u32,
    pub exception_regions: u32,
    /// Callables whose physical argument count exceeds the configured
    /// delegate arity
    pub oversized_arity: u32,
}

impl CompileMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold another collector into this one
    pub fn merge(&mut self, other: &CompileMetrics) {
        self.scopes += other.scopes;
        self.bindings += other.bindings;
        self.captured_bindings += other.captured_bindings;
        self.callables += other.callables;
        self.chained_callables += other.chained_callables;
        self.resumable_callables += other.resumable_callables;
        self.yield_points += other.yield_points;
        self.exception_regions += other.exception_regions;
        self.oversized_arity += other.oversized_arity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        let mut total = CompileMetrics::new();
        let run = CompileMetrics {
            callables: 3,
            yield_points: 2,
            ..CompileMetrics::default()
        };
        total.merge(&run);
        total.merge(&run);
        assert_eq!(total.callables, 6);
        assert_eq!(total.yield_points, 4);
        assert_eq!(total.scopes, 0);
    }
}
