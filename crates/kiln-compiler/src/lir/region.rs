//! Protected region descriptors

use serde::Serialize;

use super::Label;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RegionKind {
    /// Handler runs the catch clause
    Catch,
    /// Catch-all handler that records the in-flight exception as a pending
    /// completion and jumps to the finally body. Normal exits reach the
    /// finally body through explicit `Leave`s.
    Finally,
}

/// One protected region. Ranges are half-open: `[try_start, try_end)` and
/// `[handler_start, handler_end)` in label positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionRegionInfo {
    pub kind: RegionKind,
    pub try_start: Label,
    pub try_end: Label,
    pub handler_start: Label,
    pub handler_end: Label,
    /// `None` catches everything
    pub exception_type_filter: Option<String>,
}
