//! Protected region well-formedness
//!
//! A malformed region table makes the emitted artifact invalid, so bodies
//! are checked before they leave the compiler:
//!
//! - every label is defined exactly once and every jump target exists
//! - try and handler ranges are non-empty and a handler never overlaps its
//!   own try range
//! - any two ranges are either nested or disjoint
//! - a try range is entered from outside only at its start, a handler only
//!   through the exception path
//! - only `Leave` (or `Throw`) may exit a range; `Return` never appears
//!   inside one and control never falls off the end of one
//! - every handler begins with `StoreException`

use rustc_hash::FxHashMap;
use tracing::trace;

use super::{Body, Instr, Label};
use crate::error::{CompileError, CompileResult};

#[derive(Debug, Clone, Copy)]
struct Range {
    start: usize,
    end: usize,
    is_handler: bool,
    region: usize,
}

impl Range {
    fn contains(&self, position: usize) -> bool {
        self.start <= position && position < self.end
    }

    fn nests_or_disjoint(&self, other: &Range) -> bool {
        let disjoint = self.end <= other.start || other.end <= self.start;
        let self_inside = other.start <= self.start && self.end <= other.end;
        let other_inside = self.start <= other.start && other.end <= self.end;
        disjoint || self_inside || other_inside
    }
}

fn malformed(callable: &str, message: String) -> CompileError {
    CompileError::MalformedRegions {
        callable: callable.to_string(),
        message,
    }
}

/// Check the region table of `body`
pub fn verify_regions(body: &Body, callable: &str) -> CompileResult<()> {
    let mut defined: FxHashMap<Label, usize> = FxHashMap::default();
    for (position, instr) in body.instrs.iter().enumerate() {
        if let Instr::Label(label) = instr {
            if defined.insert(*label, position).is_some() {
                return Err(malformed(callable, format!("label {} defined twice", label)));
            }
        }
    }
    let resolve = |label: Label| -> CompileResult<usize> {
        defined
            .get(&label)
            .copied()
            .ok_or_else(|| malformed(callable, format!("label {} is never defined", label)))
    };

    let mut ranges = Vec::with_capacity(body.regions.len() * 2);
    for (index, region) in body.regions.iter().enumerate() {
        let try_range = Range {
            start: resolve(region.try_start)?,
            end: resolve(region.try_end)?,
            is_handler: false,
            region: index,
        };
        let handler_range = Range {
            start: resolve(region.handler_start)?,
            end: resolve(region.handler_end)?,
            is_handler: true,
            region: index,
        };
        for range in [try_range, handler_range] {
            if range.start >= range.end {
                return Err(malformed(
                    callable,
                    format!("region {} has an empty or inverted range", index),
                ));
            }
        }
        if !(try_range.end <= handler_range.start || handler_range.end <= try_range.start) {
            return Err(malformed(
                callable,
                format!("region {} handler overlaps its try range", index),
            ));
        }
        match body.instrs.get(handler_range.start + 1) {
            Some(Instr::StoreException { .. }) => {}
            _ => {
                return Err(malformed(
                    callable,
                    format!("region {} handler does not begin with StoreException", index),
                ))
            }
        }
        ranges.push(try_range);
        ranges.push(handler_range);
    }

    for (i, a) in ranges.iter().enumerate() {
        for b in &ranges[i + 1..] {
            if !a.nests_or_disjoint(b) {
                return Err(malformed(
                    callable,
                    format!("regions {} and {} overlap without nesting", a.region, b.region),
                ));
            }
        }
        if a.end < body.instrs.len() && !body.instrs[a.end - 1].is_terminator() {
            return Err(malformed(
                callable,
                format!("control falls off the end of region {}", a.region),
            ));
        }
    }

    for (position, instr) in body.instrs.iter().enumerate() {
        if matches!(instr, Instr::Return { .. }) && ranges.iter().any(|r| r.contains(position)) {
            return Err(malformed(
                callable,
                format!("return at {} inside a protected region", position),
            ));
        }
        let is_leave = matches!(instr, Instr::Leave { .. });
        for target_label in instr.jump_targets() {
            let target = resolve(target_label)?;
            for range in &ranges {
                let from_inside = range.contains(position);
                let to_inside = range.contains(target);
                if to_inside && !from_inside {
                    if range.is_handler {
                        return Err(malformed(
                            callable,
                            format!("jump at {} into handler of region {}", position, range.region),
                        ));
                    }
                    if target != range.start {
                        return Err(malformed(
                            callable,
                            format!(
                                "jump at {} enters region {} past its start",
                                position, range.region
                            ),
                        ));
                    }
                }
                if from_inside && !to_inside && !is_leave {
                    return Err(malformed(
                        callable,
                        format!(
                            "branch at {} exits region {} without Leave",
                            position, range.region
                        ),
                    ));
                }
            }
        }
    }

    trace!(callable, regions = body.regions.len(), "regions verified");
    Ok(())
}
