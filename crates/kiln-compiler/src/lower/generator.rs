//! State-machine lowering for generators and async callables
//!
//! A resumable callable's body is ordinary LIR with three additions:
//!
//! - every `yield`, `yield*` step and `await` becomes a `Suspend` with a
//!   fresh state number, followed by a resume label;
//! - the body begins with a state switch that maps each state to the
//!   outermost protected region containing its resume label (or straight
//!   to the label when no region encloses it);
//! - every protected region containing a suspension begins with its own
//!   switch that forwards one level deeper.
//!
//! Re-entry therefore always enters a region at its start, which keeps the
//! region table valid for backends that forbid jumping into a try range.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::trace;

use super::FunctionLowerer;
use crate::error::{CompileError, CompileResult};
use crate::lir::{Body, Constant, Instr, Label, ResumeKind, StateId, SuspendKind, Temp};

/// One suspension point
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YieldPoint {
    pub state: StateId,
    pub resume_label: Label,
    /// Temp receiving the value the machine was resumed with
    pub result_slot: Temp,
    pub kind: SuspendKind,
    /// Start labels of the protected regions enclosing the point, outermost
    /// first
    pub region_path: Vec<Label>,
    /// Temps that must survive the suspension
    pub live_temps: Vec<Temp>,
}

/// Resume metadata of one resumable callable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratorStateMachineInfo {
    pub yield_points: Vec<YieldPoint>,
    next_state: u32,
    resume_labels: BTreeMap<StateId, Label>,
}

impl Default for GeneratorStateMachineInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorStateMachineInfo {
    pub fn new() -> Self {
        Self {
            yield_points: Vec::new(),
            next_state: 1,
            resume_labels: BTreeMap::new(),
        }
    }

    /// Allocate the next state number. State 0 means "not started".
    pub fn allocate_state(&mut self) -> StateId {
        let state = StateId(self.next_state);
        self.next_state += 1;
        state
    }

    pub fn record(&mut self, point: YieldPoint) {
        self.resume_labels.insert(point.state, point.resume_label);
        self.yield_points.push(point);
    }

    pub fn resume_label(&self, state: StateId) -> Option<Label> {
        self.resume_labels.get(&state).copied()
    }

    pub fn resume_labels(&self) -> &BTreeMap<StateId, Label> {
        &self.resume_labels
    }

    /// Number of states including the initial one
    pub fn state_count(&self) -> u32 {
        self.next_state
    }

    pub fn yield_point(&self, state: StateId) -> Option<&YieldPoint> {
        self.yield_points.iter().find(|p| p.state == state)
    }

    /// Fill in `live_temps` of every point from the finished body
    pub(super) fn compute_liveness(&mut self, body: &Body, callable: &str) -> CompileResult<()> {
        let positions = self
            .yield_points
            .iter()
            .map(|p| {
                body.label_position(p.resume_label).ok_or_else(|| {
                    CompileError::internal(format!(
                        "{}: resume label {} of state {} was never placed",
                        callable, p.resume_label, p.state
                    ))
                })
            })
            .collect::<CompileResult<Vec<usize>>>()?;
        let live = super::liveness::live_temps_at(body, callable, &positions)?;
        for (point, temps) in self.yield_points.iter_mut().zip(live) {
            point.live_temps = temps;
        }
        Ok(())
    }
}

/// A protected region whose start carries a resume switch
#[derive(Debug)]
pub(super) struct DispatchRegion {
    start: Label,
    switch_position: usize,
    cases: Vec<(StateId, Label)>,
}

/// Resume switches of the callable being lowered
#[derive(Debug)]
pub(super) struct ResumeDispatch {
    entry_position: usize,
    entry_cases: Vec<(StateId, Label)>,
    regions: Vec<DispatchRegion>,
}

impl ResumeDispatch {
    pub(super) fn new(entry_position: usize) -> Self {
        Self {
            entry_position,
            entry_cases: Vec::new(),
            regions: Vec::new(),
        }
    }

    /// Route `state` to `resume` through every open region, innermost
    /// first, ending at the entry switch
    fn register(&mut self, state: StateId, resume: Label) {
        let mut target = resume;
        for region in self.regions.iter_mut().rev() {
            region.cases.push((state, target));
            target = region.start;
        }
        self.entry_cases.push((state, target));
    }

    fn region_path(&self) -> Vec<Label> {
        self.regions.iter().map(|r| r.start).collect()
    }
}

impl<'a> FunctionLowerer<'a> {
    /// Emit a region switch placeholder at the current position when the
    /// region about to start contains a suspension. Returns whether one was
    /// opened; pass that to [`Self::close_dispatch_region`].
    pub(super) fn open_dispatch_region(&mut self, start: Label, suspends: bool) -> bool {
        if !suspends || self.dispatch.is_none() {
            return false;
        }
        let switch_position = self.builder.position();
        self.builder
            .emit(Instr::GeneratorStateSwitch { cases: Vec::new() });
        if let Some(dispatch) = self.dispatch.as_mut() {
            dispatch.regions.push(DispatchRegion {
                start,
                switch_position,
                cases: Vec::new(),
            });
        }
        true
    }

    pub(super) fn close_dispatch_region(&mut self, opened: bool) {
        if !opened {
            return;
        }
        if let Some(region) = self.dispatch.as_mut().and_then(|d| d.regions.pop()) {
            self.builder.patch(
                region.switch_position,
                Instr::GeneratorStateSwitch {
                    cases: region.cases,
                },
            );
        }
    }

    /// Patch the entry switch once the whole body is lowered
    pub(super) fn finish_dispatch(&mut self) {
        if let Some(dispatch) = self.dispatch.take() {
            self.builder.patch(
                dispatch.entry_position,
                Instr::GeneratorStateSwitch {
                    cases: dispatch.entry_cases,
                },
            );
        }
    }

    fn check_suspension(&self, kind: SuspendKind) -> CompileResult<()> {
        let allowed = match kind {
            SuspendKind::Yield | SuspendKind::Delegate => self.is_generator,
            SuspendKind::Await => self.is_async,
        };
        if allowed && self.dispatch.is_some() {
            return Ok(());
        }
        Err(CompileError::InvalidSuspension {
            callable: self.name().to_string(),
            message: match kind {
                SuspendKind::Await => "await outside an async callable".to_string(),
                _ => "yield outside a generator".to_string(),
            },
        })
    }

    /// Emit `Suspend` for a fresh state and place its resume label.
    /// Returns the state and the temp holding the resume kind.
    fn emit_suspend(&mut self, kind: SuspendKind, value: Temp) -> CompileResult<(StateId, Temp)> {
        let resume = self.builder.new_label();
        let result_slot = self.builder.new_temp();
        let state = match self.state_machine.as_mut() {
            Some(info) => info.allocate_state(),
            None => {
                return Err(CompileError::internal(format!(
                    "{}: suspension without state machine",
                    self.name()
                )))
            }
        };
        let region_path = match self.dispatch.as_mut() {
            Some(dispatch) => {
                dispatch.register(state, resume);
                dispatch.region_path()
            }
            None => Vec::new(),
        };

        self.builder.emit(Instr::Suspend { kind, value, state });
        self.builder.place(resume);
        self.builder.emit(Instr::ClearResumeState);
        let resume_kind = self.builder.new_temp();
        self.builder.emit(Instr::LoadResumeKind { dest: resume_kind });

        if let Some(info) = self.state_machine.as_mut() {
            info.record(YieldPoint {
                state,
                resume_label: resume,
                result_slot,
                kind,
                region_path,
                live_temps: Vec::new(),
            });
        }
        trace!(callable = %self.name(), state = state.as_u32(), ?kind, "suspension point");
        Ok((state, resume_kind))
    }

    /// `yield value` or `await value`. Resumption with a throw rethrows at
    /// the suspension point; a generator resumed with return completes as
    /// if `return value` executed here, running enclosing finally bodies.
    pub(super) fn lower_suspend(&mut self, kind: SuspendKind, value: Temp) -> CompileResult<Temp> {
        self.check_suspension(kind)?;
        let (state, resume_kind) = self.emit_suspend(kind, value)?;

        self.when_equals(resume_kind, ResumeKind::Throw.code(), |this| {
            let thrown = this.builder.new_temp();
            this.builder.emit(Instr::LoadResumeValue { dest: thrown });
            this.builder.emit(Instr::Throw { value: thrown });
            Ok(())
        })?;
        if kind == SuspendKind::Yield {
            self.when_equals(resume_kind, ResumeKind::Return.code(), |this| {
                let returned = this.builder.new_temp();
                this.builder.emit(Instr::LoadResumeValue { dest: returned });
                this.lower_return_value(returned)
            })?;
        }

        let result = self.result_slot(state)?;
        self.builder.emit(Instr::LoadResumeValue { dest: result });
        Ok(result)
    }

    /// `yield* iterable`: forward every resume event to the inner iterator
    /// until it completes. A return request that the inner iterator honors
    /// completes the outer generator with the inner result.
    pub(super) fn lower_delegate(&mut self, iterable: Temp) -> CompileResult<Temp> {
        self.check_suspension(SuspendKind::Delegate)?;
        let iterator = self.builder.new_temp();
        self.builder.emit(Instr::GetIterator {
            dest: iterator,
            iterable,
        });
        let mode = self.constant(Constant::Number(ResumeKind::Next.code()));
        let sent = self.constant(Constant::Undefined);
        let done = self.builder.new_temp();
        let result = self.builder.new_temp();

        let step = self.builder.new_label();
        let finished = self.builder.new_label();
        self.builder.place(step);
        self.builder.emit(Instr::DelegateResume {
            iterator,
            mode,
            value: sent,
            done,
            result,
        });
        self.builder.emit(Instr::BranchIfTrue {
            cond: done,
            target: finished,
        });
        let (state, resume_kind) = self.emit_suspend(SuspendKind::Delegate, result)?;
        self.builder.emit(Instr::Move {
            dest: mode,
            src: resume_kind,
        });
        let resumed = self.result_slot(state)?;
        self.builder.emit(Instr::LoadResumeValue { dest: resumed });
        self.builder.emit(Instr::Move {
            dest: sent,
            src: resumed,
        });
        self.builder.emit(Instr::Branch { target: step });

        self.builder.place(finished);
        self.when_equals(mode, ResumeKind::Return.code(), |this| {
            this.lower_return_value(result)
        })?;
        Ok(result)
    }

    fn result_slot(&self, state: StateId) -> CompileResult<Temp> {
        self.state_machine
            .as_ref()
            .and_then(|info| info.yield_point(state))
            .map(|point| point.result_slot)
            .ok_or_else(|| {
                CompileError::internal(format!("{}: unknown state {}", self.name(), state))
            })
    }
}
