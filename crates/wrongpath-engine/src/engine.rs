//! The speculation state machine.

use tracing::{debug, warn};

use crate::{
    BaseAddress, BranchOutcome, CheckpointStore, Disposition, ExecutionContext, ExecutionPoint,
    PathState, ResolutionThreshold, TraceSink, Transition,
};

/// Counters describing one monitored run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpeculationStats {
    /// Branches redirected onto their wrong path.
    pub speculations: u64,
    /// Checkpoints restored.
    pub rollbacks: u64,
    /// Speculations that replaced a still-live checkpoint.
    pub overwrites: u64,
    /// Instructions that actually ran on the wrong path.
    pub wrong_path_instructions: u64,
    /// Wrong-path instructions the host turned into no-ops.
    pub squashed: u64,
    /// Instructions thrown away by the rollback trigger.
    pub discarded: u64,
}

/// Wrong-path speculation engine for one thread of execution.
///
/// Holds the path state, the single checkpoint, the base address used for
/// offsets and the trace sink. The host calls [`on_instruction`] or
/// [`on_branch`] before every instruction and obeys the returned
/// [`Transition`].
///
/// [`on_instruction`]: Self::on_instruction
/// [`on_branch`]: Self::on_branch
#[derive(Debug)]
pub struct SpeculationEngine<C, S> {
    threshold: ResolutionThreshold,
    path: PathState,
    checkpoint: CheckpointStore<C>,
    base: BaseAddress,
    sink: S,
    stats: SpeculationStats,
}

impl<C: ExecutionContext, S: TraceSink> SpeculationEngine<C, S> {
    pub const fn new(threshold: ResolutionThreshold, sink: S) -> Self {
        Self {
            threshold,
            path: PathState::new(),
            checkpoint: CheckpointStore::new(),
            base: BaseAddress::unset(),
            sink,
            stats: SpeculationStats {
                speculations: 0,
                rollbacks: 0,
                overwrites: 0,
                wrong_path_instructions: 0,
                squashed: 0,
                discarded: 0,
            },
        }
    }

    /// Announce the configuration on the trace.
    pub fn start(&mut self) {
        debug!(threshold = self.threshold.get(), "speculation engine started");
        self.sink.started(self.threshold);
    }

    /// Finalization hook, called once when the monitored program exits.
    pub fn finish(&mut self) {
        debug!(
            speculations = self.stats.speculations,
            rollbacks = self.stats.rollbacks,
            overwrites = self.stats.overwrites,
            wrong_path = self.stats.wrong_path_instructions,
            "speculation engine finished"
        );
        self.sink.finished();
    }

    /// Hook for an instruction that is not a speculated branch.
    pub fn on_instruction(&mut self, ctx: &C) -> Transition<C> {
        self.observe_instruction(ctx.instruction_pointer(), Disposition::Execute)
    }

    /// Hook for a wrong-path instruction the host will not execute.
    ///
    /// The instruction still counts toward the resolution window.
    pub fn on_squashed(&mut self, ctx: &C) -> Transition<C> {
        self.observe_instruction(ctx.instruction_pointer(), Disposition::Squash)
    }

    /// Hook for a control transfer with a fallthrough.
    ///
    /// `ctx` is the live context at the branch with every effect of the
    /// branch other than the transfer itself already applied. Unless the
    /// rollback trigger fires first, the correct continuation is
    /// checkpointed and execution is redirected to the other direction; the
    /// live context is left pointing at the wrong path.
    pub fn on_branch(&mut self, ctx: &mut C, outcome: BranchOutcome) -> Transition<C> {
        let transition = self.on_instruction(ctx);
        if !transition.is_continue() {
            return transition;
        }
        self.sink.branch(outcome.taken);

        ctx.set_instruction_pointer(outcome.right_path());
        if self.checkpoint.save(ctx).is_some() {
            self.stats.overwrites += 1;
        }
        self.path.enter_wrong_path();

        let wrong = outcome.wrong_path();
        ctx.set_instruction_pointer(wrong);
        self.stats.speculations += 1;
        self.sink.redirect(wrong, self.base.offset(wrong));

        Transition::Speculate(ExecutionPoint::new(ctx.clone()))
    }

    /// Restore the checkpoint if the wrong-path window has run out.
    ///
    /// Returns the point to resume at, or `None` when on the correct path or
    /// still within the window.
    pub fn maybe_rollback(&mut self) -> Option<ExecutionPoint<C>> {
        if !self.path.exceeds(self.threshold) {
            return None;
        }
        self.path.leave_wrong_path();
        let Some(context) = self.checkpoint.take() else {
            warn!("wrong path without a checkpoint, continuing in place");
            return None;
        };

        let point = ExecutionPoint::new(context);
        self.stats.rollbacks += 1;
        self.sink.rollback(point.address, self.base.offset(point.address));
        Some(point)
    }

    fn observe_instruction(&mut self, addr: u64, disposition: Disposition) -> Transition<C> {
        self.path.observe();
        self.base.observe(addr);

        let disposition = if self.path.exceeds(self.threshold) {
            Disposition::Discard
        } else {
            disposition
        };
        let wrong_path = self
            .path
            .on_wrong_path()
            .then_some(self.path.wrong_path_instr_count());
        self.sink
            .instruction(addr, self.base.offset(addr), wrong_path, disposition);

        if let Some(point) = self.maybe_rollback() {
            self.stats.discarded += 1;
            return Transition::Rollback(point);
        }

        if self.path.on_wrong_path() {
            match disposition {
                Disposition::Execute => self.stats.wrong_path_instructions += 1,
                Disposition::Squash => self.stats.squashed += 1,
                Disposition::Discard => {}
            }
        }
        Transition::Continue
    }

    pub const fn threshold(&self) -> ResolutionThreshold {
        self.threshold
    }

    pub const fn path(&self) -> &PathState {
        &self.path
    }

    pub const fn on_wrong_path(&self) -> bool {
        self.path.on_wrong_path()
    }

    pub const fn checkpoint(&self) -> &CheckpointStore<C> {
        &self.checkpoint
    }

    pub const fn base_address(&self) -> Option<u64> {
        self.base.get()
    }

    pub const fn stats(&self) -> &SpeculationStats {
        &self.stats
    }

    pub const fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::TestContext;
    use crate::{RecordingSink, TraceEvent};

    type Engine = SpeculationEngine<TestContext, RecordingSink>;

    fn engine(threshold: u32) -> Engine {
        SpeculationEngine::new(ResolutionThreshold::new(threshold), RecordingSink::new())
    }

    /// Run straight-line instructions from `ctx.pc` until the engine
    /// transfers control; returns the transition and how many ran.
    fn run_until_transfer(
        engine: &mut Engine,
        ctx: &mut TestContext,
        limit: usize,
    ) -> (Transition<TestContext>, usize) {
        for executed in 0..limit {
            let transition = engine.on_instruction(ctx);
            if !transition.is_continue() {
                return (transition, executed);
            }
            ctx.pc += 4;
        }
        (Transition::Continue, limit)
    }

    #[test]
    fn test_on_path_instruction_continues() {
        let mut engine = engine(0);
        let ctx = TestContext::at(0x1000);
        assert!(engine.on_instruction(&ctx).is_continue());
        assert!(!engine.on_wrong_path());
        assert_eq!(engine.path().wrong_path_instr_count(), 0);
        assert_eq!(engine.sink().executed(), vec![0x1000]);
    }

    #[test]
    fn test_branch_checkpoints_right_path_and_redirects() {
        let mut engine = engine(4);
        let mut ctx = TestContext::at(0x1000);
        ctx.regs[2] = 42;

        let outcome = BranchOutcome::new(true, 0x2000, 0x1004);
        let transition = engine.on_branch(&mut ctx, outcome);

        let Transition::Speculate(point) = transition else {
            panic!("expected speculation, got {transition:?}");
        };
        assert_eq!(point.address, 0x1004);
        assert_eq!(point.context.regs[2], 42);
        assert_eq!(ctx.pc, 0x1004);
        assert!(engine.on_wrong_path());
        assert_eq!(engine.path().wrong_path_instr_count(), 0);
        assert_eq!(engine.checkpoint().resume_address(), Some(0x2000));
        assert_eq!(engine.checkpoint().get().map(|c| c.regs[2]), Some(42));
        assert_eq!(engine.stats().speculations, 1);
    }

    #[test]
    fn test_not_taken_branch_speculates_target() {
        let mut engine = engine(4);
        let mut ctx = TestContext::at(0x1000);
        let transition = engine.on_branch(&mut ctx, BranchOutcome::new(false, 0x2000, 0x1004));
        assert_eq!(transition.target().map(|p| p.address), Some(0x2000));
        assert_eq!(engine.checkpoint().resume_address(), Some(0x1004));
    }

    #[test]
    fn test_threshold_allows_exactly_t_plus_one_reached() {
        for threshold in 0..12 {
            let mut engine = engine(threshold);
            let mut ctx = TestContext::at(0x1000);
            let _ = engine.on_branch(&mut ctx, BranchOutcome::new(false, 0x4000, 0x1004));

            let (transition, executed) = run_until_transfer(&mut engine, &mut ctx, 100);
            let Transition::Rollback(point) = transition else {
                panic!("threshold {threshold}: no rollback");
            };
            assert_eq!(point.address, 0x1004);
            assert_eq!(executed, threshold as usize, "threshold {threshold}");

            let counts = engine.sink().wrong_path_counts();
            assert_eq!(counts, (1..=threshold + 1).collect::<Vec<_>>());
            assert_eq!(engine.stats().wrong_path_instructions, u64::from(threshold));
            assert_eq!(engine.stats().discarded, 1);
        }
    }

    #[test]
    fn test_rollback_clears_state_and_is_idempotent() {
        let mut engine = engine(1);
        let mut ctx = TestContext::at(0x1000);
        let _ = engine.on_branch(&mut ctx, BranchOutcome::new(true, 0x3000, 0x1004));
        let (transition, _) = run_until_transfer(&mut engine, &mut ctx, 10);
        let point = transition.into_target().unwrap();
        assert!(!engine.on_wrong_path());
        assert!(engine.checkpoint().is_empty());
        assert!(engine.maybe_rollback().is_none());

        let resumed = point.context;
        assert!(engine.on_instruction(&resumed).is_continue());
        assert_eq!(engine.path().wrong_path_instr_count(), 0);
        assert_eq!(engine.stats().rollbacks, 1);
    }

    #[test]
    fn test_count_zero_whenever_on_path() {
        let mut engine = engine(2);
        let mut ctx = TestContext::at(0x1000);
        for step in 0..40u64 {
            let transition = if step % 7 == 3 {
                let outcome = BranchOutcome::new(step % 2 == 0, 0x8000, ctx.pc + 4);
                engine.on_branch(&mut ctx, outcome)
            } else {
                engine.on_instruction(&ctx)
            };
            if !engine.on_wrong_path() {
                assert_eq!(engine.path().wrong_path_instr_count(), 0);
            }
            match transition.into_target() {
                Some(point) => ctx = point.context,
                None => ctx.pc += 4,
            }
        }
    }

    #[test]
    fn test_branch_on_wrong_path_overwrites_checkpoint() {
        let mut engine = engine(10);
        let mut ctx = TestContext::at(0x1000);
        let _ = engine.on_branch(&mut ctx, BranchOutcome::new(true, 0x2000, 0x1004));
        assert_eq!(engine.checkpoint().resume_address(), Some(0x2000));

        let _ = engine.on_instruction(&ctx);
        ctx.pc += 4;
        let _ = engine.on_instruction(&ctx);
        ctx.pc += 4;
        assert_eq!(engine.path().wrong_path_instr_count(), 2);

        let transition = engine.on_branch(&mut ctx, BranchOutcome::new(false, 0x5000, 0x1010));
        assert_eq!(transition.target().map(|p| p.address), Some(0x5000));
        assert!(engine.on_wrong_path());
        assert_eq!(engine.path().wrong_path_instr_count(), 0);
        assert_eq!(engine.checkpoint().resume_address(), Some(0x1010));
        assert_eq!(engine.stats().overwrites, 1);

        let (transition, _) = run_until_transfer(&mut engine, &mut ctx, 100);
        assert_eq!(transition.target().map(|p| p.address), Some(0x1010));
    }

    #[test]
    fn test_branch_past_window_rolls_back_instead() {
        let mut engine = engine(0);
        let mut ctx = TestContext::at(0x1000);
        let _ = engine.on_branch(&mut ctx, BranchOutcome::new(true, 0x2000, 0x1004));

        let transition = engine.on_branch(&mut ctx, BranchOutcome::new(true, 0x9000, 0x1008));
        let Transition::Rollback(point) = transition else {
            panic!("expected rollback, got {transition:?}");
        };
        assert_eq!(point.address, 0x2000);
        assert_eq!(engine.stats().speculations, 1);
        assert_eq!(engine.sink().redirects(), 1);
    }

    #[test]
    fn test_squashed_instructions_count_toward_window() {
        let mut engine = engine(2);
        let mut ctx = TestContext::at(0x1000);
        let _ = engine.on_branch(&mut ctx, BranchOutcome::new(true, 0x2000, 0x1004));
        assert!(engine.on_squashed(&ctx).is_continue());
        ctx.pc += 4;
        assert!(engine.on_instruction(&ctx).is_continue());
        ctx.pc += 4;
        assert!(!engine.on_squashed(&ctx).is_continue());
        assert_eq!(engine.stats().squashed, 1);
        assert_eq!(engine.stats().wrong_path_instructions, 1);
    }

    #[test]
    fn test_trace_sequence_for_zero_threshold() {
        let mut engine = engine(0);
        engine.start();
        let mut ctx = TestContext::at(0x100);
        let _ = engine.on_instruction(&ctx);
        ctx.pc = 0x104;
        let point = engine
            .on_branch(&mut ctx, BranchOutcome::new(true, 0x200, 0x108))
            .into_target()
            .unwrap();
        let rollback = engine.on_instruction(&point.context).into_target().unwrap();
        let _ = engine.on_instruction(&rollback.context);
        engine.finish();

        let events = &engine.sink().events;
        assert_eq!(
            events.as_slice(),
            &[
                TraceEvent::Started { threshold: 0 },
                TraceEvent::Instruction {
                    addr: 0x100,
                    offset: 0,
                    wrong_path: None,
                    disposition: Disposition::Execute,
                },
                TraceEvent::Instruction {
                    addr: 0x104,
                    offset: 4,
                    wrong_path: None,
                    disposition: Disposition::Execute,
                },
                TraceEvent::Branch { taken: true },
                TraceEvent::Redirect {
                    addr: 0x108,
                    offset: 8
                },
                TraceEvent::Instruction {
                    addr: 0x108,
                    offset: 8,
                    wrong_path: Some(1),
                    disposition: Disposition::Discard,
                },
                TraceEvent::Rollback {
                    addr: 0x200,
                    offset: 0x100
                },
                TraceEvent::Instruction {
                    addr: 0x200,
                    offset: 0x100,
                    wrong_path: None,
                    disposition: Disposition::Execute,
                },
                TraceEvent::Finished,
            ]
        );
    }

    #[test]
    fn test_base_address_is_first_observed() {
        let mut engine = engine(3);
        let mut ctx = TestContext::at(0x8000_0040);
        let _ = engine.on_instruction(&ctx);
        ctx.pc = 0x8000_0000;
        let _ = engine.on_instruction(&ctx);
        assert_eq!(engine.base_address(), Some(0x8000_0040));
        let TraceEvent::Instruction { offset, .. } = engine.sink().events[1] else {
            panic!("expected instruction event");
        };
        assert_eq!(offset, 0x8000_0000u64.wrapping_sub(0x8000_0040));
    }
}
