//! Interpreter loop that drives the speculation engine.
//!
//! Every instruction is fetched and classified once, then cached by address.
//! Before each instruction the runner calls the engine hook chosen at
//! classification time and obeys the returned transition:
//!
//! - `Speculate` opens a fresh memory journal and jumps to the wrong path.
//! - `Rollback` undoes the journal and restores the checkpoint.
//!
//! On the wrong path, ECALL, EBREAK and undecodable or misaligned fetches are
//! squashed: they count toward the resolution window but have no effect.

mod result;

use std::path::Path;
use std::time::Instant;

use rustc_hash::FxHashMap;
use tracing::{debug, info, trace, warn};
use wrongpath_elf::{ElfImage, get_elf_xlen};
use wrongpath_engine::{
    BranchOutcome, ExecutionPoint, Hook, InstrProps, SpeculationEngine, SpeculationStats,
    TraceSink, Transition,
};
use wrongpath_isa::{
    CompositeDecoder, DecodedInstr, INSN_BYTES, OP_EBREAK, OP_ECALL, REG_GP, REG_RA, REG_SP,
};
use wrongpath_state::{CpuContext, GuestMemory};

pub use result::{RunResult, StopReason};

use crate::config::RunConfig;
use crate::exec::{self, Effect};
use crate::syscalls::{LinuxHandler, SyscallHandler, SyscallOutcome};
use crate::{Error, Result};

/// Initial stack pointer sits this far below the top of the memory window.
const STACK_TOP_GAP: u64 = 16;

/// An address after fetch and classification.
#[derive(Clone, Debug)]
enum Fetched {
    Decoded { instr: DecodedInstr, hook: Hook },
    Illegal { raw: u32 },
    Misaligned,
}

/// Read a program: a raw binary mapped and entered at `raw_base` if given,
/// otherwise an RV64 ELF file.
pub fn load_program(path: impl AsRef<Path>, raw_base: Option<u64>) -> Result<ElfImage> {
    let data = std::fs::read(path.as_ref())?;
    if let Some(base) = raw_base {
        return Ok(ElfImage::from_bytecode(data, base)?);
    }
    let xlen = get_elf_xlen(&data)?;
    if xlen != 64 {
        return Err(Error::XlenMismatch {
            expected: 64,
            actual: xlen,
        });
    }
    Ok(ElfImage::parse(&data)?)
}

/// Runs one guest program under the speculation engine.
pub struct Runner<S: TraceSink> {
    config: RunConfig,
    ctx: CpuContext,
    memory: GuestMemory,
    decoder: CompositeDecoder,
    cache: FxHashMap<u64, Fetched>,
    engine: SpeculationEngine<CpuContext, S>,
    syscalls: Box<dyn SyscallHandler>,
    instret: u64,
    observed: u64,
}

impl<S: TraceSink> Runner<S> {
    /// Load `image` into fresh guest memory and set up the initial registers.
    pub fn new(image: &ElfImage, config: RunConfig, sink: S) -> Result<Self> {
        let mut memory = GuestMemory::new(config.memory_bits)?;
        memory.load_image(image)?;
        if image.is_rvc() {
            warn!("ELF is flagged for compressed instructions, which are not supported");
        }

        let mut runner = Self {
            config,
            ctx: CpuContext::new(image.entry_point),
            memory,
            decoder: CompositeDecoder::standard(),
            cache: FxHashMap::default(),
            engine: SpeculationEngine::new(config.threshold, sink),
            syscalls: Box::new(LinuxHandler::new()),
            instret: 0,
            observed: 0,
        };
        runner.setup_initial_regs(image);
        info!(
            entry_point = format!("{:#x}", image.entry_point),
            segments = image.memory_segments.len(),
            size = image.total_size(),
            "program loaded"
        );
        Ok(runner)
    }

    /// Load a program from disk; see [`load_program`].
    pub fn from_file(
        path: impl AsRef<Path>,
        raw_base: Option<u64>,
        config: RunConfig,
        sink: S,
    ) -> Result<Self> {
        let image = load_program(path, raw_base)?;
        Self::new(&image, config, sink)
    }

    /// Replace the default Linux syscall handler.
    #[must_use]
    pub fn with_syscalls(mut self, handler: impl SyscallHandler + 'static) -> Self {
        self.syscalls = Box::new(handler);
        self
    }

    fn setup_initial_regs(&mut self, image: &ElfImage) {
        if let Some(gp) = image.lookup_symbol("__global_pointer$") {
            self.ctx.set_reg(REG_GP, gp);
        }
        let sp = image
            .lookup_symbol("__stack_top")
            .unwrap_or_else(|| self.default_stack_top(image));
        self.ctx.set_reg(REG_SP, sp);
        // Trap on unexpected returns from entry points.
        self.ctx.set_reg(REG_RA, 0);
    }

    /// Top of the memory window holding the lowest segment.
    fn default_stack_top(&self, image: &ElfImage) -> u64 {
        let size = self.memory.size();
        let lowest = image
            .memory_segments
            .iter()
            .map(|s| s.virtual_start)
            .min()
            .unwrap_or(0);
        (lowest & !(size - 1)).wrapping_add(size - STACK_TOP_GAP)
    }

    /// Run until the guest exits, the instruction limit is hit, or the
    /// correct path faults.
    pub fn run(&mut self) -> Result<RunResult> {
        trace!(
            entry_point = format!("{:#x}", self.ctx.pc),
            threshold = self.config.threshold.get(),
            "starting run"
        );
        let start = Instant::now();
        self.engine.start();
        let outcome = self.run_loop();
        self.engine.finish();
        let stop = outcome?;
        let time_secs = start.elapsed().as_secs_f64();

        let stats = *self.engine.stats();
        debug!(
            instret = self.instret,
            observed = self.observed,
            speculations = stats.speculations,
            rollbacks = stats.rollbacks,
            "run finished"
        );
        Ok(RunResult {
            stop,
            instret: self.instret,
            observed: self.observed,
            guest_output: self.syscalls.output().to_vec(),
            stats,
            time_secs,
        })
    }

    fn run_loop(&mut self) -> Result<StopReason> {
        loop {
            if self
                .config
                .max_insns
                .is_some_and(|limit| self.observed >= limit)
            {
                warn!(limit = self.observed, "instruction limit reached");
                return Ok(StopReason::InstructionLimit);
            }
            if let Some(stop) = self.step()? {
                return Ok(stop);
            }
        }
    }

    /// Observe and execute the instruction at `pc`.
    fn step(&mut self) -> Result<Option<StopReason>> {
        let pc = self.ctx.pc;
        self.observed += 1;

        let instr = match self.fetch(pc) {
            Fetched::Decoded { instr, hook } => {
                if hook == Hook::Branch
                    && let Some(outcome) = exec::branch_outcome(&self.ctx, &instr)
                {
                    self.speculate(&instr, outcome);
                    return Ok(None);
                }
                instr
            }
            Fetched::Illegal { raw } => {
                return self.fault(Error::IllegalInstruction { pc, raw });
            }
            Fetched::Misaligned => return self.fault(Error::MisalignedFetch(pc)),
        };

        if self.engine.on_wrong_path() && (instr.opid == OP_ECALL || instr.opid == OP_EBREAK) {
            let transition = self.engine.on_squashed(&self.ctx);
            if !self.apply(transition) {
                self.ctx.pc = instr.next_pc();
            }
            return Ok(None);
        }

        let transition = self.engine.on_instruction(&self.ctx);
        if self.apply(transition) {
            return Ok(None);
        }
        let correct_path = !self.engine.on_wrong_path();

        match exec::execute(&mut self.ctx, &mut self.memory, &instr) {
            Effect::Done => {}
            Effect::Ecall => match self.syscalls.handle_ecall(&mut self.ctx, &self.memory) {
                SyscallOutcome::Exit(code) => {
                    self.instret += 1;
                    return Ok(Some(StopReason::Exited(code)));
                }
                SyscallOutcome::Continue => self.ctx.pc = instr.next_pc(),
            },
            Effect::Ebreak => return Err(Error::Breakpoint(pc)),
            Effect::Illegal => {
                return Err(Error::IllegalInstruction {
                    pc,
                    raw: instr.raw,
                });
            }
        }
        if correct_path {
            self.instret += 1;
        }
        Ok(None)
    }

    /// A branch or call: the link is written before the engine checkpoints.
    fn speculate(&mut self, instr: &DecodedInstr, outcome: BranchOutcome) {
        let correct_path = !self.engine.on_wrong_path();
        let mut ctx = self.ctx;
        exec::write_link(&mut ctx, instr);

        match self.engine.on_branch(&mut ctx, outcome) {
            Transition::Continue => {
                self.ctx = ctx;
                self.ctx.pc = outcome.right_path();
            }
            transition => {
                if correct_path && matches!(transition, Transition::Speculate(_)) {
                    self.instret += 1;
                }
                self.apply(transition);
            }
        }
    }

    /// An instruction that cannot run. Squashed on the wrong path, fatal on
    /// the correct one.
    fn fault(&mut self, err: Error) -> Result<Option<StopReason>> {
        if self.engine.on_wrong_path() {
            let transition = self.engine.on_squashed(&self.ctx);
            if !self.apply(transition) {
                self.ctx.pc = self.ctx.pc.wrapping_add(u64::from(INSN_BYTES));
            }
            return Ok(None);
        }
        let _ = self.engine.on_instruction(&self.ctx);
        Err(err)
    }

    /// Carry out a redirecting transition. Returns false for `Continue`.
    fn apply(&mut self, transition: Transition<CpuContext>) -> bool {
        match transition {
            Transition::Continue => false,
            Transition::Speculate(point) => {
                self.memory.begin_journal();
                self.resume(point);
                true
            }
            Transition::Rollback(point) => {
                let restored = self.memory.undo_journal();
                trace!(
                    to = format!("{:#x}", point.address),
                    restored_bytes = restored,
                    "rollback"
                );
                self.resume(point);
                true
            }
        }
    }

    fn resume(&mut self, point: ExecutionPoint<CpuContext>) {
        self.ctx = point.context;
    }

    fn fetch(&mut self, pc: u64) -> Fetched {
        if let Some(fetched) = self.cache.get(&pc) {
            return fetched.clone();
        }
        let fetched = if pc % u64::from(INSN_BYTES) != 0 {
            Fetched::Misaligned
        } else {
            let raw = self.memory.read_u32(pc);
            match self.decoder.decode(&raw.to_le_bytes(), pc) {
                Some(instr) => {
                    let hook = Hook::for_props(InstrProps {
                        is_control_flow: instr.is_control_flow(),
                        has_fallthrough: instr.has_fallthrough(),
                    });
                    Fetched::Decoded { instr, hook }
                }
                None => Fetched::Illegal { raw },
            }
        };
        // Words read under an open journal may be wrong-path stores that a
        // rollback puts back; only decodes of committed memory are kept.
        if !self.memory.is_journaling() {
            self.cache.insert(pc, fetched.clone());
        }
        fetched
    }

    pub const fn context(&self) -> &CpuContext {
        &self.ctx
    }

    pub const fn memory(&self) -> &GuestMemory {
        &self.memory
    }

    pub const fn engine(&self) -> &SpeculationEngine<CpuContext, S> {
        &self.engine
    }

    pub const fn stats(&self) -> &SpeculationStats {
        self.engine.stats()
    }

    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn into_sink(self) -> S {
        self.engine.into_sink()
    }
}
