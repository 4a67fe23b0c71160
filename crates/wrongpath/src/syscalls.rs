//! ECALL handling on the correct path.
//!
//! Wrong-path ECALLs never get here; the runner squashes them. The default
//! [`LinuxHandler`] implements just enough of the RISC-V Linux ABI for
//! freestanding test programs: `exit`, `exit_group` and `write` to
//! stdout/stderr. Everything else returns `-ENOSYS`.

use tracing::{debug, trace};
use wrongpath_isa::{REG_A0, REG_A1, REG_A2, REG_A7};
use wrongpath_state::{CpuContext, GuestMemory};

/// Known Linux syscall numbers (RISC-V ABI).
pub mod syscall_nr {
    pub const SYS_WRITE: u64 = 64;
    pub const SYS_EXIT: u64 = 93;
    pub const SYS_EXIT_GROUP: u64 = 94;
}

const ENOSYS: i64 = 38;
const EBADF: i64 = 9;

/// Largest single `write` the handler copies out of guest memory.
const MAX_WRITE: u64 = 1 << 20;

/// Result of one ECALL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyscallOutcome {
    /// Result is in `a0`; continue after the ECALL.
    Continue,
    /// The guest asked to exit with this status.
    Exit(u8),
}

/// Services ECALLs reached on the correct path.
pub trait SyscallHandler {
    fn handle_ecall(&mut self, ctx: &mut CpuContext, mem: &GuestMemory) -> SyscallOutcome;

    /// Bytes the guest wrote to stdout and stderr, in order.
    fn output(&self) -> &[u8] {
        &[]
    }
}

/// Minimal Linux syscall emulation with captured output.
#[derive(Debug, Clone, Default)]
pub struct LinuxHandler {
    output: Vec<u8>,
}

impl LinuxHandler {
    pub const fn new() -> Self {
        Self { output: Vec::new() }
    }

    fn write(&mut self, fd: u64, buf: u64, len: u64, mem: &GuestMemory) -> i64 {
        if fd != 1 && fd != 2 {
            return -EBADF;
        }
        let len = len.min(MAX_WRITE).min(mem.size());
        let start = self.output.len();
        self.output.resize(start + len as usize, 0);
        mem.read_bytes(buf, &mut self.output[start..]);
        len.cast_signed()
    }
}

impl SyscallHandler for LinuxHandler {
    fn handle_ecall(&mut self, ctx: &mut CpuContext, mem: &GuestMemory) -> SyscallOutcome {
        let nr = ctx.get_reg(REG_A7);
        let a0 = ctx.get_reg(REG_A0);
        trace!(nr, a0, "ecall");

        let ret = match nr {
            syscall_nr::SYS_EXIT | syscall_nr::SYS_EXIT_GROUP => {
                return SyscallOutcome::Exit(a0 as u8);
            }
            syscall_nr::SYS_WRITE => self.write(a0, ctx.get_reg(REG_A1), ctx.get_reg(REG_A2), mem),
            _ => {
                debug!(nr, pc = format!("{:#x}", ctx.pc), "unsupported syscall");
                -ENOSYS
            }
        };
        ctx.set_reg(REG_A0, ret.cast_unsigned());
        SyscallOutcome::Continue
    }

    fn output(&self) -> &[u8] {
        &self.output
    }
}
