use wrongpath_engine::SpeculationStats;

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The guest called `exit` or `exit_group` on the correct path.
    Exited(u8),
    /// The configured instruction limit was reached.
    InstructionLimit,
}

/// Execution result.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub stop: StopReason,
    /// Correct-path instructions retired.
    pub instret: u64,
    /// Every instruction the engine observed, either path.
    pub observed: u64,
    /// Bytes written to stdout and stderr by the guest.
    pub guest_output: Vec<u8>,
    pub stats: SpeculationStats,
    /// Wall-clock time in seconds.
    pub time_secs: f64,
}

impl RunResult {
    /// Exit status for the host process.
    pub const fn exit_code(&self) -> Option<u8> {
        match self.stop {
            StopReason::Exited(code) => Some(code),
            StopReason::InstructionLimit => None,
        }
    }

    /// Speed in MIPS (million observed instructions per second).
    pub fn mips(&self) -> f64 {
        if self.time_secs > 0.0 {
            self.observed as f64 / self.time_secs / 1_000_000.0
        } else {
            0.0
        }
    }

    /// Print result in JSON format.
    pub fn print_json(&self) {
        let exit_code = self
            .exit_code()
            .map_or_else(|| "null".to_string(), |c| c.to_string());
        println!(
            r#"{{"exit_code":{},"instret":{},"observed":{},"speculations":{},"rollbacks":{},"overwrites":{},"wrong_path":{},"squashed":{},"time":{:.6}}}"#,
            exit_code,
            self.instret,
            self.observed,
            self.stats.speculations,
            self.stats.rollbacks,
            self.stats.overwrites,
            self.stats.wrong_path_instructions,
            self.stats.squashed,
            self.time_secs
        );
    }
}
