//! Diagnostic trace sinks.
//!
//! The engine reports every observed instruction and every redirection to a
//! [`TraceSink`]. The text format is line-oriented and meant for people, not
//! parsers:
//!
//! ```text
//! Executing instruction at 80000004(4)
//! Taken branch
//! xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx
//! Redirecting to wrong path address 8000000c(c)
//! xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx
//! [ON WRONG PATH, 1 wrong instructions executed] Discarding instruction at 8000000c(c)
//! ===================================
//! Rolling back to 80000020(20)
//! ===================================
//! ```

use std::io::{self, Write};

use crate::ResolutionThreshold;

const BANNER: &str = "===============================================";
const ROLLBACK_RULE: &str = "===================================";
const REDIRECT_RULE: &str = "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx";

/// What happens to an observed instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Runs normally.
    Execute,
    /// Reached on the wrong path but turned into a no-op by the host
    /// (system calls, traps, undecodable words).
    Squash,
    /// Thrown away because the rollback trigger fired in front of it.
    Discard,
}

impl Disposition {
    const fn verb(self) -> &'static str {
        match self {
            Self::Execute => "Executing",
            Self::Squash => "Squashing",
            Self::Discard => "Discarding",
        }
    }
}

/// Receiver for engine diagnostics.
///
/// All methods default to no-ops so a sink only implements what it needs.
pub trait TraceSink {
    /// Called once before the first instruction.
    fn started(&mut self, _threshold: ResolutionThreshold) {}

    /// Called for every observed instruction. `wrong_path` carries the
    /// running wrong-path count while on the wrong path.
    fn instruction(
        &mut self,
        _addr: u64,
        _offset: u64,
        _wrong_path: Option<u32>,
        _disposition: Disposition,
    ) {
    }

    /// Called when a branch resolves, before redirection.
    fn branch(&mut self, _taken: bool) {}

    /// Called when execution is sent down the wrong path.
    fn redirect(&mut self, _addr: u64, _offset: u64) {}

    /// Called when the checkpoint is restored.
    fn rollback(&mut self, _addr: u64, _offset: u64) {}

    /// Called once when the monitored program is done.
    fn finished(&mut self) {}
}

impl<T: TraceSink + ?Sized> TraceSink for Box<T> {
    fn started(&mut self, threshold: ResolutionThreshold) {
        (**self).started(threshold);
    }

    fn instruction(
        &mut self,
        addr: u64,
        offset: u64,
        wrong_path: Option<u32>,
        disposition: Disposition,
    ) {
        (**self).instruction(addr, offset, wrong_path, disposition);
    }

    fn branch(&mut self, taken: bool) {
        (**self).branch(taken);
    }

    fn redirect(&mut self, addr: u64, offset: u64) {
        (**self).redirect(addr, offset);
    }

    fn rollback(&mut self, addr: u64, offset: u64) {
        (**self).rollback(addr, offset);
    }

    fn finished(&mut self) {
        (**self).finished();
    }
}

/// Sink that drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

/// Writes the text trace to any [`Write`].
///
/// Write failures do not stop the monitored program. The first one is kept
/// and later output is dropped; the host decides whether to report it.
#[derive(Debug)]
pub struct TextSink<W: Write> {
    writer: W,
    error: Option<io::Error>,
    lines: u64,
}

impl<W: Write> TextSink<W> {
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            error: None,
            lines: 0,
        }
    }

    /// Number of lines successfully written.
    pub const fn lines(&self) -> u64 {
        self.lines
    }

    /// The first write error, if any.
    pub const fn error(&self) -> Option<&io::Error> {
        self.error.as_ref()
    }

    /// Flush and return the writer.
    ///
    /// # Errors
    ///
    /// Returns the first write error seen while tracing, or the flush error.
    pub fn into_inner(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn line(&mut self, args: std::fmt::Arguments<'_>) {
        if self.error.is_some() {
            return;
        }
        match writeln!(self.writer, "{args}") {
            Ok(()) => self.lines += 1,
            Err(err) => self.error = Some(err),
        }
    }
}

impl<W: Write> TraceSink for TextSink<W> {
    fn started(&mut self, threshold: ResolutionThreshold) {
        self.line(format_args!(
            "Branch resolution time set as {threshold} instructions"
        ));
        self.line(format_args!("{BANNER}"));
        self.line(format_args!("wrongpath started"));
        self.line(format_args!("{BANNER}"));
    }

    fn instruction(
        &mut self,
        addr: u64,
        offset: u64,
        wrong_path: Option<u32>,
        disposition: Disposition,
    ) {
        let verb = disposition.verb();
        match wrong_path {
            Some(count) => self.line(format_args!(
                "[ON WRONG PATH, {count} wrong instructions executed] \
                 {verb} instruction at {addr:x}({offset:x})"
            )),
            None => self.line(format_args!("{verb} instruction at {addr:x}({offset:x})")),
        }
    }

    fn branch(&mut self, taken: bool) {
        if taken {
            self.line(format_args!("Taken branch"));
        } else {
            self.line(format_args!("Not taken branch"));
        }
    }

    fn redirect(&mut self, addr: u64, offset: u64) {
        self.line(format_args!("{REDIRECT_RULE}"));
        self.line(format_args!(
            "Redirecting to wrong path address {addr:x}({offset:x})"
        ));
        self.line(format_args!("{REDIRECT_RULE}"));
    }

    fn rollback(&mut self, addr: u64, offset: u64) {
        self.line(format_args!("{ROLLBACK_RULE}"));
        self.line(format_args!("Rolling back to {addr:x}({offset:x})"));
        self.line(format_args!("{ROLLBACK_RULE}"));
    }

    fn finished(&mut self) {
        self.line(format_args!("{BANNER}"));
        self.line(format_args!("wrongpath finished"));
        self.line(format_args!("{BANNER}"));
        if self.error.is_none()
            && let Err(err) = self.writer.flush()
        {
            self.error = Some(err);
        }
    }
}

/// One recorded sink call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TraceEvent {
    Started {
        threshold: u32,
    },
    Instruction {
        addr: u64,
        offset: u64,
        wrong_path: Option<u32>,
        disposition: Disposition,
    },
    Branch {
        taken: bool,
    },
    Redirect {
        addr: u64,
        offset: u64,
    },
    Rollback {
        addr: u64,
        offset: u64,
    },
    Finished,
}

/// Sink that keeps every event in memory.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<TraceEvent>,
}

impl RecordingSink {
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Addresses of instructions that actually ran, in order.
    pub fn executed(&self) -> Vec<u64> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TraceEvent::Instruction {
                    addr,
                    disposition: Disposition::Execute,
                    ..
                } => Some(*addr),
                _ => None,
            })
            .collect()
    }

    /// Wrong-path counts of annotated instruction events, in order.
    pub fn wrong_path_counts(&self) -> Vec<u32> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TraceEvent::Instruction { wrong_path, .. } => *wrong_path,
                _ => None,
            })
            .collect()
    }

    pub fn rollbacks(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, TraceEvent::Rollback { .. }))
            .count()
    }

    pub fn redirects(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, TraceEvent::Redirect { .. }))
            .count()
    }
}

impl TraceSink for RecordingSink {
    fn started(&mut self, threshold: ResolutionThreshold) {
        self.events.push(TraceEvent::Started {
            threshold: threshold.get(),
        });
    }

    fn instruction(
        &mut self,
        addr: u64,
        offset: u64,
        wrong_path: Option<u32>,
        disposition: Disposition,
    ) {
        self.events.push(TraceEvent::Instruction {
            addr,
            offset,
            wrong_path,
            disposition,
        });
    }

    fn branch(&mut self, taken: bool) {
        self.events.push(TraceEvent::Branch { taken });
    }

    fn redirect(&mut self, addr: u64, offset: u64) {
        self.events.push(TraceEvent::Redirect { addr, offset });
    }

    fn rollback(&mut self, addr: u64, offset: u64) {
        self.events.push(TraceEvent::Rollback { addr, offset });
    }

    fn finished(&mut self) {
        self.events.push(TraceEvent::Finished);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_text_instruction_lines() {
        let mut sink = TextSink::new(Vec::new());
        sink.instruction(0x8000_0004, 0x4, None, Disposition::Execute);
        sink.instruction(0x8000_0010, 0x10, Some(2), Disposition::Execute);
        sink.instruction(0x8000_0014, 0x14, Some(3), Disposition::Squash);
        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "Executing instruction at 80000004(4)");
        assert_eq!(
            lines[1],
            "[ON WRONG PATH, 2 wrong instructions executed] Executing instruction at 80000010(10)"
        );
        assert_eq!(
            lines[2],
            "[ON WRONG PATH, 3 wrong instructions executed] Squashing instruction at 80000014(14)"
        );
    }

    #[test]
    fn test_text_redirect_and_rollback_blocks() {
        let mut sink = TextSink::new(Vec::new());
        sink.branch(false);
        sink.redirect(0x120, 0x20);
        sink.rollback(0x104, 0x4);
        assert_eq!(sink.lines(), 7);
        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "Not taken branch");
        assert_eq!(lines[1], REDIRECT_RULE);
        assert_eq!(lines[2], "Redirecting to wrong path address 120(20)");
        assert_eq!(lines[5], "Rolling back to 104(4)");
    }

    #[test]
    fn test_text_banners() {
        let mut sink = TextSink::new(Vec::new());
        sink.started(ResolutionThreshold::new(5));
        sink.finished();
        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert!(out.starts_with("Branch resolution time set as 5 instructions\n"));
        assert!(out.contains("wrongpath started"));
        assert!(out.trim_end().ends_with(BANNER));
        assert!(out.contains("wrongpath finished"));
    }

    #[test]
    fn test_text_sink_keeps_first_error() {
        let mut sink = TextSink::new(FailingWriter);
        sink.branch(true);
        sink.branch(false);
        assert_eq!(sink.lines(), 0);
        assert_eq!(
            sink.error().map(io::Error::kind),
            Some(io::ErrorKind::BrokenPipe)
        );
        assert!(sink.into_inner().is_err());
    }

    #[test]
    fn test_boxed_sink_forwards() {
        let mut boxed: Box<RecordingSink> = Box::new(RecordingSink::new());
        boxed.branch(true);
        boxed.rollback(0x10, 0);
        assert_eq!(boxed.events.len(), 2);
        assert_eq!(boxed.rollbacks(), 1);
    }
}
