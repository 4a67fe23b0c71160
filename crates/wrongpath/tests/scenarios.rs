//! End-to-end runs of small guest programs under the speculation engine.
//!
//! Every program is assembled in-process, so no toolchain is needed. Some
//! checks are repeated for a range of resolution times.

mod common;

use std::fs::{self, File};
use std::io::BufWriter;

use common::{BASE, build_elf, config, correct_path, excursions, exit, exit_a0, run_words};
use libtest_mimic::{Arguments, Failed, Trial};
use wrongpath::{
    Disposition, Error, RecordingSink, Runner, StopReason, TextSink, TraceEvent, load_program,
};
use wrongpath_isa::{
    REG_A0, REG_A1, REG_A2, REG_A7, REG_RA, REG_T0, REG_T1, REG_T2, REG_ZERO, asm,
};

/// Largest resolution time swept by the per-threshold checks.
const MAX_SWEPT_THRESHOLD: u32 = 12;

fn main() {
    let args = Arguments::from_args();

    let mut trials = vec![
        Trial::test("taken_branch_at_zero_threshold", taken_branch_at_zero_threshold),
        Trial::test("not_taken_branch_window", not_taken_branch_window),
        Trial::test("nested_branch_overwrites_checkpoint", nested_branch_overwrites_checkpoint),
        Trial::test("call_resumes_at_callee", call_resumes_at_callee),
        Trial::test("instruction_limit", instruction_limit),
        Trial::test("guest_write_captured", guest_write_captured),
        Trial::test("elf_file", elf_file),
        Trial::test("rv32_elf_rejected", rv32_elf_rejected),
        Trial::test("text_trace_file", text_trace_file),
    ];
    for threshold in 0..=MAX_SWEPT_THRESHOLD {
        trials.push(Trial::test(format!("diamond_t{threshold}"), move || {
            diamond(threshold)
        }));
        trials.push(Trial::test(
            format!("wrong_path_store_undone_t{threshold}"),
            move || wrong_path_store_undone(threshold),
        ));
        trials.push(Trial::test(
            format!("wrong_path_code_store_undone_t{threshold}"),
            move || wrong_path_code_store_undone(threshold),
        ));
    }
    for threshold in 0..=2 {
        trials.push(Trial::test(format!("countdown_loop_t{threshold}"), move || {
            countdown_loop(threshold)
        }));
    }

    libtest_mimic::run(&args, trials).exit();
}

fn check(cond: bool, msg: impl Into<String>) -> Result<(), Failed> {
    if cond { Ok(()) } else { Err(msg.into().into()) }
}

fn check_eq<T: PartialEq + std::fmt::Debug>(
    actual: T,
    expected: T,
    what: &str,
) -> Result<(), Failed> {
    check(
        actual == expected,
        format!("{what}: expected {expected:?}, got {actual:?}"),
    )
}

fn instr(offset: u64, wrong_path: Option<u32>, disposition: Disposition) -> TraceEvent {
    TraceEvent::Instruction {
        addr: BASE + offset,
        offset,
        wrong_path,
        disposition,
    }
}

fn executing(offset: u64) -> TraceEvent {
    instr(offset, None, Disposition::Execute)
}

/// One taken branch with no slack: exactly one wrong-path instruction is
/// traced and rollback follows at once.
fn taken_branch_at_zero_threshold() -> Result<(), Failed> {
    let mut words = vec![
        asm::addi(REG_A0, REG_ZERO, 0),
        asm::beq(REG_ZERO, REG_ZERO, 12),
        asm::addi(REG_A0, REG_ZERO, 1),
        asm::addi(REG_A0, REG_ZERO, 2),
    ];
    words.extend(exit_a0());

    let (result, sink) = run_words(&words, 0);

    let expected = vec![
        TraceEvent::Started { threshold: 0 },
        executing(0),
        executing(4),
        TraceEvent::Branch { taken: true },
        TraceEvent::Redirect {
            addr: BASE + 8,
            offset: 8,
        },
        instr(8, Some(1), Disposition::Discard),
        TraceEvent::Rollback {
            addr: BASE + 16,
            offset: 16,
        },
        executing(16),
        executing(20),
        TraceEvent::Finished,
    ];
    check_eq(&sink.events, &expected, "events")?;
    check_eq(result.stop, StopReason::Exited(0), "stop")?;
    check_eq(result.instret, 4, "instret")?;
    check_eq(result.observed, 5, "observed")?;
    check_eq(result.stats.speculations, 1, "speculations")?;
    check_eq(result.stats.rollbacks, 1, "rollbacks")?;
    check_eq(result.stats.wrong_path_instructions, 0, "wrong-path executed")
}

/// A not-taken branch with a window of three: four annotated instructions,
/// the last one discarded, then the fallthrough.
fn not_taken_branch_window() -> Result<(), Failed> {
    let mut words = vec![
        asm::addi(REG_T0, REG_ZERO, 1),
        asm::beq(REG_T0, REG_ZERO, 32),
    ];
    words.extend(exit(5));
    words.extend([asm::nop(); 4]);
    words.extend([
        asm::addi(REG_A0, REG_ZERO, 9),
        asm::addi(REG_A0, REG_A0, 1),
        asm::addi(REG_A0, REG_A0, 1),
        asm::addi(REG_A0, REG_A0, 1),
        asm::ebreak(),
    ]);

    let (result, sink) = run_words(&words, 3);

    let annotated: Vec<_> = sink
        .events
        .iter()
        .filter(|event| {
            matches!(
                event,
                TraceEvent::Instruction {
                    wrong_path: Some(_),
                    ..
                }
            )
        })
        .cloned()
        .collect();
    check_eq(
        annotated,
        vec![
            instr(36, Some(1), Disposition::Execute),
            instr(40, Some(2), Disposition::Execute),
            instr(44, Some(3), Disposition::Execute),
            instr(48, Some(4), Disposition::Discard),
        ],
        "wrong-path instructions",
    )?;

    let rollback = sink
        .events
        .iter()
        .position(|event| matches!(event, TraceEvent::Rollback { .. }))
        .ok_or("no rollback")?;
    check_eq(
        &sink.events[rollback],
        &TraceEvent::Rollback {
            addr: BASE + 8,
            offset: 8,
        },
        "rollback",
    )?;
    check_eq(&sink.events[rollback + 1], &executing(8), "after rollback")?;
    check(
        sink.events.contains(&TraceEvent::Branch { taken: false }),
        "branch not reported as not taken",
    )?;

    check_eq(correct_path(&sink), vec![BASE, BASE + 4, BASE + 8, BASE + 12, BASE + 16], "path")?;
    check_eq(result.stop, StopReason::Exited(5), "stop")?;
    check_eq(result.stats.wrong_path_instructions, 3, "wrong-path executed")
}

/// A branch met inside an excursion starts a fresh one: the counter resets
/// and the first checkpoint is lost for good.
fn nested_branch_overwrites_checkpoint() -> Result<(), Failed> {
    let mut words = vec![
        asm::beq(REG_ZERO, REG_ZERO, 100),
        asm::addi(REG_A1, REG_ZERO, 1),
        asm::addi(REG_A2, REG_ZERO, 2),
        asm::beq(REG_A1, REG_ZERO, 40),
    ];
    words.extend(exit(3));
    words.resize(25, asm::nop());
    words.extend(exit(0));

    let (result, sink) = run_words(&words, 10);

    check_eq(
        excursions(&sink),
        vec![vec![1, 2, 3], (1..=11).collect()],
        "excursions",
    )?;
    check_eq(sink.redirects(), 2, "redirects")?;
    check_eq(sink.rollbacks(), 1, "rollbacks")?;
    check(
        sink.events.contains(&TraceEvent::Rollback {
            addr: BASE + 16,
            offset: 16,
        }),
        "rollback must target the nested branch's fallthrough",
    )?;
    check(
        !sink.executed().contains(&(BASE + 100)),
        "original branch target must be unreachable",
    )?;

    check_eq(result.stop, StopReason::Exited(3), "stop")?;
    check_eq(result.stats.speculations, 2, "speculations")?;
    check_eq(result.stats.overwrites, 1, "overwrites")?;
    check_eq(result.stats.rollbacks, 1, "rollbacks")
}

/// Calls speculate into the return site; the link written by the call
/// survives the rollback.
fn call_resumes_at_callee() -> Result<(), Failed> {
    let words = [
        asm::jal(REG_RA, 12),
        asm::addi(REG_A7, REG_ZERO, 93),
        asm::ecall(),
        asm::addi(REG_A0, REG_ZERO, 7),
        asm::jalr(REG_ZERO, REG_RA, 0),
    ];

    let (result, sink) = run_words(&words, 2);

    check_eq(
        sink.wrong_path_counts(),
        vec![1, 2, 3],
        "wrong-path counts",
    )?;
    check(
        sink.events
            .contains(&instr(8, Some(2), Disposition::Squash)),
        "wrong-path ecall must be squashed",
    )?;
    check_eq(
        correct_path(&sink),
        vec![BASE, BASE + 12, BASE + 16, BASE + 4, BASE + 8],
        "path",
    )?;
    check_eq(result.stop, StopReason::Exited(7), "stop")?;
    check_eq(result.stats.squashed, 1, "squashed")?;
    check_eq(result.stats.speculations, 1, "speculations")
}

fn instruction_limit() -> Result<(), Failed> {
    let image = wrongpath::ElfImage::from_bytecode(asm::assemble(&[asm::jal(REG_ZERO, 0)]), BASE)?;
    let mut runner = Runner::new(&image, config(0).with_max_insns(50), RecordingSink::new())?;
    let result = runner.run()?;

    check_eq(result.stop, StopReason::InstructionLimit, "stop")?;
    check_eq(result.exit_code(), None, "exit code")?;
    check_eq(result.observed, 50, "observed")?;
    check_eq(result.stats.speculations, 0, "plain jumps never speculate")
}

fn guest_write_captured() -> Result<(), Failed> {
    let mut words = vec![
        asm::auipc(REG_A1, 0),
        asm::addi(REG_A1, REG_A1, 36),
        asm::addi(REG_A0, REG_ZERO, 1),
        asm::addi(REG_A2, REG_ZERO, 3),
        asm::addi(REG_A7, REG_ZERO, 64),
        asm::ecall(),
    ];
    words.extend(exit(0));
    words.push(u32::from_le_bytes(*b"hi\n\0"));

    let (result, _) = run_words(&words, 4);

    check_eq(result.stop, StopReason::Exited(0), "stop")?;
    check_eq(result.guest_output.as_slice(), b"hi\n".as_slice(), "output")
}

fn elf_file() -> Result<(), Failed> {
    const VADDR: u64 = 0x1_0000;

    let mut words = vec![
        asm::addi(REG_T0, REG_ZERO, 1),
        asm::bne(REG_T0, REG_ZERO, 16),
    ];
    words.extend(exit(1));
    words.extend(exit(6));

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("guest.elf");
    fs::write(&path, build_elf(VADDR, VADDR, &asm::assemble(&words)))?;

    let mut runner = Runner::from_file(&path, None, config(1), RecordingSink::new())?;
    let result = runner.run()?;
    let sink = runner.into_sink();

    check_eq(result.stop, StopReason::Exited(6), "stop")?;
    check_eq(
        sink.events.get(1),
        Some(&TraceEvent::Instruction {
            addr: VADDR,
            offset: 0,
            wrong_path: None,
            disposition: Disposition::Execute,
        }),
        "first instruction",
    )?;
    check_eq(sink.wrong_path_counts(), vec![1, 2], "wrong-path counts")
}

fn rv32_elf_rejected() -> Result<(), Failed> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("guest32.elf");
    fs::write(&path, [0x7F, b'E', b'L', b'F', 1, 1, 1, 0])?;

    match load_program(&path, None) {
        Err(Error::XlenMismatch {
            expected: 64,
            actual: 32,
        }) => Ok(()),
        Err(other) => Err(format!("unexpected error: {other}").into()),
        Ok(_) => Err("32-bit ELF accepted".into()),
    }
}

fn text_trace_file() -> Result<(), Failed> {
    let mut words = vec![
        asm::addi(REG_A0, REG_ZERO, 0),
        asm::beq(REG_ZERO, REG_ZERO, 12),
        asm::addi(REG_A0, REG_ZERO, 1),
        asm::addi(REG_A0, REG_ZERO, 2),
    ];
    words.extend(exit_a0());

    let dir = tempfile::tempdir()?;
    let program = dir.path().join("guest.bin");
    let trace = dir.path().join("trace.out");
    fs::write(&program, asm::assemble(&words))?;

    let sink = TextSink::new(BufWriter::new(File::create(&trace)?));
    let mut runner = Runner::from_file(&program, Some(BASE), config(0), sink)?;
    runner.run()?;
    runner.into_sink().into_inner()?;

    let text = fs::read_to_string(&trace)?;
    let lines: Vec<&str> = text.lines().collect();
    check_eq(
        lines.first().copied(),
        Some("Branch resolution time set as 0 instructions"),
        "first line",
    )?;
    for expected in [
        "Executing instruction at 80000004(4)",
        "Taken branch",
        "Redirecting to wrong path address 80000008(8)",
        "[ON WRONG PATH, 1 wrong instructions executed] Discarding instruction at 80000008(8)",
        "Rolling back to 80000010(10)",
        "Executing instruction at 80000014(14)",
        "wrongpath finished",
    ] {
        check(lines.contains(&expected), format!("missing line: {expected}"))?;
    }
    check(
        !text.contains("instruction at 8000000c"),
        "instruction after the window must not be observed",
    )
}

/// If/else whose wrong arm runs into unmapped zeros. No wrong-path branch
/// is ever met, so every resolution time must agree on the result.
fn diamond(threshold: u32) -> Result<(), Failed> {
    let mut words = vec![
        asm::addi(REG_A0, REG_ZERO, 0),
        asm::addi(REG_T0, REG_ZERO, 1),
        asm::beq(REG_T0, REG_ZERO, 12),
        asm::addi(REG_A0, REG_A0, 3),
        asm::jal(REG_ZERO, 8),
        asm::addi(REG_A0, REG_A0, 100),
    ];
    words.extend(exit_a0());

    let (result, sink) = run_words(&words, threshold);

    let window: Vec<u32> = (1..=threshold + 1).collect();
    check_eq(excursions(&sink), vec![window], "excursion")?;
    check_eq(
        correct_path(&sink),
        [0, 4, 8, 12, 16, 24, 28].map(|offset| BASE + offset).to_vec(),
        "path",
    )?;
    check_eq(result.stop, StopReason::Exited(3), "stop")?;
    check_eq(result.instret, 7, "instret")?;
    check_eq(result.observed, 7 + u64::from(threshold) + 1, "observed")?;
    check_eq(result.stats.rollbacks, 1, "rollbacks")?;
    check_eq(result.stats.discarded, 1, "discarded")?;
    check_eq(
        result.stats.wrong_path_instructions + result.stats.squashed,
        u64::from(threshold),
        "wrong-path window",
    )
}

/// A wrong-path store is visible to later wrong-path loads but undone by
/// the rollback.
fn wrong_path_store_undone(threshold: u32) -> Result<(), Failed> {
    let mut words = vec![
        asm::auipc(REG_T1, 0),
        asm::addi(REG_T0, REG_ZERO, 1),
        asm::bne(REG_T0, REG_ZERO, 16),
        asm::addi(REG_T2, REG_ZERO, 42),
        asm::sd(REG_T1, REG_T2, 256),
        asm::nop(),
        asm::ld(REG_A0, REG_T1, 256),
    ];
    words.extend(exit_a0());

    let image = wrongpath::ElfImage::from_bytecode(asm::assemble(&words), BASE)?;
    let mut runner = Runner::new(&image, config(threshold), RecordingSink::new())?;
    let result = runner.run()?;

    check_eq(result.stop, StopReason::Exited(0), "stop")?;
    check_eq(runner.memory().read_u64(BASE + 256), 0, "memory after rollback")?;
    check_eq(runner.context().get_reg(REG_A0), 0, "a0")?;
    check_eq(result.stats.rollbacks, 1, "rollbacks")
}

/// The wrong path overwrites an instruction and then runs into it. The
/// correct path must still execute the original instruction.
fn wrong_path_code_store_undone(threshold: u32) -> Result<(), Failed> {
    let mut words = vec![
        asm::auipc(REG_A1, 0),
        asm::beq(REG_ZERO, REG_ZERO, 16),
        asm::sw(REG_A1, REG_ZERO, 24),
        asm::jal(REG_ZERO, 12),
        asm::nop(),
        asm::nop(),
    ];
    words.extend(exit(7));

    let image = wrongpath::ElfImage::from_bytecode(asm::assemble(&words), BASE)?;
    let mut runner = Runner::new(&image, config(threshold), RecordingSink::new())?;
    let result = runner.run()?;

    check_eq(result.stop, StopReason::Exited(7), "stop")?;
    check_eq(
        runner.memory().read_u32(BASE + 24),
        asm::addi(REG_A0, REG_ZERO, 7),
        "instruction after rollback",
    )?;
    check_eq(
        correct_path(&runner.into_sink()),
        [0, 4, 20, 24, 28, 32].map(|offset| BASE + offset).to_vec(),
        "path",
    )
}

/// Countdown loop. Resolution times below three never reach the loop
/// branch again on the wrong path, so the run matches plain execution.
fn countdown_loop(threshold: u32) -> Result<(), Failed> {
    let mut words = vec![
        asm::addi(REG_T0, REG_ZERO, 5),
        asm::addi(REG_A0, REG_ZERO, 0),
        asm::addi(REG_A0, REG_A0, 2),
        asm::addi(REG_T0, REG_T0, -1),
        asm::bne(REG_T0, REG_ZERO, -8),
    ];
    words.extend(exit_a0());

    let (result, sink) = run_words(&words, threshold);

    check_eq(result.stop, StopReason::Exited(10), "stop")?;
    check_eq(result.instret, 19, "instret")?;
    check_eq(result.stats.speculations, 5, "speculations")?;
    check_eq(result.stats.rollbacks, 5, "rollbacks")?;
    check_eq(result.stats.overwrites, 0, "overwrites")?;
    check(
        sink.wrong_path_counts()
            .iter()
            .all(|&count| count <= threshold + 1),
        "wrong-path count exceeded the window",
    )
}
