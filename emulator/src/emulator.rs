use tracing::{info, instrument};
use zkc_core::{Image, VmParams};

use crate::{
    Continuation, Emu, EmuContext, EmuOptions, ExecutorError, Segment, Session, SessionInfo,
};

pub struct ZkcEmulator;

/*
execute_with_input()
\
 ZkcEmulator::execute()
 \
  check_options()
  Emu::run()
  \
   Emu::run_segment() ... until halt, pause or fault
*/

impl ZkcEmulator {
    fn check_options(
        params: &VmParams,
        input: &[u8],
        options: &EmuOptions,
    ) -> Result<(), ExecutorError> {
        let max = params.max_segment_cycles();
        if options.segment_limit == 0 || options.segment_limit as u64 > max {
            return Err(ExecutorError::InvalidSegmentLimit { limit: options.segment_limit, max });
        }
        if input.len() > options.max_input_size || input.len() > u32::MAX as usize {
            return Err(ExecutorError::InputTooLarge {
                size: input.len(),
                max: options.max_input_size,
            });
        }
        if options.max_segment_pages < 2 {
            return Err(ExecutorError::InvalidPagingBudget(options.max_segment_pages));
        }
        Ok(())
    }

    /// Runs an image from its entry point
    #[instrument(skip_all, fields(input_len = input.len(), segment_limit = options.segment_limit))]
    pub fn execute(
        image: &Image,
        input: &[u8],
        options: &EmuOptions,
    ) -> Result<Session, ExecutorError> {
        Self::check_options(image.params(), input, options)?;
        let ctx = EmuContext::from_image(image, input.to_vec());
        let session = Emu::new(ctx, options).run();
        Self::log_session(&session);
        Ok(session)
    }

    /// Resumes a paused session with fresh input; segment indices continue where the paused
    /// session stopped
    #[instrument(skip_all, fields(input_len = input.len(), segment_limit = options.segment_limit))]
    pub fn resume(
        continuation: Continuation,
        input: &[u8],
        options: &EmuOptions,
    ) -> Result<Session, ExecutorError> {
        Self::check_options(continuation.params(), input, options)?;
        let ctx = EmuContext::from_continuation(continuation, input.to_vec());
        let session = Emu::new(ctx, options).run();
        Self::log_session(&session);
        Ok(session)
    }

    fn log_session(session: &Session) {
        info!(
            "session finished: exit={} segments={} cycles={} journal_len={}",
            session.info.exit_code,
            session.info.segment_count,
            session.info.total_cycles,
            session.info.journal.len()
        );
    }
}

/// Executes `image` on `input`, splitting every `segment_limit` instructions
pub fn execute_with_input(
    image: &Image,
    input: &[u8],
    segment_limit: u32,
) -> Result<(Vec<Segment>, SessionInfo), ExecutorError> {
    let options = EmuOptions::with_segment_limit(segment_limit);
    ZkcEmulator::execute(image, input, &options).map(Session::into_parts)
}

/// Resumes a paused session
pub fn resume_with_input(
    continuation: Continuation,
    input: &[u8],
    segment_limit: u32,
) -> Result<Session, ExecutorError> {
    let options = EmuOptions::with_segment_limit(segment_limit);
    ZkcEmulator::resume(continuation, input, &options)
}

#[cfg(test)]
mod tests {
    use riscv::{
        asm::{self, Asm},
        RiscVRegisters as Reg,
    };
    use zkc_core::{
        journal_digest, load_image_from_elf, testing::program_elf, ExitCode, FaultReason,
        SYSCALL_HALT, SYSCALL_INPUT_LEN, SYSCALL_PAUSE, SYSCALL_READ, SYSCALL_WRITE, SYSCALL_YIELD,
    };

    use super::*;

    fn syscall(a: &mut Asm, id: u32) {
        a.push(asm::addi(Reg::A7, 0, id as i32)).push(asm::ecall());
    }

    /// Counts t0 up to `n`, writes "ok" and halts with code 3
    fn counting_program(n: u32) -> Image {
        let mut a = Asm::new();
        a.extend(asm::li(Reg::T1, n));
        let top = a.here();
        a.push(asm::addi(Reg::T0, Reg::T0, 1));
        a.push_to(top, |off| asm::bne(Reg::T0, Reg::T1, off));
        a.extend(asm::li(Reg::A0, u32::from_le_bytes([b'o', b'k', 0, 0])));
        a.push(asm::addi(Reg::A1, 0, 2));
        syscall(&mut a, SYSCALL_WRITE);
        a.push(asm::addi(Reg::A0, 0, 3));
        syscall(&mut a, SYSCALL_HALT);
        load_image_from_elf(&program_elf(a.words())).unwrap()
    }

    #[test]
    fn halts_with_journal() {
        let image = counting_program(100);
        let (segments, info) = execute_with_input(&image, &[], 1 << 16).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(info.exit_code, ExitCode::Halted(3));
        assert_eq!(info.journal, b"ok");
        assert_eq!(info.output_digest, journal_digest(b"ok"));
        assert_eq!(segments[0].start_commitment, image.entry_state());
        assert_eq!(segments[0].instruction_count as u64, info.total_cycles);
    }

    #[test]
    fn splits_on_cycle_limit_and_chains() {
        let image = counting_program(100);
        let (segments, info) = execute_with_input(&image, &[], 16).unwrap();
        assert!(segments.len() > 10);
        assert_eq!(info.segment_count as usize, segments.len());
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end_commitment, pair[1].start_commitment);
            assert_eq!(pair[0].exit_code, ExitCode::SystemSplit);
            assert_eq!(pair[0].instruction_count, 16);
            assert_eq!(pair[0].index + 1, pair[1].index);
        }
        let (single, single_info) = execute_with_input(&image, &[], 1 << 16).unwrap();
        assert_eq!(segments.last().unwrap().end_commitment, single[0].end_commitment);
        assert_eq!(info.total_cycles, single_info.total_cycles);
    }

    #[test]
    fn fault_ends_session_at_pre_fault_state() {
        let mut a = Asm::new();
        a.push(asm::addi(Reg::T0, 0, 1));
        a.push(asm::lw(Reg::T1, 0, 0)); // load from the null page
        a.push(asm::addi(Reg::T0, 0, 2));
        let image = load_image_from_elf(&program_elf(a.words())).unwrap();
        let options = EmuOptions::with_segment_limit(1);
        let session = ZkcEmulator::execute(&image, &[], &options).unwrap();

        assert_eq!(
            session.info.exit_code,
            ExitCode::Fault(FaultReason::MemoryOutOfBounds { addr: 0 })
        );
        assert!(matches!(session.check_exit(), Err(ExecutorError::Fault(_))));
        assert_eq!(session.segments.len(), 2);
        let last = session.segments.last().unwrap();
        assert_eq!(last.instruction_count, 0);
        assert_eq!(last.start_commitment, last.end_commitment);
        assert_eq!(session.info.total_cycles, 1);
        assert!(session.continuation.is_none());
    }

    #[test]
    fn session_cycle_budget() {
        let image = counting_program(1000);
        let options = EmuOptions { segment_limit: 64, max_cycles: 100, ..Default::default() };
        let session = ZkcEmulator::execute(&image, &[], &options).unwrap();
        assert_eq!(session.info.exit_code, ExitCode::Fault(FaultReason::SessionLimitExceeded));
        assert_eq!(session.info.total_cycles, 100);
    }

    #[test]
    fn rejects_bad_arguments() {
        let image = counting_program(1);
        assert!(matches!(
            execute_with_input(&image, &[], 0),
            Err(ExecutorError::InvalidSegmentLimit { .. })
        ));
        assert!(matches!(
            execute_with_input(&image, &[], (1 << 20) + 1),
            Err(ExecutorError::InvalidSegmentLimit { .. })
        ));
        let options = EmuOptions { max_input_size: 4, ..Default::default() };
        assert!(matches!(
            ZkcEmulator::execute(&image, &[0; 5], &options),
            Err(ExecutorError::InputTooLarge { size: 5, max: 4 })
        ));
        let options = EmuOptions { max_segment_pages: 1, ..Default::default() };
        assert!(matches!(
            ZkcEmulator::execute(&image, &[], &options),
            Err(ExecutorError::InvalidPagingBudget(1))
        ));
    }

    /// Echoes the input to the journal, then pauses with code 9; once resumed echoes the new
    /// input and halts with code 9
    fn echo_program() -> Image {
        let mut a = Asm::new();
        let round = a.here();
        syscall(&mut a, SYSCALL_INPUT_LEN);
        a.push(asm::addi(Reg::T1, Reg::A0, 0));
        let top = a.here();
        let exit_branch = a.here();
        a.push(0);
        syscall(&mut a, SYSCALL_READ);
        a.push(asm::sub(Reg::T1, Reg::T1, Reg::A1));
        syscall(&mut a, SYSCALL_WRITE);
        a.push_to(top, |off| asm::jal(0, off));
        let done = a.here();
        a.push(asm::addi(Reg::T0, Reg::T0, 1));
        a.push(asm::addi(Reg::A0, 0, 9));
        a.push(asm::addi(Reg::T2, 0, 2));
        let halt_branch = a.here();
        a.push(0);
        syscall(&mut a, SYSCALL_PAUSE);
        a.push_to(round, |off| asm::jal(0, off));
        let halt = a.here();
        syscall(&mut a, SYSCALL_HALT);
        a.patch_to(exit_branch, done, |off| asm::beq(Reg::T1, 0, off));
        a.patch_to(halt_branch, halt, |off| asm::beq(Reg::T0, Reg::T2, off));
        load_image_from_elf(&program_elf(a.words())).unwrap()
    }

    #[test]
    fn pause_and_resume_continue_the_chain() {
        let image = echo_program();
        let first =
            ZkcEmulator::execute(&image, b"hello", &EmuOptions::with_segment_limit(8)).unwrap();
        assert_eq!(first.info.exit_code, ExitCode::Paused(9));
        assert_eq!(first.info.journal, b"hello");
        let continuation = first.continuation.unwrap();
        let last = first.segments.last().unwrap();
        assert_eq!(continuation.commitment(), last.end_commitment);
        assert_eq!(continuation.next_segment_index(), first.info.segment_count);

        let second = resume_with_input(continuation, b"!!", 8).unwrap();
        assert_eq!(second.info.exit_code, ExitCode::Halted(9));
        assert_eq!(second.info.journal, b"hello!!");
        assert_eq!(second.info.output_digest, journal_digest(b"hello!!"));
        assert_eq!(second.segments[0].start_commitment, last.end_commitment);
        assert_eq!(second.segments[0].index, first.info.segment_count);
    }

    #[test]
    fn yield_splits_after_the_syscall() {
        let mut a = Asm::new();
        a.push(asm::addi(Reg::T0, 0, 1));
        syscall(&mut a, SYSCALL_YIELD);
        a.push(asm::addi(Reg::A0, 0, 0));
        syscall(&mut a, SYSCALL_HALT);
        let image = load_image_from_elf(&program_elf(a.words())).unwrap();
        let (segments, info) = execute_with_input(&image, &[], 1 << 10).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].exit_code, ExitCode::SystemSplit);
        assert_eq!(segments[0].instruction_count, 3);
        assert_eq!(info.exit_code, ExitCode::Halted(0));
    }

    #[test]
    fn paging_budget_splits_before_new_pages() {
        // touches a fresh page on every store
        let mut a = Asm::new();
        a.extend(asm::li(Reg::T0, 0x10_0000));
        a.extend(asm::li(Reg::T1, 0x10_0000 + 8 * 1024));
        let top = a.here();
        a.push(asm::sw(Reg::T0, Reg::T0, 0));
        a.extend(asm::li(Reg::A1, 1024));
        a.push(asm::add(Reg::T0, Reg::T0, Reg::A1));
        a.push_to(top, |off| asm::bne(Reg::T0, Reg::T1, off));
        a.push(asm::addi(Reg::A0, 0, 0));
        syscall(&mut a, SYSCALL_HALT);
        let image = load_image_from_elf(&program_elf(a.words())).unwrap();

        let options = EmuOptions { max_segment_pages: 3, ..Default::default() };
        let paged = ZkcEmulator::execute(&image, &[], &options).unwrap();
        let unpaged = ZkcEmulator::execute(&image, &[], &EmuOptions::default()).unwrap();
        assert_eq!(unpaged.segments.len(), 1);
        // code page plus two data pages per segment
        assert_eq!(paged.segments.len(), 4);
        assert_eq!(
            paged.segments.last().unwrap().end_commitment,
            unpaged.segments[0].end_commitment
        );
    }
}
