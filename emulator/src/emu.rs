//! Emu is the core of the executor: it runs instructions and cuts the run into segments

use std::collections::HashSet;

use riscv::riscv_decode;
use tracing::{debug, trace};
use zkc_core::{
    data_address, step, CpuState, ExitCode, FaultReason, HostPort, HostReply, MemoryImage,
    MemoryPort, StepOutcome, REG_A0, REG_A1, REG_A7, SYSCALL_INPUT_LEN, SYSCALL_READ,
    SYSCALL_WRITE,
};

use crate::{Continuation, EmuContext, EmuOptions, Segment, SegmentTrace, Session, SessionInfo};

/// Live memory port
struct ExecMemory<'a>(&'a mut MemoryImage);

impl MemoryPort for ExecMemory<'_> {
    #[inline(always)]
    fn fetch(&mut self, pc: u32) -> u32 {
        self.0.load_word(pc)
    }

    #[inline(always)]
    fn load_word(&mut self, addr: u32) -> u32 {
        self.0.load_word(addr)
    }

    #[inline(always)]
    fn store_word(&mut self, addr: u32, value: u32) {
        self.0.store_word(addr, value)
    }
}

/// Answers host calls from the session input and records every reply for the segment trace
struct InputHost<'a> {
    input: &'a [u8],
    pos: &'a mut usize,
    replies: &'a mut Vec<HostReply>,
}

impl HostPort for InputHost<'_> {
    fn host_call(&mut self, syscall: u32) -> HostReply {
        let remaining = &self.input[*self.pos..];
        let reply = match syscall {
            SYSCALL_READ => {
                let n = remaining.len().min(4);
                let mut word = [0u8; 4];
                word[..n].copy_from_slice(&remaining[..n]);
                *self.pos += n;
                HostReply { a0: u32::from_le_bytes(word), a1: n as u32 }
            }
            SYSCALL_INPUT_LEN => HostReply { a0: remaining.len() as u32, a1: 0 },
            _ => HostReply::default(),
        };
        self.replies.push(reply);
        reply
    }
}

pub struct Emu<'a> {
    pub options: &'a EmuOptions,
    pub ctx: EmuContext,
}

impl<'a> Emu<'a> {
    pub fn new(ctx: EmuContext, options: &'a EmuOptions) -> Self {
        Self { options, ctx }
    }

    /// Distinct pages the next instruction touches: its own and, for loads and stores, the
    /// data page. Instructions that will fault count only what is addressable.
    fn next_pages(&self) -> [Option<u32>; 2] {
        let params = &self.ctx.params;
        let pc = self.ctx.cpu.pc;
        if pc % 4 != 0 || !params.is_valid_addr(pc) {
            return [None, None];
        }
        let pc_page = params.page_index(pc);
        let data_page = riscv_decode(self.ctx.memory.load_word(pc))
            .and_then(|inst| data_address(&inst, &self.ctx.cpu))
            .filter(|addr| params.is_valid_addr(*addr))
            .map(|addr| params.page_index(addr))
            .filter(|page| *page != pc_page);
        [Some(pc_page), data_page]
    }

    /// Runs until the session halts, pauses or faults
    pub fn run(mut self) -> Session {
        let mut segments = Vec::new();
        let exit_code = loop {
            let segment = self.run_segment();
            let exit_code = segment.exit_code;
            segments.push(segment);
            if exit_code != ExitCode::SystemSplit {
                break exit_code;
            }
        };

        let info = SessionInfo {
            exit_code,
            output_digest: self.ctx.output.digest,
            journal: self.ctx.journal.clone(),
            segment_count: segments.len() as u32,
            total_cycles: self.ctx.step,
        };
        let continuation = match exit_code {
            ExitCode::Paused(_) => Some(Continuation::new(
                self.ctx.params,
                self.ctx.cpu,
                self.ctx.memory,
                self.ctx.output,
                self.ctx.journal,
                self.ctx.segment_index,
            )),
            _ => None,
        };
        Session { segments, info, continuation }
    }

    /// Executes one segment starting at the current state
    pub fn run_segment(&mut self) -> Segment {
        let start_cpu = self.ctx.cpu;
        let start_memory = self.ctx.memory.clone();
        let start_output = self.ctx.output;
        let start_commitment = self.ctx.state().commitment();

        let max_pages = self.options.max_segment_pages as usize;
        let mut pages: HashSet<u32> = HashSet::new();
        let mut replies = Vec::new();
        let mut cycles = 0u32;

        let exit_code = loop {
            if cycles == self.options.segment_limit {
                break ExitCode::SystemSplit;
            }
            if self.ctx.step >= self.options.max_cycles {
                break ExitCode::Fault(FaultReason::SessionLimitExceeded);
            }

            // Split before an instruction that would exceed the paging budget
            let needed = self.next_pages();
            let new_pages = needed.iter().flatten().filter(|p| !pages.contains(*p)).count();
            if cycles > 0 && pages.len() + new_pages > max_pages {
                break ExitCode::SystemSplit;
            }
            pages.extend(needed.iter().flatten());

            let pre = self.ctx.cpu;
            let pre_output_len = self.ctx.output.len;
            let outcome = {
                let ctx = &mut self.ctx;
                let mut mem = ExecMemory(&mut ctx.memory);
                let mut host =
                    InputHost { input: &ctx.input, pos: &mut ctx.input_pos, replies: &mut replies };
                step(&ctx.params, &mut ctx.cpu, &mut ctx.output, &mut mem, &mut host)
            };

            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(reason) => break ExitCode::Fault(reason),
            };
            cycles += 1;
            self.ctx.step += 1;
            self.capture_output(&pre, pre_output_len);

            if self.options.log_step {
                trace!(
                    "step={} pc={:#x} next={:#x} outcome={:?} inst={}",
                    self.ctx.step - 1,
                    pre.pc,
                    self.ctx.cpu.pc,
                    outcome,
                    riscv_decode(self.ctx.memory.load_word(pre.pc))
                        .map(|i| i.to_text())
                        .unwrap_or_default()
                );
            }

            match outcome {
                StepOutcome::Continue => {}
                StepOutcome::Halted(code) => break ExitCode::Halted(code),
                StepOutcome::Paused(code) => break ExitCode::Paused(code),
                StepOutcome::Yielded => break ExitCode::SystemSplit,
            }
        };

        let index = self.ctx.segment_index;
        self.ctx.segment_index += 1;
        let end_commitment = self.ctx.state().commitment();
        debug!(
            "Emu::run_segment() index={} cycles={} pages={} exit={}",
            index,
            cycles,
            pages.len(),
            exit_code
        );

        Segment {
            index,
            start_commitment,
            end_commitment,
            instruction_count: cycles,
            exit_code,
            output_digest: self.ctx.output.digest,
            params: self.ctx.params,
            config_digest: self.ctx.params.config_digest(),
            trace: SegmentTrace::new(start_cpu, start_memory, start_output, replies),
        }
    }

    /// Appends the bytes of a `WRITE` syscall to the journal
    fn capture_output(&mut self, pre: &CpuState, pre_output_len: u32) {
        let written = (self.ctx.output.len - pre_output_len) as usize;
        if written > 0 && pre.regs[REG_A7] == SYSCALL_WRITE {
            debug_assert_eq!(written as u32, pre.regs[REG_A1]);
            self.ctx.journal.extend_from_slice(&pre.regs[REG_A0].to_le_bytes()[..written]);
        }
    }
}
