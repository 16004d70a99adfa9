//! RV32IM instruction semantics, shared by the executor, the witness generator and the segment
//! verifier.
//!
//! One call to [`step`] executes one instruction. Memory and host interaction go through the
//! [`MemoryPort`] and [`HostPort`] traits so that the same code runs against live memory,
//! against a recording wrapper that captures Merkle paths, and against a replay of witness
//! values. Every fault is detected before any state is modified, so a faulting step leaves the
//! state exactly as it was before the instruction.

use riscv::{riscv_decode, RiscvInstruction, RiscvOp};
use serde::{Deserialize, Serialize};

use crate::{
    CpuState, FaultReason, OutputState, VmParams, MAX_OUTPUT_LEN, REG_A0, REG_A1, REG_A7,
    SYSCALL_HALT, SYSCALL_INPUT_LEN, SYSCALL_PAUSE, SYSCALL_READ, SYSCALL_WRITE, SYSCALL_YIELD,
};

/// Word-granular access to guest memory.
///
/// Addresses are word aligned and inside the guest address space. A store is always preceded
/// by a load of the same word within one step, and a step touches at most one data word.
pub trait MemoryPort {
    fn fetch(&mut self, pc: u32) -> u32;
    fn load_word(&mut self, addr: u32) -> u32;
    fn store_word(&mut self, addr: u32, value: u32);
}

/// Registers written back by a host call
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostReply {
    pub a0: u32,
    pub a1: u32,
}

/// Source of host replies for `READ` and `INPUT_LEN`
pub trait HostPort {
    fn host_call(&mut self, syscall: u32) -> HostReply;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Halted(u32),
    Paused(u32),
    /// The guest asked for a segment boundary after this instruction
    Yielded,
}

/// Returns the effective data address of a load or store, `None` for other instructions
#[inline(always)]
pub fn data_address(inst: &RiscvInstruction, cpu: &CpuState) -> Option<u32> {
    if inst.op.is_load() || inst.op.is_store() {
        Some(cpu.reg(inst.rs1).wrapping_add(inst.imm as u32))
    } else {
        None
    }
}

/// Fetches and decodes the instruction at `cpu.pc`
#[inline(always)]
pub fn fetch_instruction<M: MemoryPort>(
    params: &VmParams,
    cpu: &CpuState,
    mem: &mut M,
) -> Result<RiscvInstruction, FaultReason> {
    let pc = cpu.pc;
    if pc % 4 != 0 || !params.is_valid_addr(pc) {
        return Err(FaultReason::InstructionFault { pc });
    }
    let word = mem.fetch(pc);
    riscv_decode(word).ok_or(FaultReason::IllegalInstruction { pc, word })
}

fn check_data_access(params: &VmParams, addr: u32, width: u32) -> Result<(), FaultReason> {
    if addr % width != 0 {
        return Err(FaultReason::MisalignedAccess { addr });
    }
    if !params.is_valid_addr(addr) {
        return Err(FaultReason::MemoryOutOfBounds { addr });
    }
    Ok(())
}

/// Executes one instruction
pub fn step<M: MemoryPort, H: HostPort>(
    params: &VmParams,
    cpu: &mut CpuState,
    output: &mut OutputState,
    mem: &mut M,
    host: &mut H,
) -> Result<StepOutcome, FaultReason> {
    let inst = fetch_instruction(params, cpu, mem)?;
    let pc = cpu.pc;
    let next_pc = pc.wrapping_add(4);
    let rs1 = cpu.reg(inst.rs1);
    let rs2 = cpu.reg(inst.rs2);
    let imm = inst.imm as u32;

    match inst.op {
        RiscvOp::Lui => cpu.set_reg(inst.rd, imm),
        RiscvOp::Auipc => cpu.set_reg(inst.rd, pc.wrapping_add(imm)),
        RiscvOp::Jal => {
            cpu.set_reg(inst.rd, next_pc);
            cpu.pc = pc.wrapping_add(imm);
            return Ok(StepOutcome::Continue);
        }
        RiscvOp::Jalr => {
            let target = rs1.wrapping_add(imm) & !1;
            cpu.set_reg(inst.rd, next_pc);
            cpu.pc = target;
            return Ok(StepOutcome::Continue);
        }
        RiscvOp::Beq
        | RiscvOp::Bne
        | RiscvOp::Blt
        | RiscvOp::Bge
        | RiscvOp::Bltu
        | RiscvOp::Bgeu => {
            let taken = match inst.op {
                RiscvOp::Beq => rs1 == rs2,
                RiscvOp::Bne => rs1 != rs2,
                RiscvOp::Blt => (rs1 as i32) < (rs2 as i32),
                RiscvOp::Bge => (rs1 as i32) >= (rs2 as i32),
                RiscvOp::Bltu => rs1 < rs2,
                _ => rs1 >= rs2,
            };
            cpu.pc = if taken { pc.wrapping_add(imm) } else { next_pc };
            return Ok(StepOutcome::Continue);
        }
        RiscvOp::Lb | RiscvOp::Lh | RiscvOp::Lw | RiscvOp::Lbu | RiscvOp::Lhu => {
            let addr = rs1.wrapping_add(imm);
            check_data_access(params, addr, inst.op.access_width())?;
            let word = mem.load_word(addr & !3);
            let shift = (addr & 3) * 8;
            let value = match inst.op {
                RiscvOp::Lb => (((word >> shift) & 0xFF) as u8) as i8 as i32 as u32,
                RiscvOp::Lbu => (word >> shift) & 0xFF,
                RiscvOp::Lh => (((word >> shift) & 0xFFFF) as u16) as i16 as i32 as u32,
                RiscvOp::Lhu => (word >> shift) & 0xFFFF,
                _ => word,
            };
            cpu.set_reg(inst.rd, value);
        }
        RiscvOp::Sb | RiscvOp::Sh | RiscvOp::Sw => {
            let addr = rs1.wrapping_add(imm);
            let width = inst.op.access_width();
            check_data_access(params, addr, width)?;
            let aligned = addr & !3;
            let old = mem.load_word(aligned);
            let new = if width == 4 {
                rs2
            } else {
                let shift = (addr & 3) * 8;
                let mask = (if width == 1 { 0xFFu32 } else { 0xFFFFu32 }) << shift;
                (old & !mask) | ((rs2 << shift) & mask)
            };
            mem.store_word(aligned, new);
        }
        RiscvOp::Addi => cpu.set_reg(inst.rd, rs1.wrapping_add(imm)),
        RiscvOp::Slti => cpu.set_reg(inst.rd, ((rs1 as i32) < inst.imm) as u32),
        RiscvOp::Sltiu => cpu.set_reg(inst.rd, (rs1 < imm) as u32),
        RiscvOp::Xori => cpu.set_reg(inst.rd, rs1 ^ imm),
        RiscvOp::Ori => cpu.set_reg(inst.rd, rs1 | imm),
        RiscvOp::Andi => cpu.set_reg(inst.rd, rs1 & imm),
        RiscvOp::Slli => cpu.set_reg(inst.rd, rs1 << (imm & 0x1F)),
        RiscvOp::Srli => cpu.set_reg(inst.rd, rs1 >> (imm & 0x1F)),
        RiscvOp::Srai => cpu.set_reg(inst.rd, ((rs1 as i32) >> (imm & 0x1F)) as u32),
        RiscvOp::Add => cpu.set_reg(inst.rd, rs1.wrapping_add(rs2)),
        RiscvOp::Sub => cpu.set_reg(inst.rd, rs1.wrapping_sub(rs2)),
        RiscvOp::Sll => cpu.set_reg(inst.rd, rs1 << (rs2 & 0x1F)),
        RiscvOp::Slt => cpu.set_reg(inst.rd, ((rs1 as i32) < (rs2 as i32)) as u32),
        RiscvOp::Sltu => cpu.set_reg(inst.rd, (rs1 < rs2) as u32),
        RiscvOp::Xor => cpu.set_reg(inst.rd, rs1 ^ rs2),
        RiscvOp::Srl => cpu.set_reg(inst.rd, rs1 >> (rs2 & 0x1F)),
        RiscvOp::Sra => cpu.set_reg(inst.rd, ((rs1 as i32) >> (rs2 & 0x1F)) as u32),
        RiscvOp::Or => cpu.set_reg(inst.rd, rs1 | rs2),
        RiscvOp::And => cpu.set_reg(inst.rd, rs1 & rs2),
        RiscvOp::Mul => cpu.set_reg(inst.rd, rs1.wrapping_mul(rs2)),
        RiscvOp::Mulh => {
            cpu.set_reg(inst.rd, (((rs1 as i32 as i64) * (rs2 as i32 as i64)) >> 32) as u32)
        }
        RiscvOp::Mulhsu => {
            cpu.set_reg(inst.rd, (((rs1 as i32 as i64) * (rs2 as u64 as i64)) >> 32) as u32)
        }
        RiscvOp::Mulhu => cpu.set_reg(inst.rd, (((rs1 as u64) * (rs2 as u64)) >> 32) as u32),
        RiscvOp::Div => {
            let value =
                if rs2 == 0 { u32::MAX } else { (rs1 as i32).wrapping_div(rs2 as i32) as u32 };
            cpu.set_reg(inst.rd, value)
        }
        RiscvOp::Divu => cpu.set_reg(inst.rd, rs1.checked_div(rs2).unwrap_or(u32::MAX)),
        RiscvOp::Rem => {
            let value = if rs2 == 0 { rs1 } else { (rs1 as i32).wrapping_rem(rs2 as i32) as u32 };
            cpu.set_reg(inst.rd, value)
        }
        RiscvOp::Remu => cpu.set_reg(inst.rd, rs1.checked_rem(rs2).unwrap_or(rs1)),
        RiscvOp::Fence => {}
        RiscvOp::Ebreak => return Err(FaultReason::Breakpoint { pc }),
        RiscvOp::Ecall => {
            let outcome = syscall(cpu, output, host)?;
            cpu.pc = next_pc;
            return Ok(outcome);
        }
    }

    cpu.pc = next_pc;
    Ok(StepOutcome::Continue)
}

fn syscall<H: HostPort>(
    cpu: &mut CpuState,
    output: &mut OutputState,
    host: &mut H,
) -> Result<StepOutcome, FaultReason> {
    let id = cpu.regs[REG_A7];
    let a0 = cpu.regs[REG_A0];
    let a1 = cpu.regs[REG_A1];
    match id {
        SYSCALL_HALT => Ok(StepOutcome::Halted(a0)),
        SYSCALL_PAUSE => Ok(StepOutcome::Paused(a0)),
        SYSCALL_YIELD => Ok(StepOutcome::Yielded),
        SYSCALL_READ | SYSCALL_INPUT_LEN => {
            let reply = host.host_call(id);
            cpu.regs[REG_A0] = reply.a0;
            cpu.regs[REG_A1] = reply.a1;
            Ok(StepOutcome::Continue)
        }
        SYSCALL_WRITE => {
            if a1 > 4 {
                return Err(FaultReason::InvalidSyscallArgs { id });
            }
            if output.len as u64 + a1 as u64 > MAX_OUTPUT_LEN as u64 {
                return Err(FaultReason::OutputLimitExceeded);
            }
            output.absorb(&a0.to_le_bytes()[..a1 as usize]);
            Ok(StepOutcome::Continue)
        }
        _ => Err(FaultReason::UnknownSyscall { id }),
    }
}
