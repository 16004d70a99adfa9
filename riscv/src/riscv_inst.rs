//! RISC-V instruction definition
//!
//! Contains RV32IM instruction data, split by functionality.
//! RV32I is the base user-level 32-bit integer instruction set; the M extension adds integer
//! multiplication and division. Instructions are grouped into six encoding types:
//! * R-type: register-register
//! * I-type: short immediates and loads
//! * S-type: stores
//! * B-type: conditional branches, a variation of S-type
//! * U-type: long immediates
//! * J-type: unconditional jumps, a variation of U-type
//!
//! RV32I instruction formats showing immediate variants, rows R, I, S, B, U and J:
//! ```text
//!  31 30 29 28 27 26 25 24 23 22 21 20 19 18 17 16 15 14 13 12 11 10 09 08 07 06 05 04 03 02 01 00
//! |      funct7        |      rs2     |      rs1     | funct3 |      rd      |       opcode      |
//! |               imm[11:0]           |      rs1     | funct3 |      rd      |       opcode      |
//! |     imm[11:5]      |      rs2     |      rs1     | funct3 |   imm[4:0]   |       opcode      |
//! |12|    imm[10:5]    |      rs2     |      rs1     | funct3 |imm[4:1]   |11|       opcode      |
//! |                         imm[31:12]                        |      rd      |       opcode      |
//! |20|           imm[10:1]         |11|      imm[19:12]       |      rd      |       opcode      |
//! ```
//! x0 is hardwired to zero, x1-x31 are general purpose 32-bit registers. User space is 32-bit
//! byte addressable and little endian. Only loads and stores access memory.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::RiscVRegisters;

/// Instruction encoding type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstType {
    R,
    I,
    S,
    B,
    U,
    J,
}

/// RV32IM operation.
///
/// `Fence` is accepted and executes as a no-op: the machine is single-hart and has no caches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiscvOp {
    // U-type
    Lui,
    Auipc,
    // J-type
    Jal,
    // I-type jump
    Jalr,
    // B-type
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
    // Loads
    Lb,
    Lh,
    Lw,
    Lbu,
    Lhu,
    // Stores
    Sb,
    Sh,
    Sw,
    // Immediate arithmetic
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
    Slli,
    Srli,
    Srai,
    // Register arithmetic
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
    // M extension
    Mul,
    Mulh,
    Mulhsu,
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
    // System
    Fence,
    Ecall,
    Ebreak,
}

impl RiscvOp {
    /// Lowercase assembler mnemonic
    pub fn mnemonic(&self) -> &'static str {
        match self {
            RiscvOp::Lui => "lui",
            RiscvOp::Auipc => "auipc",
            RiscvOp::Jal => "jal",
            RiscvOp::Jalr => "jalr",
            RiscvOp::Beq => "beq",
            RiscvOp::Bne => "bne",
            RiscvOp::Blt => "blt",
            RiscvOp::Bge => "bge",
            RiscvOp::Bltu => "bltu",
            RiscvOp::Bgeu => "bgeu",
            RiscvOp::Lb => "lb",
            RiscvOp::Lh => "lh",
            RiscvOp::Lw => "lw",
            RiscvOp::Lbu => "lbu",
            RiscvOp::Lhu => "lhu",
            RiscvOp::Sb => "sb",
            RiscvOp::Sh => "sh",
            RiscvOp::Sw => "sw",
            RiscvOp::Addi => "addi",
            RiscvOp::Slti => "slti",
            RiscvOp::Sltiu => "sltiu",
            RiscvOp::Xori => "xori",
            RiscvOp::Ori => "ori",
            RiscvOp::Andi => "andi",
            RiscvOp::Slli => "slli",
            RiscvOp::Srli => "srli",
            RiscvOp::Srai => "srai",
            RiscvOp::Add => "add",
            RiscvOp::Sub => "sub",
            RiscvOp::Sll => "sll",
            RiscvOp::Slt => "slt",
            RiscvOp::Sltu => "sltu",
            RiscvOp::Xor => "xor",
            RiscvOp::Srl => "srl",
            RiscvOp::Sra => "sra",
            RiscvOp::Or => "or",
            RiscvOp::And => "and",
            RiscvOp::Mul => "mul",
            RiscvOp::Mulh => "mulh",
            RiscvOp::Mulhsu => "mulhsu",
            RiscvOp::Mulhu => "mulhu",
            RiscvOp::Div => "div",
            RiscvOp::Divu => "divu",
            RiscvOp::Rem => "rem",
            RiscvOp::Remu => "remu",
            RiscvOp::Fence => "fence",
            RiscvOp::Ecall => "ecall",
            RiscvOp::Ebreak => "ebreak",
        }
    }

    pub fn is_load(&self) -> bool {
        matches!(self, RiscvOp::Lb | RiscvOp::Lh | RiscvOp::Lw | RiscvOp::Lbu | RiscvOp::Lhu)
    }

    pub fn is_store(&self) -> bool {
        matches!(self, RiscvOp::Sb | RiscvOp::Sh | RiscvOp::Sw)
    }

    /// Width in bytes of a memory access, 0 for non-memory instructions
    pub fn access_width(&self) -> u32 {
        match self {
            RiscvOp::Lb | RiscvOp::Lbu | RiscvOp::Sb => 1,
            RiscvOp::Lh | RiscvOp::Lhu | RiscvOp::Sh => 2,
            RiscvOp::Lw | RiscvOp::Sw => 4,
            _ => 0,
        }
    }
}

/// Decoded RISC-V instruction data
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiscvInstruction {
    /// Original instruction content (32 bits)
    pub rvinst: u32,

    /// Instruction type
    pub t: InstType,

    /// Instruction operation
    pub op: RiscvOp,

    pub rd: u32,
    pub rs1: u32,
    pub rs2: u32,

    /// Sign-extended immediate; shift amount for `slli`/`srli`/`srai`
    pub imm: i32,
}

impl RiscvInstruction {
    /// Converts the instruction into a human-readable assembler string
    pub fn to_text(&self) -> String {
        let rd = RiscVRegisters::name_from_usize(self.rd as usize);
        let rs1 = RiscVRegisters::name_from_usize(self.rs1 as usize);
        let rs2 = RiscVRegisters::name_from_usize(self.rs2 as usize);
        let m = self.op.mnemonic();
        match self.op {
            RiscvOp::Ecall | RiscvOp::Ebreak | RiscvOp::Fence => m.to_string(),
            _ if self.op.is_load() || self.op == RiscvOp::Jalr => {
                format!("{m} {rd}, {}({rs1})", self.imm)
            }
            _ if self.op.is_store() => format!("{m} {rs2}, {}({rs1})", self.imm),
            _ => match self.t {
                InstType::R => format!("{m} {rd}, {rs1}, {rs2}"),
                InstType::I => format!("{m} {rd}, {rs1}, {}", self.imm),
                InstType::S | InstType::B => format!("{m} {rs1}, {rs2}, {}", self.imm),
                InstType::U => format!("{m} {rd}, {:#x}", (self.imm as u32) >> 12),
                InstType::J => format!("{m} {rd}, {}", self.imm),
            },
        }
    }
}

impl fmt::Display for RiscvInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
