//! Parses a 32-bits RISC-V instruction

use crate::{InstType, RiscvInstruction, RiscvOp};

/// Convert 32-bits data chunk that contains a signed integer of a specified size in bits to a
/// signed integer of 32 bits
pub fn signext(v: u32, size: u32) -> i32 {
    let sign_bit: u32 = 1u32 << (size - 1);
    let max_value: u64 = 1u64 << size;
    if (sign_bit & v) != 0 {
        (v as i64 - max_value as i64) as i32
    } else {
        v as i32
    }
}

const OP_LUI: u32 = 0b0110111;
const OP_AUIPC: u32 = 0b0010111;
const OP_JAL: u32 = 0b1101111;
const OP_JALR: u32 = 0b1100111;
const OP_BRANCH: u32 = 0b1100011;
const OP_LOAD: u32 = 0b0000011;
const OP_STORE: u32 = 0b0100011;
const OP_IMM: u32 = 0b0010011;
const OP_REG: u32 = 0b0110011;
const OP_FENCE: u32 = 0b0001111;
const OP_SYSTEM: u32 = 0b1110011;

/// Decodes a 32-bits RV32IM instruction.
///
/// Returns `None` for compressed encodings, other extensions, reserved encodings and CSR
/// accesses; the machine treats those as illegal instructions.
pub fn riscv_decode(inst: u32) -> Option<RiscvInstruction> {
    if inst & 0x3 != 0x3 {
        return None;
    }
    let opcode = inst & 0x7F;
    let rd = (inst & 0xF80) >> 7;
    let funct3 = (inst & 0x7000) >> 12;
    let rs1 = (inst & 0xF8000) >> 15;
    let rs2 = (inst & 0x1F00000) >> 20;
    let funct7 = (inst & 0xFE000000) >> 25;

    let build = |t: InstType, op: RiscvOp, rd: u32, rs1: u32, rs2: u32, imm: i32| {
        Some(RiscvInstruction { rvinst: inst, t, op, rd, rs1, rs2, imm })
    };

    match opcode {
        //  31 30 ... 13 12 11 10 09 08 07 06 05 04 03 02 01 00
        // |  imm[31:12]   |      rd      |        opcode      | U-type
        OP_LUI => build(InstType::U, RiscvOp::Lui, rd, 0, 0, (inst & 0xFFFFF000) as i32),
        OP_AUIPC => build(InstType::U, RiscvOp::Auipc, rd, 0, 0, (inst & 0xFFFFF000) as i32),

        //  31 30 29...22 21 20 19 18 ... 13 12 11 10 09 08 07 06 05 04 03 02 01 00
        // |20|  imm[10:1]  |11|  imm[19:12]   |      rd      |       opcode       | J-type
        OP_JAL => {
            let imm20 = (inst & 0x80000000) >> 31;
            let imm10_1 = (inst & 0x7FE00000) >> 21;
            let imm11 = (inst & 0x100000) >> 20;
            let imm19_12 = (inst & 0xFF000) >> 12;
            let imm =
                signext((imm20 << 20) | (imm19_12 << 12) | (imm11 << 11) | (imm10_1 << 1), 21);
            build(InstType::J, RiscvOp::Jal, rd, 0, 0, imm)
        }

        //  31 30 ... 21 20 19 ... 15 14 13 12 11 ... 07 06 05 04 03 02 01 00
        // |  imm[11:0]    |  rs1    | funct3 |   rd    |       opcode       | I-type
        OP_JALR if funct3 == 0 => {
            build(InstType::I, RiscvOp::Jalr, rd, rs1, 0, signext(inst >> 20, 12))
        }
        OP_LOAD => {
            let op = match funct3 {
                0b000 => RiscvOp::Lb,
                0b001 => RiscvOp::Lh,
                0b010 => RiscvOp::Lw,
                0b100 => RiscvOp::Lbu,
                0b101 => RiscvOp::Lhu,
                _ => return None,
            };
            build(InstType::I, op, rd, rs1, 0, signext(inst >> 20, 12))
        }
        OP_IMM => {
            let imm = signext(inst >> 20, 12);
            let shamt = ((inst >> 20) & 0x1F) as i32;
            match funct3 {
                0b000 => build(InstType::I, RiscvOp::Addi, rd, rs1, 0, imm),
                0b010 => build(InstType::I, RiscvOp::Slti, rd, rs1, 0, imm),
                0b011 => build(InstType::I, RiscvOp::Sltiu, rd, rs1, 0, imm),
                0b100 => build(InstType::I, RiscvOp::Xori, rd, rs1, 0, imm),
                0b110 => build(InstType::I, RiscvOp::Ori, rd, rs1, 0, imm),
                0b111 => build(InstType::I, RiscvOp::Andi, rd, rs1, 0, imm),
                0b001 if funct7 == 0 => build(InstType::I, RiscvOp::Slli, rd, rs1, 0, shamt),
                0b101 if funct7 == 0 => build(InstType::I, RiscvOp::Srli, rd, rs1, 0, shamt),
                0b101 if funct7 == 0b0100000 => {
                    build(InstType::I, RiscvOp::Srai, rd, rs1, 0, shamt)
                }
                _ => None,
            }
        }

        //  31 30 ... 26 25 24 ... 20 19 ... 15 14 13 12 11 10 09 08 07 06 05 04 03 02 01 00
        // |  imm[11:5]    |  rs2    |   rs1   | funct3 |   imm[4:0]   |       opcode       | S-type
        OP_STORE => {
            let op = match funct3 {
                0b000 => RiscvOp::Sb,
                0b001 => RiscvOp::Sh,
                0b010 => RiscvOp::Sw,
                _ => return None,
            };
            let imm = signext((funct7 << 5) | rd, 12);
            build(InstType::S, op, 0, rs1, rs2, imm)
        }

        //  31 30 29 28 27 26 25 24...20 19...15 14 13 12 11 10 09 08 07 06 05 04 03 02 01 00
        // |12|    imm[10:5]    |  rs2  | rs1   | funct3 |imm[4:1]   |11|    opcode     | B-type
        OP_BRANCH => {
            let op = match funct3 {
                0b000 => RiscvOp::Beq,
                0b001 => RiscvOp::Bne,
                0b100 => RiscvOp::Blt,
                0b101 => RiscvOp::Bge,
                0b110 => RiscvOp::Bltu,
                0b111 => RiscvOp::Bgeu,
                _ => return None,
            };
            let imm11 = (inst & 0x080) >> 7;
            let imm4_1 = (inst & 0xF00) >> 8;
            let imm10_5 = (inst & 0x7E000000) >> 25;
            let imm12 = (inst & 0x80000000) >> 31;
            let imm = signext((imm12 << 12) | (imm11 << 11) | (imm10_5 << 5) | (imm4_1 << 1), 13);
            build(InstType::B, op, 0, rs1, rs2, imm)
        }

        //  31 30 ... 26 25 24 ... 20 19 ... 15 14 13 12 11 ... 07 06 05 04 03 02 01 00
        // |   funct7      |  rs2    |  rs1    | funct3 |   rd    |       opcode       | R-type
        OP_REG => {
            let op = match (funct7, funct3) {
                (0b0000000, 0b000) => RiscvOp::Add,
                (0b0100000, 0b000) => RiscvOp::Sub,
                (0b0000000, 0b001) => RiscvOp::Sll,
                (0b0000000, 0b010) => RiscvOp::Slt,
                (0b0000000, 0b011) => RiscvOp::Sltu,
                (0b0000000, 0b100) => RiscvOp::Xor,
                (0b0000000, 0b101) => RiscvOp::Srl,
                (0b0100000, 0b101) => RiscvOp::Sra,
                (0b0000000, 0b110) => RiscvOp::Or,
                (0b0000000, 0b111) => RiscvOp::And,
                (0b0000001, 0b000) => RiscvOp::Mul,
                (0b0000001, 0b001) => RiscvOp::Mulh,
                (0b0000001, 0b010) => RiscvOp::Mulhsu,
                (0b0000001, 0b011) => RiscvOp::Mulhu,
                (0b0000001, 0b100) => RiscvOp::Div,
                (0b0000001, 0b101) => RiscvOp::Divu,
                (0b0000001, 0b110) => RiscvOp::Rem,
                (0b0000001, 0b111) => RiscvOp::Remu,
                _ => return None,
            };
            build(InstType::R, op, rd, rs1, rs2, 0)
        }

        // fence.i and reserved fence encodings are rejected
        OP_FENCE if funct3 == 0 => build(InstType::I, RiscvOp::Fence, 0, 0, 0, 0),
        OP_SYSTEM => match inst {
            0x00000073 => build(InstType::I, RiscvOp::Ecall, 0, 0, 0, 0),
            0x00100073 => build(InstType::I, RiscvOp::Ebreak, 0, 0, 0, 0),
            _ => None,
        },
        _ => None,
    }
}
