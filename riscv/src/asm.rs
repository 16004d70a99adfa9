//! RV32IM instruction encoders.
//!
//! Used to assemble small guest programs directly from Rust, mainly in tests and benches.
//! Register arguments are register indices (see [`crate::RiscVRegisters`]); branch and jump
//! offsets are byte offsets relative to the instruction itself.

fn r_type(funct7: u32, rs2: u32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
    (funct7 << 25)
        | ((rs2 & 0x1F) << 20)
        | ((rs1 & 0x1F) << 15)
        | (funct3 << 12)
        | ((rd & 0x1F) << 7)
        | opcode
}

fn i_type(imm: i32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
    (((imm as u32) & 0xFFF) << 20)
        | ((rs1 & 0x1F) << 15)
        | (funct3 << 12)
        | ((rd & 0x1F) << 7)
        | opcode
}

fn s_type(imm: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
    let imm = imm as u32;
    (((imm >> 5) & 0x7F) << 25)
        | ((rs2 & 0x1F) << 20)
        | ((rs1 & 0x1F) << 15)
        | (funct3 << 12)
        | ((imm & 0x1F) << 7)
        | 0b0100011
}

fn b_type(offset: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
    let imm = offset as u32;
    (((imm >> 12) & 0x1) << 31)
        | (((imm >> 5) & 0x3F) << 25)
        | ((rs2 & 0x1F) << 20)
        | ((rs1 & 0x1F) << 15)
        | (funct3 << 12)
        | (((imm >> 1) & 0xF) << 8)
        | (((imm >> 11) & 0x1) << 7)
        | 0b1100011
}

pub fn lui(rd: u32, imm20: u32) -> u32 {
    ((imm20 & 0xFFFFF) << 12) | ((rd & 0x1F) << 7) | 0b0110111
}

pub fn auipc(rd: u32, imm20: u32) -> u32 {
    ((imm20 & 0xFFFFF) << 12) | ((rd & 0x1F) << 7) | 0b0010111
}

pub fn jal(rd: u32, offset: i32) -> u32 {
    let imm = offset as u32;
    (((imm >> 20) & 0x1) << 31)
        | (((imm >> 1) & 0x3FF) << 21)
        | (((imm >> 11) & 0x1) << 20)
        | (((imm >> 12) & 0xFF) << 12)
        | ((rd & 0x1F) << 7)
        | 0b1101111
}

pub fn jalr(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 0b000, rd, 0b1100111)
}

pub fn beq(rs1: u32, rs2: u32, offset: i32) -> u32 {
    b_type(offset, rs2, rs1, 0b000)
}

pub fn bne(rs1: u32, rs2: u32, offset: i32) -> u32 {
    b_type(offset, rs2, rs1, 0b001)
}

pub fn blt(rs1: u32, rs2: u32, offset: i32) -> u32 {
    b_type(offset, rs2, rs1, 0b100)
}

pub fn bge(rs1: u32, rs2: u32, offset: i32) -> u32 {
    b_type(offset, rs2, rs1, 0b101)
}

pub fn bltu(rs1: u32, rs2: u32, offset: i32) -> u32 {
    b_type(offset, rs2, rs1, 0b110)
}

pub fn lb(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 0b000, rd, 0b0000011)
}

pub fn lh(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 0b001, rd, 0b0000011)
}

pub fn lw(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 0b010, rd, 0b0000011)
}

pub fn lbu(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 0b100, rd, 0b0000011)
}

pub fn sb(rs2: u32, rs1: u32, imm: i32) -> u32 {
    s_type(imm, rs2, rs1, 0b000)
}

pub fn sh(rs2: u32, rs1: u32, imm: i32) -> u32 {
    s_type(imm, rs2, rs1, 0b001)
}

pub fn sw(rs2: u32, rs1: u32, imm: i32) -> u32 {
    s_type(imm, rs2, rs1, 0b010)
}

pub fn addi(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 0b000, rd, 0b0010011)
}

pub fn andi(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 0b111, rd, 0b0010011)
}

pub fn slli(rd: u32, rs1: u32, shamt: u32) -> u32 {
    i_type((shamt & 0x1F) as i32, rs1, 0b001, rd, 0b0010011)
}

pub fn srli(rd: u32, rs1: u32, shamt: u32) -> u32 {
    i_type((shamt & 0x1F) as i32, rs1, 0b101, rd, 0b0010011)
}

pub fn add(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(0b0000000, rs2, rs1, 0b000, rd, 0b0110011)
}

pub fn sub(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(0b0100000, rs2, rs1, 0b000, rd, 0b0110011)
}

pub fn xor(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(0b0000000, rs2, rs1, 0b100, rd, 0b0110011)
}

pub fn mul(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(0b0000001, rs2, rs1, 0b000, rd, 0b0110011)
}

pub fn divu(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(0b0000001, rs2, rs1, 0b101, rd, 0b0110011)
}

pub fn remu(rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(0b0000001, rs2, rs1, 0b111, rd, 0b0110011)
}

pub fn ecall() -> u32 {
    0x00000073
}

pub fn ebreak() -> u32 {
    0x00100073
}

/// Loads a 32-bit constant into `rd`: one `addi` when it fits in 12 bits, `lui` + `addi`
/// otherwise.
pub fn li(rd: u32, value: u32) -> Vec<u32> {
    let signed = value as i32;
    if (-2048..2048).contains(&signed) {
        return vec![addi(rd, 0, signed)];
    }
    let lo = ((value & 0xFFF) as i32) << 20 >> 20;
    let hi = value.wrapping_sub(lo as u32) >> 12;
    if lo == 0 {
        vec![lui(rd, hi)]
    } else {
        vec![lui(rd, hi), addi(rd, rd, lo)]
    }
}

/// Growing instruction buffer with byte offsets, for programs with loops
#[derive(Default, Debug, Clone)]
pub struct Asm {
    code: Vec<u32>,
}

impl Asm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte offset of the next instruction
    pub fn here(&self) -> i32 {
        (self.code.len() * 4) as i32
    }

    pub fn push(&mut self, inst: u32) -> &mut Self {
        self.code.push(inst);
        self
    }

    pub fn extend(&mut self, insts: impl IntoIterator<Item = u32>) -> &mut Self {
        self.code.extend(insts);
        self
    }

    /// Appends a branch or jump produced by `f` from the offset between the next instruction
    /// and `target`
    pub fn push_to(&mut self, target: i32, f: impl FnOnce(i32) -> u32) -> &mut Self {
        let offset = target - self.here();
        self.push(f(offset))
    }

    /// Overwrites the instruction at byte offset `at` with a branch or jump to `target`, for
    /// forward references
    pub fn patch_to(&mut self, at: i32, target: i32, f: impl FnOnce(i32) -> u32) -> &mut Self {
        self.code[(at / 4) as usize] = f(target - at);
        self
    }

    pub fn words(&self) -> &[u32] {
        &self.code
    }

    /// Little-endian code bytes
    pub fn bytes(&self) -> Vec<u8> {
        self.code.iter().flat_map(|w| w.to_le_bytes()).collect()
    }
}
