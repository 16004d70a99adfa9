//! RISC-V integer register file naming

pub struct RiscVRegisters;

const ABI_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

impl RiscVRegisters {
    pub const SP: u32 = 2;
    pub const T0: u32 = 5;
    pub const T1: u32 = 6;
    pub const T2: u32 = 7;
    pub const A0: u32 = 10;
    pub const A1: u32 = 11;
    pub const A7: u32 = 17;

    /// ABI name of register `x{index}`, `"?"` when out of range
    pub fn name_from_usize(index: usize) -> &'static str {
        ABI_NAMES.get(index).copied().unwrap_or("?")
    }
}
