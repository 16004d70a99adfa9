//! This module contains constant definitions used by other modules and crates.

/// Size of a machine word in bytes
pub const WORD_SIZE: u32 = 4;

/// Addresses below this value belong to the null guard page and are never mapped
pub const GUEST_MIN_MEM: u32 = 0x0000_1000;

/// Maximum number of journal bytes a session may write
pub const MAX_OUTPUT_LEN: u32 = 1 << 20;

/// Default maximum input size accepted by the executor, in bytes
pub const DEFAULT_MAX_INPUT_SIZE: usize = 1 << 24;

/// Default session cycle budget
pub const DEFAULT_MAX_CYCLES: u64 = 1 << 32;

/// Syscall identifiers, passed in register a7
pub const SYSCALL_HALT: u32 = 0;
pub const SYSCALL_PAUSE: u32 = 1;
pub const SYSCALL_YIELD: u32 = 2;
pub const SYSCALL_READ: u32 = 3;
pub const SYSCALL_WRITE: u32 = 4;
pub const SYSCALL_INPUT_LEN: u32 = 5;

/// Register indices used by the syscall ABI
pub const REG_SP: usize = 2;
pub const REG_A0: usize = 10;
pub const REG_A1: usize = 11;
pub const REG_A7: usize = 17;

/// Number of integer registers
pub const REGS_NUMBER: usize = 32;
