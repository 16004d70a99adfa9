//! RV32IM instruction decoding and encoding.
//!
//! The decoder turns a raw 32-bit word into a typed [`RiscvInstruction`]; the encoder in
//! [`asm`] does the opposite and is used to build guest programs without a cross compiler.

pub mod asm;
mod riscv_inst;
mod riscv_interpreter;
mod riscv_registers;

pub use riscv_inst::*;
pub use riscv_interpreter::*;
pub use riscv_registers::*;
