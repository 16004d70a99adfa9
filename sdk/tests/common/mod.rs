#![allow(dead_code)]

use riscv::{
    asm::{self, Asm},
    RiscVRegisters as Reg,
};
use zkc_core::testing::program_elf;
use zkc_sdk::{
    load_image_from_elf, verify_with_context, Digest, Image, SuccinctReceipt, VerifierContext,
};

pub const HALT: u32 = 0;
pub const PAUSE: u32 = 1;
pub const READ: u32 = 3;
pub const WRITE: u32 = 4;
pub const INPUT_LEN: u32 = 5;

/// Receipts here come from the built-in dev-mode recursion backend
pub fn dev() -> VerifierContext {
    VerifierContext::default().with_dev_mode(true)
}

pub fn verify_dev(receipt: &SuccinctReceipt, config: &Digest, output: &Digest) -> bool {
    verify_with_context(&dev(), receipt, config, output)
}

pub fn syscall(a: &mut Asm, id: u32) {
    a.push(asm::addi(Reg::A7, 0, id as i32)).push(asm::ecall());
}

pub fn image(a: &Asm) -> Image {
    load_image_from_elf(&program_elf(a.words())).unwrap()
}

/// Writes the 4-byte `constant` to the journal and halts with code 0
pub fn constant_program(constant: [u8; 4]) -> Image {
    let mut a = Asm::new();
    a.extend(asm::li(Reg::A0, u32::from_le_bytes(constant)));
    a.push(asm::addi(Reg::A1, 0, 4));
    syscall(&mut a, WRITE);
    a.push(asm::addi(Reg::A0, 0, 0));
    syscall(&mut a, HALT);
    image(&a)
}

/// Sums 1..=n into a word on the stack, writes the sum and halts with code 0
pub fn sum_program(n: u32) -> Image {
    let mut a = Asm::new();
    a.extend(asm::li(Reg::T1, n));
    let top = a.here();
    a.push(asm::addi(Reg::T0, Reg::T0, 1));
    a.push(asm::lw(Reg::T2, Reg::SP, -4));
    a.push(asm::add(Reg::T2, Reg::T2, Reg::T0));
    a.push(asm::sw(Reg::T2, Reg::SP, -4));
    a.push_to(top, |off| asm::bne(Reg::T0, Reg::T1, off));
    a.push(asm::lw(Reg::A0, Reg::SP, -4));
    a.push(asm::addi(Reg::A1, 0, 4));
    syscall(&mut a, WRITE);
    a.push(asm::addi(Reg::A0, 0, 0));
    syscall(&mut a, HALT);
    image(&a)
}

/// Echoes the whole input to the journal, then pauses with code 1. After a resume it echoes
/// the new input and halts with code 0.
pub fn echo_program() -> Image {
    let mut a = Asm::new();
    let round = a.here();
    syscall(&mut a, INPUT_LEN);
    a.push(asm::addi(Reg::T1, Reg::A0, 0));
    let top = a.here();
    let exit_branch = a.here();
    a.push(0);
    syscall(&mut a, READ);
    a.push(asm::sub(Reg::T1, Reg::T1, Reg::A1));
    syscall(&mut a, WRITE);
    a.push_to(top, |off| asm::jal(0, off));
    let done = a.here();
    let halt_branch = a.here();
    a.push(0);
    a.push(asm::addi(Reg::T0, 0, 1));
    a.push(asm::addi(Reg::A0, 0, 1));
    syscall(&mut a, PAUSE);
    a.push_to(round, |off| asm::jal(0, off));
    let halt = a.here();
    a.push(asm::addi(Reg::A0, 0, 0));
    syscall(&mut a, HALT);
    a.patch_to(exit_branch, done, |off| asm::beq(Reg::T1, 0, off));
    a.patch_to(halt_branch, halt, |off| asm::bne(Reg::T0, 0, off));
    image(&a)
}
