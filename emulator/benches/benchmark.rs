#[macro_use]
extern crate criterion;
use criterion::{black_box, BenchmarkId, Criterion};
use riscv::asm::{self, Asm};
use zkc_core::{load_image_from_elf, testing::program_elf, Image, SYSCALL_HALT};
use zkcemu::{EmuOptions, ZkcEmulator};

/// Sums 0..n in a loop, storing the running sum to memory every iteration
fn sum_program(n: u32) -> Image {
    let mut a = Asm::new();
    a.extend(asm::li(6, n));
    a.extend(asm::li(7, 0x20_0000));
    let top = a.here();
    a.push(asm::add(10, 10, 5));
    a.push(asm::sw(10, 7, 0));
    a.push(asm::addi(5, 5, 1));
    a.push_to(top, |off| asm::bne(5, 6, off));
    a.push(asm::addi(17, 0, SYSCALL_HALT as i32));
    a.push(asm::ecall());
    load_image_from_elf(&program_elf(a.words())).expect("valid program")
}

fn bench_emulate(c: &mut Criterion) {
    let image = sum_program(100_000);
    c.bench_function("Emulate", |b| {
        b.iter(|| {
            let options = EmuOptions::with_segment_limit(1 << 20);
            ZkcEmulator::execute(black_box(&image), &[], &options).expect("execution")
        })
    });
}

fn bench_segment_sizes(c: &mut Criterion) {
    let image = sum_program(50_000);
    let mut group = c.benchmark_group("Segment limit");
    for po2 in [10u32, 14, 18] {
        group.bench_with_input(BenchmarkId::from_parameter(po2), &po2, |b, po2| {
            let options = EmuOptions::with_segment_limit(1 << po2);
            b.iter(|| ZkcEmulator::execute(&image, &[], &options).expect("execution"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_emulate, bench_segment_sizes);
criterion_main!(benches);
