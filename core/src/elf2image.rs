//! Reads a RISC-V ELF executable and converts it to a program [`Image`]

use elf::{
    abi::{EM_RISCV, ET_EXEC, PF_X, PT_DYNAMIC, PT_INTERP, PT_LOAD, PT_TLS},
    endian::LittleEndian,
    ElfBytes,
};
use thiserror::Error;
use tracing::debug;

use crate::{Image, ImageMetadata, LoadSegment, MemoryImage, ParamsError, VmParams, GUEST_MIN_MEM};

const ELFCLASS32: u8 = 1;
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;
const EF_RISCV_RVC: u32 = 0x0001;
const EF_RISCV_FLOAT_ABI: u32 = 0x0006;
const EF_RISCV_RVE: u32 = 0x0008;
const ELF32_EHDR_SIZE: usize = 52;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("invalid ELF file: {0}")]
    Format(String),

    #[error("unsupported instruction set: {0}")]
    UnsupportedIsa(String),

    #[error("program does not fit the guest address space: {0}")]
    TooLarge(String),

    #[error("invalid parameters: {0}")]
    Params(#[from] ParamsError),
}

/// Parses an ELF32 little-endian RISC-V executable into an image with default parameters
pub fn load_image_from_elf(bytes: &[u8]) -> Result<Image, ImageError> {
    elf2image(bytes, VmParams::default())
}

/// Parses an ELF32 little-endian RISC-V executable into an image under `params`
pub fn elf2image(bytes: &[u8], params: VmParams) -> Result<Image, ImageError> {
    params.validate()?;

    // Check the identification bytes before handing the buffer to the parser, so that the
    // error classes stay precise
    if bytes.len() < 16 || bytes[0..4] != [0x7f, b'E', b'L', b'F'] {
        return Err(ImageError::Format("missing ELF magic".into()));
    }
    match bytes[4] {
        ELFCLASS32 => {}
        ELFCLASS64 => return Err(ImageError::UnsupportedIsa("64-bit ELF class".into())),
        class => return Err(ImageError::Format(format!("unknown ELF class {class}"))),
    }
    if bytes[5] != ELFDATA2LSB {
        return Err(ImageError::Format("ELF data is not little-endian".into()));
    }
    if bytes.len() < ELF32_EHDR_SIZE {
        return Err(ImageError::Format("truncated ELF header".into()));
    }

    let elf_bytes = ElfBytes::<LittleEndian>::minimal_parse(bytes)
        .map_err(|e| ImageError::Format(e.to_string()))?;
    let ehdr = &elf_bytes.ehdr;

    if ehdr.e_machine != EM_RISCV {
        return Err(ImageError::Format(format!("machine {} is not RISC-V", ehdr.e_machine)));
    }
    if ehdr.e_type != ET_EXEC {
        return Err(ImageError::Format(format!("ELF type {} is not an executable", ehdr.e_type)));
    }
    if ehdr.e_flags & EF_RISCV_RVC != 0 {
        return Err(ImageError::UnsupportedIsa("compressed instructions".into()));
    }
    if ehdr.e_flags & EF_RISCV_FLOAT_ABI != 0 {
        return Err(ImageError::UnsupportedIsa("floating-point ABI".into()));
    }
    if ehdr.e_flags & EF_RISCV_RVE != 0 {
        return Err(ImageError::UnsupportedIsa("RV32E register file".into()));
    }

    let segments = elf_bytes
        .segments()
        .ok_or_else(|| ImageError::Format("no program headers".into()))?;

    let guest_max_mem = params.guest_max_mem() as u64;
    let mut regions: Vec<(u32, &[u8])> = Vec::new();
    let mut loaded = Vec::new();
    let mut footprint = 0u64;

    for phdr in segments.iter() {
        match phdr.p_type {
            PT_DYNAMIC => return Err(ImageError::UnsupportedIsa("dynamic linking".into())),
            PT_INTERP => return Err(ImageError::UnsupportedIsa("program interpreter".into())),
            PT_TLS => return Err(ImageError::UnsupportedIsa("thread-local storage".into())),
            PT_LOAD => {}
            _ => continue,
        }
        if phdr.p_memsz == 0 {
            continue;
        }
        if phdr.p_filesz > phdr.p_memsz {
            return Err(ImageError::Format(format!(
                "segment at {:#x} has file size {} above memory size {}",
                phdr.p_vaddr, phdr.p_filesz, phdr.p_memsz
            )));
        }
        let end = phdr.p_vaddr.checked_add(phdr.p_memsz).unwrap_or(u64::MAX);
        if phdr.p_vaddr < GUEST_MIN_MEM as u64 {
            return Err(ImageError::TooLarge(format!(
                "segment at {:#x} overlaps the null guard page",
                phdr.p_vaddr
            )));
        }
        if end > guest_max_mem {
            return Err(ImageError::TooLarge(format!(
                "segment [{:#x}, {end:#x}) reaches past {guest_max_mem:#x}",
                phdr.p_vaddr
            )));
        }
        let data = elf_bytes
            .segment_data(&phdr)
            .map_err(|e| ImageError::Format(format!("segment data outside file: {e}")))?;
        if data.len() as u64 != phdr.p_filesz {
            return Err(ImageError::Format("segment data outside file".into()));
        }

        debug!(
            "elf2image() load segment vaddr={:#x} filesz={} memsz={} flags={:#x}",
            phdr.p_vaddr, phdr.p_filesz, phdr.p_memsz, phdr.p_flags
        );
        footprint += phdr.p_memsz;
        regions.push((phdr.p_vaddr as u32, data));
        loaded.push(LoadSegment {
            vaddr: phdr.p_vaddr as u32,
            file_size: phdr.p_filesz as u32,
            mem_size: phdr.p_memsz as u32,
            flags: phdr.p_flags,
        });
    }

    if loaded.is_empty() {
        return Err(ImageError::Format("no loadable segment".into()));
    }
    if footprint >= guest_max_mem {
        return Err(ImageError::TooLarge(format!("footprint of {footprint} bytes")));
    }

    let entry = ehdr.e_entry;
    let entry_in_code = entry % 4 == 0
        && loaded.iter().any(|s| {
            s.flags & PF_X != 0
                && entry >= s.vaddr as u64
                && entry + 4 <= s.vaddr as u64 + s.file_size as u64
        });
    if !entry_in_code {
        return Err(ImageError::Format(format!("entry point {entry:#x} is outside loaded code")));
    }

    let memory = MemoryImage::from_regions(&params, regions);
    let metadata = ImageMetadata {
        elf_hash: blake3::hash(bytes).to_hex().to_string(),
        segments: loaded,
        footprint,
    };
    Ok(Image::new(memory, entry as u32, params, metadata))
}

#[cfg(test)]
mod tests {
    use riscv::asm;

    use super::*;
    use crate::testing::{ElfBuilder, CODE_BASE};

    fn halt_program() -> Vec<u32> {
        vec![asm::addi(17, 0, 0), asm::addi(10, 0, 0), asm::ecall()]
    }

    #[test]
    fn loads_code_and_data() {
        let elf = ElfBuilder::new()
            .code(CODE_BASE, &halt_program())
            .data(0x20000, b"hello")
            .bss(0x30000, 4096)
            .build();
        let image = load_image_from_elf(&elf).unwrap();
        assert_eq!(image.entry_pc(), CODE_BASE);
        assert_eq!(image.memory().load_word(CODE_BASE + 8), asm::ecall());
        assert_eq!(image.memory().load_word(0x20000), u32::from_le_bytes(*b"hell"));
        assert_eq!(image.metadata().segments.len(), 3);
        assert_eq!(image.metadata().footprint, 12 + 5 + 4096);
        assert_eq!(image.metadata().elf_hash, blake3::hash(&elf).to_hex().to_string());
        assert_eq!(image.entry_state(), image.initial_state().commitment());
    }

    #[test]
    fn format_errors() {
        let good = ElfBuilder::new().code(CODE_BASE, &halt_program()).build();

        assert!(matches!(load_image_from_elf(b"not an elf"), Err(ImageError::Format(_))));
        assert!(matches!(load_image_from_elf(&good[..40]), Err(ImageError::Format(_))));

        let mut big_endian = good.clone();
        big_endian[5] = 2;
        assert!(matches!(load_image_from_elf(&big_endian), Err(ImageError::Format(_))));

        let wrong_machine = ElfBuilder::new().code(CODE_BASE, &halt_program()).machine(62).build();
        assert!(matches!(load_image_from_elf(&wrong_machine), Err(ImageError::Format(_))));

        let shared_object = ElfBuilder::new().code(CODE_BASE, &halt_program()).elf_type(3).build();
        assert!(matches!(load_image_from_elf(&shared_object), Err(ImageError::Format(_))));

        let no_load = ElfBuilder::new().entry(CODE_BASE).build();
        assert!(matches!(load_image_from_elf(&no_load), Err(ImageError::Format(_))));

        let bad_entry = ElfBuilder::new().code(CODE_BASE, &halt_program()).entry(0x50000).build();
        assert!(matches!(load_image_from_elf(&bad_entry), Err(ImageError::Format(_))));

        let data_entry = ElfBuilder::new()
            .data(0x20000, &[0u8; 16])
            .code(CODE_BASE, &halt_program())
            .entry(0x20000)
            .build();
        assert!(matches!(load_image_from_elf(&data_entry), Err(ImageError::Format(_))));
    }

    #[test]
    fn unsupported_isa() {
        let mut elf64 = ElfBuilder::new().code(CODE_BASE, &halt_program()).build();
        elf64[4] = 2;
        assert!(matches!(load_image_from_elf(&elf64), Err(ImageError::UnsupportedIsa(_))));

        for flags in [EF_RISCV_RVC, 0x2, 0x4, EF_RISCV_RVE] {
            let elf = ElfBuilder::new().code(CODE_BASE, &halt_program()).flags(flags).build();
            assert!(
                matches!(load_image_from_elf(&elf), Err(ImageError::UnsupportedIsa(_))),
                "{flags}"
            );
        }

        for p_type in [PT_DYNAMIC, PT_INTERP, PT_TLS] {
            let elf = ElfBuilder::new()
                .code(CODE_BASE, &halt_program())
                .segment(p_type, 0x40000, &[0u8; 8], 8, 4)
                .build();
            assert!(matches!(load_image_from_elf(&elf), Err(ImageError::UnsupportedIsa(_))));
        }
    }

    #[test]
    fn too_large() {
        let params = VmParams::default();
        let past_end = ElfBuilder::new()
            .code(CODE_BASE, &halt_program())
            .bss(params.guest_max_mem() - 16, 32)
            .build();
        assert!(matches!(load_image_from_elf(&past_end), Err(ImageError::TooLarge(_))));

        let null_page = ElfBuilder::new().code(0x100, &halt_program()).build();
        assert!(matches!(load_image_from_elf(&null_page), Err(ImageError::TooLarge(_))));

        // reaches past a 2^20 byte address space, fits the default 2^24
        let small = VmParams { memory_bits: 20, ..params };
        let elf = ElfBuilder::new().code(CODE_BASE, &halt_program()).bss(0x80000, 0x80004).build();
        assert!(matches!(elf2image(&elf, small), Err(ImageError::TooLarge(_))));
        assert!(elf2image(&elf, params).is_ok());
    }
}
