use serde::{Deserialize, Serialize};

use crate::{
    CpuState, Digest, ImageError, MemoryImage, OutputState, SystemState, VmParams, REG_SP,
};

/// A loadable ELF program segment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSegment {
    pub vaddr: u32,
    pub file_size: u32,
    pub mem_size: u32,
    pub flags: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// BLAKE3 hash of the ELF file, hex encoded
    pub elf_hash: String,
    pub segments: Vec<LoadSegment>,
    /// Sum of the loaded segments' memory sizes, in bytes
    pub footprint: u64,
}

/// Program image: initial memory, entry point and the parameters it is proven under.
///
/// Immutable once built. `entry_state` is the commitment of the machine state the first
/// segment of a fresh session starts from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Image {
    memory: MemoryImage,
    entry_pc: u32,
    params: VmParams,
    entry_state: Digest,
    config_digest: Digest,
    metadata: ImageMetadata,
}

impl Image {
    pub(crate) fn new(
        memory: MemoryImage,
        entry_pc: u32,
        params: VmParams,
        metadata: ImageMetadata,
    ) -> Self {
        let mut image = Self {
            memory,
            entry_pc,
            params,
            entry_state: Digest::ZERO,
            config_digest: params.config_digest(),
            metadata,
        };
        image.entry_state = image.initial_state().commitment();
        image
    }

    /// Loads an ELF executable with default parameters
    pub fn from_elf(bytes: &[u8]) -> Result<Self, ImageError> {
        crate::load_image_from_elf(bytes)
    }

    pub fn from_elf_with_params(bytes: &[u8], params: VmParams) -> Result<Self, ImageError> {
        crate::elf2image(bytes, params)
    }

    pub fn memory(&self) -> &MemoryImage {
        &self.memory
    }

    pub fn entry_pc(&self) -> u32 {
        self.entry_pc
    }

    pub fn params(&self) -> &VmParams {
        &self.params
    }

    pub fn entry_state(&self) -> Digest {
        self.entry_state
    }

    pub fn config_digest(&self) -> Digest {
        self.config_digest
    }

    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    /// Registers at entry: `pc = entry`, `sp = stack top`, everything else zero
    pub fn initial_cpu(&self) -> CpuState {
        let mut cpu = CpuState::new(self.entry_pc);
        cpu.regs[REG_SP] = self.params.stack_top();
        cpu
    }

    pub fn initial_state(&self) -> SystemState {
        SystemState::new(&self.initial_cpu(), self.memory.root(), &OutputState::default())
    }

    /// Recomputes the derived digests, for images obtained from an untrusted encoding
    pub fn check_integrity(&self) -> Result<(), ImageError> {
        self.params.validate()?;
        if self.config_digest != self.params.config_digest() {
            return Err(ImageError::Format("config digest does not match parameters".into()));
        }
        if self.memory.page_size() != self.params.page_size
            || self.memory.memory_bits() != self.params.memory_bits
        {
            return Err(ImageError::Format("memory layout does not match parameters".into()));
        }
        if self.entry_state != self.initial_state().commitment() {
            return Err(ImageError::Format("entry state does not match memory".into()));
        }
        Ok(())
    }
}
