//! Proving parameters and the config digest derived from them

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Digest, TaggedHasher, GUEST_MIN_MEM};

/// Parameters that fix the memory layout, segment sizes and recursion circuit.
///
/// The config digest is the hash of these values; a receipt proven under one set of
/// parameters never verifies under another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VmParams {
    pub vm_version: u32,
    /// log2 of the guest address space size in bytes
    pub memory_bits: u32,
    /// Paging granularity in bytes, a power of two
    pub page_size: u32,
    /// log2 of the largest segment the prover accepts
    pub max_segment_po2: u32,
    pub recursion_version: u32,
}

impl Default for VmParams {
    fn default() -> Self {
        Self {
            vm_version: 1,
            memory_bits: 24,
            page_size: 1024,
            max_segment_po2: 20,
            recursion_version: 1,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamsError {
    #[error("memory_bits {0} out of range [14, 30]")]
    MemoryBits(u32),

    #[error("page_size {0} must be a power of two between 64 and the guard page size")]
    PageSize(u32),

    #[error("max_segment_po2 {0} out of range [1, 24]")]
    SegmentPo2(u32),
}

impl VmParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(14..=30).contains(&self.memory_bits) {
            return Err(ParamsError::MemoryBits(self.memory_bits));
        }
        if !self.page_size.is_power_of_two() || !(64..=GUEST_MIN_MEM).contains(&self.page_size) {
            return Err(ParamsError::PageSize(self.page_size));
        }
        if !(1..=24).contains(&self.max_segment_po2) {
            return Err(ParamsError::SegmentPo2(self.max_segment_po2));
        }
        Ok(())
    }

    /// First address past the guest address space
    pub fn guest_max_mem(&self) -> u32 {
        1u32 << self.memory_bits
    }

    /// Initial stack pointer; the stack grows down from the top of the address space
    pub fn stack_top(&self) -> u32 {
        self.guest_max_mem()
    }

    /// Depth of the word-level memory Merkle tree
    pub fn merkle_depth(&self) -> u32 {
        self.memory_bits - 2
    }

    pub fn max_segment_cycles(&self) -> u64 {
        1u64 << self.max_segment_po2
    }

    pub fn is_valid_addr(&self, addr: u32) -> bool {
        addr >= GUEST_MIN_MEM && addr < self.guest_max_mem()
    }

    pub fn page_index(&self, addr: u32) -> u32 {
        addr / self.page_size
    }

    /// `SHA-256("zkc.config.v1" || params)`, fields little-endian in declaration order
    pub fn config_digest(&self) -> Digest {
        TaggedHasher::new("zkc.config.v1")
            .u32(self.vm_version)
            .u32(self.memory_bits)
            .u32(self.page_size)
            .u32(self.max_segment_po2)
            .u32(self.recursion_version)
            .finalize()
    }
}
