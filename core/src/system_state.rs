//! Machine state and its commitment

use serde::{Deserialize, Serialize};

use crate::{Digest, TaggedHasher, REGS_NUMBER};

/// Program counter and register file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuState {
    pub pc: u32,
    pub regs: [u32; REGS_NUMBER],
}

impl CpuState {
    pub fn new(pc: u32) -> Self {
        Self { pc, regs: [0; REGS_NUMBER] }
    }

    /// Writes a register, discarding writes to x0
    #[inline(always)]
    pub fn set_reg(&mut self, index: u32, value: u32) {
        if index != 0 {
            self.regs[index as usize] = value;
        }
    }

    #[inline(always)]
    pub fn reg(&self, index: u32) -> u32 {
        self.regs[index as usize]
    }
}

/// Running digest of the journal.
///
/// The digest is a byte-wise chain, `d_0 = 0^32` and `d_{k+1} = SHA-256(d_k || byte_k)`, so it
/// depends only on the bytes written and never on how writes were split across syscalls or
/// segments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputState {
    pub len: u32,
    pub digest: Digest,
}

impl OutputState {
    pub fn absorb(&mut self, bytes: &[u8]) {
        for b in bytes {
            let mut buf = [0u8; 33];
            buf[..32].copy_from_slice(self.digest.as_bytes());
            buf[32] = *b;
            self.digest = Digest::hash(&buf);
        }
        self.len += bytes.len() as u32;
    }
}

/// Digest of a whole journal
pub fn journal_digest(bytes: &[u8]) -> Digest {
    let mut output = OutputState::default();
    output.absorb(bytes);
    output.digest
}

/// Full machine state: CPU, committed memory and journal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemState {
    pub pc: u32,
    pub regs: [u32; REGS_NUMBER],
    pub memory_root: Digest,
    pub output_len: u32,
    pub output_digest: Digest,
}

impl SystemState {
    pub fn new(cpu: &CpuState, memory_root: Digest, output: &OutputState) -> Self {
        Self {
            pc: cpu.pc,
            regs: cpu.regs,
            memory_root,
            output_len: output.len,
            output_digest: output.digest,
        }
    }

    pub fn cpu(&self) -> CpuState {
        CpuState { pc: self.pc, regs: self.regs }
    }

    pub fn output(&self) -> OutputState {
        OutputState { len: self.output_len, digest: self.output_digest }
    }

    /// `SHA-256("zkc.state.v1" || pc || regs || memory_root || output_len || output_digest)`
    pub fn commitment(&self) -> Digest {
        let mut h = TaggedHasher::new("zkc.state.v1").u32(self.pc);
        for r in &self.regs {
            h = h.u32(*r);
        }
        h.digest(&self.memory_root).u32(self.output_len).digest(&self.output_digest).finalize()
    }
}
