use serde::{Deserialize, Serialize};
use zkc_core::{
    CpuState, Digest, ExitCode, HostReply, MemoryImage, OutputState, SystemState, VmParams,
};

/// Everything needed to re-execute a segment: the machine state at its start and the host
/// replies it consumed, in order
#[derive(Debug, Serialize, Deserialize)]
pub struct SegmentTrace {
    start_cpu: CpuState,
    start_memory: MemoryImage,
    start_output: OutputState,
    host_replies: Vec<HostReply>,
}

impl SegmentTrace {
    pub(crate) fn new(
        start_cpu: CpuState,
        start_memory: MemoryImage,
        start_output: OutputState,
        host_replies: Vec<HostReply>,
    ) -> Self {
        Self { start_cpu, start_memory, start_output, host_replies }
    }

    pub fn start_state(&self) -> SystemState {
        SystemState::new(&self.start_cpu, self.start_memory.root(), &self.start_output)
    }

    pub fn host_replies(&self) -> &[HostReply] {
        &self.host_replies
    }

    /// Bytes held by the start snapshot
    pub fn resident_bytes(&self) -> u64 {
        self.start_memory.resident_bytes() + self.host_replies.len() as u64 * 8
    }

    pub fn into_parts(self) -> (CpuState, MemoryImage, OutputState, Vec<HostReply>) {
        (self.start_cpu, self.start_memory, self.start_output, self.host_replies)
    }
}

/// A contiguous slice of a session's execution, consumed once by the segment prover
#[derive(Debug, Serialize, Deserialize)]
pub struct Segment {
    pub index: u32,
    pub start_commitment: Digest,
    pub end_commitment: Digest,
    pub instruction_count: u32,
    pub exit_code: ExitCode,
    /// Journal digest at the end of the segment
    pub output_digest: Digest,
    pub params: VmParams,
    pub config_digest: Digest,
    pub trace: SegmentTrace,
}
