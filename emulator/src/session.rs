use serde::{Deserialize, Serialize};
use zkc_core::{CpuState, Digest, ExitCode, MemoryImage, OutputState, SystemState, VmParams};

use crate::{ExecutorError, Segment};

/// Summary of one executor run, produced once when the run ends
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub exit_code: ExitCode,
    /// Digest of `journal`
    pub output_digest: Digest,
    /// Journal bytes since the start of the session chain, including runs before a resume
    pub journal: Vec<u8>,
    pub segment_count: u32,
    /// Instructions executed in this run
    pub total_cycles: u64,
}

/// Suspended machine of a paused session, resumed with fresh input
#[derive(Debug, Serialize, Deserialize)]
pub struct Continuation {
    params: VmParams,
    cpu: CpuState,
    memory: MemoryImage,
    output: OutputState,
    journal: Vec<u8>,
    next_segment_index: u32,
}

impl Continuation {
    pub(crate) fn new(
        params: VmParams,
        cpu: CpuState,
        memory: MemoryImage,
        output: OutputState,
        journal: Vec<u8>,
        next_segment_index: u32,
    ) -> Self {
        Self { params, cpu, memory, output, journal, next_segment_index }
    }

    pub(crate) fn into_parts(self) -> (VmParams, CpuState, MemoryImage, OutputState, Vec<u8>, u32) {
        (self.params, self.cpu, self.memory, self.output, self.journal, self.next_segment_index)
    }

    pub fn params(&self) -> &VmParams {
        &self.params
    }

    pub fn next_segment_index(&self) -> u32 {
        self.next_segment_index
    }

    /// State the first segment of the resumed session starts from
    pub fn state(&self) -> SystemState {
        SystemState::new(&self.cpu, self.memory.root(), &self.output)
    }

    pub fn commitment(&self) -> Digest {
        self.state().commitment()
    }
}

#[derive(Debug)]
pub struct Session {
    pub segments: Vec<Segment>,
    pub info: SessionInfo,
    /// Present only when the session ended paused
    pub continuation: Option<Continuation>,
}

impl Session {
    /// Turns a fault exit into an error, for callers who want faults raised
    pub fn check_exit(&self) -> Result<(), ExecutorError> {
        match self.info.exit_code {
            ExitCode::Fault(reason) => Err(ExecutorError::Fault(reason)),
            _ => Ok(()),
        }
    }

    pub fn into_parts(self) -> (Vec<Segment>, SessionInfo) {
        (self.segments, self.info)
    }
}
