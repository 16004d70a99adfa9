//! Witness generation: re-executes a segment from its start snapshot and records, for every
//! row, the pre-state plus the authenticated memory words the instruction touches.

use serde::{Deserialize, Serialize};
use tracing::debug;
use zkc_core::{
    step, CpuState, Digest, ExitCode, FaultReason, HostPort, HostReply, MemoryImage, MemoryPort,
    MerklePath, OutputState, StepOutcome, SystemState, TaggedHasher, REGS_NUMBER,
};
use zkcemu::Segment;

use crate::ProverError;

/// Instruction word read at `addr`, authenticated against the row's memory root
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchWitness {
    pub addr: u32,
    pub value: u32,
    pub path: MerklePath,
}

/// Data word accessed by a load or store. For a load `new == old`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataWitness {
    pub addr: u32,
    pub old: u32,
    pub new: u32,
    pub path: MerklePath,
}

/// One row of the execution trace
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepWitness {
    pub pc: u32,
    pub regs: [u32; REGS_NUMBER],
    pub memory_root: Digest,
    pub output_len: u32,
    pub output_digest: Digest,
    pub fetch: Option<FetchWitness>,
    pub data: Option<DataWitness>,
    pub host: Option<HostReply>,
}

impl StepWitness {
    fn at(state: &SystemState) -> Self {
        Self {
            pc: state.pc,
            regs: state.regs,
            memory_root: state.memory_root,
            output_len: state.output_len,
            output_digest: state.output_digest,
            fetch: None,
            data: None,
            host: None,
        }
    }

    pub fn state(&self) -> SystemState {
        SystemState {
            pc: self.pc,
            regs: self.regs,
            memory_root: self.memory_root,
            output_len: self.output_len,
            output_digest: self.output_digest,
        }
    }

    /// Leaf committed in the trace tree
    pub fn digest(&self) -> Digest {
        let mut h = TaggedHasher::new("zkc.row.v1").u32(self.pc);
        for r in &self.regs {
            h = h.u32(*r);
        }
        h = h.digest(&self.memory_root).u32(self.output_len).digest(&self.output_digest);
        h = match &self.fetch {
            Some(f) => hash_path(h.u32(1).u32(f.addr).u32(f.value), &f.path),
            None => h.u32(0),
        };
        h = match &self.data {
            Some(d) => hash_path(h.u32(1).u32(d.addr).u32(d.old).u32(d.new), &d.path),
            None => h.u32(0),
        };
        h = match &self.host {
            Some(reply) => h.u32(1).u32(reply.a0).u32(reply.a1),
            None => h.u32(0),
        };
        h.finalize()
    }
}

fn hash_path(mut h: TaggedHasher, path: &MerklePath) -> TaggedHasher {
    h = h.u32(path.siblings.len() as u32);
    for s in &path.siblings {
        h = h.digest(s);
    }
    h
}

/// Approximate size in bytes of one witness row for a given memory tree depth
pub fn row_size_estimate(merkle_depth: u32) -> u64 {
    let state = 4 + 4 * REGS_NUMBER as u64 + 32 + 4 + 32;
    let path = 24 + 32 * merkle_depth as u64;
    state + 2 * (path + 16) + 16
}

/// Memory needed to hold the replay snapshot, every witness row of `segment` and the encoded
/// seal carrying those rows
pub fn estimate_witness_bytes(segment: &Segment) -> u64 {
    let rows = segment.instruction_count as u64 + 1;
    2 * rows * row_size_estimate(segment.params.merkle_depth()) + segment.trace.resident_bytes()
}

/// Memory port over the live image that records the words an instruction touches
struct RecordingMemory<'a> {
    memory: &'a mut MemoryImage,
    fetch: Option<FetchWitness>,
    data: Option<DataWitness>,
}

impl<'a> RecordingMemory<'a> {
    fn new(memory: &'a mut MemoryImage) -> Self {
        Self { memory, fetch: None, data: None }
    }
}

impl MemoryPort for RecordingMemory<'_> {
    fn fetch(&mut self, pc: u32) -> u32 {
        let value = self.memory.load_word(pc);
        self.fetch = Some(FetchWitness { addr: pc, value, path: self.memory.path(pc) });
        value
    }

    fn load_word(&mut self, addr: u32) -> u32 {
        let value = self.memory.load_word(addr);
        if self.data.is_none() {
            let path = self.memory.path(addr);
            self.data = Some(DataWitness { addr, old: value, new: value, path });
        }
        value
    }

    fn store_word(&mut self, addr: u32, value: u32) {
        self.memory.store_word(addr, value);
        if let Some(data) = self.data.as_mut() {
            if data.addr == addr {
                data.new = value;
            }
        }
    }
}

/// Hands back the recorded host replies in order
struct ReplayHost {
    replies: std::vec::IntoIter<HostReply>,
    last: Option<HostReply>,
    exhausted: bool,
}

impl HostPort for ReplayHost {
    fn host_call(&mut self, _syscall: u32) -> HostReply {
        match self.replies.next() {
            Some(reply) => {
                self.last = Some(reply);
                reply
            }
            None => {
                self.exhausted = true;
                HostReply::default()
            }
        }
    }
}

/// Checks that the outcome of the last executed row is consistent with the segment exit code
pub(crate) fn last_outcome_matches(exit_code: &ExitCode, outcome: StepOutcome) -> bool {
    match exit_code {
        ExitCode::Halted(code) => outcome == StepOutcome::Halted(*code),
        ExitCode::Paused(code) => outcome == StepOutcome::Paused(*code),
        ExitCode::SystemSplit => matches!(outcome, StepOutcome::Continue | StepOutcome::Yielded),
        ExitCode::Fault(_) => outcome == StepOutcome::Continue,
    }
}

/// Exit codes that need at least one executed instruction
pub(crate) fn needs_instruction(exit_code: &ExitCode) -> bool {
    matches!(exit_code, ExitCode::Halted(_) | ExitCode::Paused(_) | ExitCode::SystemSplit)
}

/// Re-executes `segment` and returns its `instruction_count + 1` witness rows
pub fn generate_witness(segment: Segment) -> Result<Vec<StepWitness>, ProverError> {
    let Segment {
        index,
        end_commitment,
        instruction_count,
        exit_code,
        output_digest,
        params,
        trace,
        ..
    } = segment;
    let (mut cpu, mut memory, mut output, replies): (
        CpuState,
        MemoryImage,
        OutputState,
        Vec<HostReply>,
    ) = trace.into_parts();
    let mut host = ReplayHost { replies: replies.into_iter(), last: None, exhausted: false };

    if instruction_count == 0 && needs_instruction(&exit_code) {
        return Err(ProverError::Proving(format!(
            "segment {index} ends with {exit_code} after no instructions"
        )));
    }

    let mut rows = Vec::with_capacity(instruction_count as usize + 1);
    for i in 0..instruction_count {
        let pre = SystemState::new(&cpu, memory.root(), &output);
        let mut recorder = RecordingMemory::new(&mut memory);
        host.last = None;
        let outcome = step(&params, &mut cpu, &mut output, &mut recorder, &mut host)
            .map_err(|reason| {
                ProverError::Proving(format!("segment {index} faults at row {i}: {reason}"))
            })?;
        if host.exhausted {
            return Err(ProverError::Proving(format!(
                "segment {index} ran out of host replies at row {i}"
            )));
        }

        let is_last = i + 1 == instruction_count;
        if !is_last && outcome != StepOutcome::Continue {
            return Err(ProverError::Proving(format!("segment {index} stops early at row {i}")));
        }
        if is_last && !last_outcome_matches(&exit_code, outcome) {
            return Err(ProverError::Proving(format!(
                "segment {index} last instruction gives {outcome:?}, exit code is {exit_code}"
            )));
        }

        let mut row = StepWitness::at(&pre);
        row.fetch = recorder.fetch;
        row.data = recorder.data;
        row.host = host.last;
        rows.push(row);
    }
    if host.replies.next().is_some() {
        return Err(ProverError::Proving(format!("segment {index} leaves host replies unconsumed")));
    }

    let end = SystemState::new(&cpu, memory.root(), &output);
    let mut last = StepWitness::at(&end);
    if let ExitCode::Fault(reason) = exit_code {
        if reason != FaultReason::SessionLimitExceeded {
            let mut fault_cpu = cpu;
            let mut fault_output = output;
            let mut recorder = RecordingMemory::new(&mut memory);
            match step(&params, &mut fault_cpu, &mut fault_output, &mut recorder, &mut host) {
                Err(r) if r == reason => {}
                other => {
                    return Err(ProverError::Proving(format!(
                        "segment {index} claims {reason}, final step gives {other:?}"
                    )))
                }
            }
            last.fetch = recorder.fetch;
            last.data = recorder.data;
        }
    }
    rows.push(last);

    if end.commitment() != end_commitment {
        return Err(ProverError::Proving(format!(
            "segment {index} replay does not reach its end state"
        )));
    }
    if end.output_digest != output_digest {
        return Err(ProverError::Proving(format!("segment {index} output digest mismatch")));
    }
    debug!("witness: segment {} has {} rows", index, rows.len());
    Ok(rows)
}
