use serde::{Deserialize, Serialize};
use zkc_core::{codec, Digest, ExitCode, TaggedHasher, VmParams};

use crate::{StepWitness, VerificationError};

/// Public statement proven by a segment receipt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentClaim {
    pub config_digest: Digest,
    pub index: u32,
    pub start_commitment: Digest,
    pub end_commitment: Digest,
    pub instruction_count: u32,
    pub exit_code: ExitCode,
    pub output_digest: Digest,
}

impl SegmentClaim {
    pub fn digest(&self) -> Digest {
        let h = TaggedHasher::new("zkc.segment_claim.v1")
            .digest(&self.config_digest)
            .u32(self.index)
            .digest(&self.start_commitment)
            .digest(&self.end_commitment)
            .u32(self.instruction_count);
        self.exit_code.hash_into(h).digest(&self.output_digest).finalize()
    }
}

/// Identifies the proof system that produced a seal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofSystemTag {
    /// Complete execution trace, every transition replayed by the verifier
    TraceReplayV1,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSeal {
    pub params: VmParams,
    /// Merkle root over the row digests
    pub trace_root: Digest,
    /// `instruction_count + 1` rows, the last one holding the end state
    pub rows: Vec<StepWitness>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentReceipt {
    pub claim: SegmentClaim,
    pub seal: Vec<u8>,
    pub proof_system_tag: ProofSystemTag,
}

impl SegmentReceipt {
    /// Commitment to the seal bytes
    pub fn seal_digest(&self) -> Digest {
        Digest::hash(&self.seal)
    }

    pub fn decode_seal(&self) -> Result<SegmentSeal, VerificationError> {
        codec::decode(&self.seal).map_err(|e| VerificationError::MalformedSeal(e.to_string()))
    }

    pub fn verify(&self) -> Result<(), VerificationError> {
        crate::verify_segment_receipt(self)
    }
}
