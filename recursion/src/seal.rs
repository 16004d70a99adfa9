//! Built-in recursion backend.
//!
//! A recursion seal binds a claim to the receipts that were verified to produce it. The
//! built-in backend does the verification natively and records the result as a fixed-size
//! hash commitment. The commitment is not a proof: anyone can compute it over any claim, so
//! its seals are tagged [`RecursionBackend::DevMode`] and verifiers only accept them from a
//! [`VerifierContext`](crate::VerifierContext) with dev mode enabled. A recursion circuit
//! would replace [`RecursionSeal`] with a proof of the same statement without changing the
//! receipt types.

use serde::{Deserialize, Serialize};
use zkc_core::{codec, Digest, TaggedHasher};

use crate::{RecursionError, RecursionProgram, SegmentSpan};

/// Backend that produced a recursion seal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecursionBackend {
    /// Hash binding over natively verified inputs; not sound against a malicious prover
    DevMode,
}

impl RecursionBackend {
    pub fn name(&self) -> &'static str {
        match self {
            RecursionBackend::DevMode => "dev",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecursionSeal {
    pub backend: RecursionBackend,
    pub control_id: Digest,
    pub claim_digest: Digest,
    /// Commitment to the verified inputs
    pub inputs_digest: Digest,
    pub binding: Digest,
}

fn binding(
    backend: RecursionBackend,
    control_id: &Digest,
    claim_digest: &Digest,
    inputs_digest: &Digest,
    depth: u32,
    span: &SegmentSpan,
) -> Digest {
    TaggedHasher::new("zkc.recursion.binding.v1")
        .bytes(backend.name().as_bytes())
        .digest(control_id)
        .digest(claim_digest)
        .digest(inputs_digest)
        .u32(depth)
        .u32(span.first)
        .u32(span.count)
        .u64(span.cycles)
        .finalize()
}

impl RecursionSeal {
    /// Seals a claim whose inputs the caller has already verified
    pub(crate) fn new(
        program: RecursionProgram,
        config_digest: &Digest,
        claim_digest: Digest,
        inputs_digest: Digest,
        depth: u32,
        span: &SegmentSpan,
    ) -> Self {
        let backend = RecursionBackend::DevMode;
        let control_id = program.control_id(backend, config_digest);
        let binding = binding(backend, &control_id, &claim_digest, &inputs_digest, depth, span);
        Self { backend, control_id, claim_digest, inputs_digest, binding }
    }

    pub fn is_bound(&self, depth: u32, span: &SegmentSpan) -> bool {
        let expected = binding(
            self.backend,
            &self.control_id,
            &self.claim_digest,
            &self.inputs_digest,
            depth,
            span,
        );
        self.binding == expected
    }

    pub fn encode(&self) -> Result<Vec<u8>, RecursionError> {
        codec::encode(self).map_err(|e| RecursionError::InvalidReceipt(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, RecursionError> {
        codec::decode(bytes)
            .map_err(|e| RecursionError::InvalidReceipt(format!("malformed seal: {e}")))
    }
}

/// Inputs commitment of a lift: the segment claim and its seal bytes
pub(crate) fn lift_inputs_digest(
    segment_claim_digest: &Digest,
    segment_seal_digest: &Digest,
) -> Digest {
    TaggedHasher::new("zkc.recursion.lift.inputs")
        .digest(segment_claim_digest)
        .digest(segment_seal_digest)
        .finalize()
}

/// Inputs commitment of a join: both claims and both bindings
pub(crate) fn join_inputs_digest(left: &RecursionSeal, right: &RecursionSeal) -> Digest {
    TaggedHasher::new("zkc.recursion.join.inputs")
        .digest(&left.claim_digest)
        .digest(&left.binding)
        .digest(&right.claim_digest)
        .digest(&right.binding)
        .finalize()
}
