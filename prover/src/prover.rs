use rayon::prelude::*;
use tracing::{debug, info, instrument};
use zkc_core::{codec, Digest};
use zkcemu::Segment;

use crate::{
    estimate_witness_bytes, generate_witness, trace_root, CancellationToken, ProofSystemTag,
    ProverError, SegmentClaim, SegmentReceipt, SegmentSeal, StepWitness,
};

/// Proves segments one at a time under a witness memory limit
#[derive(Clone, Debug)]
pub struct SegmentProver {
    max_witness_bytes: u64,
    cancel: CancellationToken,
}

impl Default for SegmentProver {
    fn default() -> Self {
        Self { max_witness_bytes: u64::MAX, cancel: CancellationToken::new() }
    }
}

impl SegmentProver {
    pub fn new(max_witness_bytes: u64, cancel: CancellationToken) -> Self {
        Self { max_witness_bytes, cancel }
    }

    fn check_cancelled(&self) -> Result<(), ProverError> {
        if self.cancel.is_cancelled() {
            return Err(ProverError::Cancelled);
        }
        Ok(())
    }

    /// Checks a segment and produces its receipt. The segment is consumed.
    #[instrument(skip_all, fields(segment = segment.index))]
    pub fn prove(&self, segment: Segment) -> Result<SegmentReceipt, ProverError> {
        self.check_cancelled()?;
        let params = segment.params;
        params.validate().map_err(|e| ProverError::Proving(e.to_string()))?;
        if params.config_digest() != segment.config_digest {
            return Err(ProverError::Proving(format!(
                "segment {} config digest mismatch",
                segment.index
            )));
        }
        if segment.instruction_count as u64 > params.max_segment_cycles() {
            return Err(ProverError::Proving(format!(
                "segment {} has {} instructions, limit is {}",
                segment.index,
                segment.instruction_count,
                params.max_segment_cycles()
            )));
        }
        if segment.trace.start_state().commitment() != segment.start_commitment {
            return Err(ProverError::Proving(format!(
                "segment {} start snapshot mismatch",
                segment.index
            )));
        }

        let needed = estimate_witness_bytes(&segment);
        if needed > self.max_witness_bytes {
            return Err(ProverError::ResourceExhausted { needed, budget: self.max_witness_bytes });
        }

        let claim = SegmentClaim {
            config_digest: segment.config_digest,
            index: segment.index,
            start_commitment: segment.start_commitment,
            end_commitment: segment.end_commitment,
            instruction_count: segment.instruction_count,
            exit_code: segment.exit_code,
            output_digest: segment.output_digest,
        };

        let rows = generate_witness(segment)?;
        self.check_cancelled()?;

        let leaves: Vec<Digest> = rows.par_iter().map(StepWitness::digest).collect();
        let trace_root = trace_root(leaves);
        debug!("prove: trace root {} over {} rows", trace_root, rows.len());
        self.check_cancelled()?;

        let seal = SegmentSeal { params, trace_root, rows };
        let seal = codec::encode(&seal).map_err(|e| ProverError::Proving(e.to_string()))?;
        info!(
            "prove: segment {} proven, {} instructions, exit {}, seal {} bytes",
            claim.index,
            claim.instruction_count,
            claim.exit_code,
            seal.len()
        );
        Ok(SegmentReceipt { claim, seal, proof_system_tag: ProofSystemTag::TraceReplayV1 })
    }
}

/// Proves a single segment without a memory limit
pub fn prove_segment(segment: Segment) -> Result<SegmentReceipt, ProverError> {
    SegmentProver::default().prove(segment)
}
