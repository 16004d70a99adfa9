use tracing::{debug, instrument};
use zkc_prover::{verify_segment_receipt, SegmentReceipt};

use crate::{
    seal::{lift_inputs_digest, RecursionSeal},
    RecursionError, RecursionProgram, SegmentSpan, SuccinctClaim, SuccinctReceipt,
    RECURSION_VERSION,
};

/// Verifies a segment receipt and wraps it in a depth-0 succinct receipt
#[instrument(skip_all, fields(segment = receipt.claim.index))]
pub fn lift_segment_receipt(receipt: &SegmentReceipt) -> Result<SuccinctReceipt, RecursionError> {
    let index = receipt.claim.index;
    verify_segment_receipt(receipt)
        .map_err(|e| RecursionError::InvalidReceipt(format!("segment {index}: {e}")))?;
    let params = receipt
        .decode_seal()
        .map_err(|e| RecursionError::InvalidReceipt(format!("segment {index}: {e}")))?
        .params;
    if params.recursion_version != RECURSION_VERSION {
        return Err(RecursionError::InvalidReceipt(format!(
            "segment {index}: recursion version {} is not supported",
            params.recursion_version
        )));
    }

    let claim = SuccinctClaim::from(&receipt.claim);
    let cycles = receipt.claim.instruction_count as u64;
    let span = SegmentSpan { first: index, count: 1, cycles };
    let inputs_digest = lift_inputs_digest(&receipt.claim.digest(), &receipt.seal_digest());
    let seal = RecursionSeal::new(
        RecursionProgram::Lift,
        &claim.config_digest,
        claim.digest(),
        inputs_digest,
        0,
        &span,
    );

    debug!("lift: segment {} lifted, exit {}", index, claim.exit.exit_code);
    Ok(SuccinctReceipt {
        claim,
        seal: seal.encode()?,
        recursion_depth: 0,
        control_id: seal.control_id,
        span,
    })
}
