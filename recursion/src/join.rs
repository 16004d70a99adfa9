use tracing::{debug, instrument};

use crate::{
    seal::{join_inputs_digest, RecursionSeal},
    RecursionError, RecursionProgram, SegmentSpan, SuccinctClaim, SuccinctReceipt,
};

/// Joins two adjacent receipts into one covering both.
///
/// Both inputs are verified first. The left receipt must end where the right one starts, with
/// a continuable exit, and its segment span must be immediately followed by the right span.
#[instrument(skip_all, fields(left = left.span.first, right = right.span.first))]
pub fn join_succinct_receipts(
    left: &SuccinctReceipt,
    right: &SuccinctReceipt,
) -> Result<SuccinctReceipt, RecursionError> {
    let left_seal = left.checked_seal()?;
    let right_seal = right.checked_seal()?;

    if left.claim.config_digest != right.claim.config_digest {
        return Err(RecursionError::ConfigMismatch);
    }
    if left.claim.end_commitment != right.claim.start_commitment {
        return Err(RecursionError::ChainMismatch(format!(
            "left ends at {}, right starts at {}",
            left.claim.end_commitment, right.claim.start_commitment
        )));
    }
    if !left.claim.exit.exit_code.is_continuable() {
        return Err(RecursionError::ChainMismatch(format!(
            "left receipt ends with {}",
            left.claim.exit.exit_code
        )));
    }
    if left.span.end() != right.span.first as u64 {
        return Err(RecursionError::ChainMismatch(format!(
            "left covers segments {}..{}, right starts at {}",
            left.span.first,
            left.span.end(),
            right.span.first
        )));
    }

    let claim = SuccinctClaim::compose(&left.claim, &right.claim);
    let span = SegmentSpan {
        first: left.span.first,
        count: left.span.count + right.span.count,
        cycles: left.span.cycles + right.span.cycles,
    };
    let depth = left.recursion_depth.max(right.recursion_depth) + 1;
    let inputs_digest = join_inputs_digest(&left_seal, &right_seal);
    let seal = RecursionSeal::new(
        RecursionProgram::Join,
        &claim.config_digest,
        claim.digest(),
        inputs_digest,
        depth,
        &span,
    );

    debug!("join: segments {}..{} at depth {}", span.first, span.end(), depth);
    Ok(SuccinctReceipt {
        claim,
        seal: seal.encode()?,
        recursion_depth: depth,
        control_id: seal.control_id,
        span,
    })
}
