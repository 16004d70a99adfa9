use serde::{Deserialize, Serialize};
use zkc_core::Digest;
use zkc_prover::{verify_segment_receipt, SegmentReceipt};

use crate::{RecursionError, SuccinctClaim, SuccinctReceipt, VerifierContext};

/// Any receipt produced by the pipeline
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Receipt {
    Segment(SegmentReceipt),
    Succinct(SuccinctReceipt),
}

impl Receipt {
    /// Claim in succinct form, whatever the receipt kind
    pub fn claim(&self) -> SuccinctClaim {
        match self {
            Receipt::Segment(r) => SuccinctClaim::from(&r.claim),
            Receipt::Succinct(r) => r.claim,
        }
    }

    pub fn config_digest(&self) -> Digest {
        self.claim().config_digest
    }
}

impl From<SegmentReceipt> for Receipt {
    fn from(r: SegmentReceipt) -> Self {
        Receipt::Segment(r)
    }
}

impl From<SuccinctReceipt> for Receipt {
    fn from(r: SuccinctReceipt) -> Self {
        Receipt::Succinct(r)
    }
}

/// Verifies the proof carried by a receipt of either kind. Dev-mode seals are rejected.
pub fn verify_receipt(receipt: &Receipt) -> Result<(), RecursionError> {
    verify_receipt_with(&VerifierContext::default(), receipt)
}

pub fn verify_receipt_with(ctx: &VerifierContext, receipt: &Receipt) -> Result<(), RecursionError> {
    match receipt {
        Receipt::Segment(r) => {
            verify_segment_receipt(r).map_err(|e| RecursionError::InvalidReceipt(e.to_string()))
        }
        Receipt::Succinct(r) => r.verify_with(ctx),
    }
}
