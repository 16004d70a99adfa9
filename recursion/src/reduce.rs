use std::{fmt, str::FromStr};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use zkc_prover::SegmentReceipt;

use crate::{join_succinct_receipts, lift_segment_receipt, RecursionError, SuccinctReceipt};

/// Order in which a list of receipts is joined
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReductionStrategy {
    /// Balanced binary tree, depth `ceil(log2 n)`
    #[default]
    Tree,
    /// Left fold, depth `n - 1`
    Fold,
}

impl FromStr for ReductionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tree" => Ok(ReductionStrategy::Tree),
            "fold" => Ok(ReductionStrategy::Fold),
            other => Err(format!("unknown reduction strategy '{other}', expected tree or fold")),
        }
    }
}

impl fmt::Display for ReductionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReductionStrategy::Tree => write!(f, "tree"),
            ReductionStrategy::Fold => write!(f, "fold"),
        }
    }
}

/// Joins an ordered list of succinct receipts into one
pub fn reduce_succinct_receipts(
    receipts: Vec<SuccinctReceipt>,
    strategy: ReductionStrategy,
) -> Result<SuccinctReceipt, RecursionError> {
    let mut level = receipts;
    if level.is_empty() {
        return Err(RecursionError::EmptyInput);
    }
    match strategy {
        ReductionStrategy::Fold => {
            let mut iter = level.into_iter();
            let first = iter.next().ok_or(RecursionError::EmptyInput)?;
            iter.try_fold(first, |acc, next| join_succinct_receipts(&acc, &next))
        }
        ReductionStrategy::Tree => {
            while level.len() > 1 {
                level = level
                    .par_chunks(2)
                    .map(|pair| match pair {
                        [left, right] => join_succinct_receipts(left, right),
                        [single] => Ok(single.clone()),
                        _ => Err(RecursionError::EmptyInput),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
            }
            level.pop().ok_or(RecursionError::EmptyInput)
        }
    }
}

/// Lifts every segment receipt in parallel, then joins them in order
pub fn join_segment_receipts(
    receipts: Vec<SegmentReceipt>,
) -> Result<SuccinctReceipt, RecursionError> {
    join_segment_receipts_with(receipts, ReductionStrategy::Tree)
}

#[instrument(skip_all, fields(segments = receipts.len(), strategy = %strategy))]
pub fn join_segment_receipts_with(
    receipts: Vec<SegmentReceipt>,
    strategy: ReductionStrategy,
) -> Result<SuccinctReceipt, RecursionError> {
    if receipts.is_empty() {
        return Err(RecursionError::EmptyInput);
    }
    let lifted = receipts.par_iter().map(lift_segment_receipt).collect::<Result<Vec<_>, _>>()?;
    let receipt = reduce_succinct_receipts(lifted, strategy)?;
    info!(
        "join: {} segments, {} cycles, depth {}, exit {}",
        receipt.span.count,
        receipt.span.cycles,
        receipt.recursion_depth,
        receipt.claim.exit.exit_code
    );
    Ok(receipt)
}
