use serde::{Deserialize, Serialize};
use zkc_core::{Digest, ExitCode, TaggedHasher};
use zkc_prover::SegmentClaim;

/// How the covered execution ended, and the journal digest at that point
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitSummary {
    pub exit_code: ExitCode,
    pub output_digest: Digest,
}

/// Statement of a succinct receipt: execution under `config_digest` goes from
/// `start_commitment` to `end_commitment` and ends with `exit`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccinctClaim {
    pub config_digest: Digest,
    pub start_commitment: Digest,
    pub end_commitment: Digest,
    pub exit: ExitSummary,
}

impl SuccinctClaim {
    pub fn digest(&self) -> Digest {
        let h = TaggedHasher::new("zkc.succinct_claim.v1")
            .digest(&self.config_digest)
            .digest(&self.start_commitment)
            .digest(&self.end_commitment);
        self.exit.exit_code.hash_into(h).digest(&self.exit.output_digest).finalize()
    }

    /// Claim covering `left` followed by `right`
    pub fn compose(left: &SuccinctClaim, right: &SuccinctClaim) -> SuccinctClaim {
        SuccinctClaim {
            config_digest: left.config_digest,
            start_commitment: left.start_commitment,
            end_commitment: right.end_commitment,
            exit: right.exit,
        }
    }
}

impl From<&SegmentClaim> for SuccinctClaim {
    fn from(claim: &SegmentClaim) -> Self {
        SuccinctClaim {
            config_digest: claim.config_digest,
            start_commitment: claim.start_commitment,
            end_commitment: claim.end_commitment,
            exit: ExitSummary { exit_code: claim.exit_code, output_digest: claim.output_digest },
        }
    }
}

/// Contiguous range of segments covered by a receipt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSpan {
    pub first: u32,
    pub count: u32,
    pub cycles: u64,
}

impl SegmentSpan {
    /// Index one past the last covered segment
    pub fn end(&self) -> u64 {
        self.first as u64 + self.count as u64
    }
}
