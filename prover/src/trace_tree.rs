//! Binary SHA-256 Merkle tree over witness row digests.
//!
//! The leaf level is padded with zero digests to the next power of two.

use rayon::prelude::*;
use zkc_core::Digest;

/// Root of the tree over `leaves`
pub fn trace_root(mut leaves: Vec<Digest>) -> Digest {
    let size = leaves.len().max(1).next_power_of_two();
    leaves.resize(size, Digest::ZERO);

    let mut level = leaves;
    while level.len() > 1 {
        level = level.par_chunks(2).map(|pair| Digest::hash_pair(&pair[0], &pair[1])).collect();
    }
    level[0]
}
