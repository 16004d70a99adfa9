//! Segment prover and verifier.
//!
//! The prover re-executes a segment from its start snapshot, recording one witness row per
//! instruction plus a final row holding the end state. Each row is self-contained: it carries
//! the full pre-state and Merkle authentication paths for every memory word the instruction
//! reads or writes, so any single transition can be checked in isolation.
//!
//! ```text
//! Segment --> witness rows --> trace Merkle root
//!                  |                 |
//!                  v                 v
//!          SegmentSeal { params, trace_root, rows }
//! ```
//!
//! The verifier recomputes the trace root, re-executes every row through the shared
//! instruction semantics and checks that each row leads to the next one.

mod cancel;
mod errors;
mod prover;
mod receipt;
mod trace_tree;
mod verifier;
mod witness;

pub use cancel::*;
pub use errors::*;
pub use prover::*;
pub use receipt::*;
pub use trace_tree::*;
pub use verifier::*;
pub use witness::*;
