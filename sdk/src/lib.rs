//! Public interface of the zkc pipeline.
//!
//! ```text
//! load_image_from_elf --> execute_with_input --> [Segment] --> prove_session --> SuccinctReceipt
//!                                                                                   |
//!                                                 verify(receipt, config, output) <-
//! ```
//!
//! Receipts carry seals from the built-in dev-mode recursion backend. [`verify`] rejects
//! them; pass a [`VerifierContext`] with dev mode enabled to [`verify_with_context`] to accept.
//!
//! The individual stages are re-exported from their crates; [`SessionProver`] runs proving,
//! lifting and joining on a bounded worker pool under a memory budget.

pub mod logging;
mod memory_budget;
mod pipeline_errors;
mod prover_opts;
mod reduction_tree;
mod session_prover;

pub use memory_budget::*;
pub use pipeline_errors::*;
pub use prover_opts::*;
pub use session_prover::*;

pub use zkc_core::{
    codec, journal_digest, load_image_from_elf, Digest, ExitCode, FaultReason, Image, ImageError,
    VmParams,
};
pub use zkcemu::{
    execute_with_input, resume_with_input, Continuation, EmuOptions, ExecutorError, Segment,
    Session, SessionInfo, ZkcEmulator,
};
pub use zkc_prover::{
    prove_segment, verify_segment_receipt, CancellationToken, ProofSystemTag, ProverError,
    SegmentClaim, SegmentProver, SegmentReceipt, VerificationError,
};
pub use zkc_recursion::{
    join_segment_receipts, join_segment_receipts_with, join_succinct_receipts,
    lift_segment_receipt, reduce_succinct_receipts, verify, verify_receipt, verify_receipt_with,
    verify_with_context, ExitSummary, Receipt, RecursionError, ReductionStrategy, SegmentSpan,
    SuccinctClaim, SuccinctReceipt, VerifierContext,
};
