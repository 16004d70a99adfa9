//! Recursion layer: lifting segment receipts into succinct receipts and joining adjacent
//! succinct receipts until a single receipt covers the whole session.
//!
//! ```text
//! SegmentReceipt --lift--> SuccinctReceipt (depth 0) \
//!                                                      join --> SuccinctReceipt (depth 1) ...
//! SegmentReceipt --lift--> SuccinctReceipt (depth 0) /
//! ```
//!
//! The recursion seal is produced by the built-in dev-mode backend in [`seal`]. Receipt types
//! and verification entry points do not depend on how the seal is produced, but verifiers
//! reject dev-mode seals unless their [`VerifierContext`] opts in.

mod claim;
mod control_id;
mod join;
mod lift;
mod receipt;
mod recursion_errors;
mod reduce;
pub mod seal;
mod succinct_receipt;

pub use claim::*;
pub use control_id::*;
pub use join::*;
pub use lift::*;
pub use receipt::*;
pub use recursion_errors::*;
pub use reduce::*;
pub use succinct_receipt::*;
