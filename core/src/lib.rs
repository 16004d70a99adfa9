//! Contains the basic structures and functionality shared by the executor, the prover and the
//! recursion layer: digests, proving parameters, the committed memory image, machine state,
//! instruction semantics, program images and their canonical encoding.
//!
//! ```text
//! ELF file --> elf2image --> Image { MemoryImage, entry_pc, VmParams, entry_state }
//!                                |
//!                                v
//!             step(CpuState, MemoryPort, HostPort) --> StepOutcome | FaultReason
//! ```

pub mod codec;
mod digest;
mod elf2image;
mod exit_code;
mod image;
mod inst_context;
mod mem;
mod merkle;
mod params;
mod system_state;
pub mod zkc_definitions;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use digest::*;
pub use elf2image::*;
pub use exit_code::*;
pub use image::*;
pub use inst_context::*;
pub use mem::*;
pub use merkle::*;
pub use params::*;
pub use system_state::*;
pub use zkc_definitions::*;
