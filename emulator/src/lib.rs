//! The ZKC executor runs a program image with the provided input, cutting the execution into
//! segments that can be proven independently.
//!
//! ```text
//! ELF file --> elf2image --> Image  \
//!                                    |
//! Input bytes ---------------------->  > Emu --> Segment[] + SessionInfo (+ Continuation)
//!                                    |
//! User configuration --> EmuOptions /
//! ```
//!
//! Execution is deterministic and single-threaded. A segment ends when it reaches the segment
//! cycle limit, when the next instruction would exceed the segment paging budget, or when the
//! guest yields. The session ends on halt, pause or fault.

mod emu;
mod emu_context;
pub mod emu_options;
mod emu_segment;
mod emulator;
mod emulator_errors;
mod session;

pub use emu::*;
pub use emu_context::*;
pub use emu_options::*;
pub use emu_segment::*;
pub use emulator::*;
pub use emulator_errors::*;
pub use session::*;
