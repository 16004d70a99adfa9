//! ZKC executor options

use std::fmt;

use serde::{Deserialize, Serialize};
use zkc_core::{DEFAULT_MAX_CYCLES, DEFAULT_MAX_INPUT_SIZE};

/// Executor limits
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmuOptions {
    /// Maximum number of instructions per segment
    pub segment_limit: u32,
    /// Session cycle budget; running out of it is a fault
    pub max_cycles: u64,
    /// Maximum number of distinct memory pages a segment may touch
    pub max_segment_pages: u32,
    /// Largest accepted input, in bytes
    pub max_input_size: usize,
    /// Trace every executed instruction
    pub log_step: bool,
}

impl Default for EmuOptions {
    fn default() -> Self {
        Self {
            segment_limit: 1 << 20,
            max_cycles: DEFAULT_MAX_CYCLES,
            max_segment_pages: 1024,
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
            log_step: false,
        }
    }
}

impl EmuOptions {
    pub fn with_segment_limit(segment_limit: u32) -> Self {
        Self { segment_limit, ..Default::default() }
    }
}

impl fmt::Display for EmuOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SEGMENT_LIMIT: {}", self.segment_limit)?;
        writeln!(f, "MAX_CYCLES: {}", self.max_cycles)?;
        writeln!(f, "MAX_SEGMENT_PAGES: {}", self.max_segment_pages)?;
        writeln!(f, "MAX_INPUT_SIZE: {}", self.max_input_size)?;
        writeln!(f, "LOG_STEP: {}", self.log_step)?;
        Ok(())
    }
}
