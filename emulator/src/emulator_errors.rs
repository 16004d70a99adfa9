use thiserror::Error;
use zkc_core::{FaultReason, ImageError};

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("segment limit {limit} outside [1, {max}]")]
    InvalidSegmentLimit { limit: u32, max: u64 },

    #[error("input of {size} bytes exceeds the limit of {max}")]
    InputTooLarge { size: usize, max: usize },

    #[error("paging budget of {0} pages, at least 2 are needed")]
    InvalidPagingBudget(u32),

    #[error("invalid image: {0}")]
    Image(#[from] ImageError),

    #[error("guest fault: {0}")]
    Fault(FaultReason),
}
