use thiserror::Error;
use zkc_prover::ProverError;
use zkc_recursion::RecursionError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Prover(#[from] ProverError),

    #[error(transparent)]
    Recursion(#[from] RecursionError),

    #[error("invalid prover options: {0}")]
    Options(String),

    #[error("failed to start the worker pool: {0}")]
    WorkerPool(String),
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Prover(ProverError::Cancelled))
    }

    /// True for errors a caller may retry with more resources
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, PipelineError::Prover(ProverError::ResourceExhausted { .. }))
    }
}
