use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProverError {
    /// The segment is inconsistent with its own replay or parameters
    #[error("proving error: {0}")]
    Proving(String),

    /// The witness would not fit the memory budget; retryable with a larger budget
    #[error("segment witness needs {needed} bytes, budget is {budget}")]
    ResourceExhausted { needed: u64, budget: u64 },

    #[error("proving cancelled")]
    Cancelled,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("malformed seal: {0}")]
    MalformedSeal(String),

    #[error("seal parameters do not match the claimed config digest")]
    ConfigMismatch,

    #[error("trace rows do not match the committed trace root")]
    TraceRootMismatch,

    #[error("invalid transition at row {row}: {reason}")]
    InvalidTransition { row: u32, reason: String },

    #[error("boundary mismatch: {0}")]
    Boundary(&'static str),

    #[error("exit code is not justified by the trace: {0}")]
    ExitMismatch(String),
}
