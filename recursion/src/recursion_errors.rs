use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecursionError {
    /// An input receipt failed verification; nothing was produced
    #[error("invalid receipt: {0}")]
    InvalidReceipt(String),

    #[error("receipts were proven under different config digests")]
    ConfigMismatch,

    #[error("receipts do not chain: {0}")]
    ChainMismatch(String),

    /// The seal comes from the dev-mode backend and the verifier does not accept it
    #[error("dev-mode seal rejected; enable dev mode in the verifier context to accept it")]
    DevModeSeal,

    #[error("no receipts to join")]
    EmptyInput,
}
