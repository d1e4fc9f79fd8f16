use thiserror::Error;

#[derive(Error, Debug)]
pub enum WhistleError {
    #[error("Compilation failed: `{command}` exited with {status}: {stderr}")]
    Compile {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Unresolved library reference: {0}")]
    UnresolvedReference(String),

    #[error("Conflicting addresses for library {name}: {existing} vs {conflicting}")]
    AddressConflict {
        name: String,
        existing: String,
        conflicting: String,
    },

    #[error("Deployment step '{step}' failed (completed: [{}]): {cause}", .completed.join(", "))]
    Deploy {
        step: String,
        completed: Vec<String>,
        cause: String,
    },

    #[error("Transaction '{call}' reverted: {reason}")]
    TransactionRevert { call: String, reason: String },

    #[error("Timed out after {secs}s waiting for '{call}' to confirm")]
    Timeout { call: String, secs: u64 },

    #[error("Proof generation failed: {0}")]
    ProofGeneration(String),

    #[error("Proof verification failed: {0}")]
    ProofVerification(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Protocol phase error: {0}")]
    Phase(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Circuit error: {0}")]
    Circuit(String),

    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WhistleError {
    /// Transport-level failures that a resend of the same signed transaction may cure.
    pub fn is_transient(&self) -> bool {
        matches!(self, WhistleError::Network(_))
    }
}

pub type WhistleResult<T> = Result<T, WhistleError>;
