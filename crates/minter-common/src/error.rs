//! Errors

use thiserror::Error;

use crate::types::TxHash;

/// EIP-1193 code returned by a wallet when the user declines a prompt
pub const USER_REJECTED_CODE: i64 = 4001;

/// JSON-RPC code for an unknown method
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;

/// Minter Error
#[derive(Debug, Error)]
pub enum Error {
    /// User declined the wallet prompt
    #[error("User rejected the request")]
    UserRejected,
    /// No account is authorized
    #[error("No accounts authorized")]
    NoAccounts,
    /// Error reported by the provider or node
    #[error("Provider error {code}: {message}")]
    Provider {
        /// Error code
        code: i64,
        /// Error message
        message: String,
    },
    /// Http transport error
    #[error("HTTP error: {1}")]
    HttpError(Option<u16>, String),
    /// Transaction was mined but reverted
    #[error("Transaction `{0}` reverted")]
    Reverted(TxHash),
    /// Receipt does not carry the mint confirmation event
    #[error("Mint event not found in receipt of `{0}`")]
    MissingMintEvent(TxHash),
    /// Invalid chain id
    #[error("Invalid chain id: `{0}`")]
    InvalidChainId(String),
    /// Log returned by the node lacks a field
    #[error("Log without {0}")]
    IncompleteLog(&'static str),
    /// Quantity does not fit in 64 bits
    #[error("Quantity overflow")]
    Overflow,
    /// ABI encoding or decoding error
    #[error(transparent)]
    Abi(#[from] alloy::sol_types::Error),
    /// Serde Json error
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    /// Pub/sub error
    #[error(transparent)]
    PubSub(#[from] crate::pub_sub::Error),
    /// Internal error
    #[error("Internal error")]
    Internal,
}

impl Error {
    /// Whether the error is the user declining a wallet prompt
    pub fn is_user_rejection(&self) -> bool {
        match self {
            Error::UserRejected => true,
            Error::Provider { code, .. } => *code == USER_REJECTED_CODE,
            _ => false,
        }
    }

    /// Build an error from a provider error object, mapping user rejections
    pub fn from_provider(code: i64, message: impl Into<String>) -> Self {
        if code == USER_REJECTED_CODE {
            return Error::UserRejected;
        }

        Error::Provider {
            code,
            message: message.into(),
        }
    }
}
