//! Fake Wallet Error

use thiserror::Error;

/// JSON-RPC internal error code used for injected failures
const INTERNAL_ERROR_CODE: i64 = -32603;

/// Execution error code returned by nodes
const EXECUTION_ERROR_CODE: i64 = -32000;

/// Fake Wallet Error
#[derive(Debug, Error)]
pub enum Error {
    /// Transaction hash never submitted
    #[error("Unknown transaction `{0}`")]
    UnknownTransaction(String),
    /// Failure injected through [`FakeBehavior`](crate::FakeBehavior)
    #[error("Injected failure in `{0}`")]
    Injected(&'static str),
}

impl From<Error> for minter_common::Error {
    fn from(e: Error) -> Self {
        let code = match e {
            Error::UnknownTransaction(_) => EXECUTION_ERROR_CODE,
            Error::Injected(_) => INTERNAL_ERROR_CODE,
        };

        Self::Provider {
            code,
            message: e.to_string(),
        }
    }
}
