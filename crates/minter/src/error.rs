//! Errors
//!
//! Every backend reports failures through the shared [`Error`] of `minter-common`. The state
//! machine itself never returns them: it logs and falls back to a safe default.

pub use minter_common::error::{Error, METHOD_NOT_FOUND_CODE, USER_REJECTED_CODE};
