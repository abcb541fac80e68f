//! Minter shared types and traits.
//!
//! This crate is the base foundation to build things that can interact with the Minter Kit and
//! its internal crates.
//!
//! It contains the value types, the wallet and contract traits implemented by every backend,
//! and the publish-subscribe hub used to fan out provider notifications.

pub mod connection;
pub mod error;
pub mod provider;
pub mod pub_sub;
pub mod task;
pub mod types;

pub use connection::{ConnectionStatus, MintResult};
pub use error::Error;
pub use provider::{
    NftContract, ProviderEvent, ProviderEvents, ProviderTopic, Subscription, WalletProvider,
};
pub use types::{
    Address, ChainId, ContractLog, EventId, MintEvent, MintedCount, Receipt, TokenId, TxHash,
};
// re-exporting external crates
pub use {alloy, parking_lot};
