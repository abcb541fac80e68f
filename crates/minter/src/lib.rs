//! Wallet connection and limited-supply mint orchestration
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod connection;
pub mod dapp;
pub mod error;
pub mod factory;
pub mod panel;
#[cfg(feature = "rpc")]
pub mod rpc;
pub mod session;
pub mod viewer;

mod test_utils;

pub use connection::ConnectionManager;
pub use dapp::{Dapp, MintSettings, Screen};
pub use error::Error;
pub use factory::{ContractBinder, SessionFactory};
#[doc(hidden)]
pub use minter_common::{
    Address, ChainId, ConnectionStatus, MintEvent, MintResult, NftContract, TokenId,
    WalletProvider,
};
pub use panel::{MintPanel, MintState};
pub use session::{MintListener, MintSession};
pub use viewer::ViewerLink;
