//! Wallet provider and contract interfaces
//!
//! Every backend (a JSON-RPC node, an in-memory fake) implements these traits. Notifications
//! flow through a [`Pubsub`](crate::pub_sub::Pubsub) of [`ProviderEvents`] and are consumed
//! as a [`Subscription`], which unsubscribes when dropped.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::pub_sub::{self, ActiveSubscription};
use crate::types::{Address, ChainId, MintEvent, MintedCount, Receipt, TxHash};
use crate::Error;

/// Topics a provider publishes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProviderTopic {
    /// Active network changed
    ChainChanged,
    /// Mint confirmation emitted by the given contract
    Minted(Address),
}

/// Notification emitted by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// Active network is now this chain
    ChainChanged(ChainId),
    /// A new item was minted, by any account
    Minted(MintEvent),
}

impl pub_sub::Event for ProviderEvent {
    type Topic = ProviderTopic;

    fn get_topics(&self) -> Vec<Self::Topic> {
        match self {
            ProviderEvent::ChainChanged(_) => vec![ProviderTopic::ChainChanged],
            ProviderEvent::Minted(event) => vec![ProviderTopic::Minted(event.contract)],
        }
    }
}

impl From<MintEvent> for ProviderEvent {
    fn from(event: MintEvent) -> Self {
        ProviderEvent::Minted(event)
    }
}

/// Topics and events of provider notifications
#[derive(Debug)]
pub struct ProviderEvents;

impl pub_sub::Spec for ProviderEvents {
    type Topic = ProviderTopic;
    type Event = ProviderEvent;
}

/// Live provider notification stream, released on drop
pub type Subscription = ActiveSubscription<ProviderEvents>;

/// Wallet injected in the session. Typically an EIP-1193 provider or a JSON-RPC node.
#[async_trait]
pub trait WalletProvider: Debug + Send + Sync {
    /// Accounts already authorized, without prompting the user
    async fn accounts(&self) -> Result<Vec<Address>, Error>;

    /// Active network
    async fn chain_id(&self) -> Result<ChainId, Error>;

    /// Prompt the user for account access
    async fn request_accounts(&self) -> Result<Vec<Address>, Error>;

    /// Network change notifications
    fn subscribe_chain_changed(&self) -> Result<Subscription, Error>;
}

/// Deployed limited-supply collection, reached through the wallet
#[async_trait]
pub trait NftContract: Debug + Send + Sync {
    /// Contract address
    fn address(&self) -> &Address;

    /// Submit a mint transaction, returning once it is signed and broadcast
    async fn mint(&self) -> Result<TxHash, Error>;

    /// Wait until the transaction is mined
    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<Receipt, Error>;

    /// Number of items minted so far, with the block it was read at
    async fn minted_count(&self) -> Result<MintedCount, Error>;

    /// Mint confirmation events of every account
    fn subscribe_minted(&self) -> Result<Subscription, Error>;
}
