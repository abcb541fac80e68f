//! Value types shared by wallets, contracts and the mint state machine

use std::fmt;
use std::str::FromStr;

pub use alloy::primitives::{Address, TxHash, B256, U256, U64};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Network identifier as reported by `eth_chainId`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChainId(u64);

impl ChainId {
    /// Create a new chain id
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Accepts a hex quantity (`0x4`) or a decimal string
impl FromStr for ChainId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        U64::from_str(s.trim())
            .map(|id| Self(id.to::<u64>()))
            .map_err(|_| Error::InvalidChainId(s.to_string()))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ChainId::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Identifier of a minted item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub u64);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TokenId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl TryFrom<U256> for TokenId {
    type Error = Error;

    fn try_from(id: U256) -> Result<Self, Self::Error> {
        u64::try_from(id).map(Self).map_err(|_| Error::Overflow)
    }
}

/// Identity of a single emitted log, used to recognise redelivery of the same event
pub type EventId = (TxHash, u64);

/// Mint confirmation event emitted by the contract
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MintEvent {
    /// Contract that emitted the event
    pub contract: Address,
    /// Account that minted
    pub sender: Address,
    /// Newly minted item
    pub token_id: TokenId,
    /// Transaction that carried the event
    pub tx_hash: TxHash,
    /// Position of the log within the block
    pub log_index: u64,
    /// Block the transaction was included in
    pub block_number: u64,
}

impl MintEvent {
    /// Unique identity of this event
    pub fn id(&self) -> EventId {
        (self.tx_hash, self.log_index)
    }
}

/// Number of items minted as of a given block
///
/// Mint events from blocks up to `block_number` are already part of `minted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintedCount {
    /// Items minted so far
    pub minted: u64,
    /// Block the count was read at
    pub block_number: u64,
}

impl MintedCount {
    /// Whether `event` is already accounted for in this count
    pub fn includes(&self, event: &MintEvent) -> bool {
        event.block_number <= self.block_number
    }
}

/// Decoded log entry of a receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractLog {
    /// Mint confirmation event
    Minted(MintEvent),
    /// Any other log, kept for diagnostics
    Other {
        /// Emitting address
        address: Address,
        /// First topic, the event signature hash
        topic: Option<B256>,
    },
}

/// Outcome of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Block the transaction was included in
    pub block_number: u64,
    /// Whether execution succeeded
    pub success: bool,
    /// Logs emitted by the transaction
    pub logs: Vec<ContractLog>,
}

impl Receipt {
    /// First mint confirmation event emitted by `contract`
    pub fn minted_event(&self, contract: &Address) -> Option<&MintEvent> {
        self.logs.iter().find_map(|log| match log {
            ContractLog::Minted(event) if &event.contract == contract => Some(event),
            _ => None,
        })
    }
}
