//! Connection status and mint outcome

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ChainId, TokenId};

/// State of the wallet connection
///
/// Exactly one variant holds at a time. It only changes through an explicit check of the
/// wallet provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Not checked yet
    #[default]
    Unknown,
    /// No wallet provider installed
    NoWallet,
    /// Wallet present but no account access granted
    Unauthorized,
    /// Authorized on a network other than the required one
    WrongNetwork {
        /// Active network
        chain_id: ChainId,
    },
    /// Authorized on the required network
    Ready {
        /// Active network
        chain_id: ChainId,
    },
}

impl ConnectionStatus {
    /// Whether minting is possible
    pub fn is_ready(&self) -> bool {
        matches!(self, ConnectionStatus::Ready { .. })
    }

    /// Whether the user already granted account access
    pub fn is_authorized(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Ready { .. } | ConnectionStatus::WrongNetwork { .. }
        )
    }

    /// Active network, once authorized
    pub fn chain_id(&self) -> Option<ChainId> {
        match self {
            ConnectionStatus::Ready { chain_id } | ConnectionStatus::WrongNetwork { chain_id } => {
                Some(*chain_id)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Unknown => write!(f, "unknown"),
            ConnectionStatus::NoWallet => write!(f, "no wallet"),
            ConnectionStatus::Unauthorized => write!(f, "unauthorized"),
            ConnectionStatus::WrongNetwork { chain_id } => write!(f, "wrong network ({chain_id})"),
            ConnectionStatus::Ready { chain_id } => write!(f, "ready ({chain_id})"),
        }
    }
}

/// Outcome of a mint request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MintResult {
    /// Item minted with this identifier
    Minted(TokenId),
    /// Mint failed or was declined
    NoIdentifier,
}

impl MintResult {
    /// Minted identifier, if any
    pub fn token_id(&self) -> Option<TokenId> {
        match self {
            MintResult::Minted(token_id) => Some(*token_id),
            MintResult::NoIdentifier => None,
        }
    }
}

impl From<Option<TokenId>> for MintResult {
    fn from(value: Option<TokenId>) -> Self {
        value.map_or(MintResult::NoIdentifier, MintResult::Minted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_helpers() {
        let chain = ChainId::new(4);
        assert!(ConnectionStatus::Ready { chain_id: chain }.is_ready());
        assert!(ConnectionStatus::WrongNetwork { chain_id: chain }.is_authorized());
        assert!(!ConnectionStatus::Unauthorized.is_authorized());
        assert_eq!(ConnectionStatus::NoWallet.chain_id(), None);
        assert_eq!(
            ConnectionStatus::WrongNetwork { chain_id: chain }.chain_id(),
            Some(chain)
        );
    }

    #[test]
    fn test_status_serialization() {
        let status = ConnectionStatus::Ready {
            chain_id: ChainId::new(4),
        };
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, r#"{"status":"ready","chain_id":"0x4"}"#);
        assert_eq!(
            serde_json::from_str::<ConnectionStatus>(r#"{"status":"no_wallet"}"#).unwrap(),
            ConnectionStatus::NoWallet
        );
    }

    #[test]
    fn test_mint_result_from_option() {
        assert_eq!(
            MintResult::from(Some(TokenId(77))),
            MintResult::Minted(TokenId(77))
        );
        assert_eq!(MintResult::from(None), MintResult::NoIdentifier);
        assert_eq!(MintResult::NoIdentifier.token_id(), None);
    }
}
