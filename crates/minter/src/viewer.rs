//! Links to minted items on a marketplace

use minter_common::{Address, TokenId};
use url::Url;

/// Builds `<marketplace-base>/<contract-address>/<token-id>` links
///
/// The marketplace is never contacted, the link is not validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerLink {
    base: Url,
    contract: Address,
}

impl ViewerLink {
    /// Create a new link builder
    pub fn new(base: Url, contract: Address) -> Self {
        Self { base, contract }
    }

    /// Link to an item of the collection
    pub fn item_url(&self, token_id: TokenId) -> Option<Url> {
        let link = format!(
            "{}/{}/{}",
            self.base.as_str().trim_end_matches('/'),
            self.contract,
            token_id
        );

        Url::parse(&link)
            .inspect_err(|err| tracing::warn!("Invalid item link {}: {}", link, err))
            .ok()
    }
}
