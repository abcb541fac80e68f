use std::sync::Arc;

use anyhow::{bail, Result};
use minter::rpc::{JsonRpcClient, RpcNftContract};
use minter::{Dapp, MintSettings, NftContract, ViewerLink, WalletProvider};
use url::Url;

use crate::config::{Backend, Settings};

/// Build the session for the configured backend
pub fn dapp(settings: &Settings) -> Result<Arc<Dapp>> {
    if settings.contract.total_supply == 0 {
        bail!("Total supply must be set");
    }
    if settings.network.poll_interval_ms == 0 {
        bail!("Poll interval must be at least 1 ms");
    }

    let mint_settings = MintSettings {
        required_chain: settings.network.chain_id,
        total_supply: settings.contract.total_supply,
        viewer: ViewerLink::new(
            Url::parse(&settings.viewer.base)?,
            settings.contract.address,
        ),
    };

    let (provider, contract): (Arc<dyn WalletProvider>, Arc<dyn NftContract>) =
        match settings.backend {
            Backend::JsonRpc => {
                let client = JsonRpcClient::new(Url::parse(&settings.network.rpc_url)?)
                    .with_poll_interval(settings.network.poll_interval());
                let contract = RpcNftContract::new(client.clone(), settings.contract.address);

                tracing::info!("Using JSON-RPC node at {}", client.endpoint());
                (Arc::new(client), Arc::new(contract))
            }
            #[cfg(feature = "fakewallet")]
            Backend::FakeWallet => {
                let mut wallet = minter_fake_wallet::FakeWallet::new(
                    settings.network.chain_id,
                    settings.contract.address,
                    settings.contract.total_supply,
                )
                .with_minted(settings.fake_wallet.minted);
                if settings.fake_wallet.authorized {
                    wallet = wallet.with_authorized();
                }

                tracing::info!("Using in-memory fake wallet");
                (Arc::new(wallet.clone()), Arc::new(wallet))
            }
            #[cfg(not(feature = "fakewallet"))]
            Backend::FakeWallet => bail!("Built without the fakewallet backend"),
        };

    Ok(Dapp::new(
        Some(provider),
        move || Ok(contract.clone()),
        mint_settings,
    ))
}
