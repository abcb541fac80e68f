#![cfg(test)]

use std::sync::Arc;
use std::time::Duration;

use minter_common::alloy::primitives::address;
use minter_common::{Address, ChainId};
use minter_fake_wallet::FakeWallet;
use url::Url;

use crate::{ConnectionManager, MintSession, ViewerLink};

pub const TEST_CHAIN: ChainId = ChainId::new(4);

pub const TEST_SUPPLY: u64 = 50;

pub fn test_contract() -> Address {
    address!("6b83553fbf4d05ee24d3815bf2b2ebc4c28f8f0d")
}

pub fn test_viewer() -> ViewerLink {
    ViewerLink::new(
        Url::parse("https://testnets.opensea.io/assets").expect("valid url"),
        test_contract(),
    )
}

pub fn fake_wallet(minted: u64) -> FakeWallet {
    FakeWallet::new(TEST_CHAIN, test_contract(), TEST_SUPPLY).with_minted(minted)
}

pub async fn ready_session(wallet: &FakeWallet) -> (Arc<ConnectionManager>, Arc<MintSession>) {
    let manager = ConnectionManager::new(Some(Arc::new(wallet.clone())), TEST_CHAIN);
    assert!(manager.start().await.is_ready());

    let session = Arc::new(MintSession::new(
        Arc::new(wallet.clone()),
        Arc::downgrade(&manager),
        TEST_CHAIN,
    ));

    (manager, session)
}

/// Poll `condition` until it holds, panicking after a few seconds
pub async fn wait_until<F>(condition: F)
where
    F: Fn() -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
