//! End-to-end mint flows against the in-memory wallet

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use minter::{
    Address, ChainId, ConnectionStatus, Dapp, MintResult, MintSettings, NftContract, Screen,
    TokenId, ViewerLink, WalletProvider,
};
use minter_fake_wallet::FakeWallet;
use url::Url;

const RINKEBY: ChainId = ChainId::new(4);
const MAINNET: ChainId = ChainId::new(1);
const SUPPLY: u64 = 50;

fn contract_address() -> Address {
    Address::from_str("0x6b83553fbf4D05ee24d3815Bf2B2eBC4c28f8F0D").unwrap()
}

fn viewer() -> ViewerLink {
    ViewerLink::new(
        Url::parse("https://testnets.opensea.io/assets").unwrap(),
        contract_address(),
    )
}

fn wallet(minted: u64) -> FakeWallet {
    FakeWallet::new(RINKEBY, contract_address(), SUPPLY).with_minted(minted)
}

fn dapp(wallet: &FakeWallet) -> Arc<Dapp> {
    let provider: Arc<dyn WalletProvider> = Arc::new(wallet.clone());
    let contract: Arc<dyn NftContract> = Arc::new(wallet.clone());

    Dapp::new(
        Some(provider),
        move || Ok(contract.clone()),
        MintSettings {
            required_chain: RINKEBY,
            total_supply: SUPPLY,
            viewer: viewer(),
        },
    )
}

fn mint_screen(dapp: &Dapp) -> minter::MintState {
    match dapp.screen() {
        Screen::Mint(state) => state,
        other => panic!("expected the mint screen, got {other:?}"),
    }
}

async fn wait_until<F>(condition: F)
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

#[tokio::test]
async fn two_left_is_urgent() {
    let wallet = wallet(48).with_authorized();
    let dapp = dapp(&wallet);
    dapp.start().await;

    let state = mint_screen(&dapp);
    assert_eq!(state.remaining, Some(2));
    assert!(state.can_mint());
    assert_eq!(state.availability().as_deref(), Some("Only 2 tokens left!"));
}

#[tokio::test]
async fn minting_the_last_item_sells_out() {
    let wallet = wallet(SUPPLY - 1).with_authorized();
    let dapp = dapp(&wallet);
    dapp.start().await;
    assert_eq!(mint_screen(&dapp).remaining, Some(1));

    let result = dapp.mint().await;
    assert_eq!(result, MintResult::Minted(TokenId(SUPPLY - 1)));

    let state = mint_screen(&dapp);
    assert_eq!(state.remaining, Some(0));
    assert!(!state.busy);
    assert!(!state.can_mint());
    assert!(state.is_sold_out());
    assert_eq!(
        state.last_minted_url.map(|url| url.to_string()),
        Some(format!(
            "https://testnets.opensea.io/assets/{}/{}",
            contract_address(),
            SUPPLY - 1
        ))
    );
    assert!(dapp
        .screen()
        .to_string()
        .contains("We ran out of tokens! Sorry!"));
}

#[tokio::test]
async fn declined_signature_changes_nothing() {
    let wallet = wallet(30).with_authorized();
    let dapp = dapp(&wallet);
    dapp.start().await;
    wallet.update_behavior(|b| b.reject_signing = true);
    let queries = wallet.account_queries();

    assert_eq!(dapp.mint().await, MintResult::NoIdentifier);

    let state = mint_screen(&dapp);
    assert!(!state.busy);
    assert_eq!(state.last_minted_url, None);
    assert_eq!(state.remaining, Some(20));
    assert_eq!(wallet.account_queries(), queries);
    assert!(dapp.connection().status().is_ready());
}

#[tokio::test]
async fn failed_mint_clears_previous_link() {
    let wallet = wallet(0).with_authorized();
    let dapp = dapp(&wallet);
    dapp.start().await;

    assert!(dapp.mint().await.token_id().is_some());
    assert!(mint_screen(&dapp).last_minted_url.is_some());

    wallet.update_behavior(|b| b.fail_mint = true);
    assert_eq!(dapp.mint().await, MintResult::NoIdentifier);
    assert_eq!(mint_screen(&dapp).last_minted_url, None);
}

#[tokio::test]
async fn leaving_the_network_hides_minting() {
    let wallet = wallet(0).with_authorized();
    let dapp = dapp(&wallet);
    dapp.start().await;
    assert!(dapp.panel().is_some());

    wallet.switch_chain(MAINNET);
    wait_until(|| dapp.panel().is_none()).await;

    assert_eq!(
        dapp.connection().status(),
        ConnectionStatus::WrongNetwork { chain_id: MAINNET }
    );
    assert_eq!(
        dapp.screen(),
        Screen::WrongNetwork {
            chain_id: MAINNET,
            required: RINKEBY,
        }
    );
    assert_eq!(dapp.mint().await, MintResult::NoIdentifier);
    wait_until(|| !wallet.has_mint_listeners()).await;
    assert_eq!(wallet.mint_submissions(), 0);
}

#[tokio::test]
async fn redelivered_events_count_once() {
    let wallet = wallet(10).with_authorized();
    let dapp = dapp(&wallet);
    dapp.start().await;

    let first = wallet.mint_from(Address::repeat_byte(0x22)).unwrap();
    wallet.mint_from(Address::repeat_byte(0x33));
    wait_until(|| mint_screen(&dapp).remaining == Some(38)).await;

    wallet.redeliver(first);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(mint_screen(&dapp).remaining, Some(38));
}

#[tokio::test]
async fn other_users_keep_the_counter_live() {
    let wallet = wallet(45).with_authorized();
    let dapp = dapp(&wallet);
    dapp.start().await;

    for sender in 0..5u8 {
        wallet.mint_from(Address::repeat_byte(sender + 0x40));
    }

    wait_until(|| mint_screen(&dapp).is_sold_out()).await;
    assert!(!mint_screen(&dapp).can_mint());
}

#[tokio::test]
async fn connect_flow() {
    let wallet = wallet(0);
    let dapp = dapp(&wallet);

    assert_eq!(dapp.start().await, Screen::Connect);
    assert_eq!(dapp.screen().to_string(), "Connect to Wallet");

    let Screen::Mint(state) = dapp.connect().await else {
        panic!("expected the mint screen after connecting");
    };
    assert_eq!(state.remaining, Some(SUPPLY));
    assert!(state.can_mint());
}
