//! Minter Fake Wallet
//!
//! Used for testing where the wallet, the network and the collection contract all live in
//! memory. Transactions are mined right away unless [`FakeBehavior::hold_transactions`] is set,
//! in which case they stay pending until [`FakeWallet::mine`] is called.

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use minter_common::alloy::primitives::{b256, B256};
use minter_common::parking_lot::Mutex;
use minter_common::pub_sub::Pubsub;
use minter_common::{
    Address, ChainId, ContractLog, MintEvent, MintedCount, NftContract, ProviderEvent,
    ProviderEvents, ProviderTopic, Receipt, Subscription, TokenId, TxHash, WalletProvider,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::instrument;

pub mod error;

use error::Error;

/// ERC-721 `Transfer(address,address,uint256)` topic, emitted next to the mint event
const TRANSFER_TOPIC: B256 =
    b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");

/// Struct for signaling how the fake wallet should respond
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FakeBehavior {
    /// Decline the account access prompt
    pub reject_connect: bool,
    /// Decline the transaction signing prompt
    pub reject_signing: bool,
    /// Fail the mint submission with a provider error
    pub fail_mint: bool,
    /// Fail minted count queries
    pub fail_count: bool,
    /// Fail account queries
    pub fail_accounts: bool,
    /// Fail network queries
    pub fail_chain_id: bool,
    /// Keep transactions pending until [`FakeWallet::mine`]
    pub hold_transactions: bool,
}

#[derive(Debug)]
struct ChainState {
    chain_id: ChainId,
    accounts: Vec<Address>,
    authorized: bool,
    behavior: FakeBehavior,
    total_supply: u64,
    minted: u64,
    nonce: u64,
    block_number: u64,
    pending: Vec<Receipt>,
    receipts: HashMap<TxHash, Receipt>,
}

/// Fake Wallet
#[derive(Clone)]
pub struct FakeWallet {
    contract: Address,
    state: Arc<Mutex<ChainState>>,
    events: Arc<Pubsub<ProviderEvents>>,
    blocks: Arc<watch::Sender<u64>>,
    account_queries: Arc<AtomicUsize>,
    mint_submissions: Arc<AtomicUsize>,
}

impl std::fmt::Debug for FakeWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FakeWallet")
            .field("contract", &self.contract)
            .field("chain_id", &state.chain_id)
            .field("authorized", &state.authorized)
            .field("minted", &state.minted)
            .finish()
    }
}

impl FakeWallet {
    /// Create new [`FakeWallet`] with one account that has not granted access yet
    pub fn new(chain_id: ChainId, contract: Address, total_supply: u64) -> Self {
        let (blocks, _) = watch::channel(0);

        Self {
            contract,
            state: Arc::new(Mutex::new(ChainState {
                chain_id,
                accounts: vec![Address::repeat_byte(0x11)],
                authorized: false,
                behavior: FakeBehavior::default(),
                total_supply,
                minted: 0,
                nonce: 0,
                block_number: 0,
                pending: Vec::new(),
                receipts: HashMap::new(),
            })),
            events: Arc::new(Pubsub::new()),
            blocks: Arc::new(blocks),
            account_queries: Arc::new(AtomicUsize::new(0)),
            mint_submissions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Mark the wallet accounts as already authorized
    pub fn with_authorized(self) -> Self {
        self.state.lock().authorized = true;
        self
    }

    /// Start with `minted` items already minted
    pub fn with_minted(self, minted: u64) -> Self {
        {
            let mut state = self.state.lock();
            state.minted = minted.min(state.total_supply);
        }
        self
    }

    /// Update the response behavior in place
    pub fn update_behavior(&self, update: impl FnOnce(&mut FakeBehavior)) {
        update(&mut self.state.lock().behavior);
    }

    /// Revoke account access, as the user would from the wallet settings
    pub fn revoke(&self) {
        self.state.lock().authorized = false;
    }

    /// Switch the active network and notify listeners
    pub fn switch_chain(&self, chain_id: ChainId) {
        self.state.lock().chain_id = chain_id;
        tracing::debug!("Fake wallet switched to chain {}", chain_id);

        if let Err(err) = self
            .events
            .publish_now(ProviderEvent::ChainChanged(chain_id))
        {
            tracing::error!("Could not publish chain change: {}", err);
        }
    }

    /// Items minted so far, held transactions included
    pub fn minted(&self) -> u64 {
        self.state.lock().minted
    }

    /// How many times accounts were queried without prompting
    pub fn account_queries(&self) -> usize {
        self.account_queries.load(Ordering::SeqCst)
    }

    /// How many mint transactions reached the wallet
    pub fn mint_submissions(&self) -> usize {
        self.mint_submissions.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions on this wallet
    pub fn active_subscribers(&self) -> usize {
        self.events.active_subscribers()
    }

    /// Whether someone listens to network changes
    pub fn has_chain_listeners(&self) -> bool {
        self.events.has_listeners(&ProviderTopic::ChainChanged)
    }

    /// Whether someone listens to mint events of the collection
    pub fn has_mint_listeners(&self) -> bool {
        self.events
            .has_listeners(&ProviderTopic::Minted(self.contract))
    }

    /// Mint on behalf of another account, as a concurrent user would
    pub fn mint_from(&self, sender: Address) -> Option<MintEvent> {
        let receipt = {
            let mut state = self.state.lock();
            state.block_number += 1;
            let block_number = state.block_number;
            let receipt = Self::execute_mint(&mut state, self.contract, sender, block_number);
            state.receipts.insert(receipt.tx_hash, receipt.clone());
            receipt
        };

        self.announce(&receipt);
        receipt.minted_event(&self.contract).cloned()
    }

    /// Deliver an already announced event again, as providers do after reconnecting
    pub fn redeliver(&self, event: MintEvent) {
        if let Err(err) = self.events.publish_now(event) {
            tracing::error!("Could not redeliver mint event: {}", err);
        }
    }

    /// Mine every pending transaction
    pub fn mine(&self) {
        let mined = {
            let mut state = self.state.lock();
            let pending = std::mem::take(&mut state.pending);
            state.block_number += 1;
            let block_number = state.block_number;

            pending
                .into_iter()
                .map(|mut receipt| {
                    receipt.block_number = block_number;
                    for log in receipt.logs.iter_mut() {
                        if let ContractLog::Minted(event) = log {
                            event.block_number = block_number;
                        }
                    }
                    state.receipts.insert(receipt.tx_hash, receipt.clone());
                    receipt
                })
                .collect::<Vec<_>>()
        };

        for receipt in mined.iter() {
            self.announce(receipt);
        }
    }

    fn announce(&self, receipt: &Receipt) {
        let block_number = self.state.lock().block_number;
        self.blocks.send_replace(block_number);

        if let Some(event) = receipt.minted_event(&self.contract) {
            if let Err(err) = self.events.publish_now(event.clone()) {
                tracing::error!("Could not publish mint event: {}", err);
            }
        }
    }

    /// Items whose transaction is mined
    fn mined_count(state: &ChainState) -> u64 {
        let held = state.pending.iter().filter(|receipt| receipt.success).count() as u64;
        state.minted - held
    }

    fn execute_mint(
        state: &mut ChainState,
        contract: Address,
        sender: Address,
        block_number: u64,
    ) -> Receipt {
        state.nonce += 1;
        let tx_hash = TxHash::left_padding_from(&state.nonce.to_be_bytes());

        if state.minted >= state.total_supply {
            tracing::debug!("Fake mint {} reverted, supply exhausted", tx_hash);
            return Receipt {
                tx_hash,
                block_number,
                success: false,
                logs: vec![],
            };
        }

        let token_id = TokenId(state.minted);
        state.minted += 1;

        Receipt {
            tx_hash,
            block_number,
            success: true,
            logs: vec![
                ContractLog::Other {
                    address: contract,
                    topic: Some(TRANSFER_TOPIC),
                },
                ContractLog::Minted(MintEvent {
                    contract,
                    sender,
                    token_id,
                    tx_hash,
                    log_index: 1,
                    block_number,
                }),
            ],
        }
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    #[instrument(skip(self))]
    async fn accounts(&self) -> Result<Vec<Address>, minter_common::Error> {
        self.account_queries.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock();

        if state.behavior.fail_accounts {
            return Err(Error::Injected("eth_accounts").into());
        }

        Ok(if state.authorized {
            state.accounts.clone()
        } else {
            vec![]
        })
    }

    #[instrument(skip(self))]
    async fn chain_id(&self) -> Result<ChainId, minter_common::Error> {
        let state = self.state.lock();

        if state.behavior.fail_chain_id {
            return Err(Error::Injected("eth_chainId").into());
        }

        Ok(state.chain_id)
    }

    #[instrument(skip(self))]
    async fn request_accounts(&self) -> Result<Vec<Address>, minter_common::Error> {
        let mut state = self.state.lock();

        if state.behavior.reject_connect {
            return Err(minter_common::Error::UserRejected);
        }

        state.authorized = true;
        Ok(state.accounts.clone())
    }

    fn subscribe_chain_changed(&self) -> Result<Subscription, minter_common::Error> {
        Ok(self.events.subscribe(vec![ProviderTopic::ChainChanged])?)
    }
}

#[async_trait]
impl NftContract for FakeWallet {
    fn address(&self) -> &Address {
        &self.contract
    }

    #[instrument(skip(self))]
    async fn mint(&self) -> Result<TxHash, minter_common::Error> {
        self.mint_submissions.fetch_add(1, Ordering::SeqCst);

        let receipt = {
            let mut state = self.state.lock();

            if !state.authorized {
                return Err(minter_common::Error::NoAccounts);
            }
            if state.behavior.reject_signing {
                return Err(minter_common::Error::UserRejected);
            }
            if state.behavior.fail_mint {
                return Err(Error::Injected("eth_sendTransaction").into());
            }

            let sender = state
                .accounts
                .first()
                .copied()
                .ok_or(minter_common::Error::NoAccounts)?;

            if state.behavior.hold_transactions {
                // Block assigned by `mine`
                let receipt = Self::execute_mint(&mut state, self.contract, sender, 0);
                state.pending.push(receipt.clone());
                return Ok(receipt.tx_hash);
            }

            state.block_number += 1;
            let block_number = state.block_number;
            let receipt = Self::execute_mint(&mut state, self.contract, sender, block_number);
            state.receipts.insert(receipt.tx_hash, receipt.clone());
            receipt
        };

        self.announce(&receipt);
        Ok(receipt.tx_hash)
    }

    #[instrument(skip(self))]
    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<Receipt, minter_common::Error> {
        let mut blocks = self.blocks.subscribe();

        loop {
            {
                let state = self.state.lock();
                if let Some(receipt) = state.receipts.get(tx_hash) {
                    return Ok(receipt.clone());
                }
                if !state.pending.iter().any(|r| &r.tx_hash == tx_hash) {
                    return Err(Error::UnknownTransaction(tx_hash.to_string()).into());
                }
            }

            blocks
                .changed()
                .await
                .map_err(|_| minter_common::Error::Internal)?;
        }
    }

    #[instrument(skip(self))]
    async fn minted_count(&self) -> Result<MintedCount, minter_common::Error> {
        let state = self.state.lock();

        if state.behavior.fail_count {
            return Err(Error::Injected("eth_call").into());
        }

        Ok(MintedCount {
            minted: Self::mined_count(&state),
            block_number: state.block_number,
        })
    }

    fn subscribe_minted(&self) -> Result<Subscription, minter_common::Error> {
        Ok(self
            .events
            .subscribe(vec![ProviderTopic::Minted(self.contract)])?)
    }
}
