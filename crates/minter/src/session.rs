//! Mint session bound to a ready connection

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use minter_common::task;
use minter_common::{
    ChainId, Error, MintEvent, MintResult, MintedCount, NftContract, ProviderEvent,
};
use tokio::task::JoinHandle;
use tracing::instrument;

use crate::ConnectionManager;

/// Holds the busy flag for the duration of a mint, clearing it on every exit path
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Mint, count and listen to a collection contract
///
/// Built by the [`SessionFactory`](crate::SessionFactory) only while the connection is
/// `Ready`. At most one mint is in flight at a time.
pub struct MintSession {
    contract: Arc<dyn NftContract>,
    connection: Weak<ConnectionManager>,
    chain_id: ChainId,
    busy: Arc<AtomicBool>,
}

impl std::fmt::Debug for MintSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MintSession")
            .field("contract", self.contract.address())
            .field("chain_id", &self.chain_id)
            .field("busy", &self.is_busy())
            .finish()
    }
}

impl MintSession {
    /// Create a new session
    pub fn new(
        contract: Arc<dyn NftContract>,
        connection: Weak<ConnectionManager>,
        chain_id: ChainId,
    ) -> Self {
        Self {
            contract,
            connection,
            chain_id,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Network this session was built for
    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// Bound contract
    pub fn contract(&self) -> &Arc<dyn NftContract> {
        &self.contract
    }

    /// Whether a mint is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Mint one item
    ///
    /// Yields [`MintResult::NoIdentifier`] on any failure, including the user declining the
    /// transaction, and when another mint is already in flight.
    pub async fn mint(&self) -> MintResult {
        self.mint_event()
            .await
            .map(|event| event.token_id)
            .into()
    }

    /// Mint one item, returning the confirmation event
    #[instrument(skip(self), fields(contract = %self.contract.address()))]
    pub async fn mint_event(&self) -> Option<MintEvent> {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            tracing::warn!("Mint already in progress");
            return None;
        };

        match self.try_mint().await {
            Ok(event) => {
                tracing::info!("Minted token {} in {}", event.token_id, event.tx_hash);
                Some(event)
            }
            Err(err) if err.is_user_rejection() => {
                tracing::info!("User declined the mint transaction");
                None
            }
            Err(err) => {
                tracing::error!("Mint failed: {}", err);
                self.recheck_connection().await;
                None
            }
        }
    }

    async fn try_mint(&self) -> Result<MintEvent, Error> {
        let tx_hash = self.contract.mint().await?;
        tracing::debug!("Mint transaction {} submitted", tx_hash);

        let receipt = self.contract.wait_for_receipt(&tx_hash).await?;
        if !receipt.success {
            return Err(Error::Reverted(tx_hash));
        }

        receipt
            .minted_event(self.contract.address())
            .cloned()
            .ok_or(Error::MissingMintEvent(tx_hash))
    }

    /// Number of items minted so far, `0` when it cannot be read
    pub async fn count(&self) -> u64 {
        self.count_at()
            .await
            .map(|count| count.minted)
            .unwrap_or_default()
    }

    /// Number of items minted so far with the block it was read at
    #[instrument(skip(self), fields(contract = %self.contract.address()))]
    pub async fn count_at(&self) -> Option<MintedCount> {
        match self.contract.minted_count().await {
            Ok(count) => Some(count),
            Err(err) => {
                tracing::error!("Could not read minted count: {}", err);
                self.recheck_connection().await;
                None
            }
        }
    }

    /// Call `on_mint` for every mint of the collection, by any account
    pub fn subscribe<F>(&self, on_mint: F) -> Result<MintListener, Error>
    where
        F: Fn(MintEvent) + Send + 'static,
    {
        let mut subscription = self.contract.subscribe_minted()?;

        let handle = task::spawn(async move {
            while let Some(event) = subscription.recv().await {
                if let ProviderEvent::Minted(event) = event {
                    on_mint(event);
                }
            }
        });

        Ok(MintListener {
            handle: Some(handle),
        })
    }

    async fn recheck_connection(&self) {
        if let Some(connection) = self.connection.upgrade() {
            tracing::debug!("Re-checking connection after a failed remote call");
            connection.check_connection().await;
        }
    }
}

/// Registered mint event listener, removed on [`MintListener::unsubscribe`] or drop
#[derive(Debug)]
pub struct MintListener {
    handle: Option<JoinHandle<()>>,
}

impl MintListener {
    /// Stop listening
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Whether events are still delivered
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for MintListener {
    fn drop(&mut self) {
        self.release();
    }
}
