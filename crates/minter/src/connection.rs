//! Wallet connection tracking
//!
//! The [`ConnectionManager`] is the single source of truth of the [`ConnectionStatus`]. It
//! only moves through explicit checks of the wallet: on start, when the user asks to connect
//! and whenever the wallet reports a network change.

use std::sync::Arc;

use minter_common::parking_lot::Mutex;
use minter_common::task;
use minter_common::{ChainId, ConnectionStatus, ProviderEvent, WalletProvider};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::instrument;

/// Tracks wallet presence, account authorization and the active network
pub struct ConnectionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    required_chain: ChainId,
    status: watch::Sender<ConnectionStatus>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("has_provider", &self.provider.is_some())
            .field("required_chain", &self.required_chain)
            .field("status", &*self.status.borrow())
            .field("listening", &self.listener.lock().is_some())
            .finish()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl ConnectionManager {
    /// Create a new manager. `None` means no wallet is installed.
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, required_chain: ChainId) -> Arc<Self> {
        let (status, _) = watch::channel(ConnectionStatus::Unknown);

        Arc::new(Self {
            provider,
            required_chain,
            status,
            listener: Mutex::new(None),
        })
    }

    /// Network minting requires
    pub fn required_chain(&self) -> ChainId {
        self.required_chain
    }

    /// Last published status
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Receiver notified on every status change
    pub fn watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Whether the network change listener is running
    pub fn is_listening(&self) -> bool {
        self.listener
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Run the initial check and listen to network changes until [`Self::shutdown`]
    pub async fn start(self: &Arc<Self>) -> ConnectionStatus {
        self.listen();
        self.check_connection().await
    }

    /// Stop listening to network changes
    pub fn shutdown(&self) {
        if let Some(handle) = self.listener.lock().take() {
            tracing::debug!("Releasing network change listener");
            handle.abort();
        }
    }

    /// Query the wallet without prompting and publish the resulting status
    ///
    /// Never fails: a missing wallet is `NoWallet` and unreadable accounts are treated as not
    /// authorized. An unreadable network keeps an authorized status as it was.
    #[instrument(skip(self))]
    pub async fn check_connection(&self) -> ConnectionStatus {
        let status = self.query_status().await;
        self.publish(status);
        status
    }

    /// Prompt the user for account access
    ///
    /// Only acts while `Unauthorized`; in any other state the current status is returned
    /// untouched. A declined prompt leaves the status unchanged.
    #[instrument(skip(self))]
    pub async fn request_connect(&self) -> ConnectionStatus {
        let current = self.status();
        if current != ConnectionStatus::Unauthorized {
            tracing::debug!("Ignoring connect request while {}", current);
            return current;
        }

        let Some(provider) = self.provider.as_ref() else {
            return current;
        };

        match provider.request_accounts().await {
            Ok(accounts) if accounts.is_empty() => {
                tracing::warn!("Wallet granted access to no account");
                current
            }
            Ok(accounts) => {
                tracing::info!("Wallet authorized {} account(s)", accounts.len());
                let status = self.query_network(provider.as_ref()).await;
                self.publish(status);
                status
            }
            Err(err) if err.is_user_rejection() => {
                tracing::info!("User declined account access");
                current
            }
            Err(err) => {
                tracing::error!("Could not request accounts: {}", err);
                current
            }
        }
    }

    async fn query_status(&self) -> ConnectionStatus {
        let Some(provider) = self.provider.as_ref() else {
            return ConnectionStatus::NoWallet;
        };

        match provider.accounts().await {
            Ok(accounts) if accounts.is_empty() => ConnectionStatus::Unauthorized,
            Ok(_) => self.query_network(provider.as_ref()).await,
            Err(err) => {
                tracing::warn!("Could not read authorized accounts: {}", err);
                ConnectionStatus::Unauthorized
            }
        }
    }

    async fn query_network(&self, provider: &dyn WalletProvider) -> ConnectionStatus {
        match provider.chain_id().await {
            Ok(chain_id) if chain_id == self.required_chain => ConnectionStatus::Ready { chain_id },
            Ok(chain_id) => ConnectionStatus::WrongNetwork { chain_id },
            Err(err) => {
                let current = self.status();
                tracing::warn!("Could not read active network while {}: {}", current, err);

                if current.is_authorized() {
                    current
                } else {
                    ConnectionStatus::Unauthorized
                }
            }
        }
    }

    fn publish(&self, status: ConnectionStatus) {
        self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }

            tracing::info!("Connection status {} -> {}", current, status);
            *current = status;
            true
        });
    }

    /// Subscribe once to network change notifications
    fn listen(self: &Arc<Self>) {
        let mut listener = self.listener.lock();
        if listener.is_some() {
            return;
        }

        let Some(provider) = self.provider.as_ref() else {
            return;
        };

        let mut subscription = match provider.subscribe_chain_changed() {
            Ok(subscription) => subscription,
            Err(err) => {
                tracing::error!("Could not subscribe to network changes: {}", err);
                return;
            }
        };

        let manager = Arc::downgrade(self);
        *listener = Some(task::spawn(async move {
            while let Some(event) = subscription.recv().await {
                let ProviderEvent::ChainChanged(chain_id) = event else {
                    continue;
                };
                let Some(manager) = manager.upgrade() else {
                    break;
                };

                tracing::debug!("Wallet switched to network {}", chain_id);
                manager.check_connection().await;
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use minter_common::Error;
    use minter_fake_wallet::FakeWallet;

    use super::*;
    use crate::test_utils::{fake_wallet, wait_until, TEST_CHAIN};

    fn manager(wallet: &FakeWallet) -> Arc<ConnectionManager> {
        ConnectionManager::new(Some(Arc::new(wallet.clone())), TEST_CHAIN)
    }

    #[tokio::test]
    async fn test_no_wallet() {
        let manager = ConnectionManager::new(None, TEST_CHAIN);
        assert_eq!(manager.status(), ConnectionStatus::Unknown);
        assert_eq!(manager.start().await, ConnectionStatus::NoWallet);
        assert_eq!(manager.request_connect().await, ConnectionStatus::NoWallet);
        assert!(!manager.is_listening());
    }

    #[tokio::test]
    async fn test_zero_accounts_is_unauthorized() {
        let wallet = fake_wallet(0);
        let manager = manager(&wallet);

        assert_eq!(manager.check_connection().await, ConnectionStatus::Unauthorized);

        wallet.switch_chain(ChainId::new(1));
        assert_eq!(manager.check_connection().await, ConnectionStatus::Unauthorized);
    }

    #[tokio::test]
    async fn test_authorized_on_required_chain() {
        let wallet = fake_wallet(0).with_authorized();
        let manager = manager(&wallet);

        assert_eq!(
            manager.start().await,
            ConnectionStatus::Ready {
                chain_id: TEST_CHAIN
            }
        );
        assert!(manager.is_listening());
    }

    #[tokio::test]
    async fn test_authorized_on_other_chain() {
        let wallet = fake_wallet(0).with_authorized();
        wallet.switch_chain(ChainId::new(1));
        let manager = manager(&wallet);

        assert_eq!(
            manager.check_connection().await,
            ConnectionStatus::WrongNetwork {
                chain_id: ChainId::new(1)
            }
        );
    }

    #[tokio::test]
    async fn test_connect() {
        let wallet = fake_wallet(0);
        let manager = manager(&wallet);
        manager.start().await;

        assert_eq!(
            manager.request_connect().await,
            ConnectionStatus::Ready {
                chain_id: TEST_CHAIN
            }
        );
    }

    #[tokio::test]
    async fn test_connect_is_noop_once_authorized() {
        let wallet = fake_wallet(0).with_authorized();
        wallet.update_behavior(|b| b.reject_connect = true);
        let manager = manager(&wallet);

        let ready = manager.start().await;
        assert!(ready.is_ready());
        assert_eq!(manager.request_connect().await, ready);

        wallet.switch_chain(ChainId::new(1));
        let wrong = manager.check_connection().await;
        assert_eq!(
            wrong,
            ConnectionStatus::WrongNetwork {
                chain_id: ChainId::new(1)
            }
        );
        assert_eq!(manager.request_connect().await, wrong);
    }

    #[tokio::test]
    async fn test_declined_connect_leaves_status() {
        let wallet = fake_wallet(0);
        wallet.update_behavior(|b| b.reject_connect = true);
        let manager = manager(&wallet);
        manager.start().await;

        assert_eq!(manager.request_connect().await, ConnectionStatus::Unauthorized);
        assert_eq!(manager.status(), ConnectionStatus::Unauthorized);
    }

    #[tokio::test]
    async fn test_unreadable_wallet_fails_soft() {
        let wallet = fake_wallet(0).with_authorized();
        wallet.update_behavior(|b| b.fail_accounts = true);
        let manager = manager(&wallet);

        assert_eq!(manager.start().await, ConnectionStatus::Unauthorized);
        assert!(wallet.accounts().await.is_err_and(|e| matches!(e, Error::Provider { .. })));
    }

    #[tokio::test]
    async fn test_unreadable_network_keeps_status() {
        let wallet = fake_wallet(0).with_authorized();
        let manager = manager(&wallet);
        let ready = manager.start().await;
        assert!(ready.is_ready());

        wallet.update_behavior(|b| b.fail_chain_id = true);
        assert_eq!(manager.check_connection().await, ready);

        wallet.update_behavior(|b| b.fail_chain_id = false);
        wallet.switch_chain(ChainId::new(1));
        wait_until(|| !manager.status().is_ready()).await;

        wallet.update_behavior(|b| b.fail_chain_id = true);
        assert_eq!(
            manager.check_connection().await,
            ConnectionStatus::WrongNetwork {
                chain_id: ChainId::new(1)
            }
        );
    }

    #[tokio::test]
    async fn test_unreadable_network_before_authorization() {
        let wallet = fake_wallet(0).with_authorized();
        wallet.update_behavior(|b| b.fail_chain_id = true);
        let manager = manager(&wallet);

        assert_eq!(manager.start().await, ConnectionStatus::Unauthorized);
    }

    #[tokio::test]
    async fn test_revoked_access_is_seen_on_repeated_network() {
        let wallet = fake_wallet(0).with_authorized();
        let manager = manager(&wallet);
        let mut status = manager.watch();
        manager.start().await;
        status.borrow_and_update();

        wallet.switch_chain(ChainId::new(1));
        status.changed().await.unwrap();
        assert_eq!(
            *status.borrow_and_update(),
            ConnectionStatus::WrongNetwork {
                chain_id: ChainId::new(1)
            }
        );

        wallet.revoke();
        wallet.switch_chain(ChainId::new(1));
        status.changed().await.unwrap();
        assert_eq!(*status.borrow_and_update(), ConnectionStatus::Unauthorized);
    }

    #[tokio::test]
    async fn test_network_change_notifications() {
        let wallet = fake_wallet(0).with_authorized();
        let manager = manager(&wallet);
        let mut status = manager.watch();
        manager.start().await;
        status.borrow_and_update();

        wallet.switch_chain(ChainId::new(1));
        status.changed().await.unwrap();
        assert_eq!(
            *status.borrow_and_update(),
            ConnectionStatus::WrongNetwork {
                chain_id: ChainId::new(1)
            }
        );

        wallet.switch_chain(TEST_CHAIN);
        status.changed().await.unwrap();
        assert_eq!(
            *status.borrow_and_update(),
            ConnectionStatus::Ready {
                chain_id: TEST_CHAIN
            }
        );
    }

    #[tokio::test]
    async fn test_shutdown_releases_listener() {
        let wallet = fake_wallet(0).with_authorized();
        let manager = manager(&wallet);
        manager.start().await;
        assert!(wallet.has_chain_listeners());

        manager.shutdown();
        assert!(!manager.is_listening());
        wait_until(|| !wallet.has_chain_listeners()).await;
    }

    #[tokio::test]
    async fn test_drop_releases_listener() {
        let wallet = fake_wallet(0).with_authorized();
        let manager = manager(&wallet);
        manager.start().await;

        drop(manager);
        wait_until(|| !wallet.has_chain_listeners()).await;
    }
}
