//! Top-level session
//!
//! Owns the [`ConnectionManager`], follows its status and keeps exactly one [`MintPanel`]
//! alive while the wallet is `Ready`.

use std::fmt;
use std::sync::Arc;

use minter_common::parking_lot::Mutex;
use minter_common::task;
use minter_common::{
    ChainId, ConnectionStatus, Error, MintResult, NftContract, WalletProvider,
};
use tokio::task::JoinHandle;
use tracing::instrument;

use crate::factory::SessionFactory;
use crate::panel::{MintPanel, MintState, HURRY_MESSAGE, MINTED_MESSAGE, SOLD_OUT_MESSAGE};
use crate::session::{MintListener, MintSession};
use crate::viewer::ViewerLink;
use crate::ConnectionManager;

/// Deployment the session mints from
#[derive(Debug, Clone)]
pub struct MintSettings {
    /// Network the collection is deployed on
    pub required_chain: ChainId,
    /// Maximum number of items
    pub total_supply: u64,
    /// Marketplace links to minted items
    pub viewer: ViewerLink,
}

/// What the user is shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Connection not checked yet, or supply still loading
    Loading,
    /// No wallet installed
    InstallWallet,
    /// Wallet present, no account authorized
    Connect,
    /// Authorized on another network
    WrongNetwork {
        /// Active network
        chain_id: ChainId,
        /// Network to switch to
        required: ChainId,
    },
    /// Ready to mint
    Mint(MintState),
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Screen::Loading => write!(f, "Loading..."),
            Screen::InstallWallet => write!(f, "Please install MetaMask to proceed"),
            Screen::Connect => write!(f, "Connect to Wallet"),
            Screen::WrongNetwork { chain_id, required } => write!(
                f,
                "Wrong network! Please switch from {chain_id} to {required} to proceed"
            ),
            Screen::Mint(state) => {
                match state.availability() {
                    Some(availability) => {
                        writeln!(f, "{HURRY_MESSAGE}")?;
                        writeln!(f, "{availability}")?;
                    }
                    None if state.is_sold_out() => writeln!(f, "{SOLD_OUT_MESSAGE}")?,
                    None => writeln!(f, "Loading supply...")?,
                }

                let disabled = if state.can_mint() { "" } else { " (disabled)" };
                write!(f, "[{}]{}", state.button_label(), disabled)?;

                if let Some(url) = state.last_minted_url.as_ref() {
                    write!(f, "\n{MINTED_MESSAGE} {url}")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug)]
struct ActivePanel {
    panel: Arc<MintPanel>,
    // Held for its drop
    _listener: Option<MintListener>,
}

/// Wallet connection and mint view of one user
pub struct Dapp {
    connection: Arc<ConnectionManager>,
    factory: SessionFactory,
    settings: MintSettings,
    active: Mutex<Option<ActivePanel>>,
    reconciler: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for Dapp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dapp")
            .field("connection", &self.connection)
            .field("settings", &self.settings)
            .field("active", &self.active.lock().is_some())
            .finish()
    }
}

impl Drop for Dapp {
    fn drop(&mut self) {
        if let Some(handle) = self.reconciler.lock().take() {
            handle.abort();
        }
        self.connection.shutdown();
    }
}

impl Dapp {
    /// Create a new session
    ///
    /// `provider` is `None` when no wallet is installed. `binder` attaches the collection
    /// contract through the wallet, it is called each time a mint session is built.
    pub fn new<F>(
        provider: Option<Arc<dyn WalletProvider>>,
        binder: F,
        settings: MintSettings,
    ) -> Arc<Self>
    where
        F: Fn() -> Result<Arc<dyn NftContract>, Error> + Send + Sync + 'static,
    {
        let connection = ConnectionManager::new(provider, settings.required_chain);
        let factory = SessionFactory::new(Arc::new(binder), Arc::downgrade(&connection));

        Arc::new(Self {
            connection,
            factory,
            settings,
            active: Mutex::new(None),
            reconciler: Mutex::new(None),
        })
    }

    /// Connection manager
    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    /// Deployment settings
    pub fn settings(&self) -> &MintSettings {
        &self.settings
    }

    /// Mint panel, present while the connection is `Ready`
    pub fn panel(&self) -> Option<Arc<MintPanel>> {
        self.active
            .lock()
            .as_ref()
            .map(|active| active.panel.clone())
    }

    /// Check the connection and follow its changes until [`Self::shutdown`]
    pub async fn start(self: &Arc<Self>) -> Screen {
        let mut statuses = self.connection.watch();
        self.connection.start().await;

        statuses.borrow_and_update();
        self.reconcile().await;

        let mut reconciler = self.reconciler.lock();
        if reconciler.is_none() {
            let dapp = Arc::downgrade(self);
            *reconciler = Some(task::spawn(async move {
                while statuses.changed().await.is_ok() {
                    statuses.borrow_and_update();
                    let Some(dapp) = dapp.upgrade() else {
                        break;
                    };
                    dapp.reconcile().await;
                }
            }));
        }
        drop(reconciler);

        self.screen()
    }

    /// Stop following the connection and release the mint session
    pub fn shutdown(&self) {
        if let Some(handle) = self.reconciler.lock().take() {
            handle.abort();
        }
        self.connection.shutdown();
        self.teardown();
    }

    /// Bring the mint panel in line with the current connection status
    #[instrument(skip(self))]
    pub async fn reconcile(&self) {
        let status = self.connection.status();
        let Some(session) = self.factory.session(&status) else {
            self.teardown();
            return;
        };

        let panel = {
            let mut active = self.active.lock();
            if self.connection.status() != status {
                tracing::debug!("Connection moved on from {}, skipping", status);
                return;
            }

            match active.as_ref() {
                Some(current) if Arc::ptr_eq(current.panel.session(), &session) => {
                    current.panel.clone()
                }
                _ => {
                    let (panel, listener) = self.build_panel(session);
                    tracing::info!("Mint panel ready on {}", status);
                    *active = Some(ActivePanel {
                        panel: panel.clone(),
                        _listener: listener,
                    });
                    panel
                }
            }
        };

        // A panel built by a concurrent reconcile may still be loading
        let remaining = panel.load().await;
        tracing::debug!("{} of {} left", remaining, self.settings.total_supply);
    }

    fn build_panel(&self, session: Arc<MintSession>) -> (Arc<MintPanel>, Option<MintListener>) {
        let panel = MintPanel::new(
            session,
            self.settings.total_supply,
            self.settings.viewer.clone(),
        );
        let listener = panel
            .attach()
            .inspect_err(|err| tracing::error!("Could not listen to mint events: {}", err))
            .ok();

        (panel, listener)
    }

    fn teardown(&self) {
        if self.active.lock().take().is_some() {
            tracing::info!("Mint panel torn down");
        }
        self.factory.invalidate();
    }

    /// What the user is currently shown
    pub fn screen(&self) -> Screen {
        match self.connection.status() {
            ConnectionStatus::Unknown => Screen::Loading,
            ConnectionStatus::NoWallet => Screen::InstallWallet,
            ConnectionStatus::Unauthorized => Screen::Connect,
            ConnectionStatus::WrongNetwork { chain_id } => Screen::WrongNetwork {
                chain_id,
                required: self.settings.required_chain,
            },
            ConnectionStatus::Ready { .. } => self
                .panel()
                .map(|panel| Screen::Mint(panel.state()))
                .unwrap_or(Screen::Loading),
        }
    }

    /// Ask the wallet for account access
    pub async fn connect(&self) -> Screen {
        self.connection.request_connect().await;
        self.reconcile().await;
        self.screen()
    }

    /// Mint one item through the active panel, only while the connection is `Ready`
    pub async fn mint(&self) -> MintResult {
        let status = self.connection.status();
        let panel = self.panel().filter(|_| status.is_ready());
        let Some(panel) = panel else {
            tracing::warn!("Mint requested while {}", status);
            return MintResult::NoIdentifier;
        };

        panel.mint().await
    }
}

#[cfg(test)]
mod tests {
    use minter_common::TokenId;
    use minter_fake_wallet::FakeWallet;

    use super::*;
    use crate::test_utils::{fake_wallet, test_viewer, wait_until, TEST_CHAIN, TEST_SUPPLY};

    fn dapp(wallet: Option<&FakeWallet>) -> Arc<Dapp> {
        let provider = wallet.map(|wallet| Arc::new(wallet.clone()) as Arc<dyn WalletProvider>);
        let contract = wallet.cloned();

        Dapp::new(
            provider,
            move || match contract.as_ref() {
                Some(contract) => Ok(Arc::new(contract.clone()) as Arc<dyn NftContract>),
                None => Err(Error::NoAccounts),
            },
            MintSettings {
                required_chain: TEST_CHAIN,
                total_supply: TEST_SUPPLY,
                viewer: test_viewer(),
            },
        )
    }

    #[tokio::test]
    async fn test_install_wallet_screen() {
        let dapp = dapp(None);
        assert_eq!(dapp.screen(), Screen::Loading);
        assert_eq!(dapp.start().await, Screen::InstallWallet);
        assert_eq!(dapp.mint().await, MintResult::NoIdentifier);
        assert_eq!(
            dapp.screen().to_string(),
            "Please install MetaMask to proceed"
        );
    }

    #[tokio::test]
    async fn test_connect_then_mint() {
        let wallet = fake_wallet(48);
        let dapp = dapp(Some(&wallet));

        assert_eq!(dapp.start().await, Screen::Connect);
        assert!(dapp.panel().is_none());

        let Screen::Mint(state) = dapp.connect().await else {
            panic!("expected the mint screen");
        };
        assert_eq!(state.remaining, Some(2));
        assert!(state.can_mint());

        assert_eq!(dapp.mint().await, MintResult::Minted(TokenId(48)));
        let Screen::Mint(state) = dapp.screen() else {
            panic!("expected the mint screen");
        };
        assert_eq!(state.remaining, Some(1));
        assert!(state.last_minted_url.is_some());
    }

    #[tokio::test]
    async fn test_wrong_network_screen() {
        let wallet = fake_wallet(0).with_authorized();
        wallet.switch_chain(ChainId::new(1));
        let dapp = dapp(Some(&wallet));

        assert_eq!(
            dapp.start().await,
            Screen::WrongNetwork {
                chain_id: ChainId::new(1),
                required: TEST_CHAIN,
            }
        );
        assert!(dapp.panel().is_none());
    }

    #[tokio::test]
    async fn test_network_switch_rebuilds_session() {
        let wallet = fake_wallet(0).with_authorized();
        let dapp = dapp(Some(&wallet));
        dapp.start().await;

        let first = dapp.panel().unwrap();
        assert!(wallet.has_mint_listeners());

        wallet.switch_chain(ChainId::new(1));
        wait_until(|| dapp.panel().is_none()).await;
        wait_until(|| !wallet.has_mint_listeners()).await;

        wallet.switch_chain(TEST_CHAIN);
        wait_until(|| dapp.panel().is_some()).await;
        let second = dapp.panel().unwrap();
        assert!(!Arc::ptr_eq(first.session(), second.session()));
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let wallet = fake_wallet(0).with_authorized();
        let dapp = dapp(Some(&wallet));
        dapp.start().await;

        let panel = dapp.panel().unwrap();
        dapp.reconcile().await;
        assert!(Arc::ptr_eq(&panel, &dapp.panel().unwrap()));
    }

    #[tokio::test]
    async fn test_stale_panel_does_not_mint() {
        let wallet = fake_wallet(0).with_authorized();
        let dapp = dapp(Some(&wallet));

        // No reconciler follows the connection
        dapp.connection().start().await;
        dapp.reconcile().await;
        assert!(dapp.panel().is_some());

        wallet.switch_chain(ChainId::new(1));
        wait_until(|| !dapp.connection().status().is_ready()).await;
        assert!(dapp.panel().is_some());

        assert_eq!(dapp.mint().await, MintResult::NoIdentifier);
        assert_eq!(wallet.mint_submissions(), 0);

        dapp.reconcile().await;
        assert!(dapp.panel().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_releases_listeners() {
        let wallet = fake_wallet(0).with_authorized();
        let dapp = dapp(Some(&wallet));
        dapp.start().await;
        assert!(wallet.has_chain_listeners());

        dapp.shutdown();
        assert!(dapp.panel().is_none());
        wait_until(|| wallet.active_subscribers() == 0).await;
    }

    #[test]
    fn test_mint_screen_rendering() {
        let screen = Screen::Mint(MintState {
            busy: false,
            remaining: Some(2),
            last_minted_url: None,
        });
        assert_eq!(
            screen.to_string(),
            "Hurry while supplies last!\nOnly 2 tokens left!\n[Mint NFT]"
        );

        let url = test_viewer().item_url(TokenId(77));
        let screen = Screen::Mint(MintState {
            busy: false,
            remaining: Some(0),
            last_minted_url: url.clone(),
        });
        assert_eq!(
            screen.to_string(),
            format!(
                "We ran out of tokens! Sorry!\n[Mint NFT] (disabled)\nNFT Minted! {}",
                url.unwrap()
            )
        );
    }
}
