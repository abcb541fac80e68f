//! Memoized [`MintSession`] construction

use std::sync::{Arc, Weak};

use minter_common::parking_lot::Mutex;
use minter_common::{ChainId, ConnectionStatus, Error, NftContract};

use crate::{ConnectionManager, MintSession};

/// Binds the collection contract through the connected wallet
pub type ContractBinder = Arc<dyn Fn() -> Result<Arc<dyn NftContract>, Error> + Send + Sync>;

/// Hands out the [`MintSession`] of the current connection
///
/// Yields `None` until the connection is `Ready`. The session is reused for as long as the
/// wallet stays on the same network and rebuilt when it changes.
pub struct SessionFactory {
    binder: ContractBinder,
    connection: Weak<ConnectionManager>,
    cached: Mutex<Option<(ChainId, Arc<MintSession>)>>,
}

impl std::fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("cached", &self.cached.lock().as_ref().map(|(chain, _)| *chain))
            .finish()
    }
}

impl SessionFactory {
    /// Create a new factory
    pub fn new(binder: ContractBinder, connection: Weak<ConnectionManager>) -> Self {
        Self {
            binder,
            connection,
            cached: Mutex::new(None),
        }
    }

    /// Session for `status`, `None` unless it is `Ready`
    pub fn session(&self, status: &ConnectionStatus) -> Option<Arc<MintSession>> {
        let ConnectionStatus::Ready { chain_id } = *status else {
            self.invalidate();
            return None;
        };

        let mut cached = self.cached.lock();
        if let Some((cached_chain, session)) = cached.as_ref() {
            if *cached_chain == chain_id {
                return Some(session.clone());
            }
        }

        let contract = match (self.binder)() {
            Ok(contract) => contract,
            Err(err) => {
                tracing::error!("Could not bind contract: {}", err);
                *cached = None;
                return None;
            }
        };

        tracing::debug!(
            "Building mint session for {} on {}",
            contract.address(),
            chain_id
        );
        let session = Arc::new(MintSession::new(
            contract,
            self.connection.clone(),
            chain_id,
        ));
        *cached = Some((chain_id, session.clone()));

        Some(session)
    }

    /// Forget the cached session
    pub fn invalidate(&self) {
        if self.cached.lock().take().is_some() {
            tracing::debug!("Mint session released");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::test_utils::{fake_wallet, TEST_CHAIN};

    fn counting_factory(binds: Arc<AtomicUsize>) -> SessionFactory {
        let wallet = fake_wallet(0);
        SessionFactory::new(
            Arc::new(move || -> Result<Arc<dyn NftContract>, Error> {
                binds.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(wallet.clone()))
            }),
            Weak::new(),
        )
    }

    #[test]
    fn test_none_until_ready() {
        let binds = Arc::new(AtomicUsize::new(0));
        let factory = counting_factory(binds.clone());

        for status in [
            ConnectionStatus::Unknown,
            ConnectionStatus::NoWallet,
            ConnectionStatus::Unauthorized,
            ConnectionStatus::WrongNetwork {
                chain_id: ChainId::new(1),
            },
        ] {
            assert!(factory.session(&status).is_none());
        }
        assert_eq!(binds.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_memoized_per_chain() {
        let binds = Arc::new(AtomicUsize::new(0));
        let factory = counting_factory(binds.clone());
        let ready = ConnectionStatus::Ready {
            chain_id: TEST_CHAIN,
        };

        let first = factory.session(&ready).unwrap();
        let second = factory.session(&ready).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(binds.load(Ordering::SeqCst), 1);

        let other = factory
            .session(&ConnectionStatus::Ready {
                chain_id: ChainId::new(1),
            })
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(other.chain_id(), ChainId::new(1));
        assert_eq!(binds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_rebuilt_after_leaving_ready() {
        let binds = Arc::new(AtomicUsize::new(0));
        let factory = counting_factory(binds.clone());
        let ready = ConnectionStatus::Ready {
            chain_id: TEST_CHAIN,
        };

        let first = factory.session(&ready).unwrap();
        assert!(factory.session(&ConnectionStatus::Unauthorized).is_none());
        let second = factory.session(&ready).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(binds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_bind_failure() {
        let factory = SessionFactory::new(
            Arc::new(|| -> Result<Arc<dyn NftContract>, Error> { Err(Error::Internal) }),
            Weak::new(),
        );

        assert!(factory
            .session(&ConnectionStatus::Ready {
                chain_id: TEST_CHAIN
            })
            .is_none());
    }
}
