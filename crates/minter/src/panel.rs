//! Mint panel state
//!
//! Derives what the mint view shows from a [`MintSession`]: the remaining supply, whether a
//! mint is in flight and the link to the last minted item.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use minter_common::parking_lot::Mutex;
use minter_common::{Error, EventId, MintEvent, MintResult, MintedCount};
use tokio::sync::watch;
use url::Url;

use crate::session::{MintListener, MintSession};
use crate::viewer::ViewerLink;

/// Below this many items left the availability message turns urgent
const SCARCITY_THRESHOLD: u64 = 10;

/// Headline shown while items are left
pub const HURRY_MESSAGE: &str = "Hurry while supplies last!";

/// Shown once remaining supply is exactly zero
pub const SOLD_OUT_MESSAGE: &str = "We ran out of tokens! Sorry!";

/// Shown next to the link of a freshly minted item
pub const MINTED_MESSAGE: &str = "NFT Minted!";

/// Observable state of the mint view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MintState {
    /// A mint is in flight
    pub busy: bool,
    /// Items left, unknown until the initial supply fetch completes
    pub remaining: Option<u64>,
    /// Link to the item minted last by this session
    pub last_minted_url: Option<Url>,
}

impl MintState {
    /// Whether the mint action is enabled
    pub fn can_mint(&self) -> bool {
        !self.busy && self.remaining.is_some_and(|remaining| remaining >= 1)
    }

    /// Remaining supply is exactly zero
    pub fn is_sold_out(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Label of the mint button
    pub fn button_label(&self) -> &'static str {
        if self.busy {
            "Minting..."
        } else {
            "Mint NFT"
        }
    }

    /// Availability message, only while items are left
    pub fn availability(&self) -> Option<String> {
        let remaining = self.remaining.filter(|remaining| *remaining > 0)?;
        let cardinality = if remaining == 1 { "token" } else { "tokens" };

        Some(if remaining < SCARCITY_THRESHOLD {
            format!("Only {remaining} {cardinality} left!")
        } else {
            format!("{remaining} {cardinality} left")
        })
    }
}

/// Mint events observed by a panel, relative to its loaded count
#[derive(Debug, Default)]
struct Ledger {
    loaded: bool,
    /// Count the remaining supply started from, `None` if it could not be read
    counted: Option<MintedCount>,
    seen: HashSet<EventId>,
    /// Events observed before the count was loaded
    early: Vec<MintEvent>,
}

impl Ledger {
    fn is_counted(&self, event: &MintEvent) -> bool {
        self.counted.is_some_and(|count| count.includes(event))
    }
}

/// View-model of the mint screen, owned by the top-level session while connected
pub struct MintPanel {
    session: Arc<MintSession>,
    total_supply: u64,
    viewer: ViewerLink,
    state: watch::Sender<MintState>,
    ledger: Mutex<Ledger>,
}

impl std::fmt::Debug for MintPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MintPanel")
            .field("total_supply", &self.total_supply)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl MintPanel {
    /// Create a new panel over `session`
    pub fn new(session: Arc<MintSession>, total_supply: u64, viewer: ViewerLink) -> Arc<Self> {
        let (state, _) = watch::channel(MintState::default());

        Arc::new(Self {
            session,
            total_supply,
            viewer,
            state,
            ledger: Mutex::new(Ledger::default()),
        })
    }

    /// Session backing the panel
    pub fn session(&self) -> &Arc<MintSession> {
        &self.session
    }

    /// Current state
    pub fn state(&self) -> MintState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn watch(&self) -> watch::Receiver<MintState> {
        self.state.subscribe()
    }

    /// Fetch the remaining supply, once per panel
    ///
    /// Mint events observed before the count arrives are applied on top of it unless the
    /// count already includes their block.
    pub async fn load(&self) -> u64 {
        if let Some(remaining) = self.state.borrow().remaining {
            return remaining;
        }

        let counted = self.session.count_at().await;
        let minted = counted.map(|count| count.minted).unwrap_or_default();
        if minted > self.total_supply {
            tracing::warn!(
                "Contract reports {} minted over a supply of {}",
                minted,
                self.total_supply
            );
        }

        let mut ledger = self.ledger.lock();
        if ledger.loaded {
            return self.state.borrow().remaining.unwrap_or_default();
        }
        ledger.loaded = true;
        ledger.counted = counted;

        let early = std::mem::take(&mut ledger.early);
        let missed = early
            .iter()
            .filter(|event| !ledger.is_counted(event))
            .count() as u64;
        let remaining = self.total_supply.saturating_sub(minted).saturating_sub(missed);
        tracing::debug!(
            "Loaded {} minted, {} of {} early events after the count",
            minted,
            missed,
            early.len()
        );

        self.state.send_modify(|state| state.remaining = Some(remaining));
        remaining
    }

    /// Keep the remaining supply live with the mint events of every account
    pub fn attach(self: &Arc<Self>) -> Result<MintListener, Error> {
        let panel: Weak<Self> = Arc::downgrade(self);

        self.session.subscribe(move |event| {
            if let Some(panel) = panel.upgrade() {
                panel.observe_mint(&event);
            }
        })
    }

    /// Account for one mint event, returns whether it was new
    ///
    /// Redelivery of an event already observed is ignored, as is an event the loaded count
    /// already includes. Remaining supply never goes below zero.
    pub fn observe_mint(&self, event: &MintEvent) -> bool {
        let mut ledger = self.ledger.lock();
        if !ledger.seen.insert(event.id()) {
            tracing::debug!(
                "Ignoring redelivered mint event {}:{}",
                event.tx_hash,
                event.log_index
            );
            return false;
        }

        if !ledger.loaded {
            ledger.early.push(event.clone());
            return true;
        }

        if ledger.is_counted(event) {
            tracing::debug!(
                "Mint of token {} in block {} is part of the loaded count",
                event.token_id,
                event.block_number
            );
            return true;
        }

        self.state.send_modify(|state| match state.remaining {
            Some(0) => tracing::warn!(
                "Mint of token {} observed with no supply left",
                event.token_id
            ),
            Some(remaining) => state.remaining = Some(remaining - 1),
            None => {}
        });

        true
    }

    /// Mint one item if the mint action is enabled
    pub async fn mint(&self) -> MintResult {
        let mut enabled = false;
        self.state.send_if_modified(|state| {
            enabled = state.can_mint();
            if enabled {
                state.busy = true;
            }
            enabled
        });

        if !enabled {
            tracing::debug!("Mint action disabled");
            return MintResult::NoIdentifier;
        }

        let minted = self.session.mint_event().await;
        if let Some(event) = minted.as_ref() {
            self.observe_mint(event);
        }

        let last_minted_url = minted
            .as_ref()
            .and_then(|event| self.viewer.item_url(event.token_id));

        self.state.send_modify(|state| {
            state.busy = false;
            state.last_minted_url = last_minted_url;
        });

        minted.map(|event| event.token_id).into()
    }
}
