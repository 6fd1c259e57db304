//! Lazily connected store handle.
//!
//! One handle is created per process and shared by every request. It starts
//! `Uninitialized`; the first request moves it through `Connecting` to either
//! `Connected` (cached for later requests) or `Failed`. A failed handle does
//! not stay failed: the next [`StoreHandle::acquire`] attempts a fresh
//! connection, since a failure may have been transient.
//!
//! Attempts are coalesced. Requests that queue up behind an attempt which
//! then fails get that attempt's error instead of each dialing again, so a
//! burst during an outage costs one connect timeout, not one per request.
//!
//! ```text
//! Uninitialized --acquire--> Connecting --ok--> Connected
//!                                 |                 |
//!                                 +--err--> Failed <+ invalidate
//!                                             |
//!                                  acquire ---+--> Connecting
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};
use crate::store::{FoodStore, StoreConnector};

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Connecting,
    Connected,
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        }
    }
}

#[derive(Default)]
struct Slot {
    store: Option<Arc<dyn FoodStore>>,
    /// Error of the most recent attempt, cleared on success.
    last_error: Option<StoreError>,
}

/// Process-wide handle to the food store.
pub struct StoreHandle {
    connector: Arc<dyn StoreConnector>,
    // Held across connect(); at most one attempt runs at a time.
    slot: Mutex<Slot>,
    // Bumped under `slot` when an attempt finishes.
    attempts: AtomicU64,
    state: RwLock<ConnectionState>,
}

impl StoreHandle {
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            connector,
            slot: Mutex::new(Slot::default()),
            attempts: AtomicU64::new(0),
            state: RwLock::new(ConnectionState::Uninitialized),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        match self.state.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    fn set_state(&self, next: ConnectionState) {
        let mut guard = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *guard != next {
            info!(from = guard.as_str(), to = next.as_str(), "store connection state changed");
        }
        *guard = next;
    }

    /// Return the cached store, connecting first if there is none.
    ///
    /// A caller that waited on the lock while another attempt failed gets
    /// that failure back without connecting again.
    pub async fn acquire(&self) -> StoreResult<Arc<dyn FoodStore>> {
        let seen = self.attempts.load(Ordering::Acquire);
        let mut slot = self.slot.lock().await;
        if let Some(store) = slot.store.as_ref() {
            return Ok(Arc::clone(store));
        }
        if self.attempts.load(Ordering::Acquire) != seen {
            if let Some(err) = slot.last_error.clone() {
                return Err(err);
            }
        }

        self.set_state(ConnectionState::Connecting);
        let result = self.connector.connect().await;
        self.attempts.fetch_add(1, Ordering::Release);
        match result {
            Ok(store) => {
                slot.store = Some(Arc::clone(&store));
                slot.last_error = None;
                self.set_state(ConnectionState::Connected);
                Ok(store)
            }
            Err(err) => {
                warn!(error = %err, "store connection failed");
                slot.last_error = Some(err.clone());
                self.set_state(ConnectionState::Failed);
                Err(err)
            }
        }
    }

    /// Drop the cached connection so the next acquire reconnects.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        if slot.store.take().is_some() {
            self.set_state(ConnectionState::Failed);
        }
    }

    /// Acquire the store and run one operation against it.
    ///
    /// A connectivity error from the operation invalidates the cached
    /// connection. The error itself is returned unchanged so the caller can
    /// pick its fallback branch.
    pub async fn run<T, F, Fut>(&self, op: F) -> StoreResult<T>
    where
        F: FnOnce(Arc<dyn FoodStore>) -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let store = self.acquire().await?;
        let result = op(store).await;
        if let Err(err) = &result {
            if err.is_connectivity() {
                self.invalidate().await;
            }
        }
        result
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("state", &self.state())
            .finish()
    }
}
