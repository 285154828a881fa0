//! Connection lifecycle management.
//!
//! One logical connection serves every request. It is opened lazily on the
//! first operation, reused while healthy, and flipped back to
//! `Unconnected` on any fault so the next operation retries the open.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{debug, warn};
use tokio::time::timeout;

use crate::core::{DbError, Result};
use crate::storage::DocumentStore;

/// Explicit connection state.
///
/// `Connected → Unconnected` on any detected fault; never terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Unconnected,
    Connecting,
    Connected,
}

pub struct ConnectionManager<S: DocumentStore> {
    store: Arc<S>,
    state: RwLock<ConnState>,
    connect_timeout: Duration,
}

impl<S: DocumentStore> ConnectionManager<S> {
    pub fn new(store: Arc<S>, connect_timeout: Duration) -> Self {
        Self {
            store,
            state: RwLock::new(ConnState::Unconnected),
            connect_timeout,
        }
    }

    pub fn state(&self) -> ConnState {
        self.state.read().map_or(ConnState::Unconnected, |guard| *guard)
    }

    /// No-op when connected; otherwise race one connect attempt against the
    /// configured timeout.
    ///
    /// The state lock is never held across an await, so two concurrent
    /// first-requests may both attempt to open. The store's connect is safe
    /// to race; last success wins.
    pub async fn ensure_connected(&self) -> Result<()> {
        if self.state() == ConnState::Connected {
            return Ok(());
        }

        self.set_state(ConnState::Connecting)?;
        match timeout(self.connect_timeout, self.store.connect()).await {
            Ok(Ok(())) => {
                self.set_state(ConnState::Connected)?;
                debug!("connection established");
                Ok(())
            }
            Ok(Err(err)) => {
                self.set_state(ConnState::Unconnected)?;
                warn!("connection attempt failed: {err}");
                Err(err)
            }
            Err(_elapsed) => {
                self.set_state(ConnState::Unconnected)?;
                let err = DbError::Timeout(format!(
                    "connection attempt exceeded {} ms",
                    self.connect_timeout.as_millis()
                ));
                warn!("{err}");
                Err(err)
            }
        }
    }

    /// Treat the connection as dead; the next operation reconnects.
    pub fn mark_unconnected(&self) {
        if let Ok(mut state) = self.state.write() {
            *state = ConnState::Unconnected;
        }
    }

    fn set_state(&self, next: ConnState) -> Result<()> {
        *self.state.write()? = next;
        Ok(())
    }
}
