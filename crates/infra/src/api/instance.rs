//! Process-wide client slot.
//!
//! The global slot backs [`ApiClient::get_instance`]. Independent slots can be
//! constructed where isolation matters (tests, embedding several clients).

use std::sync::Arc;

use netrelay_core::{ConnectivitySource, Transport};
use netrelay_domain::{ClientConfig, Result};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::client::ApiClient;

static GLOBAL: ClientSlot = ClientSlot::new();

/// The slot used by [`ApiClient::get_instance`].
pub fn global() -> &'static ClientSlot {
    &GLOBAL
}

/// Holds at most one active client.
#[derive(Debug)]
pub struct ClientSlot {
    inner: Mutex<Option<Arc<ApiClient>>>,
}

impl Default for ClientSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientSlot {
    /// An empty slot.
    pub const fn new() -> Self {
        Self { inner: parking_lot::const_mutex(None) }
    }

    /// Return the held client, or construct one if the slot is empty, its
    /// client has been destroyed, or the runtime that client was built on has
    /// shut down. A stale client is destroyed before it is replaced.
    ///
    /// # Errors
    /// Construction errors from [`ApiClient::new`].
    pub fn get_or_init(
        &self,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        connectivity: Arc<dyn ConnectivitySource>,
    ) -> Result<Arc<ApiClient>> {
        let mut slot = self.inner.lock();
        if let Some(client) = slot.as_ref() {
            if client.is_serviceable() {
                return Ok(Arc::clone(client));
            }
            if client.is_active() {
                warn!("held client outlived its runtime; replacing it");
                client.destroy();
            }
        }

        let client = ApiClient::new(config, transport, connectivity)?;
        debug!("client slot initialised");
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }

    /// The held client, if it is still active.
    pub fn current(&self) -> Option<Arc<ApiClient>> {
        self.inner.lock().as_ref().filter(|client| client.is_active()).cloned()
    }

    /// Destroy and release the held client. Returns `false` if the slot was
    /// empty.
    pub fn destroy(&self) -> bool {
        let client = self.inner.lock().take();
        match client {
            Some(client) => {
                client.destroy();
                true
            }
            None => false,
        }
    }
}
