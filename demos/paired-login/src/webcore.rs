//! Stand-in for the external "web core" credential store.

use handover_core::{KeyValueStore, MemoryStore};
use handover_transfer::CredentialExchanger;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Demo credential store. The sending page carries saved tokens; the
/// receiving page is backed by the window's local store and exchanges the
/// transferred values for a session.
pub struct WebCore {
    saved: HashMap<String, String>,
    store: Option<Arc<RwLock<MemoryStore>>>,
    authenticated: bool,
}

impl WebCore {
    /// Sending-page core with already-saved credentials.
    pub fn with_saved<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            saved: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            store: None,
            authenticated: true,
        }
    }

    /// Receiving-page core backed by the window's local store.
    pub fn backed_by(store: Arc<RwLock<MemoryStore>>) -> Self {
        Self {
            saved: HashMap::new(),
            store: Some(store),
            authenticated: false,
        }
    }
}

impl CredentialExchanger for WebCore {
    type Error = String;

    fn saved_token(&self) -> HashMap<String, String> {
        self.saved.clone()
    }

    async fn build_credentials(&mut self) -> Result<(), Self::Error> {
        let Some(store) = &self.store else {
            return Err("no local store to exchange from".to_string());
        };
        let store = store.read().await;
        let token = store
            .get("token")
            .ok_or_else(|| "no token in local storage".to_string())?;
        // A real core trades the token for session credentials here.
        tracing::info!("exchanged token ({} chars) for a session", token.len());
        Ok(())
    }

    fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
        tracing::debug!("authenticated = {}", self.authenticated);
    }
}
