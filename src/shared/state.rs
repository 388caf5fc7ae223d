use std::sync::Arc;

use crate::config::AppConfig;
use crate::mailer::Mailer;
use crate::notify::broadcaster::ChannelBroadcaster;
use crate::shared::utils::DbPool;
use crate::storage::EvidenceStore;

/// Shared application state handed to every handler as `Arc<AppState>`.
///
/// The broadcaster is held concretely so the websocket endpoint can
/// subscribe; publishers only ever see it through the `Broadcaster` trait.
pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub broadcaster: Arc<ChannelBroadcaster>,
    pub mailer: Arc<dyn Mailer>,
    pub evidence_store: Arc<dyn EvidenceStore>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("conn", &"DbPool")
            .field("config", &self.config)
            .field("broadcaster", &"ChannelBroadcaster")
            .field("mailer", &"Arc<dyn Mailer>")
            .field("evidence_store", &"Arc<dyn EvidenceStore>")
            .finish()
    }
}
