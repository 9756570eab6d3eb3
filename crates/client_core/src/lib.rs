use std::sync::Arc;

use shared::domain::{Player, ProcessId};
use tokio::sync::broadcast;
use tracing::info;

pub mod actions;
pub mod config;
pub mod error;
pub mod guard;
pub mod names;
pub mod poller;
pub mod process;
pub mod store;
pub mod sync;
pub mod views;

pub use actions::{ActionSubmitter, LeaveOutcome};
pub use config::Settings;
pub use error::ActionError;
pub use guard::{GuardOutcome, RedirectReason, SessionGuard};
pub use process::{GatewayProcessClient, ProcessClient};
pub use store::{AppState, ClientEvent, Store, Transition};
pub use views::{ChatView, LobbyView};

/// Entry point for a front end: one session store, one process client, and
/// the views and actions built on them.
pub struct RoomClient {
    store: Arc<Store>,
    process_client: Arc<dyn ProcessClient>,
    settings: Settings,
}

impl RoomClient {
    pub fn new(process_client: Arc<dyn ProcessClient>, settings: Settings) -> Self {
        Self {
            store: Store::new(),
            process_client,
            settings,
        }
    }

    /// Client talking to the HTTP gateway named in `settings`.
    pub fn connect(settings: Settings) -> Self {
        let gateway = GatewayProcessClient::new(settings.gateway_url.clone());
        Self::new(Arc::new(gateway), settings)
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn join(&self, player: Player, process: ProcessId) {
        info!(player_id = %player.id, process = %process, "session: joined");
        self.store
            .apply(Transition::SessionJoined { player, process })
            .await;
    }

    pub fn actions(&self) -> ActionSubmitter {
        ActionSubmitter::new(Arc::clone(&self.store), Arc::clone(&self.process_client))
    }

    pub fn guard(&self) -> SessionGuard {
        SessionGuard::new(Arc::clone(&self.store), Arc::clone(&self.process_client))
    }

    pub fn lobby_view(&self) -> LobbyView {
        LobbyView::new(
            Arc::clone(&self.store),
            Arc::clone(&self.process_client),
            self.settings.clone(),
        )
    }

    pub fn chat_view(&self) -> ChatView {
        ChatView::new(
            Arc::clone(&self.store),
            Arc::clone(&self.process_client),
            self.settings.clone(),
        )
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.store.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod tests_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
