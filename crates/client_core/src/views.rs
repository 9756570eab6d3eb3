//! Lobby and chat views: which pollers run, and for which process handle.
//!
//! A view is bound to the process handle the store holds when it is
//! mounted. Mounting again after the handle changed tears the old pollers
//! down before new ones start; unmounting or dropping the view stops them.
//! Pollers also stop on their own once the store moves to another handle or
//! the session lands, and a remount is then needed to poll again.

use std::sync::Arc;

use shared::domain::ProcessId;
use tracing::info;

use crate::{
    config::Settings,
    guard::{GuardOutcome, RedirectReason, SessionGuard},
    poller::{PollHandle, Poller},
    process::ProcessClient,
    store::Store,
    sync::{ChatSync, LobbySync, PhaseWatch},
};

#[derive(Default)]
struct Binding {
    process: Option<ProcessId>,
    pollers: Vec<PollHandle>,
}

impl Binding {
    fn is_bound_to(&self, process: &ProcessId) -> bool {
        self.process.as_ref() == Some(process) && self.pollers.iter().all(PollHandle::is_active)
    }

    fn bind(&mut self, process: ProcessId, pollers: Vec<PollHandle>) {
        self.release();
        self.process = Some(process);
        self.pollers = pollers;
    }

    fn release(&mut self) {
        for poller in &mut self.pollers {
            poller.cancel();
        }
        self.pollers.clear();
        self.process = None;
    }
}

pub struct LobbyView {
    store: Arc<Store>,
    client: Arc<dyn ProcessClient>,
    settings: Settings,
    binding: Binding,
}

impl LobbyView {
    pub fn new(store: Arc<Store>, client: Arc<dyn ProcessClient>, settings: Settings) -> Self {
        Self {
            store,
            client,
            settings,
            binding: Binding::default(),
        }
    }

    /// Verifies the session, then starts the lobby poll and the phase watch
    /// for the current process handle. A redirected session starts nothing.
    pub async fn mount(&mut self) -> GuardOutcome {
        let process = self.store.read(|state| state.process().cloned()).await;
        if let Some(process) = &process {
            if self.binding.is_bound_to(process) {
                return GuardOutcome::Verified;
            }
        }
        self.binding.release();

        let outcome = SessionGuard::new(Arc::clone(&self.store), Arc::clone(&self.client))
            .check()
            .await;
        if !outcome.is_verified() {
            return outcome;
        }
        let Some(process) = process else {
            return GuardOutcome::Redirected(RedirectReason::MissingProcess);
        };

        info!(process = %process, "lobby view: mounted");
        let period = self.settings.lobby_poll_interval();
        let pollers = vec![
            Poller::spawn(
                Arc::new(LobbySync::new(
                    Arc::clone(&self.store),
                    Arc::clone(&self.client),
                    process.clone(),
                )),
                period,
            ),
            Poller::spawn(
                Arc::new(PhaseWatch::new(
                    Arc::clone(&self.store),
                    Arc::clone(&self.client),
                    process.clone(),
                )),
                period,
            ),
        ];
        self.binding.bind(process, pollers);
        outcome
    }

    pub fn unmount(&mut self) {
        self.binding.release();
    }

    pub fn bound_process(&self) -> Option<&ProcessId> {
        self.binding.process.as_ref()
    }
}

pub struct ChatView {
    store: Arc<Store>,
    client: Arc<dyn ProcessClient>,
    settings: Settings,
    binding: Binding,
}

impl ChatView {
    pub fn new(store: Arc<Store>, client: Arc<dyn ProcessClient>, settings: Settings) -> Self {
        Self {
            store,
            client,
            settings,
            binding: Binding::default(),
        }
    }

    /// Starts the chat poll for the current process handle. Returns whether
    /// a handle was available.
    pub async fn mount(&mut self) -> bool {
        let Some(process) = self.store.read(|state| state.process().cloned()).await else {
            self.binding.release();
            return false;
        };
        if self.binding.is_bound_to(&process) {
            return true;
        }

        info!(process = %process, "chat view: mounted");
        let poller = Poller::spawn(
            Arc::new(ChatSync::new(
                Arc::clone(&self.store),
                Arc::clone(&self.client),
                process.clone(),
            )),
            self.settings.chat_poll_interval(),
        );
        self.binding.bind(process, vec![poller]);
        true
    }

    pub fn unmount(&mut self) {
        self.binding.release();
    }

    pub fn bound_process(&self) -> Option<&ProcessId> {
        self.binding.process.as_ref()
    }
}

#[cfg(test)]
#[path = "tests/views_tests.rs"]
mod tests;
