//! Session state shared by the lobby and chat views.
//!
//! Every mutation is a named [`Transition`] applied through [`Store::apply`]
//! or [`Store::apply_all`], and every applied transition is broadcast to
//! subscribers.

use std::sync::Arc;

use shared::domain::{ChatMessage, GamePhase, GameState, Mode, Player, ProcessId};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub mode: Mode,
    pub current_player: Option<Player>,
    pub game: GameState,
    pub roster: Vec<Player>,
    pub messages: Vec<ChatMessage>,
    pub draft: String,
    pub loading: bool,
}

impl AppState {
    pub fn process(&self) -> Option<&ProcessId> {
        self.game.process.as_ref()
    }

    pub fn is_creator(&self) -> bool {
        self.current_player
            .as_ref()
            .is_some_and(|player| player.is_creator)
    }

    pub fn in_lobby(&self) -> bool {
        self.mode == Mode::Lobby && self.game.phase == GamePhase::Lobby
    }

    /// Whether a player is seated and `process` is still the session's
    /// handle. False once the session landed.
    pub fn is_session_for(&self, process: &ProcessId) -> bool {
        self.mode != Mode::Landing
            && self.current_player.is_some()
            && self.process() == Some(process)
    }

    pub fn in_lobby_of(&self, process: &ProcessId) -> bool {
        self.in_lobby() && self.is_session_for(process)
    }

    fn apply(&mut self, transition: &Transition) {
        match transition {
            Transition::SessionJoined { player, process } => {
                self.current_player = Some(player.clone());
                self.game = GameState {
                    phase: GamePhase::Lobby,
                    process: Some(process.clone()),
                };
                self.roster.clear();
                self.messages.clear();
                self.draft.clear();
                self.loading = true;
                self.mode = Mode::Lobby;
            }
            Transition::RosterReplaced(players) => self.roster = players.clone(),
            Transition::MessagesReplaced(messages) => self.messages = messages.clone(),
            Transition::PhaseObserved(phase) => self.game.phase = phase.clone(),
            Transition::ModeChanged(mode) => self.mode = *mode,
            Transition::CreatorStatusCorrected(is_creator) => {
                if let Some(player) = self.current_player.as_mut() {
                    player.is_creator = *is_creator;
                }
            }
            Transition::DraftEdited(text) => self.draft = text.clone(),
            Transition::DraftCleared => self.draft.clear(),
            Transition::LoadingChanged(loading) => self.loading = *loading,
            Transition::SessionLeft => {
                self.current_player = None;
                self.game.phase = GamePhase::Lobby;
                self.roster.clear();
                self.mode = Mode::Landing;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    SessionJoined { player: Player, process: ProcessId },
    RosterReplaced(Vec<Player>),
    MessagesReplaced(Vec<ChatMessage>),
    PhaseObserved(GamePhase),
    ModeChanged(Mode),
    CreatorStatusCorrected(bool),
    DraftEdited(String),
    DraftCleared,
    LoadingChanged(bool),
    /// Player, roster and phase reset after a confirmed leave.
    SessionLeft,
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Transition::SessionJoined { .. } => "session_joined",
            Transition::RosterReplaced(_) => "roster_replaced",
            Transition::MessagesReplaced(_) => "messages_replaced",
            Transition::PhaseObserved(_) => "phase_observed",
            Transition::ModeChanged(_) => "mode_changed",
            Transition::CreatorStatusCorrected(_) => "creator_status_corrected",
            Transition::DraftEdited(_) => "draft_edited",
            Transition::DraftCleared => "draft_cleared",
            Transition::LoadingChanged(_) => "loading_changed",
            Transition::SessionLeft => "session_left",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    StateChanged(Transition),
    /// The chat view should scroll to its newest message.
    ScrollToLatest,
    /// A user action failed in a way the user must be told about.
    ActionFailed {
        action: &'static str,
        message: String,
    },
}

pub struct Store {
    state: RwLock<AppState>,
    events: broadcast::Sender<ClientEvent>,
}

impl Store {
    pub fn new() -> Arc<Self> {
        Self::with_state(AppState::default())
    }

    pub fn with_state(state: AppState) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            state: RwLock::new(state),
            events,
        })
    }

    pub async fn snapshot(&self) -> AppState {
        self.state.read().await.clone()
    }

    pub async fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        let guard = self.state.read().await;
        f(&guard)
    }

    pub async fn apply(&self, transition: Transition) {
        self.apply_all(vec![transition]).await;
    }

    /// Applies `transitions` under one write lock so readers never observe a
    /// partially applied group.
    pub async fn apply_all(&self, transitions: Vec<Transition>) {
        self.apply_with(move |_| transitions).await;
    }

    /// Plans transitions against the current state and applies them under
    /// the same write lock. Returns whether anything was applied.
    pub async fn apply_with(&self, plan: impl FnOnce(&AppState) -> Vec<Transition>) -> bool {
        let transitions = {
            let mut guard = self.state.write().await;
            let transitions = plan(&guard);
            for transition in &transitions {
                guard.apply(transition);
            }
            transitions
        };
        let applied = !transitions.is_empty();
        for transition in transitions {
            debug!(transition = transition.name(), "store: applied");
            let _ = self.events.send(ClientEvent::StateChanged(transition));
        }
        applied
    }

    pub fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
