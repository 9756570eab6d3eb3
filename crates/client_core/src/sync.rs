//! The [`SyncSource`]s behind the lobby and chat views.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::{
    domain::{ChatMessage, GamePhase, Mode, Player, ProcessId},
    protocol::{
        parse_player_records, ChatMessageRecord, DryRunOptions, GameStateRecord, PlayerRecord,
        ProcessAction,
    },
};
use tracing::{debug, info};

use crate::{
    poller::SyncSource,
    process::{dry_run_json, send_action, ProcessClient},
    store::{Store, Transition},
};

/// Reads the phase the process currently reports.
pub async fn fetch_phase(
    client: &dyn ProcessClient,
    process: &ProcessId,
) -> Result<Option<GamePhase>> {
    let Some(value) = dry_run_json(
        client,
        process,
        &ProcessAction::GetGameState,
        &DryRunOptions::default(),
    )
    .await?
    else {
        return Ok(None);
    };
    let record: GameStateRecord =
        serde_json::from_value(value).context("invalid Get-Game-State payload")?;
    Ok(record.phase)
}

/// Reads the roster. `Ok(None)` when the payload is missing or not an array.
pub async fn fetch_roster(
    client: &dyn ProcessClient,
    process: &ProcessId,
    options: &DryRunOptions,
) -> Result<Option<Vec<PlayerRecord>>> {
    let value = dry_run_json(client, process, &ProcessAction::GetPlayers, options).await?;
    Ok(value.and_then(parse_player_records))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbySnapshot {
    Started,
    Roster(Vec<Player>),
}

/// Lobby poll: watches the phase and, while still in the lobby, refreshes
/// the roster.
pub struct LobbySync {
    store: Arc<Store>,
    client: Arc<dyn ProcessClient>,
    process: ProcessId,
}

impl LobbySync {
    pub fn new(store: Arc<Store>, client: Arc<dyn ProcessClient>, process: ProcessId) -> Self {
        Self {
            store,
            client,
            process,
        }
    }
}

#[async_trait]
impl SyncSource for LobbySync {
    type Snapshot = LobbySnapshot;

    fn name(&self) -> &'static str {
        "lobby"
    }

    async fn is_current(&self) -> bool {
        self.store
            .read(|state| state.is_session_for(&self.process))
            .await
    }

    async fn fetch(&self) -> Result<Option<LobbySnapshot>> {
        if !self.store.read(|state| state.in_lobby_of(&self.process)).await {
            return Ok(None);
        }

        match fetch_phase(self.client.as_ref(), &self.process).await? {
            Some(GamePhase::Night) => Ok(Some(LobbySnapshot::Started)),
            Some(GamePhase::Lobby) => {
                let records =
                    fetch_roster(self.client.as_ref(), &self.process, &DryRunOptions::default())
                        .await?;
                Ok(records.map(|records| {
                    LobbySnapshot::Roster(
                        records
                            .into_iter()
                            .filter_map(PlayerRecord::into_player)
                            .collect(),
                    )
                }))
            }
            other => {
                debug!(process = %self.process, phase = ?other, "lobby: unhandled phase");
                Ok(None)
            }
        }
    }

    async fn commit(&self, snapshot: LobbySnapshot) {
        let process = &self.process;
        let applied = match snapshot {
            LobbySnapshot::Started => {
                let started = self
                    .store
                    .apply_with(|state| {
                        if !state.in_lobby_of(process) {
                            return Vec::new();
                        }
                        vec![
                            Transition::PhaseObserved(GamePhase::Night),
                            Transition::ModeChanged(Mode::Night),
                        ]
                    })
                    .await;
                if started {
                    info!(process = %process, "lobby: game started");
                }
                started
            }
            LobbySnapshot::Roster(players) => {
                self.store
                    .apply_with(|state| {
                        if !state.in_lobby_of(process) {
                            return Vec::new();
                        }
                        let mut transitions = Vec::with_capacity(2);
                        if let Some(is_creator) =
                            creator_correction(state.current_player.as_ref(), &players)
                        {
                            info!(process = %process, is_creator, "lobby: creator status corrected");
                            transitions.push(Transition::CreatorStatusCorrected(is_creator));
                        }
                        transitions.push(Transition::RosterReplaced(players));
                        transitions
                    })
                    .await
            }
        };
        if !applied {
            debug!(process = %process, "lobby: session moved on, result dropped");
        }
    }

    async fn settled(&self) {
        self.store
            .apply_with(|state| {
                if state.loading && state.process() == Some(&self.process) {
                    vec![Transition::LoadingChanged(false)]
                } else {
                    Vec::new()
                }
            })
            .await;
    }
}

/// Creator flag the current player should carry according to `roster`, when
/// it differs from the local one. A player missing from the roster is not
/// the creator.
pub fn creator_correction(current: Option<&Player>, roster: &[Player]) -> Option<bool> {
    let current = current?;
    let remote = roster
        .iter()
        .find(|player| player.id == current.id)
        .is_some_and(|player| player.is_creator);
    (remote != current.is_creator).then_some(remote)
}

/// Chat poll: replaces the message list with the process's batch.
pub struct ChatSync {
    store: Arc<Store>,
    client: Arc<dyn ProcessClient>,
    process: ProcessId,
}

impl ChatSync {
    pub fn new(store: Arc<Store>, client: Arc<dyn ProcessClient>, process: ProcessId) -> Self {
        Self {
            store,
            client,
            process,
        }
    }
}

#[async_trait]
impl SyncSource for ChatSync {
    type Snapshot = Vec<ChatMessage>;

    fn name(&self) -> &'static str {
        "chat"
    }

    async fn is_current(&self) -> bool {
        self.store
            .read(|state| state.is_session_for(&self.process))
            .await
    }

    async fn fetch(&self) -> Result<Option<Vec<ChatMessage>>> {
        let result = send_action(
            self.client.as_ref(),
            &self.process,
            &ProcessAction::GetChatMessages,
        )
        .await?;
        let Some(data) = result.first_data() else {
            return Ok(None);
        };
        let records: Vec<ChatMessageRecord> =
            serde_json::from_str(data).context("invalid Get-Chat-Messages payload")?;
        Ok(Some(records.into_iter().map(ChatMessage::from).collect()))
    }

    async fn commit(&self, messages: Vec<ChatMessage>) {
        let applied = self
            .store
            .apply_with(|state| {
                if state.is_session_for(&self.process) {
                    vec![Transition::MessagesReplaced(messages)]
                } else {
                    Vec::new()
                }
            })
            .await;
        if !applied {
            debug!(process = %self.process, "chat: session moved on, result dropped");
        }
    }
}

/// Phase watch for players who cannot start the game themselves: once the
/// process reports night, `Get-Role` confirms the player has been dealt in.
pub struct PhaseWatch {
    store: Arc<Store>,
    client: Arc<dyn ProcessClient>,
    process: ProcessId,
}

impl PhaseWatch {
    pub fn new(store: Arc<Store>, client: Arc<dyn ProcessClient>, process: ProcessId) -> Self {
        Self {
            store,
            client,
            process,
        }
    }
}

#[async_trait]
impl SyncSource for PhaseWatch {
    type Snapshot = ();

    fn name(&self) -> &'static str {
        "phase_watch"
    }

    async fn is_current(&self) -> bool {
        self.store
            .read(|state| state.is_session_for(&self.process))
            .await
    }

    async fn fetch(&self) -> Result<Option<()>> {
        let watching = self
            .store
            .read(|state| state.in_lobby_of(&self.process) && !state.is_creator())
            .await;
        if !watching {
            return Ok(None);
        }
        if fetch_phase(self.client.as_ref(), &self.process).await? != Some(GamePhase::Night) {
            return Ok(None);
        }

        let role = send_action(self.client.as_ref(), &self.process, &ProcessAction::GetRole).await?;
        Ok(role.first_data().map(|_| ()))
    }

    async fn commit(&self, _assigned: ()) {
        let applied = self
            .store
            .apply_with(|state| {
                if !state.in_lobby_of(&self.process) {
                    return Vec::new();
                }
                vec![
                    Transition::PhaseObserved(GamePhase::Night),
                    Transition::ModeChanged(Mode::Night),
                ]
            })
            .await;
        if applied {
            info!(process = %self.process, "phase watch: role assigned, entering night");
        } else {
            debug!(process = %self.process, "phase watch: session moved on, result dropped");
        }
    }
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
