//! User-triggered mutations against the game process.

use std::sync::Arc;

use shared::{
    domain::{GamePhase, Mode, Player, ProcessId},
    protocol::{ProcessAction, LEFT_GAME_SENTINEL},
};
use tracing::{info, warn};

use crate::{
    error::ActionError,
    process::{send_action, ProcessClient},
    store::{ClientEvent, Store, Transition},
    sync::fetch_phase,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    Left,
    /// The process answered with something other than the leave
    /// confirmation; the session is kept.
    NotConfirmed(Option<String>),
}

pub struct ActionSubmitter {
    store: Arc<Store>,
    client: Arc<dyn ProcessClient>,
}

impl ActionSubmitter {
    pub fn new(store: Arc<Store>, client: Arc<dyn ProcessClient>) -> Self {
        Self { store, client }
    }

    pub async fn edit_draft(&self, text: impl Into<String>) {
        self.store.apply(Transition::DraftEdited(text.into())).await;
    }

    /// Sends the current draft. The draft is only cleared once the process
    /// accepted the message.
    pub async fn send_message(&self) -> Result<(), ActionError> {
        let (draft, player, process) = self
            .store
            .read(|state| {
                (
                    state.draft.clone(),
                    state.current_player.clone(),
                    state.process().cloned(),
                )
            })
            .await;

        if draft.trim().is_empty() {
            return Err(ActionError::EmptyMessage);
        }
        let player = player.ok_or(ActionError::NoCurrentPlayer)?;
        if !player.is_alive {
            return Err(ActionError::PlayerNotAlive(player.id));
        }
        let process = process.ok_or(ActionError::NoProcess)?;

        let action = ProcessAction::SendChatMessage {
            message: draft,
            player_id: player.id.clone(),
            player_name: player.name.clone(),
            bazar_name: player.bazar_name.clone(),
        };
        if let Err(err) = send_action(self.client.as_ref(), &process, &action).await {
            warn!(player_id = %player.id, process = %process, "chat: send failed: {err:#}");
            return Err(ActionError::remote("send message")(err));
        }

        self.store.apply(Transition::DraftCleared).await;
        self.store.emit(ClientEvent::ScrollToLatest);
        Ok(())
    }

    /// Starts the game and confirms the process moved to night. Failures are
    /// also reported through [`ClientEvent::ActionFailed`].
    pub async fn start_game(&self) -> Result<(), ActionError> {
        let (player, process) = self
            .store
            .read(|state| (state.current_player.clone(), state.process().cloned()))
            .await;

        if !player.as_ref().is_some_and(|player| player.is_creator) {
            warn!("lobby: only the creator can start the game");
            return Err(ActionError::NotCreator);
        }
        let process = process.ok_or(ActionError::NoProcess)?;

        self.store.apply(Transition::LoadingChanged(true)).await;
        let outcome = self.start_and_confirm(&process).await;
        self.store.apply(Transition::LoadingChanged(false)).await;

        match outcome {
            Ok(()) => {
                info!(process = %process, "lobby: game started");
                self.store
                    .apply_with(|state| {
                        if !state.is_session_for(&process) {
                            return Vec::new();
                        }
                        vec![
                            Transition::PhaseObserved(GamePhase::Night),
                            Transition::ModeChanged(Mode::Night),
                        ]
                    })
                    .await;
                Ok(())
            }
            Err(err) => {
                warn!(process = %process, "lobby: start game failed: {err}");
                self.store.emit(ClientEvent::ActionFailed {
                    action: "start game",
                    message: format!("Failed to start game: {err}"),
                });
                Err(err)
            }
        }
    }

    async fn start_and_confirm(&self, process: &ProcessId) -> Result<(), ActionError> {
        send_action(self.client.as_ref(), process, &ProcessAction::StartGame)
            .await
            .map_err(ActionError::remote("start game"))?;

        let phase = fetch_phase(self.client.as_ref(), process)
            .await
            .map_err(ActionError::remote("start game"))?;
        match phase {
            Some(GamePhase::Night) => Ok(()),
            other => Err(ActionError::UnexpectedPhase {
                phase: other.map_or_else(|| "unknown".to_string(), String::from),
            }),
        }
    }

    /// Leaves the room. Local session state is only torn down on the exact
    /// leave confirmation.
    pub async fn leave_room(&self) -> Result<LeaveOutcome, ActionError> {
        let (player, process) = self
            .store
            .read(|state| (state.current_player.clone(), state.process().cloned()))
            .await;
        let process = process.ok_or(ActionError::NoProcess)?;

        let result = match send_action(self.client.as_ref(), &process, &ProcessAction::LeaveGame).await
        {
            Ok(result) => result,
            Err(err) => {
                warn!(process = %process, "lobby: leave failed: {err:#}");
                return Err(ActionError::remote("leave room")(err));
            }
        };

        let data = result.first_data();
        if data != Some(LEFT_GAME_SENTINEL) {
            warn!(process = %process, response = ?data, "lobby: leave not confirmed");
            return Ok(LeaveOutcome::NotConfirmed(data.map(str::to_string)));
        }

        info!(
            process = %process,
            player_id = player.as_ref().map(|p: &Player| p.id.as_str()).unwrap_or_default(),
            "lobby: left game"
        );
        self.store.apply(Transition::SessionLeft).await;
        Ok(LeaveOutcome::Left)
    }
}

#[cfg(test)]
#[path = "tests/actions_tests.rs"]
mod tests;
