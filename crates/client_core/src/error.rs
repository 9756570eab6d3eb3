use shared::domain::PlayerId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("no player in session")]
    NoCurrentPlayer,
    #[error("player {0} is not alive")]
    PlayerNotAlive(PlayerId),
    #[error("only the creator can start the game")]
    NotCreator,
    #[error("no game process selected")]
    NoProcess,
    #[error("Unexpected game state: {phase}")]
    UnexpectedPhase { phase: String },
    #[error("{action} failed: {source}")]
    Remote {
        action: &'static str,
        source: anyhow::Error,
    },
}

impl ActionError {
    pub(crate) fn remote(action: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| ActionError::Remote { action, source }
    }
}
