use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(PlayerId);
id_newtype!(ProcessId);

/// UI mode the client is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Landing,
    Lobby,
    Night,
}

/// Phase reported by the game process. Phases this client does not handle
/// are carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GamePhase {
    #[default]
    Lobby,
    Night,
    Other(String),
}

impl GamePhase {
    pub fn as_str(&self) -> &str {
        match self {
            GamePhase::Lobby => "lobby",
            GamePhase::Night => "night",
            GamePhase::Other(raw) => raw,
        }
    }
}

impl From<String> for GamePhase {
    fn from(value: String) -> Self {
        match value.as_str() {
            "lobby" => GamePhase::Lobby,
            "night" => GamePhase::Night,
            _ => GamePhase::Other(value),
        }
    }
}

impl From<&str> for GamePhase {
    fn from(value: &str) -> Self {
        GamePhase::from(value.to_string())
    }
}

impl From<GamePhase> for String {
    fn from(value: GamePhase) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bazar_name: Option<String>,
    pub is_creator: bool,
    pub is_alive: bool,
}

impl Player {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: PlayerId::new(id),
            name: name.into(),
            bazar_name: None,
            is_creator: false,
            is_alive: true,
        }
    }

    pub fn with_bazar_name(mut self, bazar_name: impl Into<String>) -> Self {
        self.bazar_name = Some(bazar_name.into());
        self
    }

    pub fn with_creator(mut self, is_creator: bool) -> Self {
        self.is_creator = is_creator;
        self
    }

    pub fn with_alive(mut self, is_alive: bool) -> Self {
        self.is_alive = is_alive;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub player_id: PlayerId,
    pub player_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bazar_name: Option<String>,
    pub message: String,
    /// Raw wire value; see [`crate::time::resolve_unit`].
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameState {
    pub phase: GamePhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessId>,
}
