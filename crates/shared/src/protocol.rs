use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{ChatMessage, GamePhase, Player, PlayerId};

/// Data returned by `Leave-Game` when the process removed the player.
pub const LEFT_GAME_SENTINEL: &str = "Left game";

pub const ACTION_TAG: &str = "Action";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Actions understood by the game process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessAction {
    GetGameState,
    GetPlayers,
    GetChatMessages,
    SendChatMessage {
        message: String,
        player_id: PlayerId,
        player_name: String,
        bazar_name: Option<String>,
    },
    StartGame,
    LeaveGame,
    GetRole,
}

impl ProcessAction {
    pub fn name(&self) -> &'static str {
        match self {
            ProcessAction::GetGameState => "Get-Game-State",
            ProcessAction::GetPlayers => "Get-Players",
            ProcessAction::GetChatMessages => "Get-Chat-Messages",
            ProcessAction::SendChatMessage { .. } => "Send-Chat-Message",
            ProcessAction::StartGame => "Start-Game",
            ProcessAction::LeaveGame => "Leave-Game",
            ProcessAction::GetRole => "Get-Role",
        }
    }

    /// Ordered tag list; the `Action` tag always comes first.
    pub fn tags(&self) -> Vec<Tag> {
        let mut tags = vec![Tag::new(ACTION_TAG, self.name())];
        if let ProcessAction::SendChatMessage {
            message,
            player_id,
            player_name,
            bazar_name,
        } = self
        {
            tags.push(Tag::new("Message", message.clone()));
            tags.push(Tag::new("PlayerId", player_id.as_str()));
            tags.push(Tag::new("PlayerName", player_name.clone()));
            if let Some(bazar_name) = bazar_name {
                tags.push(Tag::new("BazarName", bazar_name.clone()));
            }
        }
        tags
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DryRunOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl DryRunOptions {
    pub fn owned_by(owner: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
        }
    }
}

/// Request body accepted by the process gateway for both call modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessRequest {
    pub id: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMessage {
    #[serde(rename = "Data", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(rename = "Tags", default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl ResultMessage {
    pub fn with_data(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    #[serde(rename = "Messages", default)]
    pub messages: Vec<ResultMessage>,
}

impl ProcessResult {
    pub fn single(data: impl Into<String>) -> Self {
        Self {
            messages: vec![ResultMessage::with_data(data)],
        }
    }

    pub fn json(value: &Value) -> Self {
        Self::single(value.to_string())
    }

    /// `Messages[0].Data`, when present and non-empty.
    pub fn first_data(&self) -> Option<&str> {
        self.messages
            .first()
            .and_then(|message| message.data.as_deref())
            .filter(|data| !data.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameStateRecord {
    #[serde(default)]
    pub phase: Option<GamePhase>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(default, alias = "bazarName")]
    pub bazar_name: Option<String>,
    #[serde(default, alias = "isCreator")]
    pub is_creator: Value,
}

impl PlayerRecord {
    pub fn player_id(&self) -> String {
        first_non_empty(&self.id, &self.address)
    }

    /// Roster entry for this record; `None` when it has no usable id or name.
    pub fn into_player(self) -> Option<Player> {
        let id = self.player_id();
        let name = first_non_empty(&self.name, &self.display_name);
        if id.is_empty() || name.is_empty() {
            return None;
        }
        Some(Player {
            id: PlayerId(id),
            name,
            bazar_name: self.bazar_name.filter(|value| !value.is_empty()),
            is_creator: truthy(&self.is_creator),
            is_alive: true,
        })
    }
}

/// Decodes a `Get-Players` payload. Returns `None` when the payload is not an
/// array; null or non-object entries are skipped.
pub fn parse_player_records(value: Value) -> Option<Vec<PlayerRecord>> {
    let Value::Array(entries) = value else {
        return None;
    };
    Some(
        entries
            .into_iter()
            .filter(|entry| !entry.is_null())
            .filter_map(|entry| serde_json::from_value::<PlayerRecord>(entry).ok())
            .collect(),
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageRecord {
    #[serde(alias = "playerId")]
    pub player_id: String,
    #[serde(default, alias = "playerName")]
    pub player_name: String,
    #[serde(default, alias = "bazarName")]
    pub bazar_name: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: i64,
}

impl From<ChatMessageRecord> for ChatMessage {
    fn from(record: ChatMessageRecord) -> Self {
        ChatMessage {
            player_id: PlayerId(record.player_id),
            player_name: record.player_name,
            bazar_name: record.bazar_name.filter(|value| !value.is_empty()),
            message: record.message,
            timestamp: record.timestamp,
        }
    }
}

fn first_non_empty(primary: &Option<String>, fallback: &Option<String>) -> String {
    primary
        .as_deref()
        .filter(|value| !value.is_empty())
        .or_else(|| fallback.as_deref().filter(|value| !value.is_empty()))
        .unwrap_or_default()
        .to_string()
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
