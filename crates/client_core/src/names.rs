//! Display names and render-ready rows for the chat and lobby views.

use shared::{
    domain::{ChatMessage, Player},
    time::format_display_time,
};

use crate::store::AppState;

/// Picks the freshest known name: the alternate name on the message, then
/// the sender's alternate name in the roster, then the name captured when
/// the message was sent. Empty names count as missing.
pub fn resolve_name<'a>(
    message_alt: Option<&'a str>,
    roster_alt: Option<&'a str>,
    embedded: Option<&'a str>,
) -> &'a str {
    [message_alt, roster_alt, embedded]
        .into_iter()
        .flatten()
        .find(|name| !name.is_empty())
        .unwrap_or_default()
}

pub fn sender_name<'a>(message: &'a ChatMessage, roster: &'a [Player]) -> &'a str {
    let roster_alt = roster
        .iter()
        .find(|player| player.id == message.player_id)
        .and_then(|player| player.bazar_name.as_deref());
    resolve_name(
        message.bazar_name.as_deref(),
        roster_alt,
        Some(message.player_name.as_str()),
    )
}

pub fn player_name(player: &Player) -> &str {
    resolve_name(player.bazar_name.as_deref(), None, Some(player.name.as_str()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub sender: String,
    pub text: String,
    pub time: String,
    pub own: bool,
}

pub fn message_rows(state: &AppState) -> Vec<MessageRow> {
    let own_id = state.current_player.as_ref().map(|player| &player.id);
    state
        .messages
        .iter()
        .map(|message| MessageRow {
            sender: sender_name(message, &state.roster).to_string(),
            text: message.message.clone(),
            time: format_display_time(message.timestamp),
            own: own_id == Some(&message.player_id),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRow {
    pub name: String,
    pub is_creator: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbySummary {
    pub heading: String,
    pub players: Vec<PlayerRow>,
    /// Players still missing before the creator's start control unlocks.
    pub players_needed: usize,
    pub can_start: bool,
    pub start_label: String,
}

pub fn lobby_summary(state: &AppState, min_players: usize, max_players: usize) -> LobbySummary {
    let joined = state.roster.len();
    let players_needed = min_players.saturating_sub(joined);
    let is_creator = state.is_creator();

    let start_label = if !is_creator {
        "Waiting for creator to start...".to_string()
    } else if players_needed > 0 {
        format!("Start Game (Need {players_needed} more)")
    } else {
        "Start Game".to_string()
    };

    LobbySummary {
        heading: format!("Players ({joined}/{max_players})"),
        players: state
            .roster
            .iter()
            .map(|player| PlayerRow {
                name: player_name(player).to_string(),
                is_creator: player.is_creator,
            })
            .collect(),
        players_needed,
        can_start: is_creator && players_needed == 0,
        start_label,
    }
}

#[cfg(test)]
#[path = "tests/names_tests.rs"]
mod tests;
