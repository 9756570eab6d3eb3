use std::time::Duration;

use serde_json::json;

use super::*;
use crate::{
    poller::Poller,
    tests_support::{joined_store, process, CallMode, Reply, ScriptedProcess},
};

fn three_players() -> serde_json::Value {
    json!([
        {"id": "p1", "name": "alice", "is_creator": true},
        {"address": "p2", "displayName": "bob"},
        {"id": "p3", "name": "carol", "bazar_name": "Saffron"}
    ])
}

fn greeting() -> String {
    json!([{"player_id": "p1", "player_name": "alice", "message": "hi", "timestamp": 1}])
        .to_string()
}

fn lobby_sync(store: &Arc<Store>, client: &Arc<ScriptedProcess>) -> LobbySync {
    LobbySync::new(Arc::clone(store), client.clone(), process())
}

#[tokio::test]
async fn lobby_poll_maps_and_replaces_roster() {
    let store = joined_store(Player::new("p2", "bob")).await;
    let client = ScriptedProcess::new();
    client
        .reply("Get-Game-State", Reply::json(json!({"phase": "lobby"})))
        .reply("Get-Players", Reply::json(three_players()));

    let sync = lobby_sync(&store, &client);
    let snapshot = sync.fetch().await.expect("fetch").expect("snapshot");
    sync.commit(snapshot).await;

    let state = store.snapshot().await;
    let ids: Vec<_> = state.roster.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3"]);
    assert_eq!(state.roster[1].name, "bob");
    assert_eq!(state.roster[2].bazar_name.as_deref(), Some("Saffron"));
    assert!(state.roster.iter().all(|p| p.is_alive));
    assert!(client
        .calls()
        .iter()
        .all(|call| call.mode == CallMode::DryRun && call.process == process()));
}

#[tokio::test]
async fn lobby_poll_corrects_creator_flag_from_roster() {
    let store = joined_store(Player::new("p1", "alice")).await;
    let client = ScriptedProcess::new();
    client
        .reply("Get-Game-State", Reply::json(json!({"phase": "lobby"})))
        .reply("Get-Players", Reply::json(three_players()));

    let sync = lobby_sync(&store, &client);
    let snapshot = sync.fetch().await.expect("fetch").expect("snapshot");
    sync.commit(snapshot).await;

    assert!(store.snapshot().await.is_creator());
}

#[test]
fn creator_correction_only_reports_differences() {
    let roster = vec![Player::new("p1", "alice").with_creator(true)];
    let creator = Player::new("p1", "alice").with_creator(true);
    let stale = Player::new("p1", "alice");
    let departed = Player::new("p9", "zed").with_creator(true);

    assert_eq!(creator_correction(Some(&creator), &roster), None);
    assert_eq!(creator_correction(Some(&stale), &roster), Some(true));
    assert_eq!(creator_correction(Some(&departed), &roster), Some(false));
    assert_eq!(creator_correction(None, &roster), None);
}

#[tokio::test(start_paused = true)]
async fn transient_empty_roster_replaces_previous_one() {
    let store = joined_store(Player::new("p1", "alice")).await;
    let client = ScriptedProcess::new();
    client
        .reply("Get-Game-State", Reply::json(json!({"phase": "lobby"})))
        .reply("Get-Players", Reply::json(three_players()))
        .reply("Get-Players", Reply::json(json!([])));

    let _handle = Poller::spawn(Arc::new(lobby_sync(&store, &client)), Duration::from_secs(10));

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(store.snapshot().await.roster.len(), 3);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(store.snapshot().await.roster.is_empty());
}

#[tokio::test]
async fn repeated_identical_polls_commit_identical_state() {
    let store = joined_store(Player::new("p1", "alice").with_creator(true)).await;
    let client = ScriptedProcess::new();
    client
        .reply("Get-Game-State", Reply::json(json!({"phase": "lobby"})))
        .reply("Get-Players", Reply::json(three_players()));
    let sync = lobby_sync(&store, &client);

    let first = sync.fetch().await.expect("fetch").expect("snapshot");
    sync.commit(first).await;
    let after_first = store.snapshot().await;

    let second = sync.fetch().await.expect("fetch").expect("snapshot");
    sync.commit(second).await;
    assert_eq!(store.snapshot().await, after_first);
}

#[tokio::test]
async fn malformed_roster_leaves_state_untouched() {
    let store = joined_store(Player::new("p1", "alice")).await;
    store
        .apply(Transition::RosterReplaced(vec![Player::new("p1", "alice")]))
        .await;
    let client = ScriptedProcess::new();
    client
        .reply("Get-Game-State", Reply::json(json!({"phase": "lobby"})))
        .reply("Get-Players", Reply::json(json!({"error": "busy"})));

    let sync = lobby_sync(&store, &client);
    assert!(sync.fetch().await.expect("fetch").is_none());

    let garbled = ScriptedProcess::new();
    garbled.reply("Get-Game-State", Reply::data("{truncated"));
    let sync = lobby_sync(&store, &garbled);
    assert!(sync.fetch().await.is_err());
    assert_eq!(store.snapshot().await.roster.len(), 1);
}

#[tokio::test]
async fn night_phase_moves_to_night_and_freezes_roster() {
    let store = joined_store(Player::new("p2", "bob")).await;
    let client = ScriptedProcess::new();
    client.reply("Get-Game-State", Reply::json(json!({"phase": "night"})));

    let sync = lobby_sync(&store, &client);
    let snapshot = sync.fetch().await.expect("fetch").expect("snapshot");
    assert_eq!(snapshot, LobbySnapshot::Started);
    sync.commit(snapshot).await;

    let state = store.snapshot().await;
    assert_eq!(state.mode, Mode::Night);
    assert_eq!(state.game.phase, GamePhase::Night);

    let calls_before = client.calls().len();
    assert!(sync.fetch().await.expect("fetch").is_none());
    assert_eq!(client.calls().len(), calls_before);
    assert!(client.calls_for("Get-Players").is_empty());
}

#[tokio::test]
async fn settling_clears_loading_flag() {
    let store = joined_store(Player::new("p1", "alice")).await;
    store.apply(Transition::LoadingChanged(true)).await;
    let client = ScriptedProcess::new();

    lobby_sync(&store, &client).settled().await;
    assert!(!store.snapshot().await.loading);
}

#[tokio::test]
async fn chat_poll_replaces_messages_in_batch_order() {
    let store = joined_store(Player::new("p1", "alice")).await;
    let client = ScriptedProcess::new();
    let batch = json!([
        {"player_id": "p2", "player_name": "bob", "message": "later", "timestamp": 1_700_000_100},
        {"player_id": "p1", "player_name": "alice", "bazar_name": "Rose", "message": "earlier", "timestamp": 1_700_000_000_000_i64}
    ]);
    client.reply("Get-Chat-Messages", Reply::data(&batch.to_string()));

    let sync = ChatSync::new(Arc::clone(&store), client.clone(), process());
    let messages = sync.fetch().await.expect("fetch").expect("messages");
    sync.commit(messages).await;

    let state = store.snapshot().await;
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[0].message, "later");
    assert_eq!(state.messages[1].bazar_name.as_deref(), Some("Rose"));
    assert_eq!(client.calls_for("Get-Chat-Messages")[0].mode, CallMode::Message);
}

#[tokio::test]
async fn chat_poll_without_data_keeps_messages() {
    let store = joined_store(Player::new("p1", "alice")).await;
    let client = ScriptedProcess::new();
    client.reply("Get-Chat-Messages", Reply::empty());

    let sync = ChatSync::new(Arc::clone(&store), client.clone(), process());
    assert!(sync.fetch().await.expect("fetch").is_none());

    let garbled = ScriptedProcess::new();
    garbled.reply("Get-Chat-Messages", Reply::data("not json"));
    let sync = ChatSync::new(Arc::clone(&store), garbled, process());
    assert!(sync.fetch().await.is_err());
}

#[tokio::test]
async fn phase_watch_enters_night_once_role_is_assigned() {
    let store = joined_store(Player::new("p2", "bob")).await;
    let client = ScriptedProcess::new();
    client
        .reply("Get-Game-State", Reply::json(json!({"phase": "night"})))
        .reply("Get-Role", Reply::data("{\"role\":\"villager\"}"));

    let watch = PhaseWatch::new(Arc::clone(&store), client.clone(), process());
    let snapshot = watch.fetch().await.expect("fetch");
    assert_eq!(snapshot, Some(()));
    watch.commit(()).await;

    assert_eq!(store.snapshot().await.mode, Mode::Night);
    assert_eq!(client.calls_for("Get-Role")[0].mode, CallMode::Message);
}

#[tokio::test]
async fn phase_watch_waits_for_role_data() {
    let store = joined_store(Player::new("p2", "bob")).await;
    let client = ScriptedProcess::new();
    client
        .reply("Get-Game-State", Reply::json(json!({"phase": "night"})))
        .reply("Get-Role", Reply::empty());

    let watch = PhaseWatch::new(Arc::clone(&store), client.clone(), process());
    assert!(watch.fetch().await.expect("fetch").is_none());
}

#[tokio::test]
async fn phase_watch_is_idle_for_the_creator() {
    let store = joined_store(Player::new("p1", "alice").with_creator(true)).await;
    let client = ScriptedProcess::new();

    let watch = PhaseWatch::new(Arc::clone(&store), client.clone(), process());
    assert!(watch.fetch().await.expect("fetch").is_none());
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn night_result_after_leave_is_dropped() {
    let store = joined_store(Player::new("p1", "alice").with_creator(true)).await;
    let client = ScriptedProcess::new();
    client.reply("Get-Game-State", Reply::json(json!({"phase": "night"})));

    let sync = lobby_sync(&store, &client);
    let snapshot = sync.fetch().await.expect("fetch").expect("snapshot");
    store.apply(Transition::SessionLeft).await;
    sync.commit(snapshot).await;

    let state = store.snapshot().await;
    assert_eq!(state.mode, Mode::Landing);
    assert_eq!(state.game.phase, GamePhase::Lobby);
    assert!(state.current_player.is_none());
    assert!(!sync.is_current().await);
}

#[tokio::test]
async fn roster_result_after_night_is_dropped() {
    let store = joined_store(Player::new("p1", "alice").with_creator(true)).await;
    let client = ScriptedProcess::new();
    client
        .reply("Get-Game-State", Reply::json(json!({"phase": "lobby"})))
        .reply("Get-Players", Reply::json(three_players()));

    let sync = lobby_sync(&store, &client);
    let snapshot = sync.fetch().await.expect("fetch").expect("snapshot");
    store
        .apply_all(vec![
            Transition::PhaseObserved(GamePhase::Night),
            Transition::ModeChanged(Mode::Night),
        ])
        .await;
    sync.commit(snapshot).await;

    assert!(store.snapshot().await.roster.is_empty());
}

#[tokio::test]
async fn results_for_a_replaced_handle_are_dropped() {
    let store = joined_store(Player::new("p2", "bob")).await;
    let client = ScriptedProcess::new();
    client
        .reply("Get-Game-State", Reply::json(json!({"phase": "lobby"})))
        .reply("Get-Players", Reply::json(three_players()))
        .reply("Get-Role", Reply::data("{\"role\":\"seer\"}"))
        .reply("Get-Chat-Messages", Reply::data(&greeting()));

    let lobby = lobby_sync(&store, &client);
    let roster = lobby.fetch().await.expect("fetch").expect("snapshot");
    let chat = ChatSync::new(Arc::clone(&store), client.clone(), process());
    let messages = chat.fetch().await.expect("fetch").expect("messages");
    let watch = PhaseWatch::new(Arc::clone(&store), client.clone(), process());

    store
        .apply(Transition::SessionJoined {
            player: Player::new("p2", "bob"),
            process: ProcessId::new("second-process"),
        })
        .await;
    lobby.commit(roster).await;
    chat.commit(messages).await;
    watch.commit(()).await;

    let state = store.snapshot().await;
    assert!(state.roster.is_empty());
    assert!(state.messages.is_empty());
    assert_eq!(state.mode, Mode::Lobby);
    assert!(!lobby.is_current().await);
    assert!(!chat.is_current().await);
    assert!(!watch.is_current().await);
}

#[tokio::test]
async fn chat_result_after_redirect_is_dropped() {
    let store = joined_store(Player::new("p1", "alice")).await;
    let client = ScriptedProcess::new();
    client.reply("Get-Chat-Messages", Reply::data(&greeting()));

    let chat = ChatSync::new(Arc::clone(&store), client.clone(), process());
    let messages = chat.fetch().await.expect("fetch").expect("messages");
    store.apply(Transition::ModeChanged(Mode::Landing)).await;
    chat.commit(messages).await;

    assert!(store.snapshot().await.messages.is_empty());
    assert!(!chat.is_current().await);
}
