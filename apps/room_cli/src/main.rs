use anyhow::Result;
use clap::Parser;
use client_core::{
    config::{load_settings, normalize_gateway_url},
    names::{lobby_summary, message_rows, LobbySummary},
    ActionError, ClientEvent, GuardOutcome, LeaveOutcome, RoomClient, Store, Transition,
};
use shared::domain::{Mode, Player, ProcessId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Overrides the gateway URL from client.toml / APP__GATEWAY_URL.
    #[arg(long)]
    gateway_url: Option<String>,
    #[arg(long)]
    process: String,
    #[arg(long)]
    player_id: String,
    #[arg(long)]
    player_name: String,
    #[arg(long)]
    bazar_name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings()?;
    if let Some(gateway_url) = &args.gateway_url {
        settings.gateway_url = normalize_gateway_url(gateway_url)?;
    }

    let room = RoomClient::connect(settings);
    let mut player = Player::new(args.player_id, args.player_name);
    player.bazar_name = args.bazar_name;
    room.join(player, ProcessId::new(args.process)).await;

    let mut lobby = room.lobby_view();
    if let GuardOutcome::Redirected(reason) = lobby.mount().await {
        println!("Not registered with this game ({reason:?}); back to landing.");
        return Ok(());
    }
    let mut chat = room.chat_view();
    chat.mount().await;

    let printer = tokio::spawn(print_events(
        room.store().clone(),
        room.subscribe_events(),
        room.settings().min_players,
        room.settings().max_players,
    ));

    println!("Commands: /start, /leave, /players, /quit. Anything else is sent to chat.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" => break,
            "/players" => {
                let state = room.store().snapshot().await;
                print_lobby(&state, room.settings().min_players, room.settings().max_players);
            }
            "/start" => match room.actions().start_game().await {
                Ok(()) => {}
                // surfaced through ClientEvent::ActionFailed
                Err(ActionError::Remote { .. } | ActionError::UnexpectedPhase { .. }) => {}
                Err(err) => println!("Could not start: {err}"),
            },
            "/leave" => match room.actions().leave_room().await {
                Ok(LeaveOutcome::Left) => break,
                Ok(LeaveOutcome::NotConfirmed(data)) => {
                    println!("Leave was not confirmed by the game ({data:?}).");
                }
                Err(err) => println!("Could not leave: {err}"),
            },
            _ => {
                let actions = room.actions();
                actions.edit_draft(line.clone()).await;
                match actions.send_message().await {
                    Ok(()) | Err(ActionError::EmptyMessage) => {}
                    Err(err) => println!("Message not sent: {err}"),
                }
            }
        }
        if room.store().read(|state| state.mode == Mode::Landing).await {
            break;
        }
    }

    lobby.unmount();
    chat.unmount();
    printer.abort();
    Ok(())
}

async fn print_events(
    store: std::sync::Arc<Store>,
    mut events: tokio::sync::broadcast::Receiver<ClientEvent>,
    min_players: usize,
    max_players: usize,
) {
    let mut printed = 0usize;
    let mut last_lobby = None;
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "cli: event printer lagged");
                continue;
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        };

        match event {
            ClientEvent::StateChanged(Transition::MessagesReplaced(_)) => {
                let rows = message_rows(&store.snapshot().await);
                if rows.len() < printed {
                    printed = 0;
                }
                for row in &rows[printed..] {
                    let marker = if row.own { "*" } else { " " };
                    println!("{marker}[{}] {}: {}", row.time, row.sender, row.text);
                }
                printed = rows.len();
            }
            ClientEvent::StateChanged(Transition::RosterReplaced(_)) => {
                let summary = lobby_summary(&store.snapshot().await, min_players, max_players);
                if last_lobby.as_ref() != Some(&summary) {
                    print_summary(&summary);
                    last_lobby = Some(summary);
                }
            }
            ClientEvent::StateChanged(Transition::ModeChanged(mode)) => match mode {
                Mode::Night => println!("Night falls. The game has started."),
                Mode::Landing => println!("Back to landing."),
                Mode::Lobby => println!("Waiting Room"),
            },
            ClientEvent::ActionFailed { message, .. } => println!("{message}"),
            _ => {}
        }
    }
}

fn print_lobby(state: &client_core::AppState, min_players: usize, max_players: usize) {
    print_summary(&lobby_summary(state, min_players, max_players));
}

fn print_summary(summary: &LobbySummary) {
    println!("{}", summary.heading);
    for player in &summary.players {
        let badge = if player.is_creator { " (Creator)" } else { "" };
        println!("  {}{badge}", player.name);
    }
    println!("[{}]", summary.start_label);
}
