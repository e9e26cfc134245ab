//! In-process lobby simulation.
//!
//! Starts a server, connects a handful of simulated clients that join the
//! queue a few hundred milliseconds apart, and lets them play out their
//! games with the bot strategy. With an odd number of clients the last one
//! waits out the bot timeout and plays a bot.
//!
//! ```text
//! cargo run -p lobby-sim -- 5
//! FOURLINE_BOT_TIMEOUT_SECS=2 RUST_LOG=debug cargo run -p lobby-sim
//! ```

use std::sync::Arc;
use std::time::Duration;

use fourline::bot::choose_column;
use fourline::prelude::*;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Won,
    Lost,
    Draw,
}

#[derive(Debug, Clone)]
struct Outcome {
    name: String,
    opponent: String,
    result: Verdict,
    moves: usize,
}

/// Plays one client from join to `game_end`.
async fn play(
    mut client: ClientSession,
    mut outbox: mpsc::UnboundedReceiver<ServerMessage>,
    name: String,
) -> Result<Outcome, FourlineError> {
    client
        .handle(ClientRequest::JoinQueue {
            name: name.clone(),
            preferences: MatchPreferences::default(),
        })
        .await?;
    let me = client
        .player_id()
        .ok_or_else(|| FourlineError::InvalidRequest("no identity after join".into()))?;
    let mut opponent = String::new();

    while let Some(message) = outbox.recv().await {
        let state = match message {
            ServerMessage::GameFound { session, .. } => {
                opponent = session
                    .opponent_of(me)
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                info!(%name, %opponent, session_id = %session.id, "matched");
                session
            }
            ServerMessage::MoveResult {
                success: true,
                state: Some(state),
                ..
            } => state,
            ServerMessage::GameEnd {
                winner,
                is_draw,
                state,
                ..
            } => {
                let result = match winner {
                    _ if is_draw => Verdict::Draw,
                    Some(w) if w.id == me => Verdict::Won,
                    _ => Verdict::Lost,
                };
                client.disconnect().await;
                return Ok(Outcome {
                    name,
                    opponent,
                    result,
                    moves: state.move_count,
                });
            }
            _ => continue,
        };

        if !state.is_turn_of(me) {
            continue;
        }
        let Some(color) = state.color_of(me) else {
            continue;
        };
        if let Some(column) = choose_column(&state.board, color) {
            client
                .handle(ClientRequest::MakeMove {
                    session_id: state.id,
                    column,
                })
                .await?;
        }
    }

    Err(FourlineError::InvalidRequest("connection closed before game end".into()))
}

/// Connects `players` clients, staggered by `stagger`, and waits for all
/// of their games to finish.
async fn simulate(server: &GameServer, players: usize, stagger: Duration) -> Vec<Outcome> {
    let mut tasks = Vec::with_capacity(players);
    for i in 0..players {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = server.connect(Arc::new(tx));
        let name = format!("sim-{}", i + 1);
        tasks.push(tokio::spawn(async move {
            tokio::time::sleep(stagger * i as u32).await;
            play(client, rx, name).await
        }));
    }

    let mut outcomes = Vec::with_capacity(players);
    for task in tasks {
        match task.await {
            Ok(Ok(outcome)) => outcomes.push(outcome),
            Ok(Err(e)) => warn!(error = %e, "simulated client failed"),
            Err(e) => warn!(error = %e, "simulated client panicked"),
        }
    }
    outcomes
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fourline::init_tracing();

    let players = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 5,
    };
    let archive = Arc::new(MemoryArchive::new());
    let server = GameServer::builder()
        .config(ServerConfig::from_env()?)
        .results(archive.clone())
        .build();

    let outcomes = simulate(&server, players, Duration::from_millis(300)).await;
    for o in &outcomes {
        info!(name = %o.name, opponent = %o.opponent, result = ?o.result, moves = o.moves, "finished");
    }
    for record in archive.records() {
        println!("{}", serde_json::to_string(&record)?);
    }

    server.shutdown().await;
    Ok(())
}
