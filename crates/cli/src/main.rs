//! Delver - a text adventure in the deep places
//!
//! Single-player terminal front-end: reads free-form commands, feeds them
//! through the engine, and prints the emitted game events. Exit code 0 on a
//! graceful `quit`, non-zero on unrecoverable startup errors.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use delver_domain::{GameEvent, StampedEvent, SystemLevel};
use delver_engine::llm::OpenAiClient;
use delver_engine::{Database, GameConfig, LlmPort, StubLlm, World, DEFAULT_SAVE};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "delver_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration: delver.conf when present, environment on top
    let config_path = Path::new("delver.conf");
    let config = GameConfig::load(config_path.exists().then_some(config_path))?;
    tracing::info!("Configuration loaded");

    let save_dir = std::env::var("DELVER_SAVE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("saves"));
    std::fs::create_dir_all(&save_dir)?;

    let db_path = save_dir.join("world.db");
    let db = Database::open(&db_path.to_string_lossy()).await?;

    // LLM collaborator: real client with a key, deterministic stub without
    let llm: Arc<dyn LlmPort> = match &config.openai_api_key {
        Some(key) => {
            tracing::info!(model = %config.llm_model, "LLM features enabled");
            Arc::new(OpenAiClient::new(
                delver_engine::llm::DEFAULT_BASE_URL,
                key,
                config.llm_timeout,
            ))
        }
        None => {
            tracing::info!("no API key; running in deterministic fallback mode");
            Arc::new(StubLlm::new())
        }
    };

    let autosave_interval = config.autosave_interval;
    let mut world = World::create(config, llm, db, save_dir).await?;
    let mut events = world.events.subscribe();

    println!("DELVER - down among the dead rooms. Type 'help' for commands.\n");
    world.execute("look").await?;
    drain_events(&mut events);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut ticker = tokio::time::interval(autosave_interval.max(Duration::from_secs(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await; // the first tick fires immediately; swallow it

    loop {
        print!("> ");
        use std::io::Write;
        std::io::stdout().flush().ok();

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break; // EOF
                };
                world.execute(&line).await?;
                drain_events(&mut events);
                if world.quit_requested {
                    break;
                }
            }
            _ = ticker.tick() => {
                // wall-clock autosave; shares the counter with move-triggered saves
                if world.autosave.interval_due() {
                    if let Err(err) = world.save_snapshot(DEFAULT_SAVE).await {
                        tracing::warn!(%err, "interval autosave failed");
                    }
                }
                drain_events(&mut events);
            }
        }
    }

    // drain pending mutations before exit
    world.save_snapshot(DEFAULT_SAVE).await?;
    drain_events(&mut events);
    println!("Saved. Goodbye.");
    Ok(())
}

/// Print everything the engine emitted since the last drain
fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<StampedEvent>) {
    while let Ok(stamped) = rx.try_recv() {
        match stamped.event {
            GameEvent::Narrative { text } => println!("{text}"),
            GameEvent::PlayerAction { text } => println!("{text}"),
            GameEvent::Combat { text } => println!("  {text}"),
            GameEvent::System { level, message } => match level {
                SystemLevel::Info => println!("[{message}]"),
                SystemLevel::Warning => println!("[!] {message}"),
                SystemLevel::Error => eprintln!("[ERROR] {message}"),
            },
            GameEvent::Quest { message, .. } => println!("* {message}"),
            GameEvent::StatusUpdate { hp, max_hp, location } => {
                if let (Some(hp), Some(max_hp)) = (hp, max_hp) {
                    println!("  [hp {hp}/{max_hp}]");
                }
                if let Some(location) = location {
                    println!("  [now in: {location}]");
                }
            }
        }
    }
}
