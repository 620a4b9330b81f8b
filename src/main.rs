use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyEventKind};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

mod actions;
mod app;
mod command;
mod config;
mod correlate;
mod dashboard;
mod error;
mod export;
mod fetch;
mod grouping;
mod process;
mod serve;
mod staleness;
mod tmux;
mod yabai;

use actions::Action;
use app::App;
use config::Config;
use dashboard::Dashboard;
use export::SpacesResponse;
use fetch::Sources;

#[derive(Parser)]
#[command(name = "stop", about = "space top: what is running on which display, and how stale it is")]
struct Cli {
    /// Config file (default: <config dir>/stop/config.json)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve spaces and tmux staleness as JSON over HTTP
    Serve {
        /// Port to listen on
        #[arg(long, short = 'p')]
        port: Option<u16>,
    },
    /// Print one JSON snapshot and exit
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Some(Command::Serve { port }) => {
            init_stderr_logging();
            let port = port.unwrap_or(config.serve_port);
            serve::run(config, port).await
        }
        Some(Command::Json) => {
            init_stderr_logging();
            print_json(config).await
        }
        None => {
            init_file_logging()?;
            run_tui(config).await
        }
    }
}

/// `info` unless `RUST_LOG` says otherwise
fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// The terminal belongs to the UI, so the TUI logs to a file instead
fn init_file_logging() -> Result<()> {
    let Some(dir) = dirs::cache_dir().map(|d| d.join("stop")) else {
        return Ok(());
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("stop.log"))
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn print_json(config: Config) -> Result<()> {
    let snapshot = Sources::from_config(&config)
        .fetch_all()
        .await
        .context("Failed to query spaces (is yabai running?)")?;
    let dashboard = Dashboard::build(snapshot, &config);
    let body = SpacesResponse::build(&dashboard, &config, chrono::Utc::now());
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn run_tui(config: Config) -> Result<()> {
    // Create event channel
    let (tx, mut rx) = mpsc::unbounded_channel::<Action>();

    let sources = Sources::from_config(&config);
    let refresh = Arc::new(Notify::new());
    let poll_interval = config.poll_interval();

    // Initialize terminal
    let mut terminal = ratatui::init();

    // Spawn input handler
    let input_tx = tx.clone();
    tokio::task::spawn_blocking(move || loop {
        if event::poll(Duration::from_millis(100)).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                if key.kind == KeyEventKind::Press && input_tx.send(Action::KeyPress(key)).is_err() {
                    break;
                }
            }
        }
        if input_tx.is_closed() {
            break;
        }
    });

    // Spawn poller; a focus change wakes it early
    let poll_tx = tx.clone();
    let poll_sources = sources.clone();
    let poll_refresh = refresh.clone();
    tokio::spawn(async move {
        loop {
            let action = match poll_sources.fetch_all().await {
                Ok(snapshot) => Action::SnapshotUpdated(Box::new(snapshot)),
                Err(e) => Action::FetchFailed(e.to_string()),
            };
            if poll_tx.send(action).is_err() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                _ = poll_refresh.notified() => {}
            }
        }
    });

    info!(interval = ?poll_interval, "stop started");

    // Create app state
    let mut app = App::new(config);

    // Main event loop
    let result = loop {
        // Render
        if let Err(e) = terminal.draw(|f| app.render(f)) {
            break Err(e.into());
        }

        // Process any pending actions from the app
        for pending_action in app.take_pending_actions() {
            if let Action::FocusSpace(index) = pending_action {
                let yabai = sources.yabai.clone();
                let deadline = sources.query_timeout();
                let refresh = refresh.clone();
                tokio::spawn(async move {
                    yabai.focus_space(index, deadline).await;
                    refresh.notify_one();
                });
            }
        }

        // Handle events from channel
        let Some(action) = rx.recv().await else {
            break Ok(());
        };
        match app.handle_action(action) {
            Ok(true) => break Ok(()),
            Ok(false) => {}
            Err(e) => break Err(e),
        }
    };

    // Restore terminal
    ratatui::restore();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    // The only test in the crate that touches RUST_LOG
    #[test]
    fn rust_log_overrides_default_level() {
        std::env::set_var("RUST_LOG", "debug");
        assert_eq!(env_filter().max_level_hint(), Some(LevelFilter::DEBUG));

        std::env::remove_var("RUST_LOG");
        assert_eq!(env_filter().max_level_hint(), Some(LevelFilter::INFO));
    }
}
