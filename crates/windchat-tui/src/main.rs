use std::fs::{self, File};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use windchat_core::{Config, Credential, HttpGateway, SessionController};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "windchat")]
#[command(about = "Terminal client for the wind turbine diagnostics assistant")]
struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(long)]
    base_url: Option<String>,
    /// Bearer token (overrides WINDCHAT_TOKEN and the config file)
    #[arg(long)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config
    let mut config = Config::load().unwrap_or_else(|_| Config::new());
    if let Some(base_url) = cli.base_url {
        config.api_base_url = base_url;
    }

    let token = cli
        .token
        .or_else(|| config.resolve_token())
        .ok_or_else(|| anyhow!("No credential available: pass --token or set WINDCHAT_TOKEN"))?;

    init_logging()?;
    tracing::info!(base_url = %config.api_base_url, "starting session");

    let gateway = match config.request_timeout() {
        Some(timeout) => HttpGateway::with_timeout(&config.api_base_url, timeout)?,
        None => HttpGateway::new(&config.api_base_url),
    };
    let session = SessionController::new(gateway, Credential::new(token));
    let mut app = App::new(session, config.dark_mode);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &mut app).await;

    tui::restore()?;
    app.logout();
    result
}

async fn run(terminal: &mut Tui, app: &mut App) -> Result<()> {
    app.status = Some("Loading chat history...".to_string());
    terminal.draw(|frame| ui::render(app, frame))?;
    app.hydrate().await;

    let mut events = EventHandler::new();
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    Ok(())
}

/// Log to a file so output never lands on the alternate screen
fn init_logging() -> Result<()> {
    let log_dir = Config::config_dir()?;
    fs::create_dir_all(&log_dir)?;
    let log_file = File::create(log_dir.join("windchat.log"))?;

    let filter = EnvFilter::try_from_env("WINDCHAT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();

    Ok(())
}
