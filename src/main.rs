use std::path::Path;

use anyhow::{bail, Result};
use tracing_subscriber::EnvFilter;

mod app;
mod catalog;
mod chat;
mod config;
mod gemini;
mod handler;
mod session;
mod sse;
mod tui;
mod ui;

use app::App;
use catalog::Catalog;
use config::Config;
use gemini::{GeminiClient, RemoteServiceError};
use session::SessionManager;
use tui::AppEvent;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().unwrap_or_else(|_| Config::new());

    let config_dir = Config::config_dir()?;
    if let Err(error) = init_logging(&config_dir) {
        eprintln!("logging disabled: {error}");
    }
    tracing::info!("northstar-assistant v{} starting", env!("CARGO_PKG_VERSION"));

    let Some(api_key) = config.resolve_api_key() else {
        // Leave a template behind so the user knows where the key goes.
        if let Err(error) = config.save() {
            tracing::warn!("could not write config template: {error}");
        }
        bail!(
            "no API key configured. Set GEMINI_API_KEY, or put \"api_key\" in {}",
            config_dir.join("config.json").display()
        );
    };

    let catalog = Catalog::builtin()?;
    let system_instruction = catalog.system_instruction();

    let mut client = GeminiClient::new(&api_key, &config.resolve_model());
    if let Some(base_url) = &config.base_url {
        client = client.with_base_url(base_url);
    }

    let session = SessionManager::new(client, system_instruction);
    let mut app = App::new(catalog, session);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let result = run(&mut app, &mut terminal, &mut events).await;

    tui::restore()?;
    result
}

enum LoopStep {
    Terminal(Option<AppEvent>),
    Reply(Option<Result<String, RemoteServiceError>>),
}

async fn run(app: &mut App, terminal: &mut tui::Tui, events: &mut tui::EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        // Wake on either a terminal event or the next streamed fragment,
        // so replies render as they arrive.
        let step = tokio::select! {
            maybe_event = events.next() => LoopStep::Terminal(maybe_event),
            item = next_reply(&mut app.reply) => LoopStep::Reply(item),
        };

        match step {
            LoopStep::Terminal(Some(AppEvent::Key(key))) => handler::handle_key(app, key),
            LoopStep::Terminal(Some(AppEvent::Mouse(mouse))) => handler::handle_mouse(app, mouse),
            LoopStep::Terminal(Some(AppEvent::Resize)) => {} // next draw picks it up
            LoopStep::Terminal(Some(AppEvent::Tick)) => app.tick_animation(),
            LoopStep::Terminal(None) => break,
            LoopStep::Reply(item) => app.on_reply_event(item),
        }
    }

    Ok(())
}

/// Pull the next item off the in-flight reply stream; pends forever while
/// no reply is in flight so the select above only sees terminal events.
async fn next_reply(
    reply: &mut Option<session::ReplyStream>,
) -> Option<Result<String, RemoteServiceError>> {
    match reply {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

/// Log to a file under the config directory; the terminal owns the screen.
fn init_logging(config_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(config_dir)?;
    let log_file = std::fs::File::create(config_dir.join("northstar.log"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("northstar_assistant=info")),
        )
        .with_writer(std::sync::Arc::new(log_file))
        .with_ansi(false)
        .init();

    Ok(())
}
