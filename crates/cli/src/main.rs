//! CLI entrypoint and subcommand orchestration.

mod config;
mod tui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use proto::SessionId;

#[cfg(not(test))]
use std::sync::Arc;

#[cfg(not(test))]
use anyhow::Context;
#[cfg(not(test))]
use client::{ApiClient, Attachment, SendRequest};
#[cfg(not(test))]
use config::Config;
#[cfg(not(test))]
use tracing::{info, warn};
#[cfg(not(test))]
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Top-level command-line arguments for the confab application.
#[derive(Parser)]
#[command(name = "confab")]
#[command(
    about = "Terminal chat client for a generative-language backend",
    version = "0.1.0"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug logging to ~/.confab/logs
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Resume an existing session by its ID (shortcut for `tui -s <id>`)
    #[arg(short = 's', long)]
    session: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// CLI subcommands available in the application.
#[derive(Subcommand)]
enum Commands {
    /// Start the full-screen chat TUI (default when no subcommand is given)
    Tui {
        /// Resume an existing session by its ID
        #[arg(short = 's', long)]
        session: Option<String>,
    },

    /// Print the model list reported by the backend
    Models,

    /// Send a single message and print the reply
    Send {
        /// Message text to send
        #[arg(short = 'm', long)]
        message: String,

        /// File to attach (repeatable)
        #[arg(short = 'f', long = "file")]
        files: Vec<PathBuf>,

        /// Enable the server-side system instruction for this message
        #[arg(long, default_value_t = false)]
        system: bool,

        /// Model id (defaults to the configured default model)
        #[arg(long)]
        model: Option<String>,
    },
}

#[cfg(not(test))]
#[tokio::main]
/// Program entrypoint.
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Determine effective command (default to Tui if none given)
    let command = cli.command.unwrap_or(Commands::Tui {
        session: cli.session.clone(),
    });
    let is_tui = matches!(command, Commands::Tui { .. });

    // Initialize tracing — suppress console output in TUI mode to avoid
    // corrupting the display. When --debug is passed, write debug-level logs
    // to ~/.confab/logs/debug.YYYY-MM-DD.log using daily rotation.
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    // WorkerGuard must outlive main() so buffered file writes are flushed on exit.
    let _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>;

    let debug_writer = if cli.debug {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let log_dir = PathBuf::from(home).join(".confab").join("logs");
        std::fs::create_dir_all(&log_dir).ok();
        let appender = tracing_appender::rolling::daily(&log_dir, "debug.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        _file_guard = Some(guard);
        Some(writer)
    } else {
        _file_guard = None;
        None
    };

    match (is_tui, debug_writer) {
        (true, Some(writer)) => {
            let console = fmt::layer()
                .with_writer(std::io::sink)
                .with_target(false)
                .with_filter(console_filter);
            let file = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .with_filter(EnvFilter::new("debug,hyper_util=info,rustls=info,reqwest=info"));
            tracing_subscriber::registry()
                .with(console)
                .with(file)
                .init();
        }
        (true, None) => {
            fmt()
                .with_env_filter(console_filter)
                .with_writer(std::io::sink)
                .with_target(false)
                .init();
        }
        (false, Some(writer)) => {
            let console = fmt::layer().with_target(false).with_filter(console_filter);
            let file = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .with_filter(EnvFilter::new("debug,hyper_util=info,rustls=info,reqwest=info"));
            tracing_subscriber::registry()
                .with(console)
                .with(file)
                .init();
        }
        (false, None) => {
            fmt()
                .with_env_filter(console_filter)
                .with_target(false)
                .init();
        }
    }

    if cli.debug {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            log_level = %cli.log_level,
            "========== confab session start =========="
        );
    }

    // Load config
    let config = Config::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Failed to load config ({e}), using defaults");
        Config::default()
    });

    match command {
        Commands::Tui { session } => cmd_tui(config, session.or(cli.session)).await,
        Commands::Models => cmd_models(config).await,
        Commands::Send {
            message,
            files,
            system,
            model,
        } => cmd_send(config, cli.session, message, files, system, model).await,
    }
}

#[cfg(not(test))]
/// Builds the backend client from resolved config values.
fn build_client(config: &Config) -> ApiClient {
    let api_key = config.resolve_api_key();
    if api_key.is_empty() {
        warn!("No API key configured. Set CONFAB_API_KEY or [api].api_key in config.toml.");
    }
    ApiClient::new(config.resolve_base_url(), api_key)
}

#[cfg(not(test))]
/// Starts the full-screen TUI for an interactive chat session.
async fn cmd_tui(config: Config, session: Option<String>) -> anyhow::Result<()> {
    let client = Arc::new(build_client(&config));
    let session_id = resolve_session(session);
    let model = config.chat.default_model.clone();

    tui::run_tui(client, session_id.clone(), model, config).await?;

    print_goodbye(&session_id);
    Ok(())
}

#[cfg(not(test))]
/// `confab models` — prints the backend's model list.
async fn cmd_models(config: Config) -> anyhow::Result<()> {
    let client = build_client(&config);
    match client.list_models().await {
        Ok(models) => {
            println!("Models ({}):", models.len());
            for model in &models {
                println!("  {model}");
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

#[cfg(not(test))]
/// `confab send` — sends one message and prints the resolved reply.
async fn cmd_send(
    config: Config,
    session: Option<String>,
    message: String,
    files: Vec<PathBuf>,
    system: bool,
    model: Option<String>,
) -> anyhow::Result<()> {
    let client = build_client(&config);
    let session_id = resolve_session(session);

    let mut attachments = Vec::with_capacity(files.len());
    for path in &files {
        let attachment = Attachment::from_path(path)
            .with_context(|| format!("reading attachment {}", path.display()))?;
        attachments.push(attachment);
    }

    let req = SendRequest {
        session_id: session_id.clone(),
        model: model.unwrap_or_else(|| config.chat.default_model.clone()),
        message,
        use_system: system,
        temperature: Some(config.chat.temperature),
        attachments,
    };

    match client.send_message(req).await {
        Ok(reply) => {
            println!("{}", reply.display_text());
            print_goodbye(&session_id);
            Ok(())
        }
        Err(e) => {
            eprintln!("Request failed: {e}");
            std::process::exit(1);
        }
    }
}

/// Resolves the session id: resume the given one or mint a fresh one.
fn resolve_session(session: Option<String>) -> SessionId {
    match session {
        Some(id) => SessionId::from(id),
        None => SessionId::new(),
    }
}

/// Prints the farewell footer with session resume instructions.
fn print_goodbye(session_id: &SessionId) {
    println!();
    println!("  Session   {session_id}");
    println!("  Continue  confab -s {session_id}");
    println!();
}
