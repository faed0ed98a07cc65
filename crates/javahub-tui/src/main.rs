//! javahub - a terminal client for the Java Learning Hub.
//!
//! Browse courses and topics, practise, take quizzes and run Java code from
//! a keyboard-driven interface. The session credential is kept between runs
//! until the server rejects it or the user logs out.

mod app;
mod ui;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use javahub_core::api::ApiClient;
use javahub_core::auth::{Navigator, SessionGuard, SessionState, SessionStore};
use javahub_core::config::Config;

use app::{App, AppState, PASSWORD_ENV, USERNAME_ENV};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE: &str = "javahub.log";

/// Initialize the tracing subscriber, writing to a file in `log_dir`.
/// The terminal belongs to the UI, so nothing is logged to stderr.
fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, LOG_FILE));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: {:#}, using defaults", e);
        Config::default()
    });
    let data_dir = config.data_dir()?;
    let _log_guard = init_tracing(&data_dir)?;

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("--status") => return print_status(&config, &data_dir),
        Some("--logout") => return logout(&config, &data_dir),
        Some("--login") => return login_interactive(config, &data_dir).await,
        Some("--help") | Some("-h") => {
            print_usage();
            return Ok(());
        }
        Some(other) => {
            print_usage();
            anyhow::bail!("Unknown argument: {}", other);
        }
        None => {}
    }

    info!("javahub starting");

    let mut app = App::new(config)?;
    if app.is_authenticated() {
        app.load_current_tab();
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("javahub shutting down");
    Ok(())
}

fn print_usage() {
    eprintln!("Usage: javahub [--login | --logout | --status]");
    eprintln!();
    eprintln!("  --login    Sign in from the command line");
    eprintln!("  --logout   Forget the stored session");
    eprintln!("  --status   Show who is signed in");
}

// ============================================================================
// Command-line session commands
// ============================================================================

/// Outside the TUI there is no login screen to return to
struct CliNavigator;

impl Navigator for CliNavigator {
    fn to_entry_point(&self) {
        info!("Session cleared");
    }
}

fn cli_guard(config: &Config, data_dir: &Path) -> SessionGuard {
    SessionGuard::new(SessionStore::open(config.storage, data_dir), Arc::new(CliNavigator))
}

fn print_status(config: &Config, data_dir: &Path) -> Result<()> {
    match cli_guard(config, data_dir).session_state() {
        SessionState::Authenticated { username, role } => {
            println!("Logged in as {} ({})", username, role);
        }
        SessionState::Anonymous => println!("Not logged in"),
    }
    println!("Server: {}", config.api_base_url());
    Ok(())
}

fn logout(config: &Config, data_dir: &Path) -> Result<()> {
    cli_guard(config, data_dir)
        .clear_credential()
        .context("Failed to clear stored session")?;
    println!("Logged out");
    Ok(())
}

/// Prompt for credentials and store the session, without starting the TUI
async fn login_interactive(mut config: Config, data_dir: &Path) -> Result<()> {
    println!("\n=== Java Learning Hub Login ===\n");

    let default_username = std::env::var(USERNAME_ENV)
        .ok()
        .or_else(|| config.last_username.clone());
    let username = match default_username {
        Some(ref last_user) => {
            let input = prompt(&format!("Username [{}]: ", last_user))?;
            if input.is_empty() {
                last_user.clone()
            } else {
                input
            }
        }
        None => prompt("Username: ")?,
    };

    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => rpassword::prompt_password("Password: ")?,
    };

    if username.is_empty() || password.is_empty() {
        anyhow::bail!(app::MISSING_CREDENTIALS_MESSAGE);
    }

    println!("\nAuthenticating...");

    let api = ApiClient::with_timeout(
        config.api_base_url(),
        cli_guard(&config, data_dir),
        config.request_timeout(),
    )?;
    let credential = api
        .login(&username, &password)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    config.last_username = Some(credential.username.clone());
    config.save()?;

    println!("Logged in as {}\n", credential.username);
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                // Handle input
                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Results from background requests and the session guard
        app.check_background_tasks();

        // Check if we should quit
        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
