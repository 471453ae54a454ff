//! dragondeck - a terminal client for the dragon roster API.
//!
//! Authenticates through a hosted identity provider, keeps the session
//! alive with silent renewal, and lists dragons fetched from the backend
//! with the session's bearer token.

mod api;
mod app;
mod auth;
mod config;
mod models;
mod nav;
mod storage;

use std::io::{self, BufRead, Write};

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use config::Config;

/// Commands accepted at the prompt
const HELP: &str = "commands: login, logout, view <path>, refresh, quit";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Set up logging with environment-based filter
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    info!("dragondeck starting");

    let config = Config::from_env()?;
    let mut app = App::new(&config)?;

    // A redirect URL from the provider may be handed straight to the
    // process, e.g. `dragondeck 'http://localhost:4200/callback#...'`.
    let args: Vec<String> = std::env::args().collect();
    let fragment = args.get(1).and_then(|arg| app::fragment_of(arg)).map(str::to_string);
    app.start(fragment.as_deref()).await;

    let result = run_app(&mut app).await;

    app.session.unschedule_renewal().await;
    info!("dragondeck shutting down");
    result
}

async fn run_app(app: &mut App) -> Result<()> {
    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        render(app).await;

        print!("dragondeck> ");
        io::stdout().flush()?;

        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            return Ok(()); // EOF
        }

        match input.trim() {
            "login" => login_flow(app).await?,
            "logout" => {
                app.session.logout();
                if let Some(url) = app.pending_external() {
                    println!("Signed out. Finish by opening:\n  {}", url);
                }
                app.dragons.clear();
                app.last_fetch_error = None;
            }
            "refresh" => {
                app.last_fetch_error = None;
                if app.session.authenticated() {
                    app.load_dragons().await;
                }
            }
            "quit" | "q" | "exit" => return Ok(()),
            "" => {}
            other => {
                if let Some(path) = other.strip_prefix("view ") {
                    let path = path.trim().to_string();
                    if !app.guard_navigate(&path) {
                        println!("Sign in to view {}; you'll be taken back there.", path);
                        login_flow(app).await?;
                    }
                } else {
                    println!("Unknown command '{}' - {}", other, HELP);
                }
            }
        }
    }
}

/// Hosted login: hand the user the authorize URL, then consume the
/// redirect URL they paste back.
async fn login_flow(app: &mut App) -> Result<()> {
    app.session.login();
    if let Some(url) = app.pending_external() {
        println!("Open this page in your browser and sign in:\n  {}", url);
    }

    print!("Paste the full redirect URL here: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    match app::fragment_of(line.trim()) {
        Some(fragment) => app.session.handle_login_callback(fragment).await,
        None => println!("That URL has no token fragment; staying signed out."),
    }
    Ok(())
}

async fn render(app: &mut App) {
    println!();
    if !app.session.authenticated() {
        println!("Not signed in. {}", HELP);
        return;
    }

    match app.user_name() {
        Some(name) => println!("Signed in as {}", name),
        None => println!("Signed in"),
    }
    if let Some(minutes) = app.token_minutes_left() {
        println!("Token renews in about {}m", minutes);
    }

    let route = app.current_route();
    if route != "/" {
        println!("Viewing {}", route);
        return;
    }

    // The home page fetches on arrival; failures stick around on screen
    // until an explicit refresh rather than refetching every prompt.
    if app.dragons.is_empty() && app.last_fetch_error.is_none() && app.has_token() {
        app.load_dragons().await;
    }

    if let Some(ref error) = app.last_fetch_error {
        println!("Could not load dragons: {}", error);
    } else if !app.dragons_exist() {
        println!("No dragons in the roster yet.");
    } else {
        println!("Dragons:");
        for dragon in &app.dragons {
            println!("  - {}", dragon.display_line());
        }
    }
}
