//! Lokitos CLI - headless client for the LokitosXelFutbol backend.
//!
//! Each argument is a route (`/para-ti`, `/video/<id>`, `/post/<id>`,
//! `/user/<handle>`, ...). Routes are opened in order within one session, so
//! returning to a feed picks up where the previous visit stopped.
//!
//! ```text
//! lokitos [--steps N] [ROUTE...]
//! lokitos notifications
//! ```
//!
//! Credentials come from `LOKITOS_EMAIL` and `LOKITOS_PASSWORD`; the backend
//! from `~/.lokitos/config.toml` or `LOKITOS_BACKEND_URL`/`LOKITOS_ANON_KEY`.

mod app;
mod settings;

use std::{
    env,
    fs::{self, OpenOptions},
    io::stdout,
    path::PathBuf,
    sync::Mutex,
};

use anyhow::{Context, Result, bail};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use lokitos_backend::BackendClient;
use lokitos_config::LokitosConfig;
use lokitos_types::Route;

use crate::app::App;
use crate::settings::Settings;

const EMAIL_ENV: &str = "LOKITOS_EMAIL";
const PASSWORD_ENV: &str = "LOKITOS_PASSWORD";
const DEFAULT_STEPS: usize = 10;
const NOTIFICATION_LIMIT: usize = 30;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // Stdout carries the screens; logs go to stderr when no file is writable.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.lokitos/logs/lokitos.log
    if let Some(dir) = lokitos_config::data_dir() {
        candidates.push(dir.join("logs").join("lokitos.log"));
    }

    // Fallback: ./.lokitos/logs/lokitos.log
    candidates.push(PathBuf::from(".lokitos").join("logs").join("lokitos.log"));

    candidates
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Browse { steps: usize, routes: Vec<Route> },
    Notifications,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Command> {
    let mut steps = DEFAULT_STEPS;
    let mut routes = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "notifications" | "notificaciones" => return Ok(Command::Notifications),
            "--steps" | "-n" => {
                let Some(value) = args.next() else {
                    bail!("{arg} needs a number");
                };
                steps = value
                    .parse()
                    .with_context(|| format!("invalid step count {value:?}"))?;
            }
            path => routes.push(Route::parse(path)?),
        }
    }

    if routes.is_empty() {
        routes.push(Route::ForYou);
    }
    Ok(Command::Browse { steps, routes })
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let command = parse_args(env::args().skip(1))?;
    let config = LokitosConfig::load()?.unwrap_or_default();
    let settings = Settings::from_config(&config)?;
    let client = BackendClient::new(settings.backend.clone())?;

    let steps = match &command {
        Command::Browse { steps, .. } => *steps,
        Command::Notifications => 0,
    };
    let mut app = App::new(client, &settings, steps, stdout().lock());

    if let (Ok(email), Ok(password)) = (env::var(EMAIL_ENV), env::var(PASSWORD_ENV)) {
        app.sign_in(&email, &password).await?;
    }

    let result = match command {
        Command::Browse { routes, .. } => {
            let mut result = Ok(());
            for route in &routes {
                result = app.open(route).await;
                if result.is_err() {
                    break;
                }
            }
            result
        }
        Command::Notifications => app.show_notifications(NOTIFICATION_LIMIT).await,
    };

    // Also flushes view registrations still in flight.
    app.sign_out().await;
    result
}
