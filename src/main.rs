mod app;
mod board;
mod config;
mod event;
mod github;
mod input;
mod logging;
mod ui;
mod worker;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{bail, WrapErr};
use tokio::sync::mpsc;
use tracing::info;

use app::{App, Prefill};
use board::pagination::MAX_PAGE_SIZE;
use github::auth::{self, AuthError};
use github::client::GithubClient;
use github::ApiError;
use worker::Worker;

#[derive(Parser, Debug)]
#[command(name = "ghboard", version, about = "A keyboard-first terminal board for GitHub Projects")]
struct Cli {
    /// User or organization that owns the project
    #[arg(short, long)]
    owner: Option<String>,

    /// Project number; skips the project picker
    #[arg(short, long)]
    project: Option<u32>,

    /// Single-select field to group columns by
    #[arg(short = 'f', long)]
    group_field: Option<String>,

    /// Cards fetched per request (1-100)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_PAGE_SIZE as i64))]
    page_size: Option<u32>,

    /// Config file (default: ~/.config/ghboard/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    // Install color_eyre for unexpected panics/errors (developer bugs).
    let _ = color_eyre::install();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        print_user_error(&e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> color_eyre::Result<()> {
    let config = config::load(cli.config.as_deref())?;
    let _log_guard = logging::init(&config.log_level);
    info!(version = env!("CARGO_PKG_VERSION"), "starting");

    let prefill = prefill(&cli, config.owner.clone())?;
    let page_size = cli.page_size.unwrap_or(config.page_size);

    let token = auth::resolve_token()?;
    let client = GithubClient::new(config.api_url.clone(), token)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("failed to start async runtime")?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let worker = Worker::new(Arc::new(client), runtime.handle().clone(), tx);
    let mut app = App::new(prefill, page_size, config.notification_ttl());

    let mut terminal = ratatui::init();
    let result = app::run(&mut terminal, &mut app, &worker, &mut rx);
    ratatui::restore();
    info!("exiting");
    result
}

/// Command-line values win over the config file.
fn prefill(cli: &Cli, config_owner: Option<String>) -> color_eyre::Result<Prefill> {
    let owner = cli.owner.clone().or(config_owner);
    if cli.project.is_some() && owner.is_none() {
        bail!("--project needs an owner; pass --owner or set `owner` in the config file");
    }
    Ok(Prefill {
        owner,
        project: cli.project,
        group_field: cli.group_field.clone(),
    })
}

/// Print a user-friendly error message, with actionable hints for known error types.
fn print_user_error(error: &color_eyre::Report) {
    if let Some(AuthError::NoToken { gh }) = error.downcast_ref::<AuthError>() {
        eprintln!("error: no GitHub token available.");
        if !gh.is_empty() {
            eprintln!("  gh: {gh}");
        }
        eprintln!("  Run `gh auth login` or export {}.", auth::TOKEN_ENV);
        return;
    }

    if let Some(config_err) = error.downcast_ref::<config::ConfigError>() {
        match config_err {
            config::ConfigError::Parse { path, source } => {
                eprintln!("error: config file has invalid TOML syntax: {}", path.display());
                eprintln!("  {source}");
            }
            config::ConfigError::Io { path, source } => {
                eprintln!("error: could not read config file {}.", path.display());
                eprintln!("  {source}");
            }
            config::ConfigError::PageSize(size) => {
                eprintln!("error: page_size {size} in config file is out of range.");
                eprintln!("  Use a value between 1 and {MAX_PAGE_SIZE}.");
            }
        }
        return;
    }

    if let Some(api_err) = error.downcast_ref::<ApiError>() {
        eprintln!("error: could not set up the GitHub client.");
        eprintln!("  {api_err}");
        return;
    }

    // For eyre::eyre!() / bail!() messages, print the full error chain.
    eprintln!("error: {e:#}", e = error);
}
