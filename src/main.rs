// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

mod api;
mod config;
mod error;
mod fetcher;
mod models;
mod tui;
mod view;

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

use crate::api::RatesClient;
use crate::config::Config;
use crate::fetcher::{FetchState, RateFetcher};
use crate::view::TypeCase;

#[derive(Parser, Debug)]
#[command(author, version, about = "Currency exchange rates in an editable table")]
struct Cli {
    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Rates endpoint, overrides the config file and CURRENCY_RATES_ENDPOINT
    #[arg(long)]
    endpoint: Option<String>,

    /// Print the table once and exit instead of starting the terminal UI
    #[arg(long)]
    plain: bool,

    /// How to write the currency type column
    #[arg(long, value_enum)]
    type_case: Option<TypeCase>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv().ok();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let config = config::load_config(&config_path)?.with_overrides(
        [cli.endpoint.clone(), std::env::var(config::ENDPOINT_ENV).ok()],
        cli.type_case,
    );

    if cli.plain {
        init_logging(None)?;
        print_rates(&config).await
    } else {
        init_logging(Some(&config.log_file))?;
        let fetcher = new_fetcher(&config)?;
        tui::start_tui(tui::App::new(fetcher, config.type_case))?;
        Ok(ExitCode::SUCCESS)
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn new_fetcher(config: &Config) -> Result<RateFetcher> {
    let client = RatesClient::new(config.endpoint.clone(), config.request_timeout())
        .context("Failed to build HTTP client")?;
    Ok(RateFetcher::new(Arc::new(client)))
}

/// Returns a failing exit code when the fetch failed, so the fetcher is still dropped (and unmounted).
async fn print_rates(config: &Config) -> Result<ExitCode> {
    let mut fetcher = new_fetcher(config)?;

    println!("Fetching exchange rates from {} ⌛️", config.endpoint);
    fetcher.mount();
    tokio::select! {
        _ = fetcher.settled() => {}
        _ = tokio::signal::ctrl_c() => {
            fetcher.unmount();
            println!("Cancelled");
            return Ok(ExitCode::from(130));
        }
    }

    let view = view::build_view(fetcher.state(), config.type_case);
    print!("{}", view::render_plain(&view));

    Ok(ExitCode::from(exit_status(fetcher.state())))
}

fn exit_status(state: &FetchState) -> u8 {
    match state.error {
        Some(_) => 1,
        None => 0,
    }
}
