mod cache;
mod cli;
mod config;
mod db;
mod models;
mod prayer_times;
mod source;
mod tui;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use log::warn;
use std::sync::Arc;
use std::time::Duration;

use cache::{CachePolicy, TimingsCache};
use cli::args::{Cli, Commands};
use cli::handlers;
use config::AppConfig;
use db::{KeyValueStore, MemoryStore, SqliteStore};
use prayer_times::{Clock, SystemClock};
use source::{AladhanClient, location};

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Loading config")?;

    match cli.command {
        Some(Commands::Config { init }) => handlers::handle_config(&config, init)?,
        Some(Commands::Times { prayer }) => {
            let (clock, cache) = build_services(&config)?;
            handlers::handle_times(&cache, clock.as_ref(), &config, prayer.as_deref())?;
        }
        Some(Commands::Refresh) => {
            let (_, cache) = build_services(&config)?;
            handlers::handle_refresh(&cache, config.display.clock_format)?;
        }
        // No subcommand → launch TUI
        None => {
            let (clock, cache) = build_services(&config)?;
            tui::app::run(cache, clock, config)?;
        }
    }

    Ok(())
}

fn build_services(config: &AppConfig) -> Result<(Arc<dyn Clock>, Arc<TimingsCache>)> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = build_cache(config, Arc::clone(&clock))?;
    Ok((clock, Arc::new(cache)))
}

fn build_cache(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<TimingsCache> {
    let timeout = Duration::from_secs(config.api.timeout_secs);
    let provider = location::from_config(&config.location, timeout)?;
    let source = AladhanClient::new(&config.api, provider)?;

    Ok(TimingsCache::new(
        open_store(),
        Arc::new(source),
        clock,
        CachePolicy::from_config(&config.cache),
    ))
}

/// The on-disk store, or an in-memory one when the database can't be opened.
/// Without persistence every run fetches afresh.
fn open_store() -> Arc<dyn KeyValueStore> {
    let opened = AppConfig::ensure_data_dir()
        .and_then(|_| AppConfig::db_path())
        .and_then(|path| db::open(&path));

    match opened {
        Ok(conn) => Arc::new(SqliteStore::new(conn)),
        Err(e) => {
            warn!("Prayer times cache unavailable, continuing without it: {:#}", e);
            Arc::new(MemoryStore::default())
        }
    }
}
