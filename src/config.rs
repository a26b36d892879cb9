use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::db::Database;
use crate::hn_client::API_ENDPOINT;

pub const SEARCH_KEY: &str = "search";
pub const INITIAL_SEARCH_TERM: &str = "React";

#[derive(Debug, Parser)]
#[command(name = "hacker_stories", version, about = "Search Hacker News stories")]
pub struct Cli {
    /// Use the bundled stories instead of the search API
    #[arg(long)]
    pub offline: bool,

    /// Search endpoint; the search term is appended to it
    #[arg(long, default_value = API_ENDPOINT)]
    pub endpoint: String,

    /// Directory holding the preferences database (default: ~/.hacker_stories)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Simulated load time of the bundled stories, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub delay_ms: u64,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one search and print the results
    Search {
        /// Term to search for (default: the remembered one)
        term: Option<String>,
    },
    /// Fold a file of JSON-lines actions through the story reducer
    Replay { file: PathBuf },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: String,
    pub offline: bool,
    pub data_dir: PathBuf,
    pub fetch_delay: Duration,
    pub search_key: String,
    pub initial_term: String,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let data_dir = match &cli.data_dir {
            Some(dir) => dir.clone(),
            None => Database::default_data_dir()?,
        };

        Ok(Self {
            endpoint: cli.endpoint.clone(),
            offline: cli.offline,
            data_dir,
            fetch_delay: Duration::from_millis(cli.delay_ms),
            search_key: SEARCH_KEY.to_string(),
            initial_term: INITIAL_SEARCH_TERM.to_string(),
        })
    }
}
