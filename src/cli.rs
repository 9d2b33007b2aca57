//! Command-line argument parsing for the relay.

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

/// A webhook relay that turns chat messages into SQL against an embedded database.
#[derive(Parser, Debug)]
#[command(name = "dbrelay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Address to listen on (e.g., 127.0.0.1:8080)
    #[arg(short, long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// SQLite database file (defaults to in-memory)
    #[arg(short, long, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Path to the config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// LLM provider to use (openai, mock)
    #[arg(long, value_name = "PROVIDER")]
    pub llm: Option<String>,

    /// Accept unsigned requests (development only)
    #[arg(long)]
    pub allow_unsigned: bool,

    /// SQL file executed at startup to seed the database
    #[arg(long, value_name = "PATH")]
    pub seed: Option<PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The config file to load: `--config` if given, else the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies CLI overrides onto a loaded configuration.
    ///
    /// CLI arguments take precedence over both the config file and
    /// environment overrides.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(listen) = &self.listen {
            config.server.listen = listen.clone();
        }
        if let Some(database) = &self.database {
            config.database.path = Some(database.clone());
        }
        if let Some(llm) = &self.llm {
            config.llm.provider = llm.clone();
        }
        if self.allow_unsigned {
            config.signing.allow_unsigned = true;
        }
    }
}
