#![forbid(unsafe_code)]

mod args;
mod commands;
mod config;
mod logging;

use args::Args;
use config::Config;
use reg_core::FilterError;
use reg_storage::{SqliteStore, StoreError};
use std::process::ExitCode;

#[derive(Debug)]
pub(crate) enum CliError {
    Usage(String),
    Filter(FilterError),
    Store(StoreError),
    Json(serde_json::Error),
    Logging(String),
}

impl CliError {
    fn code(&self) -> &'static str {
        match self {
            Self::Usage(_) => "USAGE",
            Self::Filter(_) => "VALIDATION",
            Self::Store(err) => err.code(),
            Self::Json(_) | Self::Logging(_) => "INTERNAL",
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usage(message) => write!(f, "{message}"),
            Self::Filter(err) => write!(f, "invalid filter: {err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "json: {err}"),
            Self::Logging(message) => write!(f, "logging: {message}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<FilterError> for CliError {
    fn from(value: FilterError) -> Self {
        Self::Filter(value)
    }
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error[{}]: {err}", err.code());
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<String, CliError> {
    let args = Args::parse(std::env::args().skip(1))?;
    let config = Config::resolve(&args);
    logging::init(&config)?;

    if args.positional().is_empty() {
        return Err(CliError::Usage(commands::USAGE.to_string()));
    }

    let store = SqliteStore::open(&config.storage_dir)?;
    let value = commands::dispatch(&store, &args)?;
    Ok(serde_json::to_string_pretty(&value)?)
}
