#![forbid(unsafe_code)]

use crate::args::Args;
use std::path::PathBuf;

const DEFAULT_STORAGE_DIR: &str = "data";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(raw) if raw.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Runtime settings. Command line flags win over environment variables.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Config {
    pub(crate) storage_dir: PathBuf,
    pub(crate) log_filter: String,
    pub(crate) log_format: LogFormat,
}

impl Config {
    pub(crate) fn resolve(args: &Args) -> Self {
        Self::from_sources(args, |key| std::env::var(key).ok())
    }

    fn from_sources(args: &Args, env: impl Fn(&str) -> Option<String>) -> Self {
        let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let storage_dir = args
            .option("storage-dir")
            .map(PathBuf::from)
            .or_else(|| env("REGISTROS_STORAGE_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR));

        let log_filter = env("REGISTROS_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let log_format = if args.switch("log-json") {
            LogFormat::Json
        } else {
            LogFormat::parse(env("REGISTROS_LOG_FORMAT").as_deref())
        };

        Self {
            storage_dir,
            log_filter,
            log_format,
        }
    }
}
