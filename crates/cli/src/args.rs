#![forbid(unsafe_code)]

use crate::CliError;
use std::collections::{BTreeMap, BTreeSet};

/// Flags that never take a value.
const SWITCHES: &[&str] = &["log-json"];

/// Command line split into positionals, `--key value` options and bare switches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Args {
    positional: Vec<String>,
    options: BTreeMap<String, String>,
    switches: BTreeSet<String>,
}

impl Args {
    pub(crate) fn parse(raw: impl IntoIterator<Item = String>) -> Result<Self, CliError> {
        let mut out = Self::default();
        let mut raw = raw.into_iter();
        while let Some(arg) = raw.next() {
            let Some(name) = arg.strip_prefix("--") else {
                out.positional.push(arg);
                continue;
            };
            if name.is_empty() {
                out.positional.extend(raw.by_ref());
                break;
            }
            if SWITCHES.contains(&name) {
                out.switches.insert(name.to_string());
                continue;
            }
            let Some(value) = raw.next() else {
                return Err(CliError::Usage(format!("--{name} requires a value")));
            };
            out.options.insert(name.to_string(), value);
        }
        Ok(out)
    }

    pub(crate) fn positional(&self) -> &[String] {
        &self.positional
    }

    pub(crate) fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    pub(crate) fn option_or_empty(&self, name: &str) -> String {
        self.option(name).unwrap_or_default().to_string()
    }

    pub(crate) fn switch(&self, name: &str) -> bool {
        self.switches.contains(name)
    }

    pub(crate) fn option_parsed<T: std::str::FromStr>(
        &self,
        name: &str,
    ) -> Result<Option<T>, CliError> {
        self.option(name)
            .map(|raw| {
                raw.trim()
                    .parse::<T>()
                    .map_err(|_| CliError::Usage(format!("--{name} must be a number")))
            })
            .transpose()
    }
}

pub(crate) fn parse_ids(raw: &[String]) -> Result<Vec<i64>, CliError> {
    if raw.is_empty() {
        return Err(CliError::Usage("at least one id is required".to_string()));
    }
    raw.iter()
        .map(|value| {
            value
                .trim()
                .parse::<i64>()
                .map_err(|_| CliError::Usage(format!("invalid id: {value}")))
        })
        .collect()
}
