// Runtime settings. CLI flags win, then environment variables, then defaults.
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OLLAMA_BIN: &str = "ollama";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_INPUT_CHARS: usize = 100_000;

pub const ENV_OLLAMA_BIN: &str = "CONDENSE_OLLAMA_BIN";
pub const ENV_MODEL: &str = "OLLAMA_MODEL";
pub const ENV_TIMEOUT: &str = "CONDENSE_TIMEOUT_SECS";
pub const ENV_LOCAL_ONLY: &str = "CONDENSE_LOCAL_ONLY";
pub const ENV_MAX_CHARS: &str = "CONDENSE_MAX_CHARS";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub ollama_bin: PathBuf,
    pub model: Option<String>,
    pub timeout: Duration,
    pub local_only: bool,
    pub max_input_chars: usize,
}

/// Values given on the command line; `None` defers to the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub local_only: bool,
}

impl Settings {
    pub fn load(overrides: Overrides) -> Result<Self> {
        Self::from_lookup(overrides, |key| std::env::var(key).ok())
    }

    fn from_lookup(overrides: Overrides, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let ollama_bin = env(ENV_OLLAMA_BIN)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OLLAMA_BIN.to_string());

        let model = overrides
            .model
            .or_else(|| env(ENV_MODEL))
            .filter(|m| !m.trim().is_empty());

        let timeout_secs = match overrides.timeout_secs {
            Some(secs) => secs,
            None => match env(ENV_TIMEOUT) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid {}: {:?}", ENV_TIMEOUT, raw))?,
                None => DEFAULT_TIMEOUT_SECS,
            },
        };

        let max_input_chars = match env(ENV_MAX_CHARS) {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("invalid {}: {:?}", ENV_MAX_CHARS, raw))?,
            None => DEFAULT_MAX_INPUT_CHARS,
        };

        let local_only = overrides.local_only
            || env(ENV_LOCAL_ONLY).map(|v| is_truthy(&v)).unwrap_or(false);

        Ok(Self {
            ollama_bin: PathBuf::from(ollama_bin),
            model,
            timeout: Duration::from_secs(timeout_secs),
            local_only,
            max_input_chars,
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
