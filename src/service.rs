// Calling layer around the summarizers: validate, try the remote model,
// fall back to the extractive summarizer, attach statistics.
use crate::config::Settings;
use crate::error::validate;
use crate::nlp;
use crate::ollama::{Backend, OllamaBackend};
use crate::stats::SummaryStats;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Remote,
    Extractive,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Remote => "remote",
            Method::Extractive => "extractive",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
    pub method: Method,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model: Option<String>,
    pub stats: SummaryStats,
    /// Unix seconds.
    pub generated_at: u64,
}

pub struct Summarizer {
    backend: Option<Box<dyn Backend>>,
    max_input_chars: usize,
}

impl Summarizer {
    pub fn new(backend: Option<Box<dyn Backend>>, max_input_chars: usize) -> Self {
        Self {
            backend,
            max_input_chars,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let backend = if settings.local_only {
            info!("remote summarization disabled, using extractive summarizer");
            None
        } else {
            let discovered = OllamaBackend::discover(
                &settings.ollama_bin,
                settings.model.clone(),
                settings.timeout,
            );
            if discovered.is_none() {
                info!(
                    bin = %settings.ollama_bin.display(),
                    "no ollama model available, using extractive summarizer"
                );
            }
            discovered.map(|b| Box::new(b) as Box<dyn Backend>)
        };
        Self::new(backend, settings.max_input_chars)
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Summarize `text`. Only input validation can fail; a failing remote
    /// backend is logged and replaced by the extractive summarizer.
    pub fn run(&self, text: &str) -> Result<SummaryResponse> {
        validate(text, self.max_input_chars)?;

        let (summary, method, model) = match self.try_remote(text) {
            Some((summary, model)) => (summary, Method::Remote, Some(model)),
            None => (nlp::summarize(text), Method::Extractive, None),
        };

        let stats = SummaryStats::compute(text, &summary);
        debug!(
            method = ?method,
            original_chars = stats.original_chars,
            summary_chars = stats.summary_chars,
            compression = stats.compression_ratio,
            "summary ready"
        );

        Ok(SummaryResponse {
            summary,
            method,
            model,
            stats,
            generated_at: unix_now(),
        })
    }

    fn try_remote(&self, text: &str) -> Option<(String, String)> {
        let backend = self.backend.as_ref()?;
        match backend.summarize(text) {
            Ok(summary) => Some((summary, backend.name().to_string())),
            Err(e) => {
                warn!(
                    backend = backend.name(),
                    error = %e,
                    "remote summarization failed, falling back to extractive"
                );
                None
            }
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
