// Remote summarization through a local Ollama install.
// The service is opaque: we hand it a prompt and take whatever text comes back.
// Any failure is reported to the caller, which falls back to the extractive path.
use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Something that can turn text into a summary, or fail trying.
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;
    fn summarize(&self, text: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct OllamaBackend {
    bin: PathBuf,
    model: String,
    timeout: Duration,
}

impl OllamaBackend {
    pub fn new(bin: impl Into<PathBuf>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            model: model.into(),
            timeout,
        }
    }

    /// Use `model` if given, otherwise probe `ollama list` for the smallest
    /// installed model. `None` means there is nothing to talk to.
    pub fn discover(
        bin: impl Into<PathBuf>,
        model: Option<String>,
        timeout: Duration,
    ) -> Option<Self> {
        let bin = bin.into();
        let model = match model {
            Some(m) => m,
            None => {
                let probed = probe_models(&bin)?;
                info!(model = %probed, "picked smallest installed ollama model");
                probed
            }
        };
        Some(Self::new(bin, model, timeout))
    }
}

impl Backend for OllamaBackend {
    fn name(&self) -> &str {
        &self.model
    }

    fn summarize(&self, text: &str) -> Result<String> {
        let prompt = build_prompt(text);
        debug!(model = %self.model, prompt_chars = prompt.len(), "running ollama");
        let stdout = run_with_timeout(
            Command::new(&self.bin).arg("run").arg(&self.model).arg(&prompt),
            self.timeout,
        )?;
        let summary = stdout.trim();
        if summary.is_empty() {
            return Err(anyhow!("ollama returned an empty summary ({})", self.model));
        }
        Ok(summary.to_string())
    }
}

pub fn build_prompt(text: &str) -> String {
    format!(
        "You are a concise summarizer. Summarize the following text in a few sentences. \
         Keep the key facts, names and numbers. Output only the summary.\n\nText:\n{}\n\nSummary:",
        text
    )
}

fn probe_models(bin: &Path) -> Option<String> {
    let out = Command::new(bin).arg("list").output().ok()?;
    if !out.status.success() {
        debug!(status = %out.status, "ollama list failed");
        return None;
    }
    pick_smallest_model(&String::from_utf8_lossy(&out.stdout))
}

/// Parse `ollama list` output and return the model with the smallest size.
///
/// Lines look like `NAME  ID  SIZE UNIT  MODIFIED`, e.g. `gemma3:4b  a2af  3.3 GB  2 days ago`.
pub fn pick_smallest_model(listing: &str) -> Option<String> {
    let mut best: Option<(String, f64)> = None;
    for line in listing.lines() {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() < 3 {
            continue;
        }
        let size = cols[1..]
            .windows(2)
            .find_map(|pair| parse_size(pair[0], pair[1]));
        if let Some(sz) = size {
            match &best {
                Some((_, bsz)) if *bsz <= sz => {}
                _ => best = Some((cols[0].to_string(), sz)),
            }
        }
    }
    best.map(|(name, _)| name)
}

fn parse_size(value: &str, unit: &str) -> Option<f64> {
    let v: f64 = value.parse().ok()?;
    let scale = match unit.to_uppercase().as_str() {
        "GB" => 1024.0 * 1024.0 * 1024.0,
        "MB" => 1024.0 * 1024.0,
        "KB" => 1024.0,
        _ => return None,
    };
    Some(v * scale)
}

// Runs the command and returns stdout, killing the child if it outlives `timeout`.
fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<String> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("failed to invoke ollama")?;

    let mut stdout = child.stdout.take().context("ollama stdout not captured")?;
    let mut stderr = child.stderr.take().context("ollama stderr not captured")?;
    let out_reader = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf);
        buf
    });
    let err_reader = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf);
        buf
    });

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if started.elapsed() >= timeout => {
                kill_and_reap(&mut child);
                return Err(anyhow!("ollama timed out after {}s", timeout.as_secs_f32()));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                kill_and_reap(&mut child);
                return Err(e).context("failed to poll ollama");
            }
        }
    };

    let out = out_reader.join().unwrap_or_default();
    let err = err_reader.join().unwrap_or_default();
    if !status.success() {
        return Err(anyhow!(
            "ollama run failed ({}): {}",
            status,
            String::from_utf8_lossy(&err).trim()
        ));
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "NAME              ID              SIZE      MODIFIED\n\
                           mistral:latest    f974a74358d6    4.1 GB    3 weeks ago\n\
                           gemma3:1b         8648f39daa8f    815 MB    2 days ago\n\
                           llama3.2:3b       a80c4f17acd5    2.0 GB    5 days ago\n";

    #[test]
    fn test_pick_smallest_model() {
        assert_eq!(pick_smallest_model(LISTING), Some("gemma3:1b".to_string()));
    }

    #[test]
    fn test_pick_smallest_model_empty_listing() {
        assert_eq!(pick_smallest_model(""), None);
        assert_eq!(pick_smallest_model("NAME ID SIZE MODIFIED\n"), None);
    }

    #[test]
    fn test_pick_smallest_model_keeps_first_on_equal_size() {
        let listing = "a:1 id1 1 GB now\nb:1 id2 1 GB now\n";
        assert_eq!(pick_smallest_model(listing), Some("a:1".to_string()));
    }

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("1", "KB"), Some(1024.0));
        assert_eq!(parse_size("2", "mb"), Some(2.0 * 1024.0 * 1024.0));
        assert_eq!(parse_size("x", "GB"), None);
        assert_eq!(parse_size("3", "weeks"), None);
    }

    #[test]
    fn test_build_prompt_contains_text() {
        let prompt = build_prompt("Cats are mammals.");
        assert!(prompt.contains("Cats are mammals."));
        assert!(prompt.ends_with("Summary:"));
    }

    #[test]
    fn test_missing_binary_is_an_error() {
        let backend = OllamaBackend::new(
            "/nonexistent/condense-ollama",
            "mistral",
            Duration::from_secs(1),
        );
        assert!(backend.summarize("some text to summarize").is_err());
    }

    #[test]
    fn test_discover_without_binary_is_unconfigured() {
        let backend =
            OllamaBackend::discover("/nonexistent/condense-ollama", None, Duration::from_secs(1));
        assert!(backend.is_none());
    }

    #[test]
    fn test_discover_with_explicit_model() {
        let model = Some("gemma3:1b".to_string());
        let backend = OllamaBackend::discover("ollama", model, Duration::from_secs(5)).unwrap();
        assert_eq!(backend.name(), "gemma3:1b");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_timeout_captures_stdout() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo summary");
        let out = run_with_timeout(&mut cmd, Duration::from_secs(5)).unwrap();
        assert_eq!(out.trim(), "summary");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_timeout_kills_slow_child() {
        let started = Instant::now();
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("sleep 5");
        let res = run_with_timeout(&mut cmd, Duration::from_millis(200));
        assert!(res.is_err());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_kill_and_reap_leaves_no_running_child() -> Result<()> {
        let mut child = Command::new("sh").arg("-c").arg("sleep 5").spawn()?;
        kill_and_reap(&mut child);
        assert!(child.try_wait()?.is_some());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_timeout_reports_failure() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo boom >&2; exit 3");
        let res = run_with_timeout(&mut cmd, Duration::from_secs(5));
        let err = res.unwrap_err().to_string();
        assert!(err.contains("boom"));
    }
}
