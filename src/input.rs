// Where the text comes from: files, directories of files, or stdin.
use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["txt", "md", "csv", "json", "pdf"];

pub fn read_file(path: &Path) -> Result<String> {
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");

    match ext {
        "txt" | "md" | "csv" | "json" => {
            let mut file =
                File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
            let mut content = String::new();
            file.read_to_string(&mut content)
                .with_context(|| format!("{} is not valid UTF-8 text", path.display()))?;
            Ok(content)
        }
        "pdf" => {
            pdf_extract::extract_text(path)
                .map_err(|e| anyhow!("PDF extraction failed: {}", e))
        }
        _ => Err(anyhow!("Unsupported file format: {}", ext)),
    }
}

pub fn read_stdin() -> Result<String> {
    let mut content = String::new();
    std::io::stdin()
        .read_to_string(&mut content)
        .context("failed to read stdin")?;
    Ok(content)
}

/// Supported files under `dir`, sorted by path.
pub fn collect_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext))
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();

    files.sort();
    files
}
