// Length statistics reported next to every summary.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub original_chars: usize,
    pub summary_chars: usize,
    pub original_words: usize,
    pub summary_words: usize,
    /// Percentage of characters removed. Negative when the summary is longer.
    pub compression_ratio: i64,
}

impl SummaryStats {
    pub fn compute(original: &str, summary: &str) -> Self {
        let original_chars = original.chars().count();
        let summary_chars = summary.chars().count();
        Self {
            original_chars,
            summary_chars,
            original_words: original.split_whitespace().count(),
            summary_words: summary.split_whitespace().count(),
            compression_ratio: compression_ratio(original_chars, summary_chars),
        }
    }
}

/// `round((original - summary) / original * 100)`, halves rounded up.
pub fn compression_ratio(original_chars: usize, summary_chars: usize) -> i64 {
    if original_chars == 0 {
        return 0;
    }
    let removed = original_chars as f64 - summary_chars as f64;
    (removed / original_chars as f64 * 100.0 + 0.5).floor() as i64
}
