// Extractive summarization used when no remote model answers.
// Sentences are scored by stop-word-filtered term frequency plus positional boosts,
// and the best ones are returned in document order. Never fails: inputs without
// usable sentence structure degrade to a truncated prefix.
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

static SENTENCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^.!?]+[.!?]+\s*").unwrap()
});

static TERMINATOR_SPLIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[.!?]+\s+").unwrap()
});

static PARAGRAPH_SPLIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\s*\n").unwrap()
});

static SPACE_RUN_SPLIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r" {2,}").unwrap()
});

static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9_]+").unwrap()
});

// Digits or a capitalized word: names, dates, quantities.
static SALIENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d|[A-Z][a-z]+").unwrap()
});

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to",
        "for", "of", "with", "by", "from", "as", "is", "are", "was", "were",
        "be", "been", "being", "have", "has", "had", "do", "does", "did", "will",
        "would", "could", "should", "may", "might", "must", "can", "this", "that", "these",
        "those", "it", "its", "he", "she", "they", "we", "you", "what", "which",
        "who", "when", "where", "why", "how"
    ].iter().copied().collect()
});

/// Fragments at or below this many characters are not sentences.
const MIN_SENTENCE_CHARS: usize = 10;

const FIRST_SENTENCE_BOOST: f64 = 1.5;
const LAST_SENTENCE_BOOST: f64 = 1.3;
const SALIENT_BOOST: f64 = 1.2;

const MIN_SUMMARY_SENTENCES: usize = 3;
const TARGET_RATIO: f64 = 0.35;
const MAX_RATIO: f64 = 0.6;

const SHORT_TEXT_PREFIX: f64 = 0.6;
const EMPTY_SUMMARY_PREFIX: f64 = 0.4;

type Segmenter = fn(&str) -> Vec<String>;

// Tried in order; the first one that yields any sentence wins.
const SEGMENTERS: [Segmenter; 4] = [
    match_sentences,
    split_on_terminators,
    split_on_paragraphs,
    split_on_space_runs,
];

#[derive(Debug, Clone, Copy)]
struct ScoredSentence {
    index: usize,
    score: f64,
}

/// Condense `text` to its most salient sentences.
///
/// Empty or whitespace-only input is returned unchanged; anything else yields a
/// non-empty result made only of input sentences (or a prefix of the input).
pub fn summarize(text: &str) -> String {
    let normalized = text.trim();
    if normalized.is_empty() {
        return text.to_string();
    }

    let sentences = split_sentences(normalized);
    match sentences.len() {
        0..=2 => return truncate_with_ellipsis(normalized, SHORT_TEXT_PREFIX),
        3 => return sentences.join(" "),
        _ => {}
    }

    // Frequencies come from the raw input, not the trimmed copy.
    let word_freq = word_frequencies(text);
    let scored = score_sentences(&sentences, &word_freq);
    let selected = select_sentences(scored, sentences.len());

    let summary = selected
        .iter()
        .map(|&idx| sentences[idx].as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string();

    if summary.is_empty() {
        return truncate_with_ellipsis(normalized, EMPTY_SUMMARY_PREFIX);
    }
    summary
}

/// Segment `text` into sentences, falling back to coarser splits when the
/// finer ones find nothing.
pub fn split_sentences(text: &str) -> Vec<String> {
    let normalized = text.trim();
    SEGMENTERS
        .iter()
        .map(|segment| segment(normalized))
        .find(|sentences| !sentences.is_empty())
        .unwrap_or_default()
}

fn keep_sentences<'a>(pieces: impl Iterator<Item = &'a str>) -> Vec<String> {
    pieces
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .map(String::from)
        .collect()
}

fn match_sentences(text: &str) -> Vec<String> {
    keep_sentences(SENTENCE_PATTERN.find_iter(text).map(|m| m.as_str()))
}

fn split_on_terminators(text: &str) -> Vec<String> {
    keep_sentences(TERMINATOR_SPLIT.split(text))
}

fn split_on_paragraphs(text: &str) -> Vec<String> {
    keep_sentences(PARAGRAPH_SPLIT.split(text))
}

fn split_on_space_runs(text: &str) -> Vec<String> {
    keep_sentences(SPACE_RUN_SPLIT.split(text))
}

fn tokenize(s: &str) -> Vec<String> {
    WORD_PATTERN
        .find_iter(s)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

fn word_frequencies(text: &str) -> HashMap<String, usize> {
    let mut word_freq: HashMap<String, usize> = HashMap::new();
    for word in tokenize(text) {
        if word.len() <= 2 || STOP_WORDS.contains(word.as_str()) {
            continue;
        }
        *word_freq.entry(word).or_insert(0) += 1;
    }
    word_freq
}

fn score_sentences(
    sentences: &[String],
    word_freq: &HashMap<String, usize>,
) -> Vec<ScoredSentence> {
    let last = sentences.len().saturating_sub(1);
    sentences
        .iter()
        .enumerate()
        .map(|(index, sentence)| ScoredSentence {
            index,
            score: score_sentence(sentence, index, last, word_freq),
        })
        .collect()
}

fn score_sentence(
    sentence: &str,
    index: usize,
    last: usize,
    word_freq: &HashMap<String, usize>,
) -> f64 {
    let words = tokenize(sentence);
    if words.is_empty() {
        return 0.0;
    }

    let mut score: f64 = words
        .iter()
        .map(|w| word_freq.get(w).copied().unwrap_or(0) as f64)
        .sum();

    if index == 0 {
        score *= FIRST_SENTENCE_BOOST;
    }
    if index == last {
        score *= LAST_SENTENCE_BOOST;
    }
    if SALIENT_PATTERN.is_match(sentence) {
        score *= SALIENT_BOOST;
    }

    // Length-bias correction
    score / (words.len() as f64).sqrt()
}

/// At least three sentences and 35% of the input, at most 60%.
fn target_count(total: usize) -> usize {
    let wanted = (total as f64 * TARGET_RATIO).ceil() as usize;
    let ceiling = (total as f64 * MAX_RATIO).floor() as usize;
    wanted.min(ceiling).max(MIN_SUMMARY_SENTENCES)
}

fn select_sentences(mut scored: Vec<ScoredSentence>, total: usize) -> Vec<usize> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });

    let target = target_count(total);
    let mut selected = vec![0];
    if total > 1 {
        selected.push(total - 1);
    }

    for candidate in &scored {
        if selected.len() >= target {
            break;
        }
        if !selected.contains(&candidate.index) {
            selected.push(candidate.index);
        }
    }

    selected.sort_unstable();
    selected
}

fn truncate_with_ellipsis(text: &str, ratio: f64) -> String {
    let keep = (text.chars().count() as f64 * ratio).floor() as usize;
    let prefix: String = text.chars().take(keep).collect();
    format!("{}...", prefix.trim())
}
