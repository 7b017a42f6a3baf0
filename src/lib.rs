//! Text condensing: a remote model when one answers, a local extractive
//! summarizer when it does not.

pub mod config;
pub mod error;
pub mod input;
pub mod nlp;
pub mod ollama;
pub mod service;
pub mod stats;

pub use error::InputError;
pub use nlp::summarize;
pub use service::{Method, Summarizer, SummaryResponse};
pub use stats::SummaryStats;
