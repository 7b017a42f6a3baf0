// NLP module for condense
pub mod summarization;

pub use summarization::{split_sentences, summarize};
