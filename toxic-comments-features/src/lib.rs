pub mod aggregator;
pub mod auxiliary;
pub mod pipeline;
pub mod progress;
pub mod ridge;
pub mod sanitizer;
pub mod stop_words;
pub mod tfidf;
pub mod tokenizer;
