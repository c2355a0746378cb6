pub mod mood;
pub mod persona;
pub mod sentiment;

pub use mood::{MoodEngine, MoodError, MoodLevel};
pub use persona::PersonaTable;
pub use sentiment::{KeywordSentiment, SentimentAnalyzer};
