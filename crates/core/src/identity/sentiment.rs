use crate::types::{Sentiment, SentimentLabel};

/// Word lists for the built-in scorer.
const POSITIVE_KEYWORDS: &[&str] = &[
    "love", "cute", "thanks", "thank you", "great", "awesome", "nice", "good", "amazing",
    "happy", "lol", "haha", "cool", "best", "beautiful",
];
const NEGATIVE_KEYWORDS: &[&str] = &[
    "hate", "stupid", "boring", "bad", "ugly", "annoying", "shut up", "worst", "dumb",
    "sad", "angry", "terrible", "awful", "cringe",
];

/// Confidence for a message with one matching keyword; each extra hit adds `STEP`.
const BASE_SCORE: i64 = 60;
const STEP: i64 = 15;
const NEUTRAL_SCORE: i64 = 80;

/// Sentiment collaborator: classifies a message into a polarity plus a 0–100 magnitude.
pub trait SentimentAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Sentiment;
}

/// Keyword-counting analyzer. Stands in for a hosted sentiment service.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordSentiment;

impl KeywordSentiment {
    pub fn new() -> Self {
        Self
    }
}

/// Lower-cased alphanumeric words of `text`.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Number of keywords present as whole words. Multi-word keywords must
/// appear as adjacent words.
fn count_hits(words: &[String], keywords: &[&str]) -> i64 {
    keywords
        .iter()
        .filter(|kw| {
            let phrase: Vec<&str> = kw.split_whitespace().collect();
            words
                .windows(phrase.len())
                .any(|window| window.iter().zip(&phrase).all(|(w, p)| w == p))
        })
        .count() as i64
}

fn confidence(hits: i64) -> i64 {
    (BASE_SCORE + STEP * (hits - 1)).min(100)
}

impl SentimentAnalyzer for KeywordSentiment {
    fn analyze(&self, text: &str) -> Sentiment {
        let words = tokenize(text);
        let positive = count_hits(&words, POSITIVE_KEYWORDS);
        let negative = count_hits(&words, NEGATIVE_KEYWORDS);
        match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => {
                Sentiment::new(SentimentLabel::Positive, confidence(positive - negative))
            }
            std::cmp::Ordering::Less => {
                Sentiment::new(SentimentLabel::Negative, confidence(negative - positive))
            }
            std::cmp::Ordering::Equal => Sentiment::new(SentimentLabel::Neutral, NEUTRAL_SCORE),
        }
    }
}
