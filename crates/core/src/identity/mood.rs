//! Mood accumulator and its threshold bucketing.
//!
//! Sentiment scores accumulate into a signed integer. The integer is bucketed
//! into an odd number of levels symmetric around neutral; each level further
//! out needs half the extra score the previous one did.

use std::str::FromStr;
use std::sync::Mutex;

use crate::config::AikoCfg;
use crate::types::{Sentiment, SentimentLabel};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MoodError {
    #[error("invalid mood configuration: {0}")]
    InvalidConfiguration(String),
}

/// Signed distance from the neutral level. Displays as "-1", "0", "+2".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MoodLevel(pub i32);

impl MoodLevel {
    pub const NEUTRAL: Self = Self(0);
}

impl std::fmt::Display for MoodLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 > 0 {
            write!(f, "+{}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for MoodLevel {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('+').parse().map(Self)
    }
}

/// Half-open score range `[start, end)` mapped to a level. The outermost
/// ranges extend to the integer limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelRange {
    pub start: i64,
    pub end: i64,
    pub level: MoodLevel,
}

/// Build the level table for `level_count` levels leaving neutral at `±magnitude`.
pub fn threshold_table(magnitude: i64, level_count: usize) -> Result<Vec<LevelRange>, MoodError> {
    if level_count % 2 == 0 {
        return Err(MoodError::InvalidConfiguration(format!(
            "level count must be odd, got {level_count}"
        )));
    }
    if magnitude <= 0 {
        return Err(MoodError::InvalidConfiguration(format!(
            "magnitude must be positive, got {magnitude}"
        )));
    }

    let steps = level_count / 2;
    let mut positive = Vec::with_capacity(steps);
    let mut boundary = magnitude;
    let mut increment = magnitude;
    for _ in 0..steps {
        positive.push(boundary);
        increment /= 2;
        boundary = boundary.saturating_add(increment);
    }
    if positive.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(MoodError::InvalidConfiguration(format!(
            "magnitude {magnitude} cannot be split into {level_count} distinct levels"
        )));
    }

    let mut cuts = Vec::with_capacity(2 * steps + 2);
    cuts.push(i64::MIN);
    cuts.extend(positive.iter().rev().map(|b| -b));
    cuts.extend(positive.iter().copied());
    cuts.push(i64::MAX);

    Ok(cuts
        .windows(2)
        .enumerate()
        .map(|(i, pair)| LevelRange {
            start: pair[0],
            end: pair[1],
            level: MoodLevel(i as i32 - steps as i32),
        })
        .collect())
}

/// Thread-safe mood accumulator.
#[derive(Debug)]
pub struct MoodEngine {
    score: Mutex<i64>,
    table: Vec<LevelRange>,
    irritability: i64,
}

impl MoodEngine {
    pub fn new(magnitude: i64, level_count: usize, irritability: i64) -> Result<Self, MoodError> {
        Ok(Self {
            score: Mutex::new(0),
            table: threshold_table(magnitude, level_count)?,
            irritability: irritability.saturating_abs(),
        })
    }

    pub fn from_cfg(cfg: &AikoCfg) -> Result<Self, MoodError> {
        Self::new(
            cfg.mood_change_threshold,
            cfg.mood_levels,
            cfg.irritability_threshold,
        )
    }

    /// Apply one message's sentiment. Returns the new score.
    ///
    /// Neutral input only moves the score once it has left the irritability
    /// zone `[-t, t)`, and then pushes it further the way it already leans.
    /// A score of exactly zero leans negative.
    pub fn update(&self, label: SentimentLabel, magnitude: i64) -> i64 {
        let mut score = self.score.lock().unwrap_or_else(|e| e.into_inner());
        let before = *score;
        *score = match label {
            SentimentLabel::Positive => before.saturating_add(magnitude),
            SentimentLabel::Negative => before.saturating_sub(magnitude),
            SentimentLabel::Neutral if self.is_irritable(before) => {
                let nudge = magnitude / 2;
                if before > 0 {
                    before.saturating_add(nudge)
                } else {
                    before.saturating_sub(nudge)
                }
            }
            SentimentLabel::Neutral => before,
        };
        tracing::debug!(?label, magnitude, before, after = *score, "mood updated");
        *score
    }

    pub fn apply(&self, sentiment: Sentiment) -> i64 {
        self.update(sentiment.label, sentiment.score)
    }

    pub fn current_score(&self) -> i64 {
        *self.score.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current_level(&self) -> MoodLevel {
        self.level_for(self.current_score())
    }

    pub fn level_for(&self, score: i64) -> MoodLevel {
        self.table
            .iter()
            .rev()
            .find(|range| score >= range.start)
            .map_or(MoodLevel::NEUTRAL, |range| range.level)
    }

    pub fn table(&self) -> &[LevelRange] {
        &self.table
    }

    /// Reset to neutral, e.g. at the start of a new session.
    pub fn reset(&self) {
        *self.score.lock().unwrap_or_else(|e| e.into_inner()) = 0;
    }

    fn is_irritable(&self, score: i64) -> bool {
        !(-self.irritability..self.irritability).contains(&score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> MoodEngine {
        MoodEngine::new(600, 5, 300).unwrap()
    }

    #[test]
    fn table_for_default_config() {
        let table = threshold_table(600, 5).unwrap();
        let bounds: Vec<_> = table.iter().map(|r| (r.start, r.end, r.level.0)).collect();
        assert_eq!(
            bounds,
            vec![
                (i64::MIN, -900, -2),
                (-900, -600, -1),
                (-600, 600, 0),
                (600, 900, 1),
                (900, i64::MAX, 2),
            ]
        );
    }

    #[test]
    fn outer_gaps_halve() {
        let table = threshold_table(800, 7).unwrap();
        let cuts: Vec<_> = table.iter().skip(1).map(|r| r.start).collect();
        assert_eq!(cuts, vec![-1400, -1200, -800, 800, 1200, 1400]);
    }

    #[test]
    fn single_level_is_always_neutral() {
        let engine = MoodEngine::new(600, 1, 300).unwrap();
        engine.update(SentimentLabel::Negative, 10_000);
        assert_eq!(engine.current_level(), MoodLevel::NEUTRAL);
    }

    #[test]
    fn even_level_count_rejected() {
        assert!(matches!(
            MoodEngine::new(600, 4, 300),
            Err(MoodError::InvalidConfiguration(_))
        ));
        assert!(MoodEngine::new(0, 5, 300).is_err());
    }

    #[test]
    fn magnitude_too_small_for_level_count_rejected() {
        assert!(matches!(
            threshold_table(1, 5),
            Err(MoodError::InvalidConfiguration(_))
        ));
        assert!(threshold_table(3, 7).is_err());
        assert!(threshold_table(i64::MAX, 5).is_err());
        let cuts: Vec<_> = threshold_table(2, 5)
            .unwrap()
            .iter()
            .skip(1)
            .map(|r| r.start)
            .collect();
        assert_eq!(cuts, vec![-3, -2, 2, 3]);
    }

    #[test]
    fn starts_neutral() {
        let engine = engine();
        assert_eq!(engine.current_score(), 0);
        assert_eq!(engine.current_level(), MoodLevel::NEUTRAL);
    }

    #[test]
    fn repeated_negative_input_saturates_at_lowest_level() {
        let engine = engine();
        let mut previous = engine.current_level();
        let mut seen = Vec::new();
        for _ in 0..6 {
            engine.update(SentimentLabel::Negative, 700);
            let level = engine.current_level();
            assert!(level <= previous, "mood level went up on negative input");
            seen.push(level.0);
            previous = level;
        }
        assert_eq!(seen, vec![-1, -2, -2, -2, -2, -2]);
    }

    #[test]
    fn neutral_inside_irritability_zone_has_no_effect() {
        let engine = engine();
        assert_eq!(engine.update(SentimentLabel::Neutral, 50), 0);
        engine.update(SentimentLabel::Positive, 299);
        assert_eq!(engine.update(SentimentLabel::Neutral, 80), 299);
        engine.update(SentimentLabel::Negative, 599);
        assert_eq!(engine.current_score(), -300);
    }

    #[test]
    fn neutral_outside_zone_follows_current_lean() {
        let engine = engine();
        engine.update(SentimentLabel::Positive, 300);
        assert_eq!(engine.update(SentimentLabel::Neutral, 80), 340);

        engine.reset();
        engine.update(SentimentLabel::Negative, 301);
        assert_eq!(engine.update(SentimentLabel::Neutral, 80), -341);
    }

    #[test]
    fn zero_score_ties_toward_negative() {
        let engine = MoodEngine::new(600, 5, 0).unwrap();
        assert_eq!(engine.update(SentimentLabel::Neutral, 40), -20);
    }

    #[test]
    fn level_boundaries_are_half_open() {
        let engine = engine();
        assert_eq!(engine.level_for(599), MoodLevel(0));
        assert_eq!(engine.level_for(600), MoodLevel(1));
        assert_eq!(engine.level_for(-600), MoodLevel(0));
        assert_eq!(engine.level_for(-601), MoodLevel(-1));
        assert_eq!(engine.level_for(i64::MAX), MoodLevel(2));
        assert_eq!(engine.level_for(i64::MIN), MoodLevel(-2));
    }

    #[test]
    fn level_labels() {
        assert_eq!(MoodLevel(2).to_string(), "+2");
        assert_eq!(MoodLevel(0).to_string(), "0");
        assert_eq!(MoodLevel(-1).to_string(), "-1");
        assert_eq!("+2".parse::<MoodLevel>(), Ok(MoodLevel(2)));
        assert_eq!("-1".parse::<MoodLevel>(), Ok(MoodLevel(-1)));
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let engine = std::sync::Arc::new(engine());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = std::sync::Arc::clone(&engine);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        engine.update(SentimentLabel::Positive, 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(engine.current_score(), 800);
    }
}
