use std::collections::BTreeMap;

use super::mood::{MoodError, MoodLevel};

/// Maps mood levels to the personality that should be active at that level.
/// Levels without an entry leave the current personality alone.
#[derive(Debug, Clone, Default)]
pub struct PersonaTable {
    by_level: BTreeMap<MoodLevel, String>,
}

impl PersonaTable {
    /// Build from level labels ("-2", "0", "+1", ...) to personality ids.
    pub fn from_labels(labels: &BTreeMap<String, String>) -> Result<Self, MoodError> {
        let by_level = labels
            .iter()
            .map(|(label, id)| {
                label
                    .parse::<MoodLevel>()
                    .map(|level| (level, id.to_uppercase()))
                    .map_err(|_| {
                        MoodError::InvalidConfiguration(format!("bad mood level label: {label}"))
                    })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { by_level })
    }

    pub fn personality_for(&self, level: MoodLevel) -> Option<&str> {
        self.by_level.get(&level).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_level.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.by_level.values().map(String::as_str)
    }
}
