use std::collections::BTreeMap;

use aiko_llm::provider::Role;

use super::window::BoundedWindow;
use crate::types::Turn;

const PERSONAL_KEYWORDS: &[&str] = &["you"];
const PREFERENCE_KEYWORDS: &[&str] = &["favorite", "like"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MemoryError {
    #[error("unknown personality: {0}")]
    UnknownPersonality(String),
    #[error("note index {index} out of range (capacity {capacity})")]
    NoteIndexOutOfRange { index: usize, capacity: usize },
}

/// Assembles the prompt context handed to the completion call.
///
/// Context order is fixed: personality, scenario, notes, rolling turns, then
/// the optional profile. Identity anchors the first position and the most
/// volatile context sits closest to the new input.
#[derive(Debug)]
pub struct ConversationMemory {
    personalities: BTreeMap<String, String>,
    active: String,
    scenario: BoundedWindow<Turn>,
    notes: BoundedWindow<Turn>,
    turns: BoundedWindow<Turn>,
    profile: Option<String>,
    /// Keyword-instruction table, longest key first so the most specific prefix wins.
    keywords: Vec<(String, String)>,
}

impl ConversationMemory {
    pub fn new(
        personalities: BTreeMap<String, String>,
        active: &str,
        max_notes: usize,
        max_turns: usize,
    ) -> Result<Self, MemoryError> {
        if !personalities.contains_key(active) {
            return Err(MemoryError::UnknownPersonality(active.to_owned()));
        }
        Ok(Self {
            personalities,
            active: active.to_owned(),
            scenario: BoundedWindow::new(1),
            notes: BoundedWindow::new(max_notes),
            turns: BoundedWindow::new(max_turns),
            profile: None,
            keywords: Vec::new(),
        })
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        let profile = profile.into();
        self.profile = (!profile.trim().is_empty()).then_some(profile);
        self
    }

    pub fn with_keywords(mut self, keywords: BTreeMap<String, String>) -> Self {
        let mut table: Vec<_> = keywords.into_iter().collect();
        table.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        self.keywords = table;
        self
    }

    /// Ordered context: personality, scenario, notes, rolling turns, optional profile.
    pub fn build_context(&self, include_profile: bool) -> Vec<Turn> {
        let mut context = vec![Turn::system(self.personality_text())];
        context.extend(self.scenario.items().cloned());
        context.extend(self.notes.items().cloned());
        context.extend(self.turns.items().cloned());
        if include_profile && let Some(profile) = &self.profile {
            context.push(Turn::system(profile.clone()));
        }
        context
    }

    /// Full request for `message`: context, any matching keyword instruction
    /// (system-role messages only), then the message itself.
    pub fn build_request(&self, message: &str, use_system_role: bool) -> Vec<Turn> {
        let mut request = self.build_context(wants_profile(message));
        if use_system_role {
            if let Some((keyword, instructions)) = self.keyword_for(message) {
                tracing::debug!(keyword = %keyword, "injecting keyword instructions");
                request.push(Turn::system(instructions.clone()));
            }
            request.push(Turn::system(message));
        } else {
            request.push(Turn::user(message));
        }
        request
    }

    pub fn append_turn(&mut self, text: impl Into<String>, role: Role) {
        self.turns.push(Turn::new(role, text));
    }

    /// Swap the active personality. Notes and rolling turns are kept.
    pub fn switch_personality(&mut self, id: &str) -> Result<(), MemoryError> {
        if !self.personalities.contains_key(id) {
            return Err(MemoryError::UnknownPersonality(id.to_owned()));
        }
        if self.active != id {
            tracing::info!(from = %self.active, to = %id, "personality switched");
            self.active = id.to_owned();
        }
        Ok(())
    }

    pub fn active_personality(&self) -> &str {
        &self.active
    }

    pub fn has_personality(&self, id: &str) -> bool {
        self.personalities.contains_key(id)
    }

    pub fn personality_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.personalities.keys().map(String::as_str)
    }

    pub fn scenario(&self) -> Option<&str> {
        self.scenario.items().next().map(|t| t.text.as_str())
    }

    /// Replace the scenario. Blank text clears it.
    pub fn change_scenario(&mut self, text: &str) {
        if text.trim().is_empty() {
            self.scenario.clear(0);
        } else {
            self.scenario.push(Turn::system(text));
        }
    }

    pub fn add_note(&mut self, text: impl Into<String>) {
        self.notes.push(Turn::system(text));
    }

    /// Remove one note, leaving the others in their slots.
    pub fn delete_note(&mut self, index: usize) -> Result<(), MemoryError> {
        let capacity = self.notes.capacity();
        if index >= capacity {
            return Err(MemoryError::NoteIndexOutOfRange { index, capacity });
        }
        self.notes.clear(index);
        Ok(())
    }

    pub fn clear_notes(&mut self) {
        for i in 0..self.notes.capacity() {
            self.notes.clear(i);
        }
    }

    /// Pending notes with their slot index.
    pub fn notes(&self) -> Vec<(usize, &str)> {
        self.notes
            .indexed()
            .map(|(i, turn)| (i, turn.text.as_str()))
            .collect()
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> + '_ {
        self.turns.items()
    }

    fn personality_text(&self) -> &str {
        self.personalities
            .get(&self.active)
            .map(String::as_str)
            .unwrap_or_default()
    }

    fn keyword_for(&self, message: &str) -> Option<&(String, String)> {
        self.keywords.iter().find(|(key, _)| message.starts_with(key.as_str()))
    }
}

/// The profile is only worth its tokens when the message asks about the
/// character's own preferences.
pub fn wants_profile(message: &str) -> bool {
    let lower = message.to_lowercase();
    PERSONAL_KEYWORDS.iter().any(|k| lower.contains(k))
        && PREFERENCE_KEYWORDS.iter().any(|k| lower.contains(k))
}
