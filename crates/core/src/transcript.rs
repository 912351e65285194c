use crate::persona::PersonaId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One attributed utterance. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub speaker: PersonaId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn is_diagnostic(&self) -> bool {
        is_diagnostic(&self.text)
    }
}

/// System notices and error lines start with a parenthesis or bracket.
pub fn is_diagnostic(text: &str) -> bool {
    let text = text.trim_start();
    text.starts_with('(') || text.starts_with('[')
}

/// The conversation so far, in the order it happened.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a turn. Timestamps never go backwards, even if the wall clock does.
    pub fn append(&mut self, speaker: PersonaId, text: String) -> &Turn {
        let now = Utc::now();
        let timestamp = match self.turns.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };
        self.turns.push(Turn {
            id: Uuid::new_v4(),
            speaker,
            text,
            timestamp,
        });
        &self.turns[self.turns.len() - 1]
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of turns taken by anyone but the moderator.
    pub fn debater_turns(&self) -> usize {
        self.turns
            .iter()
            .filter(|turn| !turn.speaker.is_moderator())
            .count()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}
