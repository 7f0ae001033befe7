//! Journal entry types shared between the inference engine and the entry store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::labels::{Energy, Mood};

/// The `(mood, energy)` pair assigned to one piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tags {
    pub mood: Mood,
    pub energy: Energy,
}

impl Tags {
    /// Both spaces at their fallback: no reliable signal.
    pub const UNKNOWN: Tags = Tags {
        mood: Mood::Unknown,
        energy: Energy::Unknown,
    };

    pub fn new(mood: Mood, energy: Energy) -> Self {
        Self { mood, energy }
    }
}

/// A labelled journal entry as persisted by the entry store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub tags: Tags,
}
