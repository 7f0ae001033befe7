//! Label spaces: the independent classification axes a journal entry is tagged on.
//!
//! Each space is an ordered list of labels plus exactly one fallback label
//! meaning "no reliable signal". The fallback is reached only through the
//! decision policy and never has prototypes or a centroid. A space may also
//! carry a [`Blend`], the label returned when two readings compete closely.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the mood label space.
pub const MOOD_SPACE: &str = "mood";

/// Name of the energy label space.
pub const ENERGY_SPACE: &str = "energy";

/// Lookup of a label or space that cannot have a centroid.
///
/// Always a programming error in the label-space definition or the caller,
/// never a property of user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnknownLabelError {
    #[error("unknown label space '{0}'")]
    Space(String),

    #[error("'{label}' is not a label of space '{space}'")]
    NotMember { space: String, label: String },

    #[error("'{label}' is the fallback label of '{space}' and has no centroid")]
    Fallback { space: String, label: String },
}

/// Ambivalence rule for a label space.
///
/// When the top two scores are within the ambiguity margin and neither of them
/// is in `ambivalent`, the classifier returns `label` instead of the top score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blend {
    pub label: String,
    pub ambivalent: Vec<String>,
}

/// An ordered set of labels plus one designated fallback label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSpace {
    pub name: String,
    /// Non-fallback labels in declaration order. Ties in score resolve to the
    /// earlier label.
    pub labels: Vec<String>,
    pub fallback: String,
    #[serde(default)]
    pub blend: Option<Blend>,
}

impl LabelSpace {
    pub fn new(
        name: impl Into<String>,
        labels: impl IntoIterator<Item = impl Into<String>>,
        fallback: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            labels: labels.into_iter().map(Into::into).collect(),
            fallback: fallback.into(),
            blend: None,
        }
    }

    /// Attach an ambivalence rule. `label` is always counted as ambivalent.
    pub fn with_blend(
        mut self,
        label: impl Into<String>,
        ambivalent: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let label = label.into();
        let mut ambivalent: Vec<String> = ambivalent.into_iter().map(Into::into).collect();
        if !ambivalent.contains(&label) {
            ambivalent.insert(0, label.clone());
        }
        self.blend = Some(Blend { label, ambivalent });
        self
    }

    /// The mood space: Positive, Negative, Neutral, Mixed, Confused; fallback Unknown.
    ///
    /// Near-ties between two non-ambivalent readings blend into Mixed.
    pub fn mood() -> Self {
        Self::new(MOOD_SPACE, Mood::SCORED.iter().map(Mood::as_str), Mood::Unknown.as_str())
            .with_blend(Mood::Mixed.as_str(), [Mood::Mixed.as_str(), Mood::Confused.as_str()])
    }

    /// The energy space: High Energy, Low Energy, High Stress, Calm; fallback Unknown.
    ///
    /// No blend label: near-ties resolve to the top score.
    pub fn energy() -> Self {
        Self::new(
            ENERGY_SPACE,
            Energy::SCORED.iter().map(Energy::as_str),
            Energy::Unknown.as_str(),
        )
    }

    /// Both built-in spaces, mood first.
    pub fn defaults() -> Vec<Self> {
        vec![Self::mood(), Self::energy()]
    }

    /// Whether `label` is a non-fallback member of this space.
    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn is_fallback(&self, label: &str) -> bool {
        self.fallback == label
    }

    /// Whether `label` already expresses ambivalence in this space.
    pub fn is_ambivalent(&self, label: &str) -> bool {
        self.blend
            .as_ref()
            .is_some_and(|b| b.ambivalent.iter().any(|l| l == label))
    }

    /// Position of a non-fallback label in declaration order.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Check that `label` is a label that owns a centroid in this space.
    pub fn require_scored(&self, label: &str) -> Result<(), UnknownLabelError> {
        if self.is_fallback(label) {
            return Err(UnknownLabelError::Fallback {
                space: self.name.clone(),
                label: label.to_string(),
            });
        }
        if !self.contains(label) {
            return Err(UnknownLabelError::NotMember {
                space: self.name.clone(),
                label: label.to_string(),
            });
        }
        Ok(())
    }
}

/// Overall emotional polarity of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    Positive,
    Negative,
    Neutral,
    Mixed,
    Confused,
    Unknown,
}

impl Mood {
    /// Labels that own a centroid, in declaration order.
    pub const SCORED: [Mood; 5] = [
        Mood::Positive,
        Mood::Negative,
        Mood::Neutral,
        Mood::Mixed,
        Mood::Confused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
            Self::Mixed => "Mixed",
            Self::Confused => "Confused",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = UnknownLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SCORED
            .iter()
            .chain(std::iter::once(&Mood::Unknown))
            .find(|m| m.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownLabelError::NotMember {
                space: MOOD_SPACE.to_string(),
                label: s.to_string(),
            })
    }
}

/// Arousal/stress level of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Energy {
    #[serde(rename = "High Energy")]
    HighEnergy,
    #[serde(rename = "Low Energy")]
    LowEnergy,
    #[serde(rename = "High Stress")]
    HighStress,
    Calm,
    Unknown,
}

impl Energy {
    /// Labels that own a centroid, in declaration order.
    pub const SCORED: [Energy; 4] = [
        Energy::HighEnergy,
        Energy::LowEnergy,
        Energy::HighStress,
        Energy::Calm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighEnergy => "High Energy",
            Self::LowEnergy => "Low Energy",
            Self::HighStress => "High Stress",
            Self::Calm => "Calm",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Energy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Energy {
    type Err = UnknownLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SCORED
            .iter()
            .chain(std::iter::once(&Energy::Unknown))
            .find(|e| e.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownLabelError::NotMember {
                space: ENERGY_SPACE.to_string(),
                label: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mood_space_layout() {
        let space = LabelSpace::mood();
        assert_eq!(space.name, "mood");
        assert_eq!(
            space.labels,
            vec!["Positive", "Negative", "Neutral", "Mixed", "Confused"]
        );
        assert_eq!(space.fallback, "Unknown");
        assert!(!space.contains("Unknown"));

        let blend = space.blend.as_ref().unwrap();
        assert_eq!(blend.label, "Mixed");
        assert!(space.is_ambivalent("Mixed"));
        assert!(space.is_ambivalent("Confused"));
        assert!(!space.is_ambivalent("Positive"));
    }

    #[test]
    fn energy_space_has_no_blend() {
        let space = LabelSpace::energy();
        assert_eq!(space.labels.len(), 4);
        assert!(space.blend.is_none());
        assert!(!space.is_ambivalent("Calm"));
    }

    #[test]
    fn with_blend_counts_blend_label_as_ambivalent() {
        let space = LabelSpace::new("tone", ["Warm", "Cold", "Torn"], "None")
            .with_blend("Torn", Vec::<String>::new());
        assert!(space.is_ambivalent("Torn"));
        assert!(!space.is_ambivalent("Warm"));
    }

    #[test]
    fn require_scored_rejects_fallback_and_strangers() {
        let space = LabelSpace::energy();
        assert!(space.require_scored("Calm").is_ok());
        assert!(matches!(
            space.require_scored("Unknown"),
            Err(UnknownLabelError::Fallback { .. })
        ));
        assert!(matches!(
            space.require_scored("Positive"),
            Err(UnknownLabelError::NotMember { .. })
        ));
    }

    #[test]
    fn index_follows_declaration_order() {
        let space = LabelSpace::mood();
        assert_eq!(space.index_of("Positive"), Some(0));
        assert_eq!(space.index_of("Confused"), Some(4));
        assert_eq!(space.index_of("Unknown"), None);
    }

    #[test]
    fn mood_parses_display_strings() {
        for mood in Mood::SCORED {
            assert_eq!(mood.as_str().parse::<Mood>().unwrap(), mood);
        }
        assert_eq!("Unknown".parse::<Mood>().unwrap(), Mood::Unknown);
        assert!("positive".parse::<Mood>().is_err());
    }

    #[test]
    fn energy_serde_uses_spaced_names() {
        let json = serde_json::to_string(&Energy::HighStress).unwrap();
        assert_eq!(json, "\"High Stress\"");
        let parsed: Energy = serde_json::from_str("\"Low Energy\"").unwrap();
        assert_eq!(parsed, Energy::LowEnergy);
        assert_eq!("High Energy".parse::<Energy>().unwrap(), Energy::HighEnergy);
    }
}
