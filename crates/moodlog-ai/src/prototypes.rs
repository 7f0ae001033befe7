//! Prototype corpus: curated example sentences per label, per label space.
//!
//! Centroids are means of prototype embeddings, so the corpus is what gives
//! each label its meaning. Prototypes deliberately include slang, sarcasm,
//! emoji, and fragments so the centroids land near how people actually write.
//! Fallback labels never have prototypes.
//!
//! Override the built-in corpus with a JSON file of the form
//! `{ "<space>": { "<label>": ["sentence", ...] } }`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use moodlog_core::{ENERGY_SPACE, MOOD_SPACE};

const MOOD_POSITIVE: &[&str] = &[
    "Today was a really good day",
    "I'm so happy with how things turned out",
    "Crushing it at work, feeling unstoppable",
    "Had a lovely dinner with friends",
    "Finally finished the project and I'm proud of myself",
    "Feeling grateful for the little things",
    "Best weekend in ages 😊",
    "lowkey had the best time tonight",
    "Got great news this morning!",
    "🥳🎉",
    "Feeling really good about life right now",
    "Spent the day laughing with people I love",
    "So happy and excited, things are going my way",
    "Proud of what I got done today",
    "What a great day, everything went well",
    "Grateful and happy, such a nice evening",
    "Good vibes all day 😄",
    "Got a promotion, feeling amazing",
    "Had so much fun with my family today",
    "Really enjoyed my day, feeling content",
];

const MOOD_NEGATIVE: &[&str] = &[
    "Today was awful",
    "I feel sad and alone",
    "This week is crushing me",
    "Everything went wrong and I'm so frustrated",
    "Love that I'm working late again, just perfect",
    "Oh great, another meeting that could have been an email",
    "I can't stop crying 😭",
    "ugh, worst day ever",
    "Feeling hopeless about everything",
    "So angry at how they treated me",
    "Such a terrible day, I hate this",
    "Feeling down and lonely again",
    "My boss yelled at me and I feel awful",
    "Nothing is going right and I'm so upset",
    "Oh wonderful, stuck in traffic for two hours again",
    "Just what I needed, more work on a Friday night",
    "So thrilled to be up at 3am dealing with this mess",
    "Sad, tired, and fed up with everything",
    "Really bad day at work, I'm miserable",
    "Everything sucks right now 😞",
    "Yay, another late night at the office, so glad",
    "Glad I get to work all weekend again, just great",
];

const MOOD_NEUTRAL: &[&str] = &[
    "Went to the store and bought groceries",
    "ok",
    "fine",
    "Had a normal day, nothing special",
    "Worked from home today",
    "Meeting at 3, then dinner",
    "It was an average Tuesday",
    "Did laundry and answered emails",
    "Regular day at the office",
    "Cleaned the apartment and cooked dinner",
    "Nothing much happened today",
    "Ran some errands and paid the bills",
    "Took the bus to work, usual routine",
    "A pretty ordinary day",
    "meh, just a day",
    "Watched some TV and went to bed",
];

const MOOD_MIXED: &[&str] = &[
    "Good day, but my chest feels tight",
    "Happy about the promotion but nervous about the new role",
    "Bittersweet goodbye to my old apartment",
    "Fun night out, though I'm worried about money",
    "Proud of my progress but still exhausted",
    "Loved seeing family, the drive home was miserable",
    "Excited and terrified at the same time",
    "Great day at work but I'm anxious about tomorrow",
    "Happy for my friend but a little sad for myself",
    "Enjoyed the trip, though I'm stressed about everything waiting at home",
    "Good news and bad news today, feeling both",
    "Fun weekend but now I'm dreading Monday",
    "Relieved it's over but kind of sad it ended",
];

const MOOD_CONFUSED: &[&str] = &[
    "I don't know how I feel about any of this",
    "Not sure what to make of today",
    "idk what's going on with me",
    "My feelings are all over the place and I can't tell why",
    "Why do I feel like this? 🤔",
    "I can't figure out if I'm okay or not",
    "Everything feels weird and unclear",
    "I don't really understand what I'm feeling",
    "Not sure if I'm happy or sad",
    "Feeling strange, can't explain it",
    "So confused about everything lately",
    "Don't know what I want anymore",
];

const ENERGY_HIGH: &[&str] = &[
    "Crushing it at work, feeling unstoppable",
    "So pumped for the game tonight!",
    "Went for a run and feel amazing, full of energy",
    "Bouncing off the walls today",
    "Super productive morning, got everything done",
    "Let's gooo 🔥",
    "Danced all night and I'm still buzzing",
    "Woke up early and ready to take on the world",
    "So much energy today, can't sit still",
    "Hit the gym hard and feel great",
    "Excited for the weekend, so hyped",
    "Got so much done today, on fire",
    "Feeling energized and motivated",
    "Big win today, I'm so excited!",
    "Out with friends all night, what a blast",
    "Celebrating tonight 🎉",
];

const ENERGY_LOW: &[&str] = &[
    "So tired I can barely move",
    "Feeling drained and sluggish",
    "Didn't get out of bed until noon",
    "ok",
    "meh",
    "Exhausted after a long week",
    "No motivation to do anything today 😴",
    "Just want to sleep all day",
    "Too tired to do anything",
    "Low energy, stayed on the couch all day",
    "Worn out and sleepy",
    "Completely exhausted, going to bed early",
    "Feeling flat and lazy today",
    "Barely got through the day, so drained",
    "Can't be bothered to do anything",
];

const ENERGY_STRESS: &[&str] = &[
    "This week is crushing me",
    "Deadlines piling up and I can't keep up",
    "My chest feels tight and my mind is racing",
    "Love that I'm working late again, just perfect",
    "So anxious about tomorrow's presentation",
    "Overwhelmed by everything on my plate",
    "Panicking about money again 😩",
    "Boss keeps piling on work, I'm about to snap",
    "So stressed about work I can't think straight",
    "Another deadline tonight and nothing is ready",
    "Stuck at the office late again with too much to do",
    "Worried and tense all day",
    "Bills are due and I'm freaking out",
    "Too much work, not enough time",
    "Oh great, the project broke right before the deadline",
    "Anxious all day, my heart won't slow down",
    "Nervous and on edge about everything",
    "Working until midnight again to get it all done",
];

const ENERGY_CALM: &[&str] = &[
    "Quiet evening with a cup of tea",
    "Feeling relaxed and at peace",
    "Took a slow walk in the park",
    "Meditated this morning and feel centered",
    "Lazy Sunday reading on the couch",
    "Everything feels calm and steady today",
    "Sat by the lake watching the sunset",
    "Took a deep breath and let it go",
    "Peaceful morning with coffee",
    "Relaxing day at home",
    "Calm and content, nothing to worry about",
    "Gentle yoga and an early night",
    "Slow easy day, feeling at ease",
    "Listened to music and unwound",
    "Nice quiet day, just taking it easy",
];

/// Example sentences keyed by space name, then label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrototypeSet {
    spaces: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

/// Summary statistics for a PrototypeSet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrototypeSummary {
    pub spaces: usize,
    pub labels: usize,
    pub sentences: usize,
}

impl PrototypeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The curated corpus for the mood and energy spaces.
    pub fn builtin() -> Self {
        let mut set = Self::new();
        for (label, sentences) in [
            ("Positive", MOOD_POSITIVE),
            ("Negative", MOOD_NEGATIVE),
            ("Neutral", MOOD_NEUTRAL),
            ("Mixed", MOOD_MIXED),
            ("Confused", MOOD_CONFUSED),
        ] {
            set.extend(MOOD_SPACE, label, sentences.iter().copied());
        }
        for (label, sentences) in [
            ("High Energy", ENERGY_HIGH),
            ("Low Energy", ENERGY_LOW),
            ("High Stress", ENERGY_STRESS),
            ("Calm", ENERGY_CALM),
        ] {
            set.extend(ENERGY_SPACE, label, sentences.iter().copied());
        }
        set
    }

    /// Parse a corpus from JSON. Sentences are trimmed; blanks and duplicates are dropped.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let raw: BTreeMap<String, BTreeMap<String, Vec<String>>> =
            serde_json::from_str(json).context("parsing prototype corpus")?;
        let mut set = Self::new();
        for (space, labels) in raw {
            for (label, sentences) in labels {
                // Keep labels listed with no sentences so the registry can reject them.
                set.spaces
                    .entry(space.clone())
                    .or_default()
                    .entry(label.clone())
                    .or_default();
                set.extend(&space, &label, sentences);
            }
        }
        Ok(set)
    }

    /// Load a corpus JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading prototype corpus {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("in {}", path.display()))
    }

    /// Add one sentence. Returns `false` if it was blank or already present.
    pub fn insert(&mut self, space: &str, label: &str, sentence: impl AsRef<str>) -> bool {
        let sentence = sentence.as_ref().trim();
        if sentence.is_empty() {
            return false;
        }
        let list = self
            .spaces
            .entry(space.to_string())
            .or_default()
            .entry(label.to_string())
            .or_default();
        if list.iter().any(|s| s == sentence) {
            return false;
        }
        list.push(sentence.to_string());
        true
    }

    pub fn extend<S: AsRef<str>>(
        &mut self,
        space: &str,
        label: &str,
        sentences: impl IntoIterator<Item = S>,
    ) {
        for s in sentences {
            self.insert(space, label, s);
        }
    }

    /// Sentences for one label, in insertion order. Empty if none.
    pub fn get(&self, space: &str, label: &str) -> &[String] {
        self.spaces
            .get(space)
            .and_then(|labels| labels.get(label))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_space(&self, space: &str) -> bool {
        self.spaces.contains_key(space)
    }

    /// Labels with prototypes recorded for `space` (sorted by name).
    pub fn labels(&self, space: &str) -> impl Iterator<Item = (&str, &[String])> {
        self.spaces
            .get(space)
            .into_iter()
            .flat_map(|labels| labels.iter().map(|(l, s)| (l.as_str(), s.as_slice())))
    }

    pub fn space_names(&self) -> impl Iterator<Item = &str> {
        self.spaces.keys().map(String::as_str)
    }

    pub fn summary(&self) -> PrototypeSummary {
        PrototypeSummary {
            spaces: self.spaces.len(),
            labels: self.spaces.values().map(BTreeMap::len).sum(),
            sentences: self
                .spaces
                .values()
                .flat_map(|labels| labels.values())
                .map(Vec::len)
                .sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodlog_core::LabelSpace;

    #[test]
    fn builtin_covers_every_scored_label() {
        let set = PrototypeSet::builtin();
        for space in LabelSpace::defaults() {
            for label in &space.labels {
                assert!(
                    set.get(&space.name, label).len() >= 5,
                    "{}/{label} needs prototypes",
                    space.name
                );
            }
            assert!(set.get(&space.name, &space.fallback).is_empty());
        }
    }

    #[test]
    fn builtin_summary() {
        let s = PrototypeSet::builtin().summary();
        assert_eq!(s.spaces, 2);
        assert_eq!(s.labels, 9);
        assert!(s.sentences > 60);
    }

    #[test]
    fn insert_dedupes_and_trims() {
        let mut set = PrototypeSet::new();
        assert!(set.insert("mood", "Positive", "  great day "));
        assert!(!set.insert("mood", "Positive", "great day"));
        assert!(!set.insert("mood", "Positive", "   "));
        assert_eq!(set.get("mood", "Positive"), ["great day".to_string()]);
    }

    #[test]
    fn insert_keeps_order() {
        let mut set = PrototypeSet::new();
        set.extend("energy", "Calm", ["b", "a", "c"]);
        assert_eq!(set.get("energy", "Calm"), ["b", "a", "c"]);
    }

    #[test]
    fn same_sentence_allowed_across_spaces() {
        let mut set = PrototypeSet::new();
        assert!(set.insert("mood", "Neutral", "ok"));
        assert!(set.insert("energy", "Low Energy", "ok"));
    }

    #[test]
    fn parses_json_corpus() {
        let json = r#"{
            "mood": { "Positive": ["yay", "yay", " "], "Negative": ["ugh"] },
            "energy": { "Calm": [] }
        }"#;
        let set = PrototypeSet::from_json_str(json).unwrap();
        assert_eq!(set.get("mood", "Positive"), ["yay"]);
        assert!(set.has_space("energy"));
        let calm: Vec<_> = set.labels("energy").collect();
        assert_eq!(calm.len(), 1);
        assert!(calm[0].1.is_empty());
    }

    #[test]
    fn rejects_bad_json() {
        assert!(PrototypeSet::from_json_str(r#"{ "mood": ["flat"] }"#).is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(&path, r#"{ "mood": { "Neutral": ["fine"] } }"#).unwrap();
        let set = PrototypeSet::load(&path).unwrap();
        assert_eq!(set.summary().sentences, 1);
        assert!(PrototypeSet::load(&dir.path().join("missing.json")).is_err());
    }
}
