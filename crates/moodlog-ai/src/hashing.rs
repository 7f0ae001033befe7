//! Feature-hashing embedder: a deterministic, model-free adapter.
//!
//! Each lowercase word, each adjacent word pair, and each character trigram of
//! a content word (`<word>` padded) is hashed (FNV-1a) into a signed bucket of a
//! fixed-size vector, which is then L2-normalized. Stop words count at a reduced
//! weight and contribute no trigrams. Emoji are kept as single-character
//! tokens. Text with no tokens embeds to the all-zero vector, which the
//! classifier treats as "no signal".
//!
//! Lexical only: it cannot see past shared vocabulary the way a sentence model
//! can. Trigrams let inflections ("stressed", "stressful") meet halfway. Useful
//! offline, in tests, and as a baseline in evaluation runs.

use async_trait::async_trait;

use crate::adapter::{AdapterError, EmbeddingAdapter};

pub const DEFAULT_HASHING_DIM: usize = 1024;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

const UNIGRAM_WEIGHT: f32 = 1.0;
const STOP_WORD_WEIGHT: f32 = 0.5;
const BIGRAM_WEIGHT: f32 = 0.25;
const TRIGRAM_WEIGHT: f32 = 1.0;

/// Function words. Negations and mood cues ("again", "too", "why") stay off the list.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "can", "need", "to", "of", "in", "for", "on", "with", "at", "by", "from", "as", "into",
    "through", "during", "before", "after", "above", "below", "between", "under", "over",
    "further", "then", "once", "here", "there", "when", "where", "all", "each", "few", "more",
    "most", "other", "some", "such", "only", "own", "same", "so", "than", "very", "just", "and",
    "if", "or", "because", "until", "while", "about", "against", "this", "that", "these",
    "those", "what", "which", "who", "whom", "i", "me", "my", "we", "our", "you", "your", "he",
    "him", "his", "she", "her", "it", "its", "they", "them", "their", "im", "ive", "am",
];

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIM)
    }
}

impl HashingEmbedder {
    /// `dim` is clamped to at least 1.
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    /// Embed synchronously; the async trait method delegates here.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        let mut v = vec![0.0f32; self.dim];

        for token in &tokens {
            let weight = if is_stop_word(token) {
                STOP_WORD_WEIGHT
            } else {
                UNIGRAM_WEIGHT
            };
            self.add_feature(&mut v, token.as_bytes(), weight);
        }
        for pair in tokens.windows(2) {
            let joined = format!("{} {}", pair[0], pair[1]);
            self.add_feature(&mut v, joined.as_bytes(), BIGRAM_WEIGHT);
        }
        for token in tokens.iter().filter(|t| has_trigrams(t)) {
            for gram in char_trigrams(token) {
                self.add_feature(&mut v, gram.as_bytes(), TRIGRAM_WEIGHT);
            }
        }

        normalize(&mut v);
        v
    }

    fn add_feature(&self, v: &mut [f32], feature: &[u8], weight: f32) {
        let h = fnv1a(feature);
        let idx = (h % self.dim as u64) as usize;
        let sign = if h >> 63 == 1 { -1.0 } else { 1.0 };
        v[idx] += sign * weight;
    }
}

#[async_trait]
impl EmbeddingAdapter for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AdapterError> {
        Ok(self.embed_sync(text))
    }
}

/// Split into lowercase word tokens; emoji and other symbols become one-char tokens.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() || ch == '\'' || ch == '\u{2019}' {
            if ch != '\'' && ch != '\u{2019}' {
                word.extend(ch.to_lowercase());
            }
            continue;
        }
        if !word.is_empty() {
            tokens.push(std::mem::take(&mut word));
        }
        if is_symbol(ch) {
            tokens.push(ch.to_string());
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }
    tokens
}

/// Pictographs and other non-ASCII symbols, minus joiners and variation selectors.
fn is_symbol(ch: char) -> bool {
    !ch.is_whitespace()
        && !ch.is_ascii()
        && !matches!(ch, '\u{200D}' | '\u{FE00}'..='\u{FE0F}')
        && !is_general_punctuation(ch)
}

fn is_general_punctuation(ch: char) -> bool {
    matches!(ch, '\u{2000}'..='\u{206F}' | '\u{3000}'..='\u{303F}')
}

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

fn has_trigrams(token: &str) -> bool {
    !is_stop_word(token) && token.chars().all(char::is_alphanumeric)
}

/// Trigrams of `<token>`, each prefixed with `#` so they never collide with a word.
fn char_trigrams(token: &str) -> Vec<String> {
    let padded: Vec<char> = std::iter::once('<')
        .chain(token.chars())
        .chain(std::iter::once('>'))
        .collect();
    padded
        .windows(3)
        .map(|w| std::iter::once('#').chain(w.iter().copied()).collect())
        .collect()
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET, |h, &b| (h ^ b as u64).wrapping_mul(FNV_PRIME))
}

/// L2-normalize a vector in place.
fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn tokenize_words_and_emoji() {
        assert_eq!(tokenize("I'm SO tired 😩!!"), vec!["im", "so", "tired", "😩"]);
        assert_eq!(tokenize("ok… fine"), vec!["ok", "fine"]);
        assert!(tokenize("  ?! ... ").is_empty());
    }

    #[test]
    fn variation_selectors_are_dropped() {
        assert_eq!(tokenize("❤\u{FE0F}"), vec!["❤"]);
    }

    #[test]
    fn embedding_is_unit_norm_and_deterministic() {
        let e = HashingEmbedder::default();
        let a = e.embed_sync("Good day at work");
        let b = e.embed_sync("Good day at work");
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_HASHING_DIM);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "expected unit norm, got {norm}");
    }

    #[test]
    fn no_tokens_gives_zero_vector() {
        let e = HashingEmbedder::new(32);
        let v = e.embed_sync("... !!! ???");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let e = HashingEmbedder::default();
        let tired = e.embed_sync("so tired and drained today");
        let drained = e.embed_sync("completely drained and tired");
        let party = e.embed_sync("dancing at the party all night");
        assert!(cosine_sim(&tired, &drained) > cosine_sim(&tired, &party));
    }

    #[test]
    fn trigrams_are_padded_and_tagged() {
        assert_eq!(char_trigrams("sad"), vec!["#<sa", "#sad", "#ad>"]);
        assert_eq!(char_trigrams("ok"), vec!["#<ok", "#ok>"]);
        assert!(!has_trigrams("the"));
        assert!(!has_trigrams("😩"));
        assert!(has_trigrams("again"));
    }

    #[test]
    fn inflections_share_signal() {
        let e = HashingEmbedder::default();
        let stressed = e.embed_sync("stressed");
        let stressful = e.embed_sync("stressful");
        let sleepy = e.embed_sync("sleepy");
        assert!(cosine_sim(&stressed, &stressful) > 0.4);
        assert!(cosine_sim(&stressed, &stressful) > cosine_sim(&stressed, &sleepy));
    }

    #[test]
    fn stop_words_weigh_less_than_content() {
        let e = HashingEmbedder::default();
        let base = e.embed_sync("so the tired");
        let content = e.embed_sync("tired");
        let filler = e.embed_sync("so the");
        assert!(cosine_sim(&base, &content) > cosine_sim(&base, &filler));
    }

    #[test]
    fn dim_is_clamped() {
        assert_eq!(HashingEmbedder::new(0).dim(), 1);
    }
}
