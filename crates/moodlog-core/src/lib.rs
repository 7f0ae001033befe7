pub mod config;
pub mod entry;
pub mod labels;

pub use config::{ConfigError, EngineConfig, SpacePolicy};
pub use entry::{JournalEntry, Tags};
pub use labels::{Blend, Energy, LabelSpace, Mood, UnknownLabelError, ENERGY_SPACE, MOOD_SPACE};
