//! Value objects used by the score tree
//!
//! Durations, pitches, indicators, tags and overrides are plain data: they
//! carry no tree links and compare by value.

pub mod duration;
pub mod indicators;
pub mod overrides;
pub mod pitch;
pub mod tag;

// Re-export commonly used types
pub use duration::{Duration, Rational};
pub use indicators::{
    ClefType, CommentPosition, Direction, DynamicType, Indicator, KeySignature, MetronomeMark,
    Mode, Slot, TimeOrientation, TimeSignature,
};
pub use overrides::{ContextSetting, GrobOverride};
pub use pitch::{NamedInterval, Pitch, PitchLanguage};
pub use tag::Tag;
