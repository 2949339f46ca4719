//! Score tree: a music-notation object model
//!
//! Scores are arena trees of leaves (notes, chords, rests, skips) and
//! containers (voices, staves, tuplets, measures) with spanners over runs
//! of leaves. The tree can be mutated structurally (fuse, split, copy,
//! wrap, scale, transpose), checked for wellformedness, formatted as
//! LilyPond text and persisted through the LilyPond renderer.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod format;
pub mod lilypond_file;
pub mod models;
pub mod mutate;
pub mod parse;
pub mod persist;
pub mod score;
pub mod selection;
pub mod spanners;

// Re-export commonly used types
pub use config::Configuration;
pub use diagnostics::{check_wellformedness, is_wellformed, DiagnosticSeverity, Diagnostics, Finding};
pub use error::{ScoreError, ScoreResult};
pub use format::{activate, deactivate, FormatContext};
pub use lilypond_file::{DocumentTemplate, LilyPondFile};
pub use models::*;
pub use persist::{LyReport, PdfReport, Persister};
pub use score::{ComponentId, Container, ContainerKind, Leaf, LeafKind, ScoreTree, SpannerId, Wrapper};
pub use selection::Selection;
pub use spanners::{FractureSide, HairpinShape, Spanner, SpannerKind, SpannerState};
