//! Leaves: notes, chords, rests, skips and multimeasure rests

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{ScoreError, ScoreResult};
use crate::models::duration::{rational_string, Duration, Rational};
use crate::models::pitch::{Pitch, PitchLanguage};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeafKind {
    Note(Pitch),
    /// Pitches kept sorted low to high; duplicates collapse
    Chord(BTreeSet<Pitch>),
    Rest,
    Skip,
    MultimeasureRest,
}

impl LeafKind {
    pub fn name(&self) -> &'static str {
        match self {
            LeafKind::Note(_) => "Note",
            LeafKind::Chord(_) => "Chord",
            LeafKind::Rest => "Rest",
            LeafKind::Skip => "Skip",
            LeafKind::MultimeasureRest => "MultimeasureRest",
        }
    }

    /// Notes and chords can be tied
    pub fn is_pitched(&self) -> bool {
        matches!(self, LeafKind::Note(_) | LeafKind::Chord(_))
    }
}

/// Terminal component with an assignable written duration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaf {
    pub kind: LeafKind,
    written_duration: Duration,
    multiplier: Option<Rational>,
}

impl Leaf {
    pub fn new(kind: LeafKind, written_duration: Duration) -> ScoreResult<Self> {
        check_written_duration(written_duration)?;
        Ok(Self {
            kind,
            written_duration,
            multiplier: None,
        })
    }

    pub fn note(pitch: Pitch, written_duration: Duration) -> ScoreResult<Self> {
        Leaf::new(LeafKind::Note(pitch), written_duration)
    }

    pub fn chord(
        pitches: impl IntoIterator<Item = Pitch>,
        written_duration: Duration,
    ) -> ScoreResult<Self> {
        Leaf::new(LeafKind::Chord(pitches.into_iter().collect()), written_duration)
    }

    pub fn rest(written_duration: Duration) -> ScoreResult<Self> {
        Leaf::new(LeafKind::Rest, written_duration)
    }

    pub fn skip(written_duration: Duration) -> ScoreResult<Self> {
        Leaf::new(LeafKind::Skip, written_duration)
    }

    pub fn multimeasure_rest(written_duration: Duration) -> ScoreResult<Self> {
        Leaf::new(LeafKind::MultimeasureRest, written_duration)
    }

    pub fn written_duration(&self) -> Duration {
        self.written_duration
    }

    pub fn set_written_duration(&mut self, duration: Duration) -> ScoreResult<()> {
        check_written_duration(duration)?;
        self.written_duration = duration;
        Ok(())
    }

    pub fn multiplier(&self) -> Option<Rational> {
        self.multiplier
    }

    pub fn set_multiplier(&mut self, multiplier: Option<Rational>) -> ScoreResult<()> {
        if let Some(m) = multiplier {
            if *m.numer() <= 0 {
                return Err(ScoreError::Assignability(format!(
                    "multiplier {} must be positive",
                    rational_string(m)
                )));
            }
        }
        self.multiplier = multiplier;
        Ok(())
    }

    pub fn with_multiplier(mut self, multiplier: Rational) -> ScoreResult<Self> {
        self.set_multiplier(Some(multiplier))?;
        Ok(self)
    }

    /// Written duration times the LilyPond multiplier
    pub fn preprolated_duration(&self) -> Duration {
        match self.multiplier {
            Some(m) => self.written_duration.scale(m),
            None => self.written_duration,
        }
    }

    /// Pitches in the leaf, low to high
    pub fn pitches(&self) -> Vec<Pitch> {
        match &self.kind {
            LeafKind::Note(pitch) => vec![*pitch],
            LeafKind::Chord(pitches) => pitches.iter().copied().collect(),
            _ => Vec::new(),
        }
    }

    /// Leaf body: `c'4`, `<c' e' g'>4`, `r4`, `s1 * 1/16`, `R1`
    pub fn body_string(&self, language: PitchLanguage) -> ScoreResult<String> {
        let duration = self.written_duration.lilypond_duration_string()?;
        let head = match &self.kind {
            LeafKind::Note(pitch) => pitch.to_lilypond_string(language),
            LeafKind::Chord(pitches) => {
                let names: Vec<String> = pitches
                    .iter()
                    .map(|p| p.to_lilypond_string(language))
                    .collect();
                format!("<{}>", names.join(" "))
            }
            LeafKind::Rest => "r".to_string(),
            LeafKind::Skip => "s".to_string(),
            LeafKind::MultimeasureRest => "R".to_string(),
        };
        let multiplier = match self.multiplier {
            Some(m) if *m.denom() == 1 => format!(" * {}", m.numer()),
            Some(m) => format!(" * {}", rational_string(m)),
            None => String::new(),
        };
        Ok(format!("{}{}{}", head, duration, multiplier))
    }
}

fn check_written_duration(duration: Duration) -> ScoreResult<()> {
    if !duration.is_assignable() {
        return Err(ScoreError::Assignability(duration.to_string()));
    }
    Ok(())
}
