//! Indicators: the value objects attached to components
//!
//! Indicators do not know where they are attached. Each one declares the
//! format slot it contributes to, the LilyPond lines it renders, whether it
//! is persistent (one per component per context) and how it travels when a
//! leaf is split.

use serde::{Deserialize, Serialize};

use crate::error::ScoreResult;
use crate::models::duration::{Duration, Rational};
use crate::models::pitch::{Pitch, PitchLanguage};

/// Where a contribution lands relative to a component's body
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Slot {
    /// Lines before the leaf body or before a container's opening bracket
    Before,
    /// Lines just inside a container's opening bracket
    Opening,
    /// Lines after the leaf body (articulations, dynamics, spanner tokens)
    RightOf,
    /// Lines just inside a container's closing bracket
    Closing,
    /// Lines after the leaf or after a container's closing bracket
    After,
}

/// Which piece keeps the indicator when a leaf is split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeOrientation {
    Left,
    Middle,
    Right,
}

/// Placement above or below the staff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn prefix(&self) -> &'static str {
        match self {
            Direction::Up => "^",
            Direction::Down => "_",
        }
    }
}

fn direction_prefix(direction: Option<Direction>) -> &'static str {
    direction.map(|d| d.prefix()).unwrap_or("-")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClefType {
    Treble,
    Bass,
    Alto,
    Tenor,
    Soprano,
    MezzoSoprano,
    Baritone,
    Percussion,
}

impl ClefType {
    pub fn name(&self) -> &'static str {
        match self {
            ClefType::Treble => "treble",
            ClefType::Bass => "bass",
            ClefType::Alto => "alto",
            ClefType::Tenor => "tenor",
            ClefType::Soprano => "soprano",
            ClefType::MezzoSoprano => "mezzosoprano",
            ClefType::Baritone => "baritone",
            ClefType::Percussion => "percussion",
        }
    }
}

/// Meter with an optional pickup (`\partial`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: i64,
    pub denominator: i64,
    pub partial: Option<Duration>,
}

impl TimeSignature {
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            numerator,
            denominator,
            partial: None,
        }
    }

    pub fn with_partial(mut self, partial: Duration) -> Self {
        self.partial = Some(partial);
        self
    }

    /// Length of one bar
    pub fn duration(&self) -> Duration {
        Duration::new(self.numerator, self.denominator)
    }

    /// Scaling for non-power-of-two denominators (`1` otherwise)
    pub fn implied_prolation(&self) -> Rational {
        crate::models::duration::implied_prolation(self.denominator)
    }

    pub fn has_non_power_of_two_denominator(&self) -> bool {
        !crate::models::duration::is_power_of_two(self.denominator)
    }

    /// Time signature of the given length, using `preferred_denominator`
    /// when the length fits it and the smallest fitting multiple otherwise
    pub fn from_duration(duration: Duration, preferred_denominator: i64) -> Self {
        let d = duration.denominator();
        if preferred_denominator % d == 0 {
            let numerator = duration.numerator() * (preferred_denominator / d);
            return TimeSignature::new(numerator, preferred_denominator);
        }
        let denominator = num_integer::lcm(preferred_denominator, d);
        TimeSignature::new(duration.numerator() * (denominator / d), denominator)
    }

    pub fn lilypond_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(partial) = self.partial {
            let token = partial
                .lilypond_duration_string()
                .unwrap_or_else(|_| format!("1 * {}", partial));
            lines.push(format!("\\partial {}", token));
        }
        lines.push(format!("\\time {}/{}", self.numerator, self.denominator));
        lines
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Major,
    Minor,
}

/// Key signature by position on the circle of fifths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeySignature {
    /// Number of sharps (positive) or flats (negative), -7 to 7
    pub fifths: i8,
    pub mode: Mode,
}

impl KeySignature {
    pub fn new(fifths: i8, mode: Mode) -> Self {
        Self { fifths, mode }
    }

    /// Tonic pitch class (octave 3, so it renders without octave marks)
    pub fn tonic(&self) -> ScoreResult<Pitch> {
        const STEP_SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];
        let fifths = self.fifths as i32
            + match self.mode {
                Mode::Major => 0,
                Mode::Minor => 3,
            };
        let step = (4 * fifths).rem_euclid(7);
        let semitones = (7 * fifths).rem_euclid(12);
        let mut alteration = (semitones - STEP_SEMITONES[step as usize]).rem_euclid(12);
        if alteration > 6 {
            alteration -= 12;
        }
        Pitch::new(step as u8, alteration as i8, 3)
    }

    pub fn lilypond_lines(&self, language: PitchLanguage) -> ScoreResult<Vec<String>> {
        let mode = match self.mode {
            Mode::Major => "\\major",
            Mode::Minor => "\\minor",
        };
        let tonic = self.tonic()?.to_lilypond_string(language);
        Ok(vec![format!("\\key {} {}", tonic, mode)])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DynamicType {
    PPP,
    PP,
    P,
    MP,
    MF,
    F,
    FF,
    FFF,
    FP,
    SF,
    SFZ,
}

impl DynamicType {
    pub fn command(&self) -> &'static str {
        match self {
            DynamicType::PPP => "\\ppp",
            DynamicType::PP => "\\pp",
            DynamicType::P => "\\p",
            DynamicType::MP => "\\mp",
            DynamicType::MF => "\\mf",
            DynamicType::F => "\\f",
            DynamicType::FF => "\\ff",
            DynamicType::FFF => "\\fff",
            DynamicType::FP => "\\fp",
            DynamicType::SF => "\\sf",
            DynamicType::SFZ => "\\sfz",
        }
    }
}

/// Metronome mark: `\tempo "Allegro" 4=120`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetronomeMark {
    pub text: Option<String>,
    pub reference: Duration,
    pub units_per_minute: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommentPosition {
    Before,
    After,
}

/// Closed set of indicator kinds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Indicator {
    Clef(ClefType),
    TimeSignature(TimeSignature),
    KeySignature(KeySignature),
    Dynamic(DynamicType),
    Articulation {
        name: String,
        direction: Option<Direction>,
    },
    Markup {
        text: String,
        direction: Option<Direction>,
    },
    MetronomeMark(MetronomeMark),
    Comment {
        text: String,
        position: CommentPosition,
    },
    /// Raw LilyPond text placed at an explicit slot
    LilyPondLiteral { lines: Vec<String>, slot: Slot },
    BarLine(String),
    StemTremolo(u32),
}

impl Indicator {
    pub fn articulation(name: impl Into<String>) -> Self {
        Indicator::Articulation {
            name: name.into(),
            direction: None,
        }
    }

    pub fn markup(text: impl Into<String>, direction: Option<Direction>) -> Self {
        Indicator::Markup {
            text: text.into(),
            direction,
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Indicator::Comment {
            text: text.into(),
            position: CommentPosition::Before,
        }
    }

    pub fn literal(text: impl Into<String>, slot: Slot) -> Self {
        Indicator::LilyPondLiteral {
            lines: vec![text.into()],
            slot,
        }
    }

    /// Short name used in messages and indicator lookup
    pub fn kind_name(&self) -> &'static str {
        match self {
            Indicator::Clef(_) => "clef",
            Indicator::TimeSignature(_) => "time signature",
            Indicator::KeySignature(_) => "key signature",
            Indicator::Dynamic(_) => "dynamic",
            Indicator::Articulation { .. } => "articulation",
            Indicator::Markup { .. } => "markup",
            Indicator::MetronomeMark(_) => "metronome mark",
            Indicator::Comment { .. } => "comment",
            Indicator::LilyPondLiteral { .. } => "literal",
            Indicator::BarLine(_) => "bar line",
            Indicator::StemTremolo(_) => "stem tremolo",
        }
    }

    /// Persistent indicators stay in effect until replaced; at most one of
    /// each persistent kind may sit on a component per context
    pub fn is_persistent(&self) -> bool {
        matches!(
            self,
            Indicator::Clef(_)
                | Indicator::TimeSignature(_)
                | Indicator::KeySignature(_)
                | Indicator::Dynamic(_)
                | Indicator::MetronomeMark(_)
        )
    }

    /// Context the indicator is scoped to when the wrapper names none
    pub fn default_context(&self) -> Option<&'static str> {
        match self {
            Indicator::Clef(_) | Indicator::TimeSignature(_) | Indicator::KeySignature(_) => {
                Some("Staff")
            }
            Indicator::MetronomeMark(_) | Indicator::BarLine(_) => Some("Score"),
            Indicator::Dynamic(_) => Some("Voice"),
            _ => None,
        }
    }

    /// True when the indicator only makes sense on a leaf
    pub fn requires_leaf(&self) -> bool {
        matches!(
            self,
            Indicator::Dynamic(_)
                | Indicator::Articulation { .. }
                | Indicator::Markup { .. }
                | Indicator::StemTremolo(_)
        )
    }

    pub fn time_orientation(&self) -> TimeOrientation {
        match self {
            Indicator::BarLine(_) => TimeOrientation::Right,
            Indicator::Comment {
                position: CommentPosition::After,
                ..
            } => TimeOrientation::Right,
            Indicator::LilyPondLiteral {
                slot: Slot::After, ..
            } => TimeOrientation::Right,
            Indicator::StemTremolo(_) => TimeOrientation::Middle,
            _ => TimeOrientation::Left,
        }
    }

    /// Slot on a leaf or a container
    pub fn slot(&self, on_container: bool) -> Slot {
        let natural = match self {
            Indicator::Clef(_)
            | Indicator::TimeSignature(_)
            | Indicator::KeySignature(_)
            | Indicator::MetronomeMark(_) => Slot::Before,
            Indicator::Dynamic(_)
            | Indicator::Articulation { .. }
            | Indicator::Markup { .. }
            | Indicator::StemTremolo(_) => Slot::RightOf,
            Indicator::Comment { position, .. } => match position {
                CommentPosition::Before => Slot::Before,
                CommentPosition::After => Slot::After,
            },
            Indicator::LilyPondLiteral { slot, .. } => *slot,
            Indicator::BarLine(_) => Slot::After,
        };
        if on_container {
            match (self, natural) {
                (Indicator::Comment { .. }, slot) => slot,
                (Indicator::LilyPondLiteral { .. }, slot) => slot,
                (_, Slot::Before) => Slot::Opening,
                (_, Slot::RightOf) | (_, Slot::After) => Slot::Closing,
                (_, slot) => slot,
            }
        } else {
            match natural {
                Slot::Opening => Slot::Before,
                Slot::Closing => Slot::After,
                slot => slot,
            }
        }
    }

    pub fn lilypond_lines(&self, language: PitchLanguage) -> ScoreResult<Vec<String>> {
        let lines = match self {
            Indicator::Clef(clef) => vec![format!("\\clef \"{}\"", clef.name())],
            Indicator::TimeSignature(time_signature) => time_signature.lilypond_lines(),
            Indicator::KeySignature(key) => key.lilypond_lines(language)?,
            Indicator::Dynamic(dynamic) => vec![dynamic.command().to_string()],
            Indicator::Articulation { name, direction } => {
                vec![format!("{}\\{}", direction_prefix(*direction), name)]
            }
            Indicator::Markup { text, direction } => {
                vec![format!("{}\\markup {{ {} }}", direction_prefix(*direction), text)]
            }
            Indicator::MetronomeMark(mark) => {
                let reference = mark.reference.lilypond_duration_string()?;
                match &mark.text {
                    Some(text) => vec![format!(
                        "\\tempo \"{}\" {}={}",
                        text, reference, mark.units_per_minute
                    )],
                    None => vec![format!("\\tempo {}={}", reference, mark.units_per_minute)],
                }
            }
            Indicator::Comment { text, .. } => vec![format!("% {}", text)],
            Indicator::LilyPondLiteral { lines, .. } => lines.clone(),
            Indicator::BarLine(abbreviation) => vec![format!("\\bar \"{}\"", abbreviation)],
            Indicator::StemTremolo(count) => vec![format!(":{}", count)],
        };
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(indicator: &Indicator) -> Vec<String> {
        indicator.lilypond_lines(PitchLanguage::English).unwrap()
    }

    #[test]
    fn test_time_signature_with_partial() {
        let ts = TimeSignature::new(2, 8).with_partial(Duration::new(1, 8));
        assert_eq!(ts.lilypond_lines(), vec!["\\partial 8", "\\time 2/8"]);
    }

    #[test]
    fn test_time_signature_from_duration() {
        assert_eq!(
            TimeSignature::from_duration(Duration::new(3, 8), 8),
            TimeSignature::new(3, 8)
        );
        assert_eq!(
            TimeSignature::from_duration(Duration::new(1, 2), 8),
            TimeSignature::new(4, 8)
        );
        assert_eq!(
            TimeSignature::from_duration(Duration::new(5, 16), 8),
            TimeSignature::new(5, 16)
        );
    }

    #[test]
    fn test_key_signatures() {
        let d_major = KeySignature::new(2, Mode::Major);
        assert_eq!(lines(&Indicator::KeySignature(d_major)), vec!["\\key d \\major"]);
        let ef_major = KeySignature::new(-3, Mode::Major);
        assert_eq!(lines(&Indicator::KeySignature(ef_major)), vec!["\\key ef \\major"]);
        let a_minor = KeySignature::new(0, Mode::Minor);
        assert_eq!(lines(&Indicator::KeySignature(a_minor)), vec!["\\key a \\minor"]);
        let fs_minor = KeySignature::new(3, Mode::Minor);
        assert_eq!(lines(&Indicator::KeySignature(fs_minor)), vec!["\\key fs \\minor"]);
    }

    #[test]
    fn test_leaf_and_container_slots() {
        let clef = Indicator::Clef(ClefType::Bass);
        assert_eq!(clef.slot(false), Slot::Before);
        assert_eq!(clef.slot(true), Slot::Opening);
        let accent = Indicator::articulation("accent");
        assert_eq!(accent.slot(false), Slot::RightOf);
        assert_eq!(lines(&accent), vec!["-\\accent"]);
        let up = Indicator::markup("dolce", Some(Direction::Up));
        assert_eq!(lines(&up), vec!["^\\markup { dolce }"]);
    }

    #[test]
    fn test_metronome_mark() {
        let mark = Indicator::MetronomeMark(MetronomeMark {
            text: None,
            reference: Duration::new(1, 4),
            units_per_minute: 60,
        });
        assert_eq!(lines(&mark), vec!["\\tempo 4=60"]);
        assert!(mark.is_persistent());
        assert_eq!(mark.default_context(), Some("Score"));
    }
}
