//! Containers: sequential or simultaneous groups of components

use serde::{Deserialize, Serialize};

use crate::models::duration::{rational_string, Duration, Rational};
use crate::models::indicators::TimeSignature;

use super::ComponentId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerKind {
    /// Anonymous braces
    Container,
    Voice,
    Staff,
    Score,
    /// Any other LilyPond context (`StaffGroup`, `PianoStaff`, `RhythmicStaff`)
    Group(String),
    Tuplet(Rational),
    Measure {
        time_signature: TimeSignature,
        automatically_adjust: bool,
    },
    /// Braces whose contents must last exactly `duration`
    FixedDuration(Duration),
}

impl ContainerKind {
    /// LilyPond context name for context containers
    pub fn context_name(&self) -> Option<&str> {
        match self {
            ContainerKind::Voice => Some("Voice"),
            ContainerKind::Staff => Some("Staff"),
            ContainerKind::Score => Some("Score"),
            ContainerKind::Group(name) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn is_context(&self) -> bool {
        self.context_name().is_some()
    }

    pub fn is_tuplet(&self) -> bool {
        matches!(self, ContainerKind::Tuplet(_))
    }

    pub fn is_measure(&self) -> bool {
        matches!(self, ContainerKind::Measure { .. })
    }

    /// Factor applied to the contents' duration: the tuplet multiplier or a
    /// measure's implied prolation
    pub fn multiplier(&self) -> Rational {
        match self {
            ContainerKind::Tuplet(multiplier) => *multiplier,
            ContainerKind::Measure { time_signature, .. } => time_signature.implied_prolation(),
            _ => Rational::from_integer(1),
        }
    }

    pub fn summary(&self) -> String {
        match self {
            ContainerKind::Container => "Container".to_string(),
            ContainerKind::Tuplet(m) => format!("Tuplet({})", rational_string(*m)),
            ContainerKind::Measure { time_signature, .. } => format!(
                "Measure({}/{})",
                time_signature.numerator, time_signature.denominator
            ),
            ContainerKind::FixedDuration(d) => format!("FixedDurationContainer({})", d),
            other => other.context_name().unwrap_or("Context").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub kind: ContainerKind,
    pub(crate) children: Vec<ComponentId>,
    pub simultaneous: bool,
    /// Engravers added in the context's `\with` block
    pub consists: Vec<String>,
    /// Engravers removed in the context's `\with` block
    pub remove: Vec<String>,
}

impl Container {
    pub fn new(kind: ContainerKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            simultaneous: false,
            consists: Vec::new(),
            remove: Vec::new(),
        }
    }

    pub fn simultaneous(mut self) -> Self {
        self.simultaneous = true;
        self
    }

    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Copy of the configuration without children
    pub fn shell(&self) -> Container {
        Container {
            kind: self.kind.clone(),
            children: Vec::new(),
            simultaneous: self.simultaneous,
            consists: self.consists.clone(),
            remove: self.remove.clone(),
        }
    }

    pub fn time_signature(&self) -> Option<&TimeSignature> {
        match &self.kind {
            ContainerKind::Measure { time_signature, .. } => Some(time_signature),
            _ => None,
        }
    }

    /// Declared duration of fixed-duration containers (measure length or
    /// target duration)
    pub fn declared_duration(&self) -> Option<Duration> {
        match &self.kind {
            ContainerKind::Measure { time_signature, .. } => Some(time_signature.duration()),
            ContainerKind::FixedDuration(duration) => Some(*duration),
            _ => None,
        }
    }
}
