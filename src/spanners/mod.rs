//! Spanners: relations over contiguous runs of leaves
//!
//! A spanner keeps an ordered list of leaf ids; every leaf keeps the ids of
//! the spanners it belongs to. Fracture and fuse never recycle a spanner:
//! the inputs become tombstones (`Fractured`, `Fused`) and new spanners
//! carry the leaves on.

mod ops;

use serde::{Deserialize, Serialize};

use crate::models::indicators::Direction;
use crate::models::overrides::GrobOverride;
use crate::models::tag::Tag;
use crate::score::{ComponentId, SpannerId, Wrapper};

pub use ops::FractureSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HairpinShape {
    Crescendo,
    Decrescendo,
}

/// Closed set of spanner kinds, in right-of ordering precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpannerKind {
    Tie,
    Beam,
    Slur,
    PhrasingSlur,
    Hairpin(HairpinShape),
    Glissando,
    TextSpanner,
    TrillSpanner,
    /// Ottava bracket shifting by the given number of octaves
    OttavaBracket(i8),
}

impl SpannerKind {
    pub fn name(&self) -> &'static str {
        match self {
            SpannerKind::Tie => "Tie",
            SpannerKind::Beam => "Beam",
            SpannerKind::Slur => "Slur",
            SpannerKind::PhrasingSlur => "PhrasingSlur",
            SpannerKind::Hairpin(_) => "Hairpin",
            SpannerKind::Glissando => "Glissando",
            SpannerKind::TextSpanner => "TextSpanner",
            SpannerKind::TrillSpanner => "TrillSpanner",
            SpannerKind::OttavaBracket(_) => "OttavaBracket",
        }
    }

    /// Sort key for contributions on a shared leaf
    pub fn precedence(&self) -> u8 {
        match self {
            SpannerKind::Tie => 0,
            SpannerKind::Beam => 1,
            SpannerKind::Slur => 2,
            SpannerKind::PhrasingSlur => 3,
            SpannerKind::Hairpin(_) => 4,
            SpannerKind::Glissando => 5,
            SpannerKind::TextSpanner => 6,
            SpannerKind::TrillSpanner => 7,
            SpannerKind::OttavaBracket(_) => 8,
        }
    }

    /// Token after the first leaf (after every leaf but the last for ties
    /// and glissandi)
    fn start_token(&self, direction: Option<Direction>) -> Option<String> {
        let prefix = direction.map(|d| d.prefix()).unwrap_or("");
        let token = match self {
            SpannerKind::Tie => format!("{}~", prefix),
            SpannerKind::Beam => format!("{}[", prefix),
            SpannerKind::Slur => format!("{}(", prefix),
            SpannerKind::PhrasingSlur => format!("{}\\(", prefix),
            SpannerKind::Hairpin(HairpinShape::Crescendo) => format!("{}\\<", prefix),
            SpannerKind::Hairpin(HairpinShape::Decrescendo) => format!("{}\\>", prefix),
            SpannerKind::Glissando => "\\glissando".to_string(),
            SpannerKind::TextSpanner => format!("{}\\startTextSpan", prefix),
            SpannerKind::TrillSpanner => format!("{}\\startTrillSpan", prefix),
            SpannerKind::OttavaBracket(_) => return None,
        };
        Some(token)
    }

    fn stop_token(&self) -> Option<&'static str> {
        match self {
            SpannerKind::Tie | SpannerKind::Glissando | SpannerKind::OttavaBracket(_) => None,
            SpannerKind::Beam => Some("]"),
            SpannerKind::Slur => Some(")"),
            SpannerKind::PhrasingSlur => Some("\\)"),
            SpannerKind::Hairpin(_) => Some("\\!"),
            SpannerKind::TextSpanner => Some("\\stopTextSpan"),
            SpannerKind::TrillSpanner => Some("\\stopTrillSpan"),
        }
    }

    /// Ties and glissandi connect each leaf to the next
    fn is_chained(&self) -> bool {
        matches!(self, SpannerKind::Tie | SpannerKind::Glissando)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpannerState {
    Unattached,
    Attached,
    /// Tombstone left behind by `fracture`
    Fractured,
    /// Tombstone left behind by `fuse`
    Fused,
    Detached,
}

impl SpannerState {
    pub fn is_tombstone(&self) -> bool {
        matches!(
            self,
            SpannerState::Fractured | SpannerState::Fused | SpannerState::Detached
        )
    }
}

/// Format lines a spanner adds around one of its leaves
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpannerLines {
    pub before: Vec<String>,
    pub stops: Vec<String>,
    pub starts: Vec<String>,
    pub after: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanner {
    pub(crate) id: SpannerId,
    pub kind: SpannerKind,
    pub(crate) leaves: Vec<ComponentId>,
    /// Persistent grob overrides: override at the first leaf, revert at
    /// the last (`\once \override` when the spanner has one leaf)
    pub overrides: Vec<GrobOverride>,
    pub tag: Option<Tag>,
    pub deactivate: bool,
    pub direction: Option<Direction>,
    pub(crate) attach_order: Option<u64>,
    pub(crate) state: SpannerState,
    /// Indicators bound to one leaf of this spanner
    pub(crate) piecewise: Vec<(ComponentId, Wrapper)>,
}

impl Spanner {
    pub(crate) fn new(id: SpannerId, kind: SpannerKind) -> Self {
        Self {
            id,
            kind,
            leaves: Vec::new(),
            overrides: Vec::new(),
            tag: None,
            deactivate: false,
            direction: None,
            attach_order: None,
            state: SpannerState::Unattached,
            piecewise: Vec::new(),
        }
    }

    pub fn id(&self) -> SpannerId {
        self.id
    }

    pub fn leaves(&self) -> &[ComponentId] {
        &self.leaves
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn state(&self) -> SpannerState {
        self.state
    }

    pub fn attach_order(&self) -> Option<u64> {
        self.attach_order
    }

    pub fn piecewise(&self) -> &[(ComponentId, Wrapper)] {
        &self.piecewise
    }

    pub fn first_leaf(&self) -> Option<ComponentId> {
        self.leaves.first().copied()
    }

    pub fn last_leaf(&self) -> Option<ComponentId> {
        self.leaves.last().copied()
    }

    /// `Beam(#3, #4, #5)`; works for empty spanners and tombstones
    pub fn summary(&self) -> String {
        let leaves: Vec<String> = self.leaves.iter().map(|l| l.to_string()).collect();
        format!("{}({})", self.kind.name(), leaves.join(", "))
    }

    /// Same kind and configuration, so the two may be fused
    pub fn is_compatible_with(&self, other: &Spanner) -> bool {
        self.kind == other.kind
            && self.overrides == other.overrides
            && self.tag == other.tag
            && self.deactivate == other.deactivate
            && self.direction == other.direction
    }

    /// Shallow configuration copy without leaves
    pub(crate) fn configured_copy(&self, id: SpannerId) -> Spanner {
        Spanner {
            id,
            kind: self.kind,
            leaves: Vec::new(),
            overrides: self.overrides.clone(),
            tag: self.tag.clone(),
            deactivate: self.deactivate,
            direction: self.direction,
            attach_order: self.attach_order,
            state: SpannerState::Unattached,
            piecewise: Vec::new(),
        }
    }

    /// Lines contributed at `leaf`; empty when the leaf is not in the
    /// spanner
    pub fn lines_for(&self, leaf: ComponentId) -> SpannerLines {
        let mut lines = SpannerLines::default();
        let Some(index) = self.leaves.iter().position(|l| *l == leaf) else {
            return lines;
        };
        let first = index == 0;
        let last = index + 1 == self.leaves.len();
        let single = self.leaves.len() == 1;

        if single {
            lines
                .before
                .extend(self.overrides.iter().map(|o| o.override_string(true)));
        } else {
            if first {
                lines
                    .before
                    .extend(self.overrides.iter().map(|o| o.override_string(false)));
            }
            if last {
                lines.after.extend(self.overrides.iter().map(|o| o.revert_string()));
            }
        }

        if let SpannerKind::OttavaBracket(octaves) = self.kind {
            if first {
                lines.before.push(format!("\\ottava #{}", octaves));
            }
            if last {
                lines.after.push("\\ottava #0".to_string());
            }
            return lines;
        }

        if single {
            return lines;
        }
        if self.kind.is_chained() {
            if !last {
                if let Some(token) = self.kind.start_token(self.direction) {
                    lines.starts.push(token);
                }
            }
            return lines;
        }
        if first {
            if let Some(token) = self.kind.start_token(self.direction) {
                lines.starts.push(token);
            }
        }
        if last {
            if let Some(token) = self.kind.stop_token() {
                lines.stops.push(token.to_string());
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spanner(kind: SpannerKind, count: usize) -> Spanner {
        let mut s = Spanner::new(SpannerId::from_raw(0), kind);
        s.leaves = (0..count).map(ComponentId::from_raw).collect();
        s.state = SpannerState::Attached;
        s
    }

    #[test]
    fn test_beam_tokens() {
        let beam = spanner(SpannerKind::Beam, 3);
        assert_eq!(beam.lines_for(ComponentId::from_raw(0)).starts, vec!["["]);
        assert!(beam.lines_for(ComponentId::from_raw(1)).starts.is_empty());
        assert_eq!(beam.lines_for(ComponentId::from_raw(2)).stops, vec!["]"]);
    }

    #[test]
    fn test_tie_on_all_but_last() {
        let mut tie = spanner(SpannerKind::Tie, 3);
        tie.direction = Some(Direction::Up);
        assert_eq!(tie.lines_for(ComponentId::from_raw(0)).starts, vec!["^~"]);
        assert_eq!(tie.lines_for(ComponentId::from_raw(1)).starts, vec!["^~"]);
        assert_eq!(tie.lines_for(ComponentId::from_raw(2)), SpannerLines::default());
    }

    #[test]
    fn test_overrides_balanced() {
        let mut slur = spanner(SpannerKind::Slur, 2);
        slur.overrides.push(GrobOverride::new("Slur", "color", "#red"));
        let first = slur.lines_for(ComponentId::from_raw(0));
        let last = slur.lines_for(ComponentId::from_raw(1));
        assert_eq!(first.before, vec!["\\override Slur.color = #red"]);
        assert_eq!(last.after, vec!["\\revert Slur.color"]);
    }

    #[test]
    fn test_single_leaf_uses_once() {
        let mut beam = spanner(SpannerKind::Beam, 1);
        beam.overrides.push(GrobOverride::new("Beam", "color", "#red"));
        let lines = beam.lines_for(ComponentId::from_raw(0));
        assert_eq!(lines.before, vec!["\\once \\override Beam.color = #red"]);
        assert!(lines.starts.is_empty() && lines.stops.is_empty() && lines.after.is_empty());
    }

    #[test]
    fn test_ottava() {
        let ottava = spanner(SpannerKind::OttavaBracket(1), 2);
        assert_eq!(ottava.lines_for(ComponentId::from_raw(0)).before, vec!["\\ottava #1"]);
        assert_eq!(ottava.lines_for(ComponentId::from_raw(1)).after, vec!["\\ottava #0"]);
    }

    #[test]
    fn test_empty_summary() {
        let empty = spanner(SpannerKind::Slur, 0);
        assert_eq!(empty.summary(), "Slur()");
        assert_eq!(empty.lines_for(ComponentId::from_raw(0)), SpannerLines::default());
    }
}
