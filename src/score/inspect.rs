//! Derived properties: durations, offsets, logical voices, effective
//! indicators
//!
//! Nothing here is cached; every query walks the current tree, so results
//! stay correct after any mutation.

use std::fmt;

use crate::error::ScoreResult;
use crate::models::duration::{Duration, Rational};
use crate::models::indicators::{Indicator, TimeSignature};

use super::{ComponentId, Node, ScoreTree};

/// Start and stop offset of a component, in whole notes from the root
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timespan {
    pub start: Duration,
    pub stop: Duration,
}

impl Timespan {
    pub fn duration(&self) -> Duration {
        self.stop - self.start
    }

    pub fn contains_offset(&self, offset: Duration) -> bool {
        self.start <= offset && offset < self.stop
    }
}

/// Identity of the voice a leaf sounds in.
///
/// Built from the root and every context or simultaneous branch on the way
/// down. Named contexts are identified by name, anonymous ones by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalVoice(Vec<String>);

impl fmt::Display for LogicalVoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl ScoreTree {
    /// Duration of the contents of a container, before its own multiplier
    pub fn contents_duration(&self, id: ComponentId) -> ScoreResult<Duration> {
        let container = self.container_ref(id)?;
        let mut durations = Vec::with_capacity(container.children.len());
        for child in &container.children {
            durations.push(self.preprolated_duration(*child)?);
        }
        if container.simultaneous {
            Ok(durations.into_iter().max().unwrap_or_else(Duration::zero))
        } else {
            Ok(durations.into_iter().sum())
        }
    }

    /// Duration ignoring the multipliers of enclosing containers
    pub fn preprolated_duration(&self, id: ComponentId) -> ScoreResult<Duration> {
        match &self.get(id)?.node {
            Node::Leaf(leaf) => Ok(leaf.preprolated_duration()),
            Node::Container(container) => {
                Ok(self.contents_duration(id)?.scale(container.kind.multiplier()))
            }
        }
    }

    /// Product of the multipliers of all proper ancestors
    pub fn prolation(&self, id: ComponentId) -> ScoreResult<Rational> {
        let mut prolation = Rational::from_integer(1);
        for ancestor in self.parentage(id)?.into_iter().skip(1) {
            prolation *= self.container_ref(ancestor)?.kind.multiplier();
        }
        Ok(prolation)
    }

    /// Sounding duration
    pub fn duration(&self, id: ComponentId) -> ScoreResult<Duration> {
        Ok(self.preprolated_duration(id)?.scale(self.prolation(id)?))
    }

    pub fn timespan(&self, id: ComponentId) -> ScoreResult<Timespan> {
        let mut start = Duration::zero();
        let parentage = self.parentage(id)?;
        for window in parentage.windows(2) {
            let (child, parent) = (window[0], window[1]);
            let container = self.container_ref(parent)?;
            if container.simultaneous {
                continue;
            }
            for sibling in &container.children {
                if *sibling == child {
                    break;
                }
                start += self.duration(*sibling)?;
            }
        }
        Ok(Timespan {
            start,
            stop: start + self.duration(id)?,
        })
    }

    pub fn logical_voice(&self, id: ComponentId) -> ScoreResult<LogicalVoice> {
        let parentage = self.parentage(id)?;
        let root = *parentage.last().unwrap_or(&id);
        let mut parts = vec![format!("root{}", root)];
        for window in parentage.windows(2).rev() {
            let (child, parent) = (window[0], window[1]);
            let parent_component = self.get(parent)?;
            if let Some(container) = parent_component.as_container() {
                if let Some(context) = container.kind.context_name() {
                    match &parent_component.name {
                        Some(name) => parts.push(format!("{}:{}", context, name)),
                        None => parts.push(format!("{}{}", context, parent)),
                    }
                }
                if container.simultaneous {
                    parts.push(format!("branch{}", child));
                }
            }
        }
        if let Some(container) = self.get(id)?.as_container() {
            if let Some(context) = container.kind.context_name() {
                match &self.get(id)?.name {
                    Some(name) => parts.push(format!("{}:{}", context, name)),
                    None => parts.push(format!("{}{}", context, id)),
                }
            }
        }
        Ok(LogicalVoice(parts))
    }

    /// Next leaf after `leaf` in the same logical voice
    pub fn next_leaf_in_logical_voice(&self, leaf: ComponentId) -> ScoreResult<Option<ComponentId>> {
        self.leaf(leaf)?;
        let voice = self.logical_voice(leaf)?;
        let root = self.root(leaf)?;
        let mut seen = false;
        for candidate in self.leaves(root) {
            if seen {
                if self.logical_voice(candidate)? == voice {
                    return Ok(Some(candidate));
                }
            } else if candidate == leaf {
                seen = true;
            }
        }
        Ok(None)
    }

    /// Previous leaf before `leaf` in the same logical voice
    pub fn previous_leaf_in_logical_voice(&self, leaf: ComponentId) -> ScoreResult<Option<ComponentId>> {
        self.leaf(leaf)?;
        let voice = self.logical_voice(leaf)?;
        let root = self.root(leaf)?;
        let mut previous = None;
        for candidate in self.leaves(root) {
            if candidate == leaf {
                return Ok(previous);
            }
            if self.logical_voice(candidate)? == voice {
                previous = Some(candidate);
            }
        }
        Ok(None)
    }

    /// True when `leaves` is one uninterrupted left-to-right run of leaves in
    /// a single logical voice. Empty and single-leaf runs are contiguous.
    pub fn are_contiguous_logical_voice(&self, leaves: &[ComponentId]) -> ScoreResult<bool> {
        let Some(first) = leaves.first() else {
            return Ok(true);
        };
        for leaf in leaves {
            self.leaf(*leaf)?;
        }
        let voice = self.logical_voice(*first)?;
        let root = self.root(*first)?;
        for leaf in &leaves[1..] {
            if self.root(*leaf)? != root || self.logical_voice(*leaf)? != voice {
                return Ok(false);
            }
        }
        let mut run = Vec::new();
        for candidate in self.leaves(root) {
            if self.logical_voice(candidate)? == voice {
                run.push(candidate);
            }
        }
        let Some(start) = run.iter().position(|c| c == first) else {
            return Ok(false);
        };
        Ok(run.get(start..start + leaves.len()) == Some(leaves))
    }

    /// Last indicator of `kind_name` in effect at the start of `id`.
    ///
    /// Candidates are the components of the same root, scoped by the
    /// wrapper's context: an indicator scoped to `Staff` only affects
    /// components inside the same staff.
    pub fn effective_indicator(&self, id: ComponentId, kind_name: &str) -> ScoreResult<Option<Indicator>> {
        let start = self.timespan(id)?.start;
        let parentage = self.parentage(id)?;
        let root = *parentage.last().unwrap_or(&id);
        let mut best: Option<(Duration, Indicator)> = None;
        for candidate in self.descendants(root)? {
            let component = self.get(candidate)?;
            for wrapper in component.wrappers() {
                if wrapper.deactivate || wrapper.indicator.kind_name() != kind_name {
                    continue;
                }
                let candidate_start = self.timespan(candidate)?.start;
                if candidate_start > start {
                    continue;
                }
                if !self.shares_context(candidate, &parentage, wrapper.effective_context())? {
                    continue;
                }
                if best.as_ref().map_or(true, |(offset, _)| candidate_start >= *offset) {
                    best = Some((candidate_start, wrapper.indicator.clone()));
                }
            }
        }
        Ok(best.map(|(_, indicator)| indicator))
    }

    fn shares_context(
        &self,
        candidate: ComponentId,
        parentage: &[ComponentId],
        context: Option<&str>,
    ) -> ScoreResult<bool> {
        let Some(context) = context else {
            return Ok(parentage.contains(&candidate) || self.logical_voice(candidate)? == self.logical_voice(parentage[0])?);
        };
        let scope = |id: ComponentId| -> ScoreResult<Option<ComponentId>> {
            for ancestor in self.parentage(id)? {
                if let Some(container) = self.get(ancestor)?.as_container() {
                    if container.kind.context_name() == Some(context) {
                        return Ok(Some(ancestor));
                    }
                }
            }
            Ok(None)
        };
        Ok(scope(candidate)? == scope(parentage[0])?)
    }

    /// True when a bar line falls strictly inside the leaf's timespan,
    /// using the effective time signature (4/4 when none) and its pickup
    pub fn bar_line_crossing(&self, leaf: ComponentId) -> ScoreResult<bool> {
        self.leaf(leaf)?;
        let time_signature = match self.effective_indicator(leaf, "time signature")? {
            Some(Indicator::TimeSignature(ts)) => ts,
            _ => TimeSignature::new(4, 4),
        };
        let bar = time_signature.duration();
        let shift = match time_signature.partial {
            Some(partial) => bar - partial,
            None => Duration::zero(),
        };
        let span = self.timespan(leaf)?;
        let start = (span.start + shift).ratio_to(bar);
        let stop = (span.stop + shift).ratio_to(bar);
        // next bar line strictly after start
        let next = start.floor() + Rational::from_integer(1);
        Ok(next < stop)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::indicators::Indicator;
    use crate::models::pitch::Pitch;

    use super::*;

    fn note(tree: &mut ScoreTree, name: &str, n: i64, d: i64) -> ComponentId {
        tree.note(Pitch::from_name(name).unwrap(), Duration::new(n, d))
            .unwrap()
    }

    #[test]
    fn test_tuplet_prolation() {
        let mut tree = ScoreTree::new();
        let staff = tree.staff();
        let tuplet = tree.tuplet(Rational::new(2, 3));
        tree.append(staff, tuplet).unwrap();
        let leaves: Vec<_> = ["c'", "d'", "e'"]
            .iter()
            .map(|n| note(&mut tree, n, 1, 8))
            .collect();
        tree.extend(tuplet, leaves.clone()).unwrap();
        assert_eq!(tree.duration(leaves[0]).unwrap(), Duration::new(1, 12));
        assert_eq!(tree.duration(tuplet).unwrap(), Duration::new(1, 4));
        assert_eq!(tree.timespan(leaves[2]).unwrap().start, Duration::new(1, 6));
        assert_eq!(tree.prolation(leaves[1]).unwrap(), Rational::new(2, 3));
    }

    #[test]
    fn test_measure_implied_prolation() {
        let mut tree = ScoreTree::new();
        let measure = tree.measure(TimeSignature::new(1, 12));
        let leaf = note(&mut tree, "d'", 1, 8);
        tree.append(measure, leaf).unwrap();
        assert_eq!(tree.duration(measure).unwrap(), Duration::new(1, 12));
        assert_eq!(tree.duration(leaf).unwrap(), Duration::new(1, 12));
    }

    #[test]
    fn test_simultaneous_duration_and_voices() {
        let mut tree = ScoreTree::new();
        let outer = tree.container();
        tree.container_mut(outer).unwrap().simultaneous = true;
        let a = tree.voice();
        let b = tree.voice();
        tree.extend(outer, [a, b]).unwrap();
        let a1 = note(&mut tree, "c'", 1, 4);
        let a2 = note(&mut tree, "d'", 1, 4);
        let b1 = note(&mut tree, "e'", 1, 2);
        tree.extend(a, [a1, a2]).unwrap();
        tree.append(b, b1).unwrap();
        assert_eq!(tree.duration(outer).unwrap(), Duration::new(1, 2));
        assert_eq!(tree.timespan(b1).unwrap().start, Duration::zero());
        assert_ne!(
            tree.logical_voice(a1).unwrap(),
            tree.logical_voice(b1).unwrap()
        );
        assert_eq!(tree.next_leaf_in_logical_voice(a1).unwrap(), Some(a2));
        assert_eq!(tree.next_leaf_in_logical_voice(a2).unwrap(), None);
        assert!(tree.are_contiguous_logical_voice(&[a1, a2]).unwrap());
        assert!(!tree.are_contiguous_logical_voice(&[a2, b1]).unwrap());
        assert!(!tree.are_contiguous_logical_voice(&[a2, a1]).unwrap());
    }

    #[test]
    fn test_same_named_voices_are_one_logical_voice() {
        let mut tree = ScoreTree::new();
        let staff = tree.staff();
        let v1 = tree.voice();
        let v2 = tree.voice();
        tree.set_name(v1, "upper").unwrap();
        tree.set_name(v2, "upper").unwrap();
        tree.extend(staff, [v1, v2]).unwrap();
        let a = note(&mut tree, "c'", 1, 4);
        let b = note(&mut tree, "d'", 1, 4);
        tree.append(v1, a).unwrap();
        tree.append(v2, b).unwrap();
        assert!(tree.are_contiguous_logical_voice(&[a, b]).unwrap());
    }

    #[test]
    fn test_effective_clef() {
        let mut tree = ScoreTree::new();
        let staff = tree.staff();
        let leaves: Vec<_> = (0..3).map(|_| note(&mut tree, "c'", 1, 4)).collect();
        tree.extend(staff, leaves.clone()).unwrap();
        tree.attach(
            Indicator::Clef(crate::models::indicators::ClefType::Bass),
            leaves[1],
        )
        .unwrap();
        assert_eq!(tree.effective_indicator(leaves[0], "clef").unwrap(), None);
        assert!(tree.effective_indicator(leaves[2], "clef").unwrap().is_some());
    }

    #[test]
    fn test_bar_line_crossing_with_partial() {
        let mut tree = ScoreTree::new();
        let staff = tree.staff();
        let leaves = vec![
            note(&mut tree, "c'", 1, 8),
            note(&mut tree, "d'", 1, 8),
            note(&mut tree, "e'", 1, 4),
            note(&mut tree, "f'", 1, 8),
        ];
        tree.extend(staff, leaves.clone()).unwrap();
        let ts = TimeSignature::new(2, 8).with_partial(Duration::new(1, 8));
        tree.attach(Indicator::TimeSignature(ts), leaves[0]).unwrap();
        let crossing: Vec<bool> = leaves
            .iter()
            .map(|l| tree.bar_line_crossing(*l).unwrap())
            .collect();
        assert_eq!(crossing, vec![false, false, true, false]);
    }

    #[test]
    fn test_bar_line_crossing_default_meter() {
        let mut tree = ScoreTree::new();
        let staff = tree.staff();
        let leaves = vec![
            note(&mut tree, "c'", 1, 2),
            note(&mut tree, "d'", 1, 1),
            note(&mut tree, "e'", 1, 2),
        ];
        tree.extend(staff, leaves.clone()).unwrap();
        let crossing: Vec<bool> = leaves
            .iter()
            .map(|l| tree.bar_line_crossing(*l).unwrap())
            .collect();
        assert_eq!(crossing, vec![false, true, false]);
    }
}
