//! Splitting leaves and containers

use log::debug;

use crate::error::{ScoreError, ScoreResult};
use crate::models::duration::Duration;
use crate::models::indicators::{TimeOrientation, TimeSignature};
use crate::score::{ComponentId, ContainerKind, ScoreTree};
use crate::selection::Selection;
use crate::spanners::SpannerKind;

impl ScoreTree {
    /// Split a leaf into pieces of the given sounding durations.
    ///
    /// With `cyclic` the durations repeat until the leaf is used up;
    /// otherwise whatever the durations leave over becomes a final piece.
    /// Pieces are tied when the leaf is pitched. Left-oriented indicators
    /// stay on the first piece, right-oriented ones move to the last.
    pub fn split_leaf(
        &mut self,
        leaf: ComponentId,
        durations: &[Duration],
        cyclic: bool,
    ) -> ScoreResult<Selection> {
        let pieces = self.split_leaf_pieces(leaf, durations, cyclic)?;
        Ok(pieces.into_iter().flatten().collect())
    }

    /// Leaves of each piece of a split (a piece may be a tied run)
    pub(crate) fn split_leaf_pieces(
        &mut self,
        leaf: ComponentId,
        durations: &[Duration],
        cyclic: bool,
    ) -> ScoreResult<Vec<Vec<ComponentId>>> {
        let payload = self.leaf(leaf)?.clone();
        let total = self.duration(leaf)?;
        let prolation = self.prolation(leaf)?;
        let targets = piece_durations(total, durations, cyclic)?;
        if targets.len() < 2 {
            return Ok(vec![vec![leaf]]);
        }
        let preprolated: Vec<Duration> = targets
            .iter()
            .map(|d| Duration::from_rational(d.as_rational() / prolation))
            .collect();
        if payload.multiplier().is_none() {
            if let Some(bad) = preprolated.iter().find(|d| !d.is_dyadic()) {
                return Err(ScoreError::Assignability(format!(
                    "piece {} of {} needs a tuplet",
                    bad, leaf
                )));
            }
        }
        debug!("splitting {} into {} pieces", leaf, targets.len());

        let extras: Vec<ComponentId> = (1..targets.len())
            .map(|_| self.add_leaf(payload.clone()))
            .collect();
        if let (Some(parent), Some(index)) = (self.parent(leaf)?, self.index_in_parent(leaf)?) {
            for (offset, extra) in extras.iter().enumerate() {
                self.insert(parent, index + 1 + offset, *extra)?;
            }
            self.grow_spanners_after(leaf, &extras)?;
            if payload.kind.is_pitched() && self.spanner_of_kind(leaf, SpannerKind::Tie)?.is_none() {
                let mut run = vec![leaf];
                run.extend(&extras);
                self.span(SpannerKind::Tie, &run)?;
            }
        }

        let heads: Vec<ComponentId> = std::iter::once(leaf).chain(extras.iter().copied()).collect();
        let mut pieces = Vec::with_capacity(heads.len());
        for (head, duration) in heads.iter().zip(preprolated) {
            pieces.push(self.set_leaf_duration(*head, duration)?);
        }
        self.distribute_indicators(leaf, &heads)?;
        Ok(pieces)
    }

    fn distribute_indicators(&mut self, leaf: ComponentId, heads: &[ComponentId]) -> ScoreResult<()> {
        let Some(last) = heads.last().copied() else {
            return Ok(());
        };
        let moved = self.detach_where(leaf, |w| {
            w.indicator.time_orientation() == TimeOrientation::Right
        })?;
        for wrapper in moved {
            self.attach(wrapper, last)?;
        }
        let middle: Vec<_> = self
            .wrappers(leaf)?
            .into_iter()
            .filter(|w| w.indicator.time_orientation() == TimeOrientation::Middle)
            .cloned()
            .collect();
        for head in &heads[1..] {
            for wrapper in &middle {
                self.attach(wrapper.clone(), *head)?;
            }
        }
        Ok(())
    }

    /// Split a container before child `index`.
    ///
    /// Two shells with the container's configuration take the left and the
    /// right children; the non-empty ones replace the container in its
    /// parent and are returned. Indicators stay with the left half, measure
    /// halves get time signatures fitted to their contents. The original
    /// container is discarded.
    pub fn split_container_at_index(&mut self, container: ComponentId, index: usize) -> ScoreResult<Selection> {
        let source = self.get(container)?.clone();
        let shell = match source.as_container() {
            Some(shell) => shell.shell(),
            None => {
                return Err(ScoreError::Structure(format!("{} is not a container", container)))
            }
        };
        let children = self.container_ref(container)?.children.clone();
        if index > children.len() {
            return Err(ScoreError::Structure(format!(
                "split index {} out of range for {} with {} children",
                index,
                container,
                children.len()
            )));
        }

        let left = self.add_container(shell.clone());
        let right = self.add_container(shell);
        for (half, wrappers) in [(left, source.wrappers.clone()), (right, Vec::new())] {
            let component = self.get_mut(half)?;
            component.name = source.name.clone();
            component.overrides = source.overrides.clone();
            component.settings = source.settings.clone();
            component.wrappers = wrappers;
        }
        for child in &children {
            self.unlink(*child)?;
        }
        for child in &children[..index] {
            self.append(left, *child)?;
        }
        for child in &children[index..] {
            self.append(right, *child)?;
        }

        let mut halves = Vec::new();
        for half in [left, right] {
            if self.container_ref(half)?.is_empty() {
                self.free(half);
                continue;
            }
            self.fit_measure(half)?;
            halves.push(half);
        }
        self.splice_replace(container, &halves)?;
        self.discard(container)?;
        Ok(Selection::new(halves))
    }

    /// Recompute a measure's meter from its contents, keeping the
    /// denominator where possible
    pub(crate) fn fit_measure(&mut self, measure: ComponentId) -> ScoreResult<()> {
        let duration = self.preprolated_duration(measure)?;
        if let ContainerKind::Measure { time_signature, .. } = &mut self.container_mut(measure)?.kind {
            let mut fitted = TimeSignature::from_duration(duration, time_signature.denominator);
            fitted.partial = time_signature.partial;
            *time_signature = fitted;
        }
        Ok(())
    }

    /// Split a container at a sounding offset from its start.
    ///
    /// A leaf crossing the offset is split first; then every container from
    /// that leaf up to `container` is split at the boundary. Simultaneous
    /// containers split each of their (container) children at the offset.
    /// Offsets at or beyond the ends return the container unchanged.
    pub fn split_container_by_duration(
        &mut self,
        container: ComponentId,
        offset: Duration,
    ) -> ScoreResult<Selection> {
        let total = self.duration(container)?;
        if offset <= Duration::zero() || offset >= total {
            return Ok(Selection::new([container]));
        }
        if self.container_ref(container)?.simultaneous {
            return self.split_simultaneous(container, offset);
        }
        let start = self.timespan(container)?.start;
        let target = start + offset;

        let mut boundary = None;
        let leaves: Vec<ComponentId> = self.leaves(container).collect();
        for leaf in leaves {
            let span = self.timespan(leaf)?;
            if span.start == target {
                boundary = Some(leaf);
                break;
            }
            if span.start < target && target < span.stop {
                let pieces = self.split_leaf_pieces(leaf, &[target - span.start], false)?;
                boundary = pieces.get(1).and_then(|piece| piece.first().copied());
                break;
            }
        }
        let Some(mut current) = boundary else {
            return Ok(Selection::new([container]));
        };

        loop {
            let Some(parent) = self.parent(current)? else {
                return Ok(Selection::new([current]));
            };
            let index = self.index_in_parent(current)?.unwrap_or(0);
            if index == 0 {
                if parent == container {
                    return Ok(Selection::new([container]));
                }
                current = parent;
                continue;
            }
            let halves = self.split_container_at_index(parent, index)?;
            if parent == container {
                return Ok(halves);
            }
            current = match halves.last() {
                Some(right) => right,
                None => return Ok(halves),
            };
        }
    }

    fn split_simultaneous(&mut self, container: ComponentId, offset: Duration) -> ScoreResult<Selection> {
        let children = self.container_ref(container)?.children.clone();
        if let Some(leaf) = children.iter().find(|c| self.is_leaf(**c)) {
            return Err(ScoreError::Structure(format!(
                "can not split simultaneous {} holding leaf {}",
                container, leaf
            )));
        }
        let mut lefts = Vec::new();
        let mut rights = Vec::new();
        for child in children {
            let child_start = self.timespan(child)?.start;
            let container_start = self.timespan(container)?.start;
            let local = offset - (child_start - container_start);
            let halves = self.split_container_by_duration(child, local)?;
            if halves.len() == 2 {
                lefts.push(halves[0]);
                rights.push(halves[1]);
            } else if local <= Duration::zero() {
                rights.extend(halves.iter());
            } else {
                lefts.extend(halves.iter());
            }
        }
        let source = self.get(container)?.clone();
        let shell = match source.as_container() {
            Some(shell) => shell.shell(),
            None => return Err(ScoreError::Structure(format!("{} is not a container", container))),
        };
        let mut halves = Vec::new();
        for (members, wrappers) in [(lefts, source.wrappers.clone()), (rights, Vec::new())] {
            if members.is_empty() {
                continue;
            }
            let half = self.add_container(shell.clone());
            let component = self.get_mut(half)?;
            component.name = source.name.clone();
            component.overrides = source.overrides.clone();
            component.settings = source.settings.clone();
            component.wrappers = wrappers;
            for member in members {
                self.unlink(member)?;
                self.append(half, member)?;
            }
            halves.push(half);
        }
        self.splice_replace(container, &halves)?;
        self.discard(container)?;
        Ok(Selection::new(halves))
    }
}

/// Sounding durations of the pieces of a leaf of length `total`
fn piece_durations(total: Duration, durations: &[Duration], cyclic: bool) -> ScoreResult<Vec<Duration>> {
    if let Some(negative) = durations.iter().find(|d| **d < Duration::zero()) {
        return Err(ScoreError::Assignability(format!(
            "can not split off a piece of {}",
            negative
        )));
    }
    let mut pieces = Vec::new();
    let mut used = Duration::zero();
    let usable: Vec<Duration> = durations.iter().copied().filter(|d| !d.is_zero()).collect();
    if usable.is_empty() {
        return Ok(vec![total]);
    }
    let mut index = 0;
    while used < total {
        if index >= usable.len() {
            if !cyclic {
                break;
            }
            index = 0;
        }
        let piece = usable[index].min(total - used);
        pieces.push(piece);
        used += piece;
        index += 1;
    }
    if used < total {
        pieces.push(total - used);
    }
    Ok(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_durations() {
        let whole = Duration::new(1, 1);
        assert_eq!(
            piece_durations(whole, &[Duration::new(3, 4)], false).unwrap(),
            vec![Duration::new(3, 4), Duration::new(1, 4)]
        );
        assert_eq!(
            piece_durations(whole, &[Duration::new(3, 8)], true).unwrap(),
            vec![Duration::new(3, 8), Duration::new(3, 8), Duration::new(1, 4)]
        );
        assert_eq!(piece_durations(whole, &[Duration::new(2, 1)], false).unwrap(), vec![whole]);
        assert_eq!(piece_durations(whole, &[], true).unwrap(), vec![whole]);
    }

    #[test]
    fn test_negative_pieces_are_rejected() {
        let whole = Duration::new(1, 1);
        for cyclic in [false, true] {
            assert!(matches!(
                piece_durations(whole, &[Duration::new(1, 4), Duration::new(-1, 8)], cyclic),
                Err(ScoreError::Assignability(_))
            ));
        }
    }
}
