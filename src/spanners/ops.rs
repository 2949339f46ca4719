//! Spanner lifecycle on the tree: attach, extend, fracture, fuse, detach

use log::debug;

use crate::error::{ScoreError, ScoreResult};
use crate::score::{ComponentId, ScoreTree, SpannerId, Wrapper};

use super::{Spanner, SpannerKind, SpannerState};

/// Where a fracture cuts relative to the leaf at the fracture index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FractureSide {
    /// Cut before the leaf
    Left,
    /// Cut after the leaf
    Right,
    /// Cut on both sides, isolating the leaf
    Both,
}

impl ScoreTree {
    /// Create an unattached spanner
    pub fn new_spanner(&mut self, kind: SpannerKind) -> SpannerId {
        let id = SpannerId::from_raw(self.spanners.len());
        self.spanners.push(Spanner::new(id, kind));
        id
    }

    /// Create a spanner and attach it to `leaves`
    pub fn span(&mut self, kind: SpannerKind, leaves: &[ComponentId]) -> ScoreResult<SpannerId> {
        self.check_attachable(kind, leaves)?;
        let id = self.new_spanner(kind);
        self.attach_spanner(id, leaves)?;
        Ok(id)
    }

    pub fn spanner(&self, id: SpannerId) -> ScoreResult<&Spanner> {
        self.spanners
            .get(id.index())
            .ok_or(ScoreError::MissingSpanner(id))
    }

    pub fn spanner_mut(&mut self, id: SpannerId) -> ScoreResult<&mut Spanner> {
        self.spanners
            .get_mut(id.index())
            .ok_or(ScoreError::MissingSpanner(id))
    }

    /// Every spanner ever created, tombstones included
    pub fn spanner_ids(&self) -> impl Iterator<Item = SpannerId> + '_ {
        self.spanners.iter().map(|s| s.id)
    }

    /// Spanners the leaf belongs to, in id order
    pub fn spanners_of(&self, leaf: ComponentId) -> ScoreResult<Vec<SpannerId>> {
        Ok(self.get(leaf)?.spanners.iter().copied().collect())
    }

    /// Live spanner of `kind` containing the leaf
    pub fn spanner_of_kind(&self, leaf: ComponentId, kind: SpannerKind) -> ScoreResult<Option<SpannerId>> {
        for id in self.spanners_of(leaf)? {
            if self.spanner(id)?.kind == kind {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// Attach an unattached spanner to a contiguous run of leaves
    pub fn attach_spanner(&mut self, id: SpannerId, leaves: &[ComponentId]) -> ScoreResult<()> {
        let spanner = self.spanner(id)?;
        if !spanner.leaves.is_empty() || spanner.state.is_tombstone() {
            return Err(ScoreError::AlreadyAttached(id));
        }
        self.check_attachable(spanner.kind, leaves)?;
        let order = self.next_attach_order;
        self.next_attach_order += 1;
        for leaf in leaves {
            self.get_mut(*leaf)?.spanners.insert(id);
        }
        let spanner = self.spanner_mut(id)?;
        spanner.leaves = leaves.to_vec();
        spanner.attach_order = Some(order);
        spanner.state = SpannerState::Attached;
        Ok(())
    }

    fn check_attachable(&self, kind: SpannerKind, leaves: &[ComponentId]) -> ScoreResult<()> {
        for (i, leaf) in leaves.iter().enumerate() {
            let component = self.get(*leaf)?;
            let Some(payload) = component.as_leaf() else {
                return Err(ScoreError::NotALeaf(*leaf));
            };
            if kind == SpannerKind::Tie && !payload.kind.is_pitched() {
                return Err(ScoreError::InvalidAttachment(format!(
                    "tie on {} {}",
                    payload.kind.name(),
                    leaf
                )));
            }
            if leaves[..i].contains(leaf) {
                return Err(ScoreError::Contiguity(format!("{} listed twice", leaf)));
            }
        }
        if !self.are_contiguous_logical_voice(leaves)? {
            return Err(ScoreError::Contiguity(describe(leaves)));
        }
        Ok(())
    }

    /// Add leaves to the right end of a spanner
    pub fn extend_spanner(&mut self, id: SpannerId, leaves: &[ComponentId]) -> ScoreResult<()> {
        let mut combined = self.live_leaves(id)?;
        combined.extend_from_slice(leaves);
        self.regrow(id, combined)
    }

    /// Add leaves to the left end of a spanner
    pub fn extend_spanner_left(&mut self, id: SpannerId, leaves: &[ComponentId]) -> ScoreResult<()> {
        let mut combined = leaves.to_vec();
        combined.extend(self.live_leaves(id)?);
        self.regrow(id, combined)
    }

    fn live_leaves(&self, id: SpannerId) -> ScoreResult<Vec<ComponentId>> {
        let spanner = self.spanner(id)?;
        if spanner.state.is_tombstone() {
            return Err(ScoreError::InvalidAttachment(format!(
                "{} is a {:?} tombstone",
                id, spanner.state
            )));
        }
        Ok(spanner.leaves.clone())
    }

    fn regrow(&mut self, id: SpannerId, leaves: Vec<ComponentId>) -> ScoreResult<()> {
        self.check_attachable(self.spanner(id)?.kind, &leaves)?;
        if self.spanner(id)?.attach_order.is_none() {
            self.spanner_mut(id)?.attach_order = Some(self.next_attach_order);
            self.next_attach_order += 1;
        }
        for leaf in &leaves {
            self.get_mut(*leaf)?.spanners.insert(id);
        }
        let spanner = self.spanner_mut(id)?;
        spanner.leaves = leaves;
        spanner.state = SpannerState::Attached;
        Ok(())
    }

    /// Insert `new_leaves` right after `anchor` in every spanner holding
    /// `anchor`. Callers guarantee the result stays contiguous.
    pub(crate) fn grow_spanners_after(
        &mut self,
        anchor: ComponentId,
        new_leaves: &[ComponentId],
    ) -> ScoreResult<()> {
        for id in self.spanners_of(anchor)? {
            let spanner = self.spanner_mut(id)?;
            let Some(position) = spanner.leaves.iter().position(|l| *l == anchor) else {
                continue;
            };
            for (offset, leaf) in new_leaves.iter().enumerate() {
                spanner.leaves.insert(position + 1 + offset, *leaf);
            }
            for leaf in new_leaves {
                self.get_mut(*leaf)?.spanners.insert(id);
            }
        }
        Ok(())
    }

    /// Drop `leaf` from every spanner that holds it. Spanners keep their
    /// remaining leaves; one left empty falls back to `Unattached`.
    pub(crate) fn block_leaf(&mut self, leaf: ComponentId) {
        let ids: Vec<SpannerId> = match self.get_mut(leaf) {
            Ok(component) => std::mem::take(&mut component.spanners).into_iter().collect(),
            Err(_) => return,
        };
        for id in ids {
            if let Some(spanner) = self.spanners.get_mut(id.index()) {
                spanner.leaves.retain(|l| *l != leaf);
                spanner.piecewise.retain(|(l, _)| *l != leaf);
                if spanner.leaves.is_empty() && spanner.state == SpannerState::Attached {
                    spanner.state = SpannerState::Unattached;
                }
            }
        }
    }

    /// Split a spanner at leaf `index` (negative counts from the end).
    ///
    /// Returns the original, now a `Fractured` tombstone, and the new
    /// pieces in left-to-right order. Empty pieces are not created.
    pub fn fracture(
        &mut self,
        id: SpannerId,
        index: isize,
        side: FractureSide,
    ) -> ScoreResult<(SpannerId, Vec<SpannerId>)> {
        let leaves = self.live_leaves(id)?;
        let len = leaves.len() as isize;
        let position = if index < 0 { index + len } else { index };
        if position < 0 || position >= len {
            return Err(ScoreError::Structure(format!(
                "fracture index {} out of range for {} with {} leaves",
                index, id, len
            )));
        }
        let i = position as usize;
        let parts: Vec<&[ComponentId]> = match side {
            FractureSide::Left => vec![&leaves[..i], &leaves[i..]],
            FractureSide::Right => vec![&leaves[..i + 1], &leaves[i + 1..]],
            FractureSide::Both => vec![&leaves[..i], &leaves[i..i + 1], &leaves[i + 1..]],
        };
        debug!("fracturing {} at {} ({:?})", id, i, side);

        let original = self.spanner(id)?.clone();
        let mut pieces = Vec::new();
        for part in parts.into_iter().filter(|p| !p.is_empty()) {
            let piece_id = SpannerId::from_raw(self.spanners.len());
            let mut piece = original.configured_copy(piece_id);
            piece.leaves = part.to_vec();
            piece.state = SpannerState::Attached;
            piece.piecewise = original
                .piecewise
                .iter()
                .filter(|(leaf, _)| part.contains(leaf))
                .map(|(leaf, wrapper)| {
                    let mut wrapper = wrapper.clone();
                    wrapper.spanner = Some(piece_id);
                    (*leaf, wrapper)
                })
                .collect();
            self.spanners.push(piece);
            for leaf in part {
                self.get_mut(*leaf)?.spanners.insert(piece_id);
            }
            pieces.push(piece_id);
        }
        self.retire(id, SpannerState::Fractured)?;
        Ok((id, pieces))
    }

    /// Concatenate two compatible spanners over adjacent runs into a new
    /// spanner; both inputs become `Fused` tombstones
    pub fn fuse_spanners(&mut self, left: SpannerId, right: SpannerId) -> ScoreResult<SpannerId> {
        let left_leaves = self.live_leaves(left)?;
        let right_leaves = self.live_leaves(right)?;
        let (first, second) = (self.spanner(left)?.clone(), self.spanner(right)?.clone());
        if left == right || !first.is_compatible_with(&second) {
            return Err(ScoreError::IncompatibleOperand(format!(
                "can not fuse {} with {}",
                first.summary(),
                second.summary()
            )));
        }
        if let (Some(last), Some(next)) = (left_leaves.last(), right_leaves.first()) {
            if self.next_leaf_in_logical_voice(*last)? != Some(*next) {
                return Err(ScoreError::Contiguity(format!(
                    "{} does not follow {}",
                    second.summary(),
                    first.summary()
                )));
            }
        }
        let fused_id = SpannerId::from_raw(self.spanners.len());
        let mut fused = first.configured_copy(fused_id);
        fused.leaves = left_leaves.iter().chain(&right_leaves).copied().collect();
        fused.state = SpannerState::Attached;
        fused.piecewise = first
            .piecewise
            .iter()
            .chain(&second.piecewise)
            .map(|(leaf, wrapper)| {
                let mut wrapper = wrapper.clone();
                wrapper.spanner = Some(fused_id);
                (*leaf, wrapper)
            })
            .collect();
        let members = fused.leaves.clone();
        self.spanners.push(fused);
        self.retire(left, SpannerState::Fused)?;
        self.retire(right, SpannerState::Fused)?;
        for leaf in members {
            self.get_mut(leaf)?.spanners.insert(fused_id);
        }
        debug!("fused {} and {} into {}", left, right, fused_id);
        Ok(fused_id)
    }

    /// Release every leaf and piecewise wrapper
    pub fn detach_spanner(&mut self, id: SpannerId) -> ScoreResult<()> {
        if self.spanner(id)?.state.is_tombstone() {
            return Ok(());
        }
        self.retire(id, SpannerState::Detached)
    }

    fn retire(&mut self, id: SpannerId, state: SpannerState) -> ScoreResult<()> {
        let leaves = std::mem::take(&mut self.spanner_mut(id)?.leaves);
        for leaf in leaves {
            if let Ok(component) = self.get_mut(leaf) {
                component.spanners.remove(&id);
            }
        }
        let spanner = self.spanner_mut(id)?;
        spanner.piecewise.clear();
        spanner.state = state;
        Ok(())
    }

    /// Bind an indicator to one leaf of the spanner
    pub fn attach_piecewise(
        &mut self,
        id: SpannerId,
        leaf: ComponentId,
        wrapper: impl Into<Wrapper>,
    ) -> ScoreResult<()> {
        let mut wrapper = wrapper.into();
        wrapper.spanner = Some(id);
        let spanner = self.spanner_mut(id)?;
        if !spanner.leaves.contains(&leaf) {
            return Err(ScoreError::InvalidAttachment(format!(
                "{} is not in {}",
                leaf,
                spanner.summary()
            )));
        }
        if !spanner.piecewise.iter().any(|(l, w)| *l == leaf && *w == wrapper) {
            spanner.piecewise.push((leaf, wrapper));
        }
        Ok(())
    }

    /// Leaves tied to `leaf`, in order; just the leaf when untied
    pub fn logical_tie(&self, leaf: ComponentId) -> ScoreResult<Vec<ComponentId>> {
        self.leaf(leaf)?;
        match self.spanner_of_kind(leaf, SpannerKind::Tie)? {
            Some(tie) => Ok(self.spanner(tie)?.leaves.clone()),
            None => Ok(vec![leaf]),
        }
    }
}

fn describe(leaves: &[ComponentId]) -> String {
    let ids: Vec<String> = leaves.iter().map(|l| l.to_string()).collect();
    format!("leaves [{}] are not contiguous in one logical voice", ids.join(", "))
}

#[cfg(test)]
mod tests {
    use crate::models::duration::Duration;
    use crate::models::indicators::Indicator;
    use crate::models::pitch::Pitch;

    use super::*;

    fn staff_of(tree: &mut ScoreTree, count: usize) -> (ComponentId, Vec<ComponentId>) {
        let staff = tree.staff();
        let leaves: Vec<ComponentId> = (0..count)
            .map(|_| {
                tree.note(Pitch::from_name("c'").unwrap(), Duration::new(1, 8))
                    .unwrap()
            })
            .collect();
        tree.extend(staff, leaves.clone()).unwrap();
        (staff, leaves)
    }

    #[test]
    fn test_attach_sets_back_references() {
        let mut tree = ScoreTree::new();
        let (_, leaves) = staff_of(&mut tree, 3);
        let beam = tree.span(SpannerKind::Beam, &leaves).unwrap();
        for leaf in &leaves {
            assert!(tree.spanners_of(*leaf).unwrap().contains(&beam));
        }
        assert_eq!(tree.spanner(beam).unwrap().state(), SpannerState::Attached);
        assert_eq!(
            tree.attach_spanner(beam, &leaves),
            Err(ScoreError::AlreadyAttached(beam))
        );
    }

    #[test]
    fn test_attach_rejects_gaps() {
        let mut tree = ScoreTree::new();
        let (_, leaves) = staff_of(&mut tree, 3);
        let result = tree.span(SpannerKind::Slur, &[leaves[0], leaves[2]]);
        assert!(matches!(result, Err(ScoreError::Contiguity(_))));
        let staff = tree.parent(leaves[0]).unwrap().unwrap();
        assert!(matches!(
            tree.span(SpannerKind::Slur, &[staff]),
            Err(ScoreError::NotALeaf(_))
        ));
    }

    #[test]
    fn test_tie_needs_pitched_leaves() {
        let mut tree = ScoreTree::new();
        let staff = tree.staff();
        let rest = tree.rest(Duration::new(1, 4)).unwrap();
        let note = tree
            .note(Pitch::from_name("c'").unwrap(), Duration::new(1, 4))
            .unwrap();
        tree.extend(staff, [rest, note]).unwrap();
        assert!(matches!(
            tree.span(SpannerKind::Tie, &[rest, note]),
            Err(ScoreError::InvalidAttachment(_))
        ));
    }

    #[test]
    fn test_extend_both_ends() {
        let mut tree = ScoreTree::new();
        let (_, leaves) = staff_of(&mut tree, 4);
        let slur = tree.span(SpannerKind::Slur, &leaves[1..3]).unwrap();
        tree.extend_spanner(slur, &leaves[3..]).unwrap();
        tree.extend_spanner_left(slur, &leaves[..1]).unwrap();
        assert_eq!(tree.spanner(slur).unwrap().leaves(), leaves.as_slice());
        assert!(tree.extend_spanner(slur, &leaves[..1]).is_err());
    }

    #[test]
    fn test_fracture_partitions_leaves() {
        let mut tree = ScoreTree::new();
        let (_, leaves) = staff_of(&mut tree, 4);
        let beam = tree.span(SpannerKind::Beam, &leaves).unwrap();
        let (original, pieces) = tree.fracture(beam, 2, FractureSide::Left).unwrap();
        assert_eq!(original, beam);
        assert_eq!(tree.spanner(beam).unwrap().state(), SpannerState::Fractured);
        assert!(tree.spanner(beam).unwrap().is_empty());
        assert_eq!(pieces.len(), 2);
        assert_eq!(tree.spanner(pieces[0]).unwrap().leaves(), &leaves[..2]);
        assert_eq!(tree.spanner(pieces[1]).unwrap().leaves(), &leaves[2..]);
        assert_eq!(
            tree.spanner(pieces[0]).unwrap().attach_order(),
            tree.spanner(pieces[1]).unwrap().attach_order()
        );
        assert!(!tree.spanners_of(leaves[0]).unwrap().contains(&beam));
    }

    #[test]
    fn test_fracture_both_and_negative_index() {
        let mut tree = ScoreTree::new();
        let (_, leaves) = staff_of(&mut tree, 3);
        let slur = tree.span(SpannerKind::Slur, &leaves).unwrap();
        let (_, pieces) = tree.fracture(slur, -2, FractureSide::Both).unwrap();
        let sizes: Vec<usize> = pieces
            .iter()
            .map(|p| tree.spanner(*p).unwrap().len())
            .collect();
        assert_eq!(sizes, vec![1, 1, 1]);
        assert_eq!(tree.spanner(pieces[1]).unwrap().leaves(), &leaves[1..2]);
    }

    #[test]
    fn test_fracture_at_edge_skips_empty_piece() {
        let mut tree = ScoreTree::new();
        let (_, leaves) = staff_of(&mut tree, 3);
        let beam = tree.span(SpannerKind::Beam, &leaves).unwrap();
        let (_, pieces) = tree.fracture(beam, 0, FractureSide::Left).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_eq!(tree.spanner(pieces[0]).unwrap().leaves(), leaves.as_slice());
    }

    #[test]
    fn test_fuse_adjacent_beams() {
        let mut tree = ScoreTree::new();
        let (_, leaves) = staff_of(&mut tree, 4);
        let left = tree.span(SpannerKind::Beam, &leaves[..2]).unwrap();
        let right = tree.span(SpannerKind::Beam, &leaves[2..]).unwrap();
        let fused = tree.fuse_spanners(left, right).unwrap();
        assert_eq!(tree.spanner(fused).unwrap().leaves(), leaves.as_slice());
        assert_eq!(tree.spanner(left).unwrap().state(), SpannerState::Fused);
        assert_eq!(tree.spanner(right).unwrap().state(), SpannerState::Fused);
        assert_eq!(tree.spanners_of(leaves[3]).unwrap(), vec![fused]);
    }

    #[test]
    fn test_fuse_rejects_mismatch() {
        let mut tree = ScoreTree::new();
        let (_, leaves) = staff_of(&mut tree, 5);
        let beam = tree.span(SpannerKind::Beam, &leaves[..2]).unwrap();
        let slur = tree.span(SpannerKind::Slur, &leaves[2..3]).unwrap();
        assert!(tree.fuse_spanners(beam, slur).unwrap_err().is_incompatible_operand());
        let far = tree.span(SpannerKind::Beam, &leaves[3..]).unwrap();
        assert!(matches!(
            tree.fuse_spanners(beam, far),
            Err(ScoreError::Contiguity(_))
        ));
    }

    #[test]
    fn test_remove_blocks_leaf() {
        let mut tree = ScoreTree::new();
        let (_, leaves) = staff_of(&mut tree, 3);
        let beam = tree.span(SpannerKind::Beam, &leaves).unwrap();
        tree.remove(leaves[1]).unwrap();
        assert_eq!(tree.spanner(beam).unwrap().leaves(), &[leaves[0], leaves[2]]);
        assert!(tree.spanners_of(leaves[1]).unwrap().is_empty());
    }

    #[test]
    fn test_piecewise_follows_fracture() {
        let mut tree = ScoreTree::new();
        let (_, leaves) = staff_of(&mut tree, 4);
        let text = tree.span(SpannerKind::TextSpanner, &leaves).unwrap();
        tree.attach_piecewise(text, leaves[3], Indicator::markup("rit.", None))
            .unwrap();
        assert!(tree
            .attach_piecewise(text, ComponentId::from_raw(99), Indicator::markup("x", None))
            .is_err());
        let (_, pieces) = tree.fracture(text, 2, FractureSide::Left).unwrap();
        assert!(tree.spanner(pieces[0]).unwrap().piecewise().is_empty());
        let moved = tree.spanner(pieces[1]).unwrap().piecewise();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].1.spanner(), Some(pieces[1]));
    }

    #[test]
    fn test_detach_and_logical_tie() {
        let mut tree = ScoreTree::new();
        let (_, leaves) = staff_of(&mut tree, 3);
        let tie = tree.span(SpannerKind::Tie, &leaves[..2]).unwrap();
        assert_eq!(tree.logical_tie(leaves[1]).unwrap(), &leaves[..2]);
        assert_eq!(tree.logical_tie(leaves[2]).unwrap(), vec![leaves[2]]);
        tree.detach_spanner(tie).unwrap();
        assert_eq!(tree.spanner(tie).unwrap().state(), SpannerState::Detached);
        assert_eq!(tree.logical_tie(leaves[0]).unwrap(), vec![leaves[0]]);
    }
}
