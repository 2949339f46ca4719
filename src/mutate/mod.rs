//! Structural edits on the score tree
//!
//! Every operation validates its whole input before touching the tree, so
//! a returned error leaves the tree as it was.

mod fuse;
mod split;

use log::debug;

use crate::error::{ScoreError, ScoreResult};
use crate::models::duration::{Duration, Rational};
use crate::models::indicators::TimeSignature;
use crate::models::pitch::{NamedInterval, Pitch};
use crate::score::{Component, ComponentId, ContainerKind, LeafKind, Node, ScoreTree};
use crate::selection::Selection;
use crate::spanners::SpannerKind;

impl ScoreTree {
    /// Deep copy of a subtree with its overrides, settings and directly
    /// attached indicators. Spanner memberships are not copied. The copy
    /// is unparented.
    pub fn copy(&mut self, id: ComponentId) -> ScoreResult<ComponentId> {
        let source = self.get(id)?;
        let mut component = Component {
            parent: None,
            name: source.name.clone(),
            spanners: Default::default(),
            wrappers: source
                .wrappers
                .iter()
                .filter(|w| w.spanner().is_none())
                .cloned()
                .collect(),
            overrides: source.overrides.clone(),
            settings: source.settings.clone(),
            node: source.node.clone(),
        };
        let children = match &mut component.node {
            Node::Container(container) => std::mem::take(&mut container.children),
            Node::Leaf(_) => Vec::new(),
        };
        let copy = self.alloc(component);
        for child in children {
            let child_copy = self.copy(child)?;
            self.append(copy, child_copy)?;
        }
        Ok(copy)
    }

    pub fn copy_selection(&mut self, selection: &Selection) -> ScoreResult<Selection> {
        selection.check_live(self)?;
        let mut copies = Vec::with_capacity(selection.len());
        for id in selection.iter() {
            copies.push(self.copy(id)?);
        }
        Ok(Selection::new(copies))
    }

    /// Put `container` where the selection sits and move the selection
    /// into it. The container must be empty and unparented; the selection
    /// must be consecutive children of one parent, or all unparented.
    pub fn wrap(&mut self, selection: &Selection, container: ComponentId) -> ScoreResult<()> {
        selection.check_live(self)?;
        selection.check_distinct()?;
        let shell = self.container_ref(container)?;
        if !shell.is_empty() || self.parent(container)?.is_some() {
            return Err(ScoreError::Structure(format!(
                "{} must be empty and unparented to wrap",
                container
            )));
        }
        if selection.contains(container) {
            return Err(ScoreError::Structure(format!("can not wrap {} in itself", container)));
        }
        if !selection.are_contiguous_siblings(self)? {
            return Err(ScoreError::Contiguity(
                "wrapped components must be consecutive siblings".to_string(),
            ));
        }
        if let Some(first) = selection.first() {
            if let Some(parent) = self.parent(first)? {
                let index = self.index_in_parent(first)?.unwrap_or(0);
                for id in selection.iter() {
                    self.unlink(id)?;
                }
                self.insert(parent, index, container)?;
            }
        }
        for id in selection.iter() {
            self.append(container, id)?;
        }
        Ok(())
    }

    /// Replace a container by its children. The emptied container stays
    /// alive, unparented.
    pub fn extract(&mut self, container: ComponentId) -> ScoreResult<Selection> {
        let children = self.container_ref(container)?.children.clone();
        for child in &children {
            self.unlink(*child)?;
        }
        self.splice_replace(container, &children)?;
        Ok(Selection::new(children))
    }

    /// Put `recipients` where the selection sits. The replaced components
    /// are removed (and leave their spanners) but not discarded.
    pub fn replace(&mut self, selection: &Selection, recipients: &Selection) -> ScoreResult<()> {
        selection.check_live(self)?;
        recipients.check_live(self)?;
        selection.check_distinct()?;
        recipients.check_distinct()?;
        let Some(first) = selection.first() else {
            return Ok(());
        };
        let Some(parent) = self.parent(first)? else {
            return Err(ScoreError::Structure(format!("{} has no parent", first)));
        };
        if !selection.are_contiguous_siblings(self)? {
            return Err(ScoreError::Contiguity(
                "replaced components must be consecutive siblings".to_string(),
            ));
        }
        for recipient in recipients.iter() {
            if self.parent(recipient)?.is_some() || selection.contains(recipient) {
                return Err(ScoreError::Structure(format!(
                    "recipient {} must be unparented",
                    recipient
                )));
            }
            if self.parentage(parent)?.contains(&recipient) {
                return Err(ScoreError::Structure(format!(
                    "recipient {} is an ancestor of the replaced components",
                    recipient
                )));
            }
        }
        let index = self.index_in_parent(first)?.unwrap_or(0);
        for id in selection.iter() {
            self.remove(id)?;
        }
        for (offset, recipient) in recipients.iter().enumerate() {
            self.insert(parent, index + offset, recipient)?;
        }
        Ok(())
    }

    /// Multiply every leaf duration below `id` by `factor`, re-spelling
    /// unassignable results as tied runs. Measures and fixed-duration
    /// containers scale their declared length.
    pub fn scale(&mut self, id: ComponentId, factor: Rational) -> ScoreResult<()> {
        if *factor.numer() <= 0 || *factor.denom() <= 0 {
            return Err(ScoreError::Assignability(format!(
                "scale factor {} must be positive",
                factor
            )));
        }
        let leaves: Vec<ComponentId> = self.leaves(id).collect();
        self.check_scalable(&leaves, factor)?;
        for container in self.descendants(id)? {
            let kind = match self.get(container)?.as_container() {
                Some(container) => container.kind.clone(),
                None => continue,
            };
            let scaled = match kind {
                ContainerKind::Measure {
                    time_signature,
                    automatically_adjust,
                } => ContainerKind::Measure {
                    time_signature: TimeSignature::from_duration(
                        time_signature.duration().scale(factor),
                        time_signature.denominator,
                    ),
                    automatically_adjust,
                },
                ContainerKind::FixedDuration(duration) => {
                    ContainerKind::FixedDuration(duration.scale(factor))
                }
                _ => continue,
            };
            self.container_mut(container)?.kind = scaled;
        }
        self.scale_leaves(&leaves, factor)
    }

    pub(crate) fn check_scalable(&self, leaves: &[ComponentId], factor: Rational) -> ScoreResult<()> {
        for leaf in leaves {
            let payload = self.leaf(*leaf)?;
            let target = payload.preprolated_duration().scale(factor);
            if payload.multiplier().is_none() && !target.is_dyadic() {
                return Err(ScoreError::Assignability(format!(
                    "{} scaled to {} needs a tuplet",
                    leaf, target
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn scale_leaves(&mut self, leaves: &[ComponentId], factor: Rational) -> ScoreResult<()> {
        for leaf in leaves {
            let target = self.leaf(*leaf)?.preprolated_duration().scale(factor);
            self.set_leaf_duration(*leaf, target)?;
        }
        Ok(())
    }

    /// Give a leaf a new preprolated duration.
    ///
    /// Multiplier leaves change their multiplier. Otherwise an assignable
    /// value is written directly and anything else becomes a tied run of
    /// canonic parts; the extra leaves follow the original and join every
    /// spanner the original belongs to. Returns the resulting leaves.
    pub(crate) fn set_leaf_duration(
        &mut self,
        leaf: ComponentId,
        duration: Duration,
    ) -> ScoreResult<Vec<ComponentId>> {
        let payload = self.leaf(leaf)?.clone();
        if payload.multiplier().is_some() {
            let multiplier = duration.ratio_to(payload.written_duration());
            self.leaf_mut(leaf)?.set_multiplier(Some(multiplier))?;
            return Ok(vec![leaf]);
        }
        if duration.is_assignable() {
            self.leaf_mut(leaf)?.set_written_duration(duration)?;
            return Ok(vec![leaf]);
        }
        let parts = duration.canonic_parts()?;
        debug!("re-spelling {} ({}) as {} tied parts", leaf, duration, parts.len());
        self.leaf_mut(leaf)?.set_written_duration(parts[0])?;
        let mut result = vec![leaf];
        for part in &parts[1..] {
            let mut extra = payload.clone();
            extra.set_written_duration(*part)?;
            result.push(self.add_leaf(extra));
        }
        if let (Some(parent), Some(index)) = (self.parent(leaf)?, self.index_in_parent(leaf)?) {
            for (offset, extra) in result[1..].iter().enumerate() {
                self.insert(parent, index + 1 + offset, *extra)?;
            }
            self.grow_spanners_after(leaf, &result[1..])?;
            if payload.kind.is_pitched() && self.spanner_of_kind(leaf, SpannerKind::Tie)?.is_none() {
                self.span(SpannerKind::Tie, &result)?;
            }
        }
        Ok(result)
    }

    /// Transpose every note and chord below `id`
    pub fn transpose(&mut self, id: ComponentId, interval: &NamedInterval) -> ScoreResult<()> {
        let mut updates = Vec::new();
        for leaf in self.leaves(id) {
            let kind = match &self.leaf(leaf)?.kind {
                LeafKind::Note(pitch) => LeafKind::Note(pitch.transpose(interval)?),
                LeafKind::Chord(pitches) => LeafKind::Chord(
                    pitches
                        .iter()
                        .map(|p| p.transpose(interval))
                        .collect::<ScoreResult<_>>()?,
                ),
                _ => continue,
            };
            updates.push((leaf, kind));
        }
        debug!("transposing {} leaves by {}", updates.len(), interval);
        for (leaf, kind) in updates {
            self.leaf_mut(leaf)?.kind = kind;
        }
        Ok(())
    }

    /// Pitches sounding in the subtree, in leaf order
    pub fn pitches(&self, id: ComponentId) -> ScoreResult<Vec<Pitch>> {
        let mut pitches = Vec::new();
        for leaf in self.leaves(id) {
            pitches.extend(self.leaf(leaf)?.pitches());
        }
        Ok(pitches)
    }
}
