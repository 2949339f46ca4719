//! Immutable ordered snapshots of component ids
//!
//! A selection never borrows the tree; queries take the tree explicitly.
//! Ids whose components were discarded after the snapshot was taken make
//! the queries fail with `MissingComponent`.

use std::collections::BTreeSet;
use std::ops::Index;
use std::sync::Arc;

use crate::error::{ScoreError, ScoreResult};
use crate::models::duration::Duration;
use crate::score::{ComponentId, ScoreTree};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection(Arc<[ComponentId]>);

impl Selection {
    pub fn new(ids: impl IntoIterator<Item = ComponentId>) -> Self {
        Selection(ids.into_iter().collect())
    }

    pub fn empty() -> Self {
        Selection(Arc::from(Vec::new()))
    }

    /// The children of a container, or the leaf itself
    pub fn children_of(tree: &ScoreTree, id: ComponentId) -> ScoreResult<Self> {
        if tree.is_leaf(id) {
            return Ok(Selection::new([id]));
        }
        Ok(Selection::new(tree.children(id)?.iter().copied()))
    }

    /// Every leaf below `id`, in pre-order
    pub fn leaves_of(tree: &ScoreTree, id: ComponentId) -> ScoreResult<Self> {
        tree.get(id)?;
        Ok(Selection::new(tree.leaves(id)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ComponentId> {
        self.0.get(index).copied()
    }

    pub fn first(&self) -> Option<ComponentId> {
        self.0.first().copied()
    }

    pub fn last(&self) -> Option<ComponentId> {
        self.0.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[ComponentId] {
        &self.0
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.0.contains(&id)
    }

    /// Sub-selection by index range
    pub fn slice(&self, range: std::ops::Range<usize>) -> Selection {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        Selection::new(self.0[start..end].iter().copied())
    }

    /// The leaves of every selected component, flattened in order
    pub fn leaves(&self, tree: &ScoreTree) -> ScoreResult<Selection> {
        let mut result = Vec::new();
        for id in self.iter() {
            tree.get(id)?;
            result.extend(tree.leaves(id));
        }
        Ok(Selection::new(result))
    }

    /// Sum of prolated durations
    pub fn duration(&self, tree: &ScoreTree) -> ScoreResult<Duration> {
        self.iter().map(|id| tree.duration(id)).sum()
    }

    pub fn all_leaves(&self, tree: &ScoreTree) -> bool {
        self.iter().all(|id| tree.is_leaf(id))
    }

    /// Common parent when every component has the same one
    pub fn common_parent(&self, tree: &ScoreTree) -> ScoreResult<Option<ComponentId>> {
        let mut parents = Vec::with_capacity(self.len());
        for id in self.iter() {
            parents.push(tree.parent(id)?);
        }
        match parents.first() {
            Some(first) if parents.iter().all(|p| p == first) => Ok(*first),
            _ => Ok(None),
        }
    }

    /// True when the components are consecutive children of one parent (in
    /// order), or all unparented
    pub fn are_contiguous_siblings(&self, tree: &ScoreTree) -> ScoreResult<bool> {
        let Some(first) = self.first() else {
            return Ok(true);
        };
        let mut parents = Vec::with_capacity(self.len());
        for id in self.iter() {
            parents.push(tree.parent(id)?);
        }
        if parents.iter().all(|p| p.is_none()) {
            return Ok(true);
        }
        let Some(parent) = parents[0] else {
            return Ok(false);
        };
        if parents.iter().any(|p| *p != Some(parent)) {
            return Ok(false);
        }
        let children = tree.children(parent)?;
        let Some(start) = children.iter().position(|c| *c == first) else {
            return Ok(false);
        };
        Ok(children.get(start..start + self.len()) == Some(self.as_slice()))
    }

    /// Leaves forming one uninterrupted run of a single logical voice
    pub fn are_contiguous_logical_voice(&self, tree: &ScoreTree) -> ScoreResult<bool> {
        tree.are_contiguous_logical_voice(self.as_slice())
    }

    /// Split into runs of consecutive components sharing a parent
    pub fn group_by_parent(&self, tree: &ScoreTree) -> ScoreResult<Vec<Selection>> {
        let mut groups: Vec<(Option<ComponentId>, Vec<ComponentId>)> = Vec::new();
        for id in self.iter() {
            let parent = tree.parent(id)?;
            match groups.last_mut() {
                Some((current, members)) if *current == parent => members.push(id),
                _ => groups.push((parent, vec![id])),
            }
        }
        Ok(groups
            .into_iter()
            .map(|(_, members)| Selection::new(members))
            .collect())
    }

    /// Fails with `Structure` when an id appears more than once
    pub fn check_distinct(&self) -> ScoreResult<()> {
        let mut seen = BTreeSet::new();
        for id in self.iter() {
            if !seen.insert(id) {
                return Err(ScoreError::Structure(format!("{} selected twice", id)));
            }
        }
        Ok(())
    }

    /// Fails with `MissingComponent` on the first stale id
    pub fn check_live(&self, tree: &ScoreTree) -> ScoreResult<()> {
        for id in self.iter() {
            if !tree.contains(id) {
                return Err(ScoreError::MissingComponent(id));
            }
        }
        Ok(())
    }
}

impl Default for Selection {
    fn default() -> Self {
        Selection::empty()
    }
}

impl Index<usize> for Selection {
    type Output = ComponentId;

    fn index(&self, index: usize) -> &ComponentId {
        &self.0[index]
    }
}

impl From<Vec<ComponentId>> for Selection {
    fn from(ids: Vec<ComponentId>) -> Self {
        Selection(ids.into())
    }
}

impl From<&[ComponentId]> for Selection {
    fn from(ids: &[ComponentId]) -> Self {
        Selection(ids.into())
    }
}

impl FromIterator<ComponentId> for Selection {
    fn from_iter<I: IntoIterator<Item = ComponentId>>(iter: I) -> Self {
        Selection::new(iter)
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a ComponentId;
    type IntoIter = std::slice::Iter<'a, ComponentId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
