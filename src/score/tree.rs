//! Parent/child structure: insertion, removal and navigation

use log::debug;

use crate::error::{ScoreError, ScoreResult};

use super::{ComponentId, Node, ScoreTree};

/// Lazy pre-order iterator over the leaves below a component.
///
/// Simultaneous containers are entered in child order. Call
/// [`ScoreTree::leaves`] again to restart.
pub struct Leaves<'a> {
    tree: &'a ScoreTree,
    stack: Vec<ComponentId>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = ComponentId;

    fn next(&mut self) -> Option<ComponentId> {
        while let Some(id) = self.stack.pop() {
            let Ok(component) = self.tree.get(id) else {
                continue;
            };
            match &component.node {
                Node::Leaf(_) => return Some(id),
                Node::Container(container) => {
                    self.stack.extend(container.children.iter().rev().copied());
                }
            }
        }
        None
    }
}

impl ScoreTree {
    /// Insert `child` into `container` at `index`
    pub fn insert(&mut self, container: ComponentId, index: usize, child: ComponentId) -> ScoreResult<()> {
        self.check_insertable(container, child)?;
        let len = self.container_ref(container)?.children.len();
        if index > len {
            return Err(ScoreError::Structure(format!(
                "index {} out of range for {} with {} children",
                index, container, len
            )));
        }
        self.container_mut(container)?.children.insert(index, child);
        self.get_mut(child)?.parent = Some(container);
        Ok(())
    }

    pub fn append(&mut self, container: ComponentId, child: ComponentId) -> ScoreResult<()> {
        let len = self.container_ref(container)?.children.len();
        self.insert(container, len, child)
    }

    /// Append every child; nothing is inserted when any child is rejected
    pub fn extend(
        &mut self,
        container: ComponentId,
        children: impl IntoIterator<Item = ComponentId>,
    ) -> ScoreResult<()> {
        let children: Vec<ComponentId> = children.into_iter().collect();
        for (i, child) in children.iter().enumerate() {
            self.check_insertable(container, *child)?;
            if children[..i].contains(child) {
                return Err(ScoreError::Structure(format!("{} appears twice", child)));
            }
        }
        for child in children {
            self.append(container, child)?;
        }
        Ok(())
    }

    fn check_insertable(&self, container: ComponentId, child: ComponentId) -> ScoreResult<()> {
        self.container_ref(container)?;
        let component = self.get(child)?;
        if let Some(parent) = component.parent {
            return Err(ScoreError::Structure(format!(
                "{} already has parent {}",
                child, parent
            )));
        }
        if self.parentage(container)?.contains(&child) {
            return Err(ScoreError::Structure(format!(
                "inserting {} into {} would create a cycle",
                child, container
            )));
        }
        Ok(())
    }

    /// Detach `child` from its parent and from every spanner touching its
    /// leaves
    pub fn remove(&mut self, child: ComponentId) -> ScoreResult<()> {
        self.unlink(child)?;
        let leaves: Vec<ComponentId> = self.leaves(child).collect();
        for leaf in leaves {
            self.block_leaf(leaf);
        }
        Ok(())
    }

    /// Remove and free the whole subtree
    pub fn discard(&mut self, component: ComponentId) -> ScoreResult<()> {
        self.remove(component)?;
        let subtree = self.descendants(component)?;
        debug!("discarding {} ({} components)", component, subtree.len());
        for id in subtree {
            self.free(id);
        }
        Ok(())
    }

    /// Detach from the parent only; spanner membership is untouched
    pub(crate) fn unlink(&mut self, child: ComponentId) -> ScoreResult<()> {
        if let Some(parent) = self.get(child)?.parent {
            self.container_mut(parent)?.children.retain(|c| *c != child);
            self.get_mut(child)?.parent = None;
        }
        Ok(())
    }

    /// Put `replacements` (all unparented) where `old` sits and unlink `old`
    pub(crate) fn splice_replace(
        &mut self,
        old: ComponentId,
        replacements: &[ComponentId],
    ) -> ScoreResult<()> {
        let Some(parent) = self.get(old)?.parent else {
            return Ok(());
        };
        let index = self.index_in_parent(old)?.unwrap_or(0);
        self.unlink(old)?;
        for (offset, id) in replacements.iter().enumerate() {
            self.insert(parent, index + offset, *id)?;
        }
        Ok(())
    }

    pub fn parent(&self, id: ComponentId) -> ScoreResult<Option<ComponentId>> {
        Ok(self.get(id)?.parent)
    }

    /// Children of a container; leaves have none
    pub fn children(&self, id: ComponentId) -> ScoreResult<&[ComponentId]> {
        match &self.get(id)?.node {
            Node::Container(container) => Ok(&container.children),
            Node::Leaf(_) => Ok(&[]),
        }
    }

    pub fn index_in_parent(&self, id: ComponentId) -> ScoreResult<Option<usize>> {
        match self.get(id)?.parent {
            Some(parent) => Ok(self.children(parent)?.iter().position(|c| *c == id)),
            None => Ok(None),
        }
    }

    /// The component followed by its ancestors, ending at the root
    pub fn parentage(&self, id: ComponentId) -> ScoreResult<Vec<ComponentId>> {
        let mut result = vec![id];
        let mut current = self.get(id)?.parent;
        while let Some(parent) = current {
            if result.contains(&parent) {
                return Err(ScoreError::Structure(format!("parent cycle at {}", parent)));
            }
            result.push(parent);
            current = self.get(parent)?.parent;
        }
        Ok(result)
    }

    pub fn root(&self, id: ComponentId) -> ScoreResult<ComponentId> {
        let parentage = self.parentage(id)?;
        Ok(*parentage.last().unwrap_or(&id))
    }

    /// Sibling `offset` positions away (negative to the left)
    pub fn sibling(&self, id: ComponentId, offset: isize) -> ScoreResult<Option<ComponentId>> {
        let Some(parent) = self.get(id)?.parent else {
            return Ok(None);
        };
        let children = self.children(parent)?;
        let Some(index) = children.iter().position(|c| *c == id) else {
            return Ok(None);
        };
        let target = index as isize + offset;
        if target < 0 {
            return Ok(None);
        }
        Ok(children.get(target as usize).copied())
    }

    /// The component and everything below it, pre-order
    pub fn descendants(&self, id: ComponentId) -> ScoreResult<Vec<ComponentId>> {
        self.get(id)?;
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            if let Node::Container(container) = &self.get(current)?.node {
                stack.extend(container.children.iter().rev().copied());
            }
        }
        Ok(result)
    }

    pub fn leaves(&self, id: ComponentId) -> Leaves<'_> {
        Leaves {
            tree: self,
            stack: vec![id],
        }
    }
}
