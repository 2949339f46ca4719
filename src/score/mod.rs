//! Score tree arena
//!
//! Every component lives in a slot of [`ScoreTree`] and is addressed by a
//! [`ComponentId`]. Containers own their children (ordered id lists);
//! parent links, spanner memberships and spanner leaf lists are plain ids,
//! so the tree never holds reference cycles. Discarding a component frees
//! its slot, after which the id reports `MissingComponent`.

pub mod container;
pub mod inspect;
pub mod leaf;
pub mod tree;
pub mod wrapper;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ScoreError, ScoreResult};
use crate::models::duration::{Duration, Rational};
use crate::models::indicators::TimeSignature;
use crate::models::overrides::{ContextSetting, GrobOverride};
use crate::models::pitch::Pitch;
use crate::spanners::Spanner;

pub use container::{Container, ContainerKind};
pub use inspect::{LogicalVoice, Timespan};
pub use leaf::{Leaf, LeafKind};
pub use tree::Leaves;
pub use wrapper::Wrapper;

/// Stable handle of a component slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentId(usize);

impl ComponentId {
    pub fn from_raw(index: usize) -> Self {
        ComponentId(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable handle of a spanner; spanners are never freed, tombstones stay
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpannerId(usize);

impl SpannerId {
    pub fn from_raw(index: usize) -> Self {
        SpannerId(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for SpannerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spanner#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf(Leaf),
    Container(Container),
}

/// One arena slot
#[derive(Debug, Clone)]
pub struct Component {
    pub(crate) parent: Option<ComponentId>,
    pub name: Option<String>,
    pub(crate) spanners: BTreeSet<SpannerId>,
    pub(crate) wrappers: Vec<Wrapper>,
    /// Grob overrides: `\once \override` on leaves, override/revert pairs
    /// around containers, `\with` entries on contexts
    pub overrides: Vec<GrobOverride>,
    pub settings: Vec<ContextSetting>,
    pub node: Node,
}

impl Component {
    fn new(node: Node) -> Self {
        Self {
            parent: None,
            name: None,
            spanners: BTreeSet::new(),
            wrappers: Vec::new(),
            overrides: Vec::new(),
            settings: Vec::new(),
            node,
        }
    }

    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    pub fn spanners(&self) -> &BTreeSet<SpannerId> {
        &self.spanners
    }

    pub fn wrappers(&self) -> &[Wrapper] {
        &self.wrappers
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.node, Node::Leaf(_))
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match &self.node {
            Node::Leaf(leaf) => Some(leaf),
            Node::Container(_) => None,
        }
    }

    pub fn as_container(&self) -> Option<&Container> {
        match &self.node {
            Node::Container(container) => Some(container),
            Node::Leaf(_) => None,
        }
    }

    pub fn kind_name(&self) -> String {
        match &self.node {
            Node::Leaf(leaf) => leaf.kind.name().to_string(),
            Node::Container(container) => container.kind.summary(),
        }
    }
}

/// Arena holding components and spanners
#[derive(Debug, Clone, Default)]
pub struct ScoreTree {
    components: Vec<Option<Component>>,
    pub(crate) spanners: Vec<Spanner>,
    pub(crate) next_attach_order: u64,
}

impl ScoreTree {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    pub(crate) fn alloc(&mut self, component: Component) -> ComponentId {
        self.components.push(Some(component));
        ComponentId(self.components.len() - 1)
    }

    pub fn add_leaf(&mut self, leaf: Leaf) -> ComponentId {
        self.alloc(Component::new(Node::Leaf(leaf)))
    }

    pub fn add_container(&mut self, container: Container) -> ComponentId {
        self.alloc(Component::new(Node::Container(container)))
    }

    pub fn note(&mut self, pitch: Pitch, duration: Duration) -> ScoreResult<ComponentId> {
        Ok(self.add_leaf(Leaf::note(pitch, duration)?))
    }

    pub fn chord(
        &mut self,
        pitches: impl IntoIterator<Item = Pitch>,
        duration: Duration,
    ) -> ScoreResult<ComponentId> {
        Ok(self.add_leaf(Leaf::chord(pitches, duration)?))
    }

    pub fn rest(&mut self, duration: Duration) -> ScoreResult<ComponentId> {
        Ok(self.add_leaf(Leaf::rest(duration)?))
    }

    pub fn skip(&mut self, duration: Duration) -> ScoreResult<ComponentId> {
        Ok(self.add_leaf(Leaf::skip(duration)?))
    }

    pub fn multimeasure_rest(&mut self, duration: Duration) -> ScoreResult<ComponentId> {
        Ok(self.add_leaf(Leaf::multimeasure_rest(duration)?))
    }

    pub fn container(&mut self) -> ComponentId {
        self.add_container(Container::new(ContainerKind::Container))
    }

    pub fn voice(&mut self) -> ComponentId {
        self.add_container(Container::new(ContainerKind::Voice))
    }

    pub fn staff(&mut self) -> ComponentId {
        self.add_container(Container::new(ContainerKind::Staff))
    }

    pub fn score(&mut self) -> ComponentId {
        self.add_container(Container::new(ContainerKind::Score).simultaneous())
    }

    pub fn group(&mut self, context: impl Into<String>) -> ComponentId {
        self.add_container(Container::new(ContainerKind::Group(context.into())).simultaneous())
    }

    pub fn tuplet(&mut self, multiplier: Rational) -> ComponentId {
        self.add_container(Container::new(ContainerKind::Tuplet(multiplier)))
    }

    pub fn measure(&mut self, time_signature: TimeSignature) -> ComponentId {
        self.add_container(Container::new(ContainerKind::Measure {
            time_signature,
            automatically_adjust: false,
        }))
    }

    pub fn fixed_duration_container(&mut self, duration: Duration) -> ComponentId {
        self.add_container(Container::new(ContainerKind::FixedDuration(duration)))
    }

    // ------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------

    pub fn contains(&self, id: ComponentId) -> bool {
        matches!(self.components.get(id.0), Some(Some(_)))
    }

    pub fn get(&self, id: ComponentId) -> ScoreResult<&Component> {
        self.components
            .get(id.0)
            .and_then(|slot| slot.as_ref())
            .ok_or(ScoreError::MissingComponent(id))
    }

    pub fn get_mut(&mut self, id: ComponentId) -> ScoreResult<&mut Component> {
        self.components
            .get_mut(id.0)
            .and_then(|slot| slot.as_mut())
            .ok_or(ScoreError::MissingComponent(id))
    }

    pub fn leaf(&self, id: ComponentId) -> ScoreResult<&Leaf> {
        self.get(id)?.as_leaf().ok_or(ScoreError::NotALeaf(id))
    }

    pub fn leaf_mut(&mut self, id: ComponentId) -> ScoreResult<&mut Leaf> {
        match &mut self.get_mut(id)?.node {
            Node::Leaf(leaf) => Ok(leaf),
            Node::Container(_) => Err(ScoreError::NotALeaf(id)),
        }
    }

    pub fn container_ref(&self, id: ComponentId) -> ScoreResult<&Container> {
        self.get(id)?
            .as_container()
            .ok_or_else(|| ScoreError::Structure(format!("{} is not a container", id)))
    }

    pub fn container_mut(&mut self, id: ComponentId) -> ScoreResult<&mut Container> {
        match &mut self.get_mut(id)?.node {
            Node::Container(container) => Ok(container),
            Node::Leaf(_) => Err(ScoreError::Structure(format!("{} is not a container", id))),
        }
    }

    pub fn is_leaf(&self, id: ComponentId) -> bool {
        self.get(id).map(|c| c.is_leaf()).unwrap_or(false)
    }

    pub fn set_name(&mut self, id: ComponentId, name: impl Into<String>) -> ScoreResult<()> {
        self.get_mut(id)?.name = Some(name.into());
        Ok(())
    }

    pub fn add_override(&mut self, id: ComponentId, grob_override: GrobOverride) -> ScoreResult<()> {
        self.get_mut(id)?.overrides.push(grob_override);
        Ok(())
    }

    pub fn add_setting(&mut self, id: ComponentId, setting: ContextSetting) -> ScoreResult<()> {
        self.get_mut(id)?.settings.push(setting);
        Ok(())
    }

    /// Turn on meter recomputation for a measure
    pub fn set_automatically_adjust(&mut self, measure: ComponentId, value: bool) -> ScoreResult<()> {
        match &mut self.container_mut(measure)?.kind {
            ContainerKind::Measure {
                automatically_adjust,
                ..
            } => {
                *automatically_adjust = value;
                Ok(())
            }
            _ => Err(ScoreError::Structure(format!("{} is not a measure", measure))),
        }
    }

    /// Ids of all live components, in allocation order
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| ComponentId(index))
    }

    /// Number of live components
    pub fn len(&self) -> usize {
        self.components.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn free(&mut self, id: ComponentId) {
        if let Some(slot) = self.components.get_mut(id.0) {
            *slot = None;
        }
    }
}
