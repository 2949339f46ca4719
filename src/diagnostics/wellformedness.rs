//! Wellformedness analyzer
//!
//! Walks a subtree and the spanners touching it, returning findings for
//! structural inconsistencies (missing parents, duplicate children,
//! dangling or discontiguous spanners), duration problems (misdurated
//! measures and fixed-duration containers) and notational ones (empty
//! containers, nested measures, mispitched ties, overlapping spanners).
//! Errors make a tree ill-formed; warnings do not.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use log::debug;

use crate::error::ScoreResult;
use crate::score::{ComponentId, Node, ScoreTree, SpannerId};
use crate::spanners::{SpannerKind, SpannerState};

use super::{Diagnostics, Finding, Location};

/// Run every check over the subtree rooted at `root`
pub fn check_wellformedness(tree: &ScoreTree, root: ComponentId) -> ScoreResult<Diagnostics> {
    tree.get(root)?;
    let mut diagnostics = Diagnostics::new();
    let components = walk(tree, root, &mut diagnostics);
    check_containers(tree, &components, &mut diagnostics)?;
    let spanners = spanners_in_scope(tree, &components, &mut diagnostics);
    check_spanners(tree, &spanners, &mut diagnostics)?;
    check_overlaps(tree, &components, &mut diagnostics)?;
    debug!(
        "wellformedness of {}: {} findings over {} components",
        root,
        diagnostics.len(),
        components.len()
    );
    Ok(diagnostics)
}

/// True when the subtree has no error-level findings
pub fn is_wellformed(tree: &ScoreTree, root: ComponentId) -> ScoreResult<bool> {
    Ok(!check_wellformedness(tree, root)?.has_errors())
}

impl ScoreTree {
    pub fn check_wellformedness(&self, root: ComponentId) -> ScoreResult<Diagnostics> {
        check_wellformedness(self, root)
    }

    pub fn is_wellformed(&self, root: ComponentId) -> ScoreResult<bool> {
        is_wellformed(self, root)
    }
}

/// Pre-order walk that tolerates (and reports) broken links
fn walk(tree: &ScoreTree, root: ComponentId, out: &mut Diagnostics) -> Vec<ComponentId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![root];
    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            out.add(Finding::error(
                Location::Component(current),
                "duplicate_child",
                format!("{} is reachable more than once", current),
            ));
            continue;
        }
        let Ok(component) = tree.get(current) else {
            out.add(Finding::error(
                Location::Component(current),
                "missing_component",
                format!("{} is listed as a child but is gone", current),
            ));
            continue;
        };
        order.push(current);
        if let Node::Container(container) = &component.node {
            for child in container.children() {
                if let Ok(child_component) = tree.get(*child) {
                    if child_component.parent() != Some(current) {
                        out.add(Finding::error(
                            Location::Component(*child),
                            "missing_parent",
                            format!(
                                "{} is a child of {} but points at {:?}",
                                child,
                                current,
                                child_component.parent()
                            ),
                        ));
                    }
                }
            }
            stack.extend(container.children().iter().rev().copied());
        }
    }
    order
}

fn check_containers(tree: &ScoreTree, components: &[ComponentId], out: &mut Diagnostics) -> ScoreResult<()> {
    for id in components {
        let Some(container) = tree.get(*id)?.as_container() else {
            continue;
        };
        if container.is_empty() {
            out.add(Finding::warning(
                Location::Component(*id),
                "empty_container",
                format!("{} has no children", tree.get(*id)?.kind_name()),
            ));
        }
        if let Err(err) = tree.check_duration(*id) {
            if err.is_duration_mismatch() {
                let kind = if container.kind.is_measure() {
                    "misdurated_measure"
                } else {
                    "misdurated_container"
                };
                out.add(Finding::error(Location::Component(*id), kind, err.to_string()));
            } else {
                return Err(err);
            }
        }
        if container.kind.is_measure() {
            for ancestor in tree.parentage(*id)?.into_iter().skip(1) {
                if tree.container_ref(ancestor)?.kind.is_measure() {
                    out.add(Finding::error(
                        Location::Component(*id),
                        "nested_measure",
                        format!("measure {} sits inside measure {}", id, ancestor),
                    ));
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Spanners referenced by a leaf of the subtree, plus attached spanners
/// naming one of its components
fn spanners_in_scope(tree: &ScoreTree, components: &[ComponentId], out: &mut Diagnostics) -> BTreeSet<SpannerId> {
    let scope: HashSet<ComponentId> = components.iter().copied().collect();
    let mut result = BTreeSet::new();
    for id in components {
        let Ok(component) = tree.get(*id) else {
            continue;
        };
        for spanner_id in component.spanners() {
            match tree.spanner(*spanner_id) {
                Ok(spanner) if !spanner.state().is_tombstone() && spanner.leaves().contains(id) => {
                    result.insert(*spanner_id);
                }
                _ => out.add(Finding::error(
                    Location::Component(*id),
                    "orphan_spanner_reference",
                    format!("{} lists {} which does not hold it", id, spanner_id),
                )),
            }
        }
    }
    for spanner_id in tree.spanner_ids() {
        let Ok(spanner) = tree.spanner(spanner_id) else {
            continue;
        };
        if spanner.state() == SpannerState::Attached && spanner.leaves().iter().any(|l| scope.contains(l)) {
            result.insert(spanner_id);
        }
    }
    result
}

fn check_spanners(tree: &ScoreTree, spanners: &BTreeSet<SpannerId>, out: &mut Diagnostics) -> ScoreResult<()> {
    for spanner_id in spanners {
        let spanner = tree.spanner(*spanner_id)?;
        let location = Location::Spanner(*spanner_id);
        let mut intact = true;
        for leaf in spanner.leaves() {
            match tree.get(*leaf) {
                Err(_) => {
                    intact = false;
                    out.add(Finding::error(
                        location,
                        "dangling_spanner",
                        format!("{} holds {} which is gone", spanner.summary(), leaf),
                    ));
                }
                Ok(component) if !component.is_leaf() => {
                    intact = false;
                    out.add(Finding::error(
                        location,
                        "dangling_spanner",
                        format!("{} holds non-leaf {}", spanner.summary(), leaf),
                    ));
                }
                Ok(component) if !component.spanners().contains(spanner_id) => {
                    out.add(Finding::error(
                        location,
                        "unregistered_spanner_member",
                        format!("{} does not list {}", leaf, spanner.summary()),
                    ));
                }
                Ok(_) => {}
            }
        }
        if !intact {
            continue;
        }
        if !tree.are_contiguous_logical_voice(spanner.leaves())? {
            out.add(Finding::error(
                location,
                "discontiguous_spanner",
                format!("{} is not one run of a logical voice", spanner.summary()),
            ));
        }
        if spanner.kind == SpannerKind::Tie {
            for pair in spanner.leaves().windows(2) {
                let left = tree.leaf(pair[0])?.pitches();
                let right = tree.leaf(pair[1])?.pitches();
                if left != right {
                    out.add(Finding::error(
                        location,
                        "mispitched_tie",
                        format!("tie joins {} and {} with different pitches", pair[0], pair[1]),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Two attached spanners of one kind sharing a leaf
fn check_overlaps(tree: &ScoreTree, components: &[ComponentId], out: &mut Diagnostics) -> ScoreResult<()> {
    let mut reported = BTreeSet::new();
    for id in components {
        let component = tree.get(*id)?;
        if !component.is_leaf() {
            continue;
        }
        let mut by_kind: BTreeMap<&'static str, Vec<SpannerId>> = BTreeMap::new();
        for spanner_id in component.spanners() {
            let Ok(spanner) = tree.spanner(*spanner_id) else {
                continue;
            };
            if spanner.state() == SpannerState::Attached {
                by_kind.entry(spanner.kind.name()).or_default().push(*spanner_id);
            }
        }
        for (kind, ids) in by_kind {
            for (i, first) in ids.iter().enumerate() {
                for second in &ids[i + 1..] {
                    if reported.insert((*first, *second)) {
                        out.add(Finding::error(
                            Location::Spanner(*second),
                            format!("overlapping_{}", snake_case(kind)),
                            format!("{} and {} both cover {}", first, second, id),
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}

fn snake_case(name: &str) -> String {
    let mut result = String::new();
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
