//! Fusing runs of leaves, tuplets or measures

use log::debug;
use num_integer::lcm;

use crate::error::{ScoreError, ScoreResult};
use crate::models::duration::{is_power_of_two, Duration, Rational};
use crate::models::indicators::TimeSignature;
use crate::score::{ComponentId, ContainerKind, ScoreTree};
use crate::selection::Selection;
use crate::spanners::SpannerKind;

/// What a selection of components can be fused as
enum FuseRun {
    Leaves,
    Tuplets,
    Measures,
}

impl ScoreTree {
    /// Merge a run of like components into the fewest equivalent ones.
    ///
    /// Empty selections come back empty and single components come back
    /// unchanged. Leaves are fused per parent into tied runs; tuplets need
    /// equal multipliers; measures combine their meters. The first
    /// component of a run absorbs the rest, which are discarded.
    pub fn fuse(&mut self, selection: &Selection) -> ScoreResult<Selection> {
        selection.check_live(self)?;
        selection.check_distinct()?;
        if selection.len() < 2 {
            return Ok(selection.clone());
        }
        match self.classify_run(selection)? {
            FuseRun::Leaves => self.fuse_leaves(selection),
            FuseRun::Tuplets => self.fuse_tuplets(selection),
            FuseRun::Measures => self.fuse_measures(selection),
        }
    }

    fn classify_run(&self, selection: &Selection) -> ScoreResult<FuseRun> {
        if selection.all_leaves(self) {
            return Ok(FuseRun::Leaves);
        }
        let mut tuplets = 0;
        let mut measures = 0;
        for id in selection.iter() {
            if let Some(container) = self.get(id)?.as_container() {
                if container.kind.is_tuplet() {
                    tuplets += 1;
                } else if container.kind.is_measure() {
                    measures += 1;
                }
            }
        }
        if tuplets == selection.len() {
            Ok(FuseRun::Tuplets)
        } else if measures == selection.len() {
            Ok(FuseRun::Measures)
        } else if measures > 0 {
            Err(ScoreError::IncompatibleOperand(format!(
                "{} measures mixed with {} other components",
                measures,
                selection.len() - measures
            )))
        } else {
            let kinds: Vec<String> = selection
                .iter()
                .map(|id| self.get(id).map(|c| c.kind_name()))
                .collect::<ScoreResult<_>>()?;
            Err(ScoreError::IncompatibleOperand(format!(
                "can not fuse {}",
                kinds.join(", ")
            )))
        }
    }

    fn fuse_leaves(&mut self, selection: &Selection) -> ScoreResult<Selection> {
        let groups = selection.group_by_parent(self)?;
        let mut plans = Vec::with_capacity(groups.len());
        for group in &groups {
            if !group.are_contiguous_siblings(self)? {
                return Err(ScoreError::Contiguity(format!(
                    "leaves starting at {} are not consecutive",
                    group[0]
                )));
            }
            let total = group
                .iter()
                .map(|leaf| self.leaf(leaf).map(|l| l.preprolated_duration()))
                .sum::<ScoreResult<Duration>>()?;
            let first = self.leaf(group[0])?;
            if first.multiplier().is_none() && !total.is_dyadic() {
                return Err(ScoreError::Assignability(format!(
                    "fused duration {} of leaves starting at {} needs a tuplet",
                    total, group[0]
                )));
            }
            plans.push((group.clone(), total));
        }

        let mut result = Vec::new();
        for (group, total) in plans {
            debug!("fusing {} leaves into {}", group.len(), total);
            for leaf in group.iter().skip(1) {
                self.discard(leaf)?;
            }
            result.extend(self.set_leaf_duration(group[0], total)?);
        }
        self.drop_short_ties(&result)?;
        Ok(Selection::new(result))
    }

    /// Ties left with fewer than two leaves are detached
    fn drop_short_ties(&mut self, leaves: &[ComponentId]) -> ScoreResult<()> {
        for leaf in leaves {
            if let Some(tie) = self.spanner_of_kind(*leaf, SpannerKind::Tie)? {
                if self.spanner(tie)?.len() < 2 {
                    self.detach_spanner(tie)?;
                }
            }
        }
        Ok(())
    }

    fn fuse_tuplets(&mut self, selection: &Selection) -> ScoreResult<Selection> {
        let first = selection[0];
        let multiplier = self.container_ref(first)?.kind.multiplier();
        for other in selection.iter().skip(1) {
            if self.container_ref(other)?.kind.multiplier() != multiplier {
                return Err(ScoreError::IncompatibleTuplets {
                    first: first.to_string(),
                    other: other.to_string(),
                });
            }
        }
        if !selection.are_contiguous_siblings(self)? {
            return Err(ScoreError::Contiguity(
                "fused tuplets must be consecutive siblings".to_string(),
            ));
        }
        debug!("fusing {} tuplets into {}", selection.len(), first);
        self.absorb(first, &selection.as_slice()[1..])?;
        Ok(Selection::new([first]))
    }

    fn fuse_measures(&mut self, selection: &Selection) -> ScoreResult<Selection> {
        if !selection.are_contiguous_siblings(self)? {
            return Err(ScoreError::Contiguity(
                "fused measures must be consecutive siblings".to_string(),
            ));
        }
        let mut signatures = Vec::with_capacity(selection.len());
        for id in selection.iter() {
            match self.container_ref(id)?.time_signature() {
                Some(time_signature) => signatures.push(*time_signature),
                None => {
                    return Err(ScoreError::IncompatibleOperand(format!(
                        "{} is not a measure",
                        id
                    )))
                }
            }
        }
        let fused = combine_time_signatures(&signatures);
        let new_prolation = fused.implied_prolation();

        // contents keep their sounding duration under the new meter
        let mut rescales = Vec::new();
        for (id, time_signature) in selection.iter().zip(&signatures) {
            let factor = time_signature.implied_prolation() / new_prolation;
            if factor != Rational::from_integer(1) {
                let leaves: Vec<ComponentId> = self.leaves(id).collect();
                self.check_scalable(&leaves, factor)?;
                rescales.push((leaves, factor));
            }
        }

        debug!(
            "fusing {} measures into {}/{}",
            selection.len(),
            fused.numerator,
            fused.denominator
        );
        for (leaves, factor) in rescales {
            self.scale_leaves(&leaves, factor)?;
        }
        let first = selection[0];
        if let ContainerKind::Measure { time_signature, .. } = &mut self.container_mut(first)?.kind {
            *time_signature = fused;
        }
        self.absorb(first, &selection.as_slice()[1..])?;
        Ok(Selection::new([first]))
    }

    /// Move the children of `others` to the end of `first`, then discard
    /// the emptied containers
    fn absorb(&mut self, first: ComponentId, others: &[ComponentId]) -> ScoreResult<()> {
        for other in others {
            let children = self.container_ref(*other)?.children.clone();
            for child in children {
                self.unlink(child)?;
                self.append(first, child)?;
            }
            self.discard(*other)?;
        }
        Ok(())
    }
}

/// Meter of fused measures.
///
/// Power-of-two denominators combine at the smallest denominator that
/// keeps every numerator integral (`1/8 + 2/16 = 2/8`). Any other
/// denominator combines at the least common multiple (`1/8 + 1/12 =
/// 5/24`).
pub(crate) fn combine_time_signatures(signatures: &[TimeSignature]) -> TimeSignature {
    let total: Duration = signatures.iter().map(|ts| ts.duration()).sum();
    let denominators = signatures.iter().map(|ts| ts.denominator);
    let denominator = if signatures.iter().all(|ts| is_power_of_two(ts.denominator)) {
        let mut denominator = denominators.min().unwrap_or(1);
        while signatures
            .iter()
            .any(|ts| (ts.numerator * denominator) % ts.denominator != 0)
        {
            denominator *= 2;
        }
        denominator
    } else {
        denominators.fold(1, lcm)
    };
    let numerator = (total.as_rational() * Rational::from_integer(denominator)).to_integer();
    let mut fused = TimeSignature::new(numerator, denominator);
    fused.partial = signatures.first().and_then(|ts| ts.partial);
    fused
}
