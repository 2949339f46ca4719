//! Indicator attachment
//!
//! A wrapper binds an indicator to a component (or to one leaf of a
//! spanner, for piecewise indicators) together with its tag, deactivation
//! flag, context scope and optional tagged alternative.

use serde::{Deserialize, Serialize};

use crate::error::{ScoreError, ScoreResult};
use crate::models::indicators::Indicator;
use crate::models::tag::Tag;

use super::{ComponentId, ScoreTree, SpannerId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wrapper {
    pub indicator: Indicator,
    pub tag: Option<Tag>,
    pub deactivate: bool,
    /// Context scope; falls back to the indicator's default context
    pub context: Option<String>,
    /// Rendered deactivated, under its own tag, right after the primary
    pub alternative: Option<(Indicator, Tag)>,
    pub(crate) spanner: Option<SpannerId>,
}

impl Wrapper {
    pub fn new(indicator: Indicator) -> Self {
        Self {
            indicator,
            tag: None,
            deactivate: false,
            context: None,
            alternative: None,
            spanner: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<Tag>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.deactivate = true;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_alternative(mut self, indicator: Indicator, tag: impl Into<Tag>) -> Self {
        self.alternative = Some((indicator, tag.into()));
        self
    }

    /// Owning spanner of a piecewise wrapper
    pub fn spanner(&self) -> Option<SpannerId> {
        self.spanner
    }

    pub fn effective_context(&self) -> Option<&str> {
        self.context
            .as_deref()
            .or_else(|| self.indicator.default_context())
    }

    /// Same persistent kind in the same context, both active
    fn conflicts_with(&self, other: &Wrapper) -> bool {
        self.indicator.is_persistent()
            && !self.deactivate
            && !other.deactivate
            && self.indicator.kind_name() == other.indicator.kind_name()
            && self.effective_context() == other.effective_context()
            && self.indicator != other.indicator
    }
}

impl From<Indicator> for Wrapper {
    fn from(indicator: Indicator) -> Self {
        Wrapper::new(indicator)
    }
}

impl ScoreTree {
    /// Attach an indicator (or a configured wrapper) to a component.
    ///
    /// Attaching an equal wrapper twice is a no-op. A second, different
    /// persistent indicator of the same kind in the same context is a
    /// `PersistentIndicator` error.
    pub fn attach(&mut self, wrapper: impl Into<Wrapper>, component: ComponentId) -> ScoreResult<()> {
        let mut wrapper = wrapper.into();
        wrapper.spanner = None;
        let target = self.get(component)?;
        if wrapper.indicator.requires_leaf() && !target.is_leaf() {
            return Err(ScoreError::InvalidAttachment(format!(
                "{} needs a leaf, not {}",
                wrapper.indicator.kind_name(),
                component
            )));
        }
        if let crate::models::indicators::Indicator::StemTremolo(count) = wrapper.indicator {
            let pitched = target
                .as_leaf()
                .map(|leaf| leaf.kind.is_pitched())
                .unwrap_or(false);
            if !pitched || count < 8 || !count.is_power_of_two() {
                return Err(ScoreError::InvalidAttachment(format!(
                    "stem tremolo :{} on {}",
                    count, component
                )));
            }
        }
        if target.wrappers.iter().any(|w| *w == wrapper) {
            return Ok(());
        }
        if let Some(existing) = target
            .wrappers
            .iter()
            .find(|w| w.spanner.is_none() && wrapper.conflicts_with(w))
        {
            log::debug!(
                "refusing {:?} on {}: already has {:?}",
                wrapper.indicator,
                component,
                existing.indicator
            );
            return Err(ScoreError::PersistentIndicator {
                component,
                kind: wrapper.indicator.kind_name(),
            });
        }
        self.get_mut(component)?.wrappers.push(wrapper);
        Ok(())
    }

    /// Directly attached (non-piecewise) wrappers
    pub fn wrappers(&self, component: ComponentId) -> ScoreResult<Vec<&Wrapper>> {
        Ok(self
            .get(component)?
            .wrappers
            .iter()
            .filter(|w| w.spanner.is_none())
            .collect())
    }

    pub fn indicators(&self, component: ComponentId) -> ScoreResult<Vec<&Indicator>> {
        Ok(self
            .wrappers(component)?
            .into_iter()
            .map(|w| &w.indicator)
            .collect())
    }

    pub fn has_indicator(&self, component: ComponentId, kind_name: &str) -> ScoreResult<bool> {
        Ok(self
            .indicators(component)?
            .iter()
            .any(|i| i.kind_name() == kind_name))
    }

    /// Detach directly attached wrappers matching `predicate`
    pub fn detach_where(
        &mut self,
        component: ComponentId,
        mut predicate: impl FnMut(&Wrapper) -> bool,
    ) -> ScoreResult<Vec<Wrapper>> {
        let wrappers = &mut self.get_mut(component)?.wrappers;
        let mut detached = Vec::new();
        let mut kept = Vec::new();
        for wrapper in wrappers.drain(..) {
            if wrapper.spanner.is_none() && predicate(&wrapper) {
                detached.push(wrapper);
            } else {
                kept.push(wrapper);
            }
        }
        *wrappers = kept;
        Ok(detached)
    }

    /// Detach every indicator equal to `indicator`
    pub fn detach(&mut self, indicator: &Indicator, component: ComponentId) -> ScoreResult<Vec<Wrapper>> {
        self.detach_where(component, |w| w.indicator == *indicator)
    }

    /// Detach all indicators of one kind (`"clef"`, `"dynamic"`)
    pub fn detach_kind(&mut self, kind_name: &str, component: ComponentId) -> ScoreResult<Vec<Wrapper>> {
        self.detach_where(component, |w| w.indicator.kind_name() == kind_name)
    }
}
