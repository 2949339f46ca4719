//! Format contributions: single output lines with their tag state

use crate::error::ScoreResult;
use crate::models::indicators::{Indicator, Slot};
use crate::models::pitch::PitchLanguage;
use crate::models::tag::Tag;
use crate::score::Wrapper;
use crate::spanners::Spanner;

use super::FormatContext;

/// One line of output before indentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    pub text: String,
    pub tag: Option<Tag>,
    pub deactivate: bool,
}

impl Contribution {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tag: None,
            deactivate: false,
        }
    }

    pub fn tagged(text: impl Into<String>, tag: Option<Tag>, deactivate: bool) -> Self {
        Self {
            text: text.into(),
            tag,
            deactivate,
        }
    }

    /// Final text under the context's tag policy; `None` when omitted
    pub fn render(&self, context: &FormatContext) -> Option<String> {
        let mut deactivate = self.deactivate;
        if let Some(tag) = &self.tag {
            if context.omits(tag) {
                return None;
            }
            deactivate |= context.deactivates(tag);
        }
        let mut line = match &self.tag {
            Some(tag) => format!("{} %! {}", self.text, tag),
            None => self.text.clone(),
        };
        if deactivate {
            line.insert_str(0, "%@% ");
        }
        Some(line)
    }
}

/// Contributions gathered for one component, by slot
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    pub before: Vec<Contribution>,
    pub opening: Vec<Contribution>,
    pub right_of: Vec<Contribution>,
    pub closing: Vec<Contribution>,
    pub after: Vec<Contribution>,
}

impl Bundle {
    fn slot_mut(&mut self, slot: Slot) -> &mut Vec<Contribution> {
        match slot {
            Slot::Before => &mut self.before,
            Slot::Opening => &mut self.opening,
            Slot::RightOf => &mut self.right_of,
            Slot::Closing => &mut self.closing,
            Slot::After => &mut self.after,
        }
    }

    /// Add the lines of a wrapper (and its deactivated alternative) at the
    /// indicator's slot
    pub fn add_wrapper(
        &mut self,
        wrapper: &Wrapper,
        on_container: bool,
        language: PitchLanguage,
    ) -> ScoreResult<()> {
        let slot = wrapper.indicator.slot(on_container);
        let mut lines = Vec::new();
        for text in wrapper.indicator.lilypond_lines(language)? {
            lines.push(Contribution::tagged(text, wrapper.tag.clone(), wrapper.deactivate));
        }
        if let Some((alternative, tag)) = &wrapper.alternative {
            for text in alternative.lilypond_lines(language)? {
                lines.push(Contribution::tagged(text, Some(tag.clone()), true));
            }
        }
        let target = self.slot_mut(slot);
        if is_comment(&wrapper.indicator) && matches!(slot, Slot::Before) {
            // comments lead the before slot
            let position = target
                .iter()
                .position(|c| !c.text.starts_with('%'))
                .unwrap_or(target.len());
            target.splice(position..position, lines);
        } else {
            target.extend(lines);
        }
        Ok(())
    }
}

fn is_comment(indicator: &Indicator) -> bool {
    matches!(indicator, Indicator::Comment { .. })
}

/// Spanner lines at one leaf, already sorted: befores, stops, starts, afters
#[derive(Debug, Clone, Default)]
pub struct SpannerContributions {
    pub before: Vec<Contribution>,
    pub stops: Vec<Contribution>,
    pub starts: Vec<Contribution>,
    pub after: Vec<Contribution>,
}

impl SpannerContributions {
    pub fn collect<'a>(spanners: impl IntoIterator<Item = &'a Spanner>, leaf: crate::score::ComponentId) -> Self {
        let mut sorted: Vec<&Spanner> = spanners.into_iter().collect();
        sorted.sort_by_key(|s| (s.kind.precedence(), s.attach_order(), s.id()));
        let mut result = SpannerContributions::default();
        for spanner in sorted {
            let lines = spanner.lines_for(leaf);
            let wrap = |text: String| Contribution::tagged(text, spanner.tag.clone(), spanner.deactivate);
            result.before.extend(lines.before.into_iter().map(wrap));
            result.stops.extend(lines.stops.into_iter().map(wrap));
            result.starts.extend(lines.starts.into_iter().map(wrap));
            result.after.extend(lines.after.into_iter().map(wrap));
        }
        result
    }
}
