//! LilyPond format engine
//!
//! Pre-order serialization of a component subtree. Each component gathers
//! a [`Bundle`] of slot contributions from its indicators, overrides and
//! spanners; containers wrap their children in opening and closing lines
//! one indentation level out. The output is deterministic: spanner lines
//! on a shared leaf sort by kind, attachment order and id.

pub mod contributions;
pub mod tagging;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{ScoreError, ScoreResult};
use crate::models::duration::rational_string;
use crate::models::indicators::TimeSignature;
use crate::models::pitch::PitchLanguage;
use crate::models::tag::Tag;
use crate::score::{Component, ComponentId, Container, ContainerKind, Node, ScoreTree};
use crate::spanners::Spanner;

pub use contributions::{Bundle, Contribution, SpannerContributions};
pub use tagging::{activate, deactivate};

/// Explicit formatting state threaded through the traversal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatContext {
    pub indent_width: usize,
    pub language: PitchLanguage,
    /// Contributions whose tag matches one of these are left out
    pub omit_tags: Vec<Tag>,
    /// Contributions whose tag matches one of these are commented out
    pub deactivate_tags: Vec<Tag>,
}

impl Default for FormatContext {
    fn default() -> Self {
        Self {
            indent_width: 4,
            language: PitchLanguage::English,
            omit_tags: Vec::new(),
            deactivate_tags: Vec::new(),
        }
    }
}

impl FormatContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language(mut self, language: PitchLanguage) -> Self {
        self.language = language;
        self
    }

    pub fn with_indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }

    pub fn omit_tag(mut self, tag: Tag) -> Self {
        self.omit_tags.push(tag);
        self
    }

    pub fn deactivate_tag(mut self, tag: Tag) -> Self {
        self.deactivate_tags.push(tag);
        self
    }

    pub fn omits(&self, tag: &Tag) -> bool {
        self.omit_tags.iter().any(|filter| tag.matches(filter))
    }

    pub fn deactivates(&self, tag: &Tag) -> bool {
        self.deactivate_tags.iter().any(|filter| tag.matches(filter))
    }
}

impl ScoreTree {
    /// LilyPond text of a subtree with the default context
    pub fn lilypond(&self, id: ComponentId) -> ScoreResult<String> {
        self.lilypond_with(id, &FormatContext::default())
    }

    pub fn lilypond_with(&self, id: ComponentId, context: &FormatContext) -> ScoreResult<String> {
        let mut formatter = Formatter {
            tree: self,
            context,
            lines: Vec::new(),
        };
        formatter.component(id, 0)?;
        Ok(formatter.lines.join("\n"))
    }

    /// Time signature a measure formats with: the declared one, or one
    /// fitted to the contents when the measure adjusts automatically
    pub fn effective_time_signature(&self, measure: ComponentId) -> ScoreResult<Option<TimeSignature>> {
        let container = self.container_ref(measure)?;
        let ContainerKind::Measure {
            time_signature,
            automatically_adjust,
        } = &container.kind
        else {
            return Ok(None);
        };
        if !automatically_adjust {
            return Ok(Some(*time_signature));
        }
        let actual = self.preprolated_duration(measure)?;
        if actual == time_signature.duration() || actual.is_zero() {
            return Ok(Some(*time_signature));
        }
        let mut fitted = TimeSignature::from_duration(actual, time_signature.denominator);
        fitted.partial = time_signature.partial;
        Ok(Some(fitted))
    }

    /// Underfull/Overfull error for measures and fixed-duration containers
    /// whose contents do not match the declared duration
    pub fn check_duration(&self, id: ComponentId) -> ScoreResult<()> {
        let container = self.container_ref(id)?;
        let (actual, expected) = match &container.kind {
            ContainerKind::Measure {
                time_signature,
                automatically_adjust,
            } => {
                if *automatically_adjust && !container.is_empty() {
                    return Ok(());
                }
                (self.preprolated_duration(id)?, time_signature.duration())
            }
            ContainerKind::FixedDuration(duration) => (self.contents_duration(id)?, *duration),
            _ => return Ok(()),
        };
        if actual < expected {
            return Err(ScoreError::UnderfullContainer {
                component: id,
                actual: actual.to_string(),
                expected: expected.to_string(),
            });
        }
        if actual > expected {
            return Err(ScoreError::OverfullContainer {
                component: id,
                actual: actual.to_string(),
                expected: expected.to_string(),
            });
        }
        Ok(())
    }
}

struct Formatter<'a> {
    tree: &'a ScoreTree,
    context: &'a FormatContext,
    lines: Vec<String>,
}

impl<'a> Formatter<'a> {
    fn push(&mut self, contribution: &Contribution, depth: usize) {
        if let Some(text) = contribution.render(self.context) {
            let indent = " ".repeat(self.context.indent_width * depth);
            self.lines.push(format!("{}{}", indent, text));
        }
    }

    fn push_all(&mut self, contributions: &[Contribution], depth: usize) {
        for contribution in contributions {
            self.push(contribution, depth);
        }
    }

    fn push_plain(&mut self, text: impl Into<String>, depth: usize) {
        self.push(&Contribution::plain(text), depth);
    }

    fn component(&mut self, id: ComponentId, depth: usize) -> ScoreResult<()> {
        let component = self.tree.get(id)?;
        match &component.node {
            Node::Leaf(_) => self.leaf(id, component, depth),
            Node::Container(container) => self.container(id, component, container, depth),
        }
    }

    /// Spanners on the leaf, checked to hold only live leaves
    fn spanners_at(&self, id: ComponentId, component: &Component) -> ScoreResult<Vec<&'a Spanner>> {
        let mut spanners = Vec::new();
        for spanner_id in component.spanners() {
            let spanner = self.tree.spanner(*spanner_id)?;
            for member in spanner.leaves() {
                if !self.tree.get(*member)?.is_leaf() {
                    return Err(ScoreError::NotALeaf(*member));
                }
            }
            if !spanner.leaves().contains(&id) {
                return Err(ScoreError::Structure(format!(
                    "{} lists {} but {} does not hold it",
                    id,
                    spanner_id,
                    spanner.summary()
                )));
            }
            spanners.push(spanner);
        }
        Ok(spanners)
    }

    fn leaf(&mut self, id: ComponentId, component: &Component, depth: usize) -> ScoreResult<()> {
        let language = self.context.language;
        let Some(leaf) = component.as_leaf() else {
            return Err(ScoreError::NotALeaf(id));
        };
        let spanners = self.spanners_at(id, component)?;

        let mut bundle = Bundle::default();
        for wrapper in component.wrappers() {
            bundle.add_wrapper(wrapper, false, language)?;
        }
        for spanner in &spanners {
            for (member, wrapper) in spanner.piecewise() {
                if *member == id {
                    bundle.add_wrapper(wrapper, false, language)?;
                }
            }
        }
        let spanner_lines = SpannerContributions::collect(spanners.iter().copied(), id);

        self.push_all(&bundle.before, depth);
        for grob_override in &component.overrides {
            self.push_plain(grob_override.override_string(true), depth);
        }
        for setting in &component.settings {
            self.push_plain(setting.set_string(), depth);
        }
        self.push_all(&spanner_lines.before, depth);
        self.push_plain(leaf.body_string(language)?, depth);
        self.push_all(&bundle.right_of, depth);
        self.push_all(&spanner_lines.stops, depth);
        self.push_all(&spanner_lines.starts, depth);
        self.push_all(&spanner_lines.after, depth);
        self.push_all(&bundle.after, depth);
        Ok(())
    }

    fn container(
        &mut self,
        id: ComponentId,
        component: &Component,
        container: &Container,
        depth: usize,
    ) -> ScoreResult<()> {
        self.tree.check_duration(id)?;
        let language = self.context.language;
        let mut bundle = Bundle::default();
        for wrapper in component.wrappers() {
            bundle.add_wrapper(wrapper, true, language)?;
        }
        let (open, close) = if container.simultaneous {
            ("<<", ">>")
        } else {
            ("{", "}")
        };

        self.push_all(&bundle.before, depth);
        let is_context = container.kind.is_context();
        if !is_context {
            for grob_override in &component.overrides {
                self.push_plain(grob_override.override_string(false), depth);
            }
            for setting in &component.settings {
                self.push_plain(setting.set_string(), depth);
            }
        }

        let mut inner = depth + 1;
        let mut scaled = false;
        match &container.kind {
            ContainerKind::Voice | ContainerKind::Staff | ContainerKind::Score | ContainerKind::Group(_) => {
                let context_name = container.kind.context_name().unwrap_or("Context");
                match &component.name {
                    Some(name) => self.push_plain(format!("\\context {} = \"{}\"", context_name, name), depth),
                    None => self.push_plain(format!("\\new {}", context_name), depth),
                }
                self.with_block(component, container, depth);
                self.push_plain(open, depth);
            }
            ContainerKind::Tuplet(multiplier) => {
                if !self.tree.preprolated_duration(id)?.is_assignable() {
                    self.push_plain("\\tweak edge-height #'(0.7 . 0)", depth);
                }
                self.push_plain(format!("\\times {} {}", rational_string(*multiplier), open), depth);
            }
            ContainerKind::Measure { time_signature, .. } => {
                self.push_plain(format!("{}   % measure", open), depth);
                let effective = self.tree.effective_time_signature(id)?.unwrap_or(*time_signature);
                if effective != *time_signature {
                    warn!(
                        "measure {} adjusted from {}/{} to {}/{}",
                        id,
                        time_signature.numerator,
                        time_signature.denominator,
                        effective.numerator,
                        effective.denominator
                    );
                }
                if self.previous_measure_signature(id)? != Some(effective) {
                    for line in effective.lilypond_lines() {
                        self.push_plain(line, inner);
                    }
                }
                if effective.has_non_power_of_two_denominator() {
                    let prolation = effective.implied_prolation();
                    self.push_plain(
                        format!(
                            "\\scaleDurations #'({} . {}) {{",
                            prolation.numer(),
                            prolation.denom()
                        ),
                        inner,
                    );
                    scaled = true;
                    inner += 1;
                }
            }
            ContainerKind::Container | ContainerKind::FixedDuration(_) => {
                self.push_plain(open, depth);
            }
        }

        self.push_all(&bundle.opening, inner);
        for child in container.children() {
            self.component(*child, inner)?;
        }
        self.push_all(&bundle.closing, inner);

        if scaled {
            self.push_plain("}", depth + 1);
        }
        if container.kind.is_measure() {
            self.push_plain(format!("{}   % measure", close), depth);
        } else {
            self.push_plain(close, depth);
        }
        if !is_context {
            for grob_override in &component.overrides {
                self.push_plain(grob_override.revert_string(), depth);
            }
        }
        self.push_all(&bundle.after, depth);
        Ok(())
    }

    /// `\with { ... }` block of a context, when it has anything to say
    fn with_block(&mut self, component: &Component, container: &Container, depth: usize) {
        let mut entries = Vec::new();
        entries.extend(container.remove.iter().map(|e| format!("\\remove {}", e)));
        entries.extend(container.consists.iter().map(|e| format!("\\consists {}", e)));
        entries.extend(component.overrides.iter().map(|o| o.with_block_string()));
        entries.extend(component.settings.iter().map(|s| s.with_block_string()));
        if entries.is_empty() {
            return;
        }
        self.push_plain("\\with", depth);
        self.push_plain("{", depth);
        for entry in entries {
            self.push_plain(entry, depth + 1);
        }
        self.push_plain("}", depth);
    }

    /// Effective time signature of the measure right before `id`, if any
    fn previous_measure_signature(&self, id: ComponentId) -> ScoreResult<Option<TimeSignature>> {
        match self.tree.sibling(id, -1)? {
            Some(previous) if self.tree.get(previous)?.as_container().map_or(false, |c| c.kind.is_measure()) => {
                self.tree.effective_time_signature(previous)
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::models::indicators::{ClefType, Indicator};
    use crate::models::pitch::Pitch;
    use crate::models::{Duration, Rational};
    use crate::spanners::SpannerKind;

    use super::*;

    fn notes(tree: &mut ScoreTree, names: &[&str], duration: Duration) -> Vec<ComponentId> {
        names
            .iter()
            .map(|n| tree.note(Pitch::from_name(n).unwrap(), duration).unwrap())
            .collect()
    }

    #[test]
    fn test_staff_with_beam() {
        let mut tree = ScoreTree::new();
        let staff = tree.staff();
        let leaves = notes(&mut tree, &["c'", "d'"], Duration::new(1, 8));
        tree.extend(staff, leaves.clone()).unwrap();
        tree.span(SpannerKind::Beam, &leaves).unwrap();
        tree.attach(Indicator::Clef(ClefType::Treble), leaves[0]).unwrap();
        assert_eq!(
            tree.lilypond(staff).unwrap(),
            "\\new Staff\n{\n    \\clef \"treble\"\n    c'8\n    [\n    d'8\n    ]\n}"
        );
    }

    #[test]
    fn test_tuplet_and_measure() {
        let mut tree = ScoreTree::new();
        let tuplet = tree.tuplet(Rational::new(2, 3));
        let leaves = notes(&mut tree, &["c'", "d'", "e'"], Duration::new(1, 8));
        tree.extend(tuplet, leaves).unwrap();
        assert_eq!(
            tree.lilypond(tuplet).unwrap(),
            "\\times 2/3 {\n    c'8\n    d'8\n    e'8\n}"
        );

        let measure = tree.measure(TimeSignature::new(1, 12));
        let leaf = notes(&mut tree, &["c'"], Duration::new(1, 8));
        tree.extend(measure, leaf).unwrap();
        assert_eq!(
            tree.lilypond(measure).unwrap(),
            "{   % measure\n    \\time 1/12\n    \\scaleDurations #'(2 . 3) {\n        c'8\n    }\n}   % measure"
        );
    }

    #[test]
    fn test_repeated_time_signature_is_omitted() {
        let mut tree = ScoreTree::new();
        let staff = tree.staff();
        for _ in 0..2 {
            let measure = tree.measure(TimeSignature::new(1, 4));
            let leaf = notes(&mut tree, &["c'"], Duration::new(1, 4));
            tree.extend(measure, leaf).unwrap();
            tree.append(staff, measure).unwrap();
        }
        let text = tree.lilypond(staff).unwrap();
        assert_eq!(text.matches("\\time 1/4").count(), 1);
    }

    #[test]
    fn test_underfull_and_auto_adjust() {
        let mut tree = ScoreTree::new();
        let measure = tree.measure(TimeSignature::new(3, 8));
        let leaf = notes(&mut tree, &["c'"], Duration::new(1, 8));
        tree.extend(measure, leaf).unwrap();
        assert!(matches!(
            tree.lilypond(measure),
            Err(ScoreError::UnderfullContainer { .. })
        ));
        tree.set_automatically_adjust(measure, true).unwrap();
        assert!(tree.lilypond(measure).unwrap().contains("\\time 1/8"));
    }

    #[test]
    fn test_named_context_with_block() {
        let mut tree = ScoreTree::new();
        let staff = tree.staff();
        tree.set_name(staff, "Violin").unwrap();
        tree.container_mut(staff)
            .unwrap()
            .remove
            .push("Time_signature_engraver".to_string());
        let leaf = notes(&mut tree, &["c'"], Duration::new(1, 4));
        tree.extend(staff, leaf).unwrap();
        assert_eq!(
            tree.lilypond(staff).unwrap(),
            "\\context Staff = \"Violin\"\n\\with\n{\n    \\remove Time_signature_engraver\n}\n{\n    c'4\n}"
        );
    }

    #[test]
    fn test_formatting_is_deterministic() {
        let mut tree = ScoreTree::new();
        let staff = tree.staff();
        let leaves = notes(&mut tree, &["c'", "d'", "e'"], Duration::new(1, 8));
        tree.extend(staff, leaves.clone()).unwrap();
        tree.span(SpannerKind::Slur, &leaves).unwrap();
        tree.span(SpannerKind::Beam, &leaves).unwrap();
        let first = tree.lilypond(staff).unwrap();
        assert_eq!(first, tree.lilypond(staff).unwrap());
        // beam sorts before slur regardless of attachment order
        assert!(first.contains("c'8\n    [\n    (\n"));
        assert!(first.contains("e'8\n    ]\n    )\n"));
    }
}
