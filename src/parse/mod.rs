//! Building leaves from LilyPond-like note strings
//!
//! `"c'8 d'8 <c' e' g'>4 r4 s1 * 1/16"` becomes five leaves. Pitches use
//! English names; a token without a duration reuses the previous one
//! (quarter notes to start). A trailing `~` ties a leaf to the next one,
//! which needs a container to hold the tied run.

pub mod tokens;

use log::debug;

use crate::error::{ScoreError, ScoreResult};
use crate::models::duration::Duration;
use crate::score::{ComponentId, Leaf, ScoreTree};
use crate::selection::Selection;
use crate::spanners::SpannerKind;

pub use tokens::{tokenize, Head, Token};

impl ScoreTree {
    /// Unparented leaves for `text`; ties are rejected
    pub fn parse_leaves(&mut self, text: &str) -> ScoreResult<Vec<ComponentId>> {
        let tokens = tokenize(text)?;
        if let Some(tied) = tokens.iter().find(|t| t.tie) {
            return Err(ScoreError::Parse {
                token: tied.text.clone(),
                reason: "ties need a container".to_string(),
            });
        }
        let leaves = build_leaves(&tokens)?;
        Ok(leaves.into_iter().map(|leaf| self.add_leaf(leaf)).collect())
    }

    /// Append the leaves for `text` to `container`, tying marked runs
    pub fn parse_into(&mut self, container: ComponentId, text: &str) -> ScoreResult<Selection> {
        self.container_ref(container)?;
        let tokens = tokenize(text)?;
        if let Some(last) = tokens.last().filter(|t| t.tie) {
            return Err(ScoreError::Parse {
                token: last.text.clone(),
                reason: "tie with nothing to follow".to_string(),
            });
        }
        let payloads = build_leaves(&tokens)?;
        check_tied_runs(&tokens, &payloads)?;
        let leaves: Vec<ComponentId> = payloads.into_iter().map(|leaf| self.add_leaf(leaf)).collect();
        self.extend(container, leaves.clone())?;
        if let Err(err) = self.tie_runs(&tokens, &leaves) {
            for leaf in &leaves {
                self.discard(*leaf)?;
            }
            return Err(err);
        }
        debug!("parsed {} leaves into {}", leaves.len(), container);
        Ok(Selection::new(leaves))
    }

    fn tie_runs(&mut self, tokens: &[Token], leaves: &[ComponentId]) -> ScoreResult<()> {
        let mut run: Vec<ComponentId> = Vec::new();
        for (token, leaf) in tokens.iter().zip(leaves) {
            run.push(*leaf);
            if !token.tie {
                if run.len() > 1 {
                    self.span(SpannerKind::Tie, &run)?;
                }
                run.clear();
            }
        }
        Ok(())
    }

    /// New anonymous container holding the leaves for `text`
    pub fn parse_container(&mut self, text: &str) -> ScoreResult<ComponentId> {
        let container = self.container();
        if let Err(err) = self.parse_into(container, text) {
            self.discard(container)?;
            return Err(err);
        }
        Ok(container)
    }
}

/// Every leaf on either side of a `~` must be a note or chord
fn check_tied_runs(tokens: &[Token], leaves: &[Leaf]) -> ScoreResult<()> {
    let mut tied_from_left = false;
    for (token, leaf) in tokens.iter().zip(leaves) {
        if (token.tie || tied_from_left) && !leaf.kind.is_pitched() {
            return Err(ScoreError::Parse {
                token: token.text.clone(),
                reason: format!("can not tie a {}", leaf.kind.name()),
            });
        }
        tied_from_left = token.tie;
    }
    Ok(())
}

fn build_leaves(tokens: &[Token]) -> ScoreResult<Vec<Leaf>> {
    let mut current = Duration::new(1, 4);
    let mut leaves = Vec::with_capacity(tokens.len());
    for token in tokens {
        if let Some(duration) = token.duration {
            current = duration;
        }
        let mut leaf = match &token.head {
            Head::Note(pitch) => Leaf::note(*pitch, current),
            Head::Chord(pitches) => Leaf::chord(pitches.iter().copied(), current),
            Head::Rest => Leaf::rest(current),
            Head::Skip => Leaf::skip(current),
            Head::MultimeasureRest => Leaf::multimeasure_rest(current),
        }?;
        if let Some(multiplier) = token.multiplier {
            leaf = leaf.with_multiplier(multiplier)?;
        }
        leaves.push(leaf);
    }
    Ok(leaves)
}
