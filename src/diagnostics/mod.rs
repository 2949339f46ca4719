//! Diagnostics for score trees
//!
//! Advisory findings collected by an explicit inspection pass. Nothing in
//! here raises: callers decide what a finding means for them.

pub mod wellformedness;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::score::{ComponentId, SpannerId};

pub use wellformedness::{check_wellformedness, is_wellformed};

/// Severity level for findings
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

/// What a finding points at
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Location {
    Component(ComponentId),
    Spanner(SpannerId),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Component(id) => write!(f, "{}", id),
            Location::Spanner(id) => write!(f, "{}", id),
        }
    }
}

/// One advisory finding
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Finding {
    pub location: Location,
    pub severity: DiagnosticSeverity,
    /// Kind identifier (e.g. "misdurated_measure", "overlapping_beam")
    pub kind: String,
    /// Human-readable message
    pub message: String,
}

impl Finding {
    pub fn error(location: Location, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location,
            severity: DiagnosticSeverity::Error,
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn warning(location: Location, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            ..Self::error(location, kind, message)
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {} at {}: {}", self.severity, self.kind, self.location, self.message)
    }
}

/// Findings of one inspection pass
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Diagnostics {
    pub findings: Vec<Finding>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.findings.extend(findings);
    }

    pub fn has_errors(&self) -> bool {
        self.findings
            .iter()
            .any(|f| f.severity == DiagnosticSeverity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// Findings of one kind
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Finding> + 'a {
        self.findings.iter().filter(move |f| f.kind == kind)
    }

    /// Per-kind counts, sorted by kind
    pub fn summary(&self) -> Vec<(String, usize)> {
        let mut counts = std::collections::BTreeMap::new();
        for finding in &self.findings {
            *counts.entry(finding.kind.clone()).or_insert(0) += 1;
        }
        counts.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_creation() {
        let finding = Finding::warning(
            Location::Component(ComponentId::from_raw(4)),
            "empty_container",
            "no children",
        );
        assert_eq!(finding.severity, DiagnosticSeverity::Warning);
        assert_eq!(finding.to_string(), "Warning empty_container at #4: no children");
    }

    #[test]
    fn test_diagnostics_collection() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());
        assert!(!diagnostics.has_errors());

        diagnostics.add(Finding::warning(
            Location::Component(ComponentId::from_raw(1)),
            "empty_container",
            "no children",
        ));
        assert!(!diagnostics.has_errors());

        diagnostics.add(Finding::error(
            Location::Spanner(SpannerId::from_raw(0)),
            "discontiguous_spanner",
            "gap",
        ));
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.of_kind("empty_container").count(), 1);
        assert_eq!(
            diagnostics.summary(),
            vec![
                ("discontiguous_spanner".to_string(), 1),
                ("empty_container".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_severity_serialization() {
        let json = serde_json::to_string(&DiagnosticSeverity::Error).unwrap();
        assert_eq!(json, "\"error\"");
    }
}
