//! LilyPond grob overrides and context settings

use serde::{Deserialize, Serialize};

/// `\override [Context.]Grob.property = value`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrobOverride {
    pub context: Option<String>,
    pub grob: String,
    pub property: String,
    /// Scheme value, written verbatim (`#red`, `#'(3 . 3)`)
    pub value: String,
}

impl GrobOverride {
    pub fn new(grob: impl Into<String>, property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            context: None,
            grob: grob.into(),
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn in_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn path(&self) -> String {
        match &self.context {
            Some(context) => format!("{}.{}.{}", context, self.grob, self.property),
            None => format!("{}.{}", self.grob, self.property),
        }
    }

    pub fn override_string(&self, once: bool) -> String {
        let prefix = if once { "\\once \\override" } else { "\\override" };
        format!("{} {} = {}", prefix, self.path(), self.value)
    }

    pub fn revert_string(&self) -> String {
        format!("\\revert {}", self.path())
    }

    /// Form used inside a context `\with` block
    pub fn with_block_string(&self) -> String {
        format!("\\override {}.{} = {}", self.grob, self.property, self.value)
    }
}

/// `\set [Context.]property = value`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextSetting {
    pub context: Option<String>,
    pub property: String,
    pub value: String,
}

impl ContextSetting {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            context: None,
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn in_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn set_string(&self) -> String {
        match &self.context {
            Some(context) => format!("\\set {}.{} = {}", context, self.property, self.value),
            None => format!("\\set {} = {}", self.property, self.value),
        }
    }

    pub fn with_block_string(&self) -> String {
        format!("{} = {}", self.property, self.value)
    }
}
