//! Mustache templates for LilyPond documents
//!
//! - `Full`: version, language, includes, staff size, header and a
//!   `\score` block
//! - `Minimal`: version, language and the bare music expression
//!
//! Templates are compiled once on first use.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::error::{ScoreError, ScoreResult};

/// Template selection for LilyPond documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentTemplate {
    #[default]
    Full,
    Minimal,
}

static FULL: Lazy<Result<mustache::Template, String>> =
    Lazy::new(|| mustache::compile_str(include_str!("templates/full.ly.mustache")).map_err(|e| e.to_string()));

static MINIMAL: Lazy<Result<mustache::Template, String>> = Lazy::new(|| {
    mustache::compile_str(include_str!("templates/minimal.ly.mustache")).map_err(|e| e.to_string())
});

fn compiled(template: DocumentTemplate) -> ScoreResult<&'static mustache::Template> {
    let compiled = match template {
        DocumentTemplate::Full => &*FULL,
        DocumentTemplate::Minimal => &*MINIMAL,
    };
    compiled.as_ref().map_err(|e| ScoreError::Template(e.clone()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeLine {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderField {
    pub name: String,
    pub value: String,
}

/// Context data for template rendering
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    /// LilyPond version (e.g., "2.24.0")
    pub version: String,
    pub language: String,
    /// Formatted music, already indented for the score block
    pub music: String,
    pub includes: Vec<IncludeLine>,
    pub has_staff_size: bool,
    pub global_staff_size: String,
    pub has_header: bool,
    pub header_fields: Vec<HeaderField>,
    pub has_date: bool,
    pub date_comment: String,
}

impl TemplateContext {
    pub fn new(version: impl Into<String>, language: impl Into<String>, music: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            language: language.into(),
            music: music.into(),
            includes: Vec::new(),
            has_staff_size: false,
            global_staff_size: String::new(),
            has_header: false,
            header_fields: Vec::new(),
            has_date: false,
            date_comment: String::new(),
        }
    }

    pub fn builder(
        version: impl Into<String>,
        language: impl Into<String>,
        music: impl Into<String>,
    ) -> TemplateContextBuilder {
        TemplateContextBuilder {
            context: TemplateContext::new(version, language, music),
        }
    }
}

/// Builder for TemplateContext
pub struct TemplateContextBuilder {
    context: TemplateContext,
}

impl TemplateContextBuilder {
    pub fn include(mut self, path: impl Into<String>) -> Self {
        self.context.includes.push(IncludeLine { path: path.into() });
        self
    }

    pub fn global_staff_size(mut self, size: Option<u32>) -> Self {
        self.context.has_staff_size = size.is_some();
        self.context.global_staff_size = size.map(|s| s.to_string()).unwrap_or_default();
        self
    }

    /// Add a header field; empty values are skipped
    pub fn header_field(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.context.header_fields.push(HeaderField {
                name: name.into(),
                value: value.replace('"', "\\\""),
            });
            self.context.has_header = true;
        }
        self
    }

    pub fn date_comment(mut self, comment: impl Into<String>) -> Self {
        self.context.date_comment = comment.into();
        self.context.has_date = true;
        self
    }

    pub fn build(self) -> TemplateContext {
        self.context
    }
}

/// Render a LilyPond document using a template
pub fn render_document(template: DocumentTemplate, context: &TemplateContext) -> ScoreResult<String> {
    Ok(compiled(template)?.render_to_string(context)?)
}
