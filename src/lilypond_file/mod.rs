//! LilyPond documents: a formatted score wrapped in version, language,
//! includes and header

pub mod templates;

use serde::{Deserialize, Serialize};

use crate::config::Configuration;
use crate::error::ScoreResult;
use crate::format::FormatContext;
use crate::models::pitch::PitchLanguage;
use crate::score::{ComponentId, ScoreTree};

pub use templates::{render_document, DocumentTemplate, TemplateContext, TemplateContextBuilder};

/// `\header` block fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub composer: Option<String>,
    pub dedication: Option<String>,
}

/// Document settings around one score subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LilyPondFile {
    pub version: String,
    pub language: PitchLanguage,
    pub includes: Vec<String>,
    pub global_staff_size: Option<u32>,
    pub header: Header,
    pub template: DocumentTemplate,
}

impl Default for LilyPondFile {
    fn default() -> Self {
        Self::from_config(&Configuration::default())
    }
}

impl LilyPondFile {
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            version: config.lilypond_version.clone(),
            language: config.language,
            includes: Vec::new(),
            global_staff_size: None,
            header: Header::default(),
            template: DocumentTemplate::Full,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.header.title = Some(title.into());
        self
    }

    pub fn with_composer(mut self, composer: impl Into<String>) -> Self {
        self.header.composer = Some(composer.into());
        self
    }

    pub fn with_include(mut self, path: impl Into<String>) -> Self {
        self.includes.push(path.into());
        self
    }

    pub fn with_template(mut self, template: DocumentTemplate) -> Self {
        self.template = template;
        self
    }

    /// Complete document text for the subtree at `root`.
    ///
    /// The document's language overrides the one in `context`; the music
    /// sits one indentation level inside the score block.
    pub fn render(&self, tree: &ScoreTree, root: ComponentId, context: &FormatContext) -> ScoreResult<String> {
        let context = context.clone().with_language(self.language);
        let music = tree.lilypond_with(root, &context)?;
        let music = match self.template {
            DocumentTemplate::Full => indent(&music, context.indent_width),
            DocumentTemplate::Minimal => music,
        };

        let mut builder = TemplateContext::builder(&self.version, self.language.directive_name(), music)
            .global_staff_size(self.global_staff_size)
            .header_field("title", self.header.title.clone())
            .header_field("subtitle", self.header.subtitle.clone())
            .header_field("composer", self.header.composer.clone())
            .header_field("dedication", self.header.dedication.clone());
        for include in &self.includes {
            builder = builder.include(include);
        }
        #[cfg(feature = "chrono")]
        {
            builder = builder.date_comment(chrono::Local::now().format("%Y-%m-%d %H:%M").to_string());
        }
        render_document(self.template, &builder.build())
    }
}

fn indent(text: &str, width: usize) -> String {
    let prefix = " ".repeat(width);
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use crate::models::duration::Duration;
    use crate::models::pitch::Pitch;

    use super::*;

    #[test]
    fn test_render_document() {
        let mut tree = ScoreTree::new();
        let staff = tree.staff();
        let note = tree.note(Pitch::from_name("cs'").unwrap(), Duration::new(1, 4)).unwrap();
        tree.append(staff, note).unwrap();

        let file = LilyPondFile::default().with_title("Sketch");
        let text = file.render(&tree, staff, &FormatContext::default()).unwrap();
        assert!(text.contains("\\version \"2.24.0\""));
        assert!(text.contains("\\language \"english\""));
        assert!(text.contains("title = \"Sketch\""));
        assert!(text.contains("\\score {\n    \\new Staff\n    {\n        cs'4\n    }\n}"));
    }

    #[test]
    fn test_document_language_wins() {
        let mut tree = ScoreTree::new();
        let note = tree.note(Pitch::from_name("cs'").unwrap(), Duration::new(1, 4)).unwrap();
        let mut file = LilyPondFile::default().with_template(DocumentTemplate::Minimal);
        file.language = PitchLanguage::Nederlands;
        let text = file.render(&tree, note, &FormatContext::default()).unwrap();
        assert!(text.contains("\\language \"nederlands\""));
        assert!(text.contains("cis'4"));
    }

    #[test]
    fn test_indent_skips_blank_lines() {
        assert_eq!(indent("a\n\nb", 2), "  a\n\n  b");
    }
}
