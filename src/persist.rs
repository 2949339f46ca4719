//! Writing LilyPond documents and running the renderer
//!
//! `as_ly` formats and writes the document. `as_pdf` does the same and
//! then runs the configured renderer once, blocking until it exits or the
//! timeout kills it. Renderer output goes to a `.log` file next to the
//! input and is returned in the report.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::config::Configuration;
use crate::error::{ScoreError, ScoreResult};
use crate::format::FormatContext;
use crate::lilypond_file::LilyPondFile;
use crate::score::{ComponentId, ScoreTree};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Result of writing a `.ly` file
#[derive(Debug, Clone)]
pub struct LyReport {
    pub ly_path: PathBuf,
    pub format_time: Duration,
}

/// Result of a renderer run
#[derive(Debug, Clone)]
pub struct PdfReport {
    pub ly_path: PathBuf,
    pub pdf_path: PathBuf,
    pub format_time: Duration,
    pub render_time: Duration,
    /// Renderer exited with status zero
    pub success: bool,
    /// Combined stdout and stderr of the renderer
    pub log: String,
}

/// Persists one score subtree as a LilyPond document
pub struct Persister<'a> {
    tree: &'a ScoreTree,
    root: ComponentId,
    file: LilyPondFile,
    config: Configuration,
    context: FormatContext,
}

impl<'a> Persister<'a> {
    pub fn new(tree: &'a ScoreTree, root: ComponentId) -> Self {
        Self::with_config(tree, root, Configuration::default())
    }

    pub fn with_config(tree: &'a ScoreTree, root: ComponentId, config: Configuration) -> Self {
        Self {
            tree,
            root,
            file: LilyPondFile::from_config(&config),
            context: config.format_context(),
            config,
        }
    }

    pub fn file(mut self, file: LilyPondFile) -> Self {
        self.file = file;
        self
    }

    pub fn context(mut self, context: FormatContext) -> Self {
        self.context = context;
        self
    }

    /// Document text without touching the filesystem
    pub fn render_string(&self) -> ScoreResult<String> {
        self.file.render(self.tree, self.root, &self.context)
    }

    /// Format the document and write it to `path` (extension forced to `.ly`)
    pub fn as_ly(&self, path: impl AsRef<Path>) -> ScoreResult<LyReport> {
        let ly_path = self.config.output_path(path).with_extension("ly");
        let start = Instant::now();
        let text = self.render_string()?;
        let format_time = start.elapsed();
        if let Some(parent) = ly_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&ly_path, text)?;
        info!("wrote {} (formatted in {:?})", ly_path.display(), format_time);
        Ok(LyReport { ly_path, format_time })
    }

    /// Write the `.ly` file for `path` and run the renderer on it
    pub fn as_pdf(&self, path: impl AsRef<Path>) -> ScoreResult<PdfReport> {
        let LyReport { ly_path, format_time } = self.as_ly(path)?;
        let pdf_path = ly_path.with_extension("pdf");
        let log_path = ly_path.with_extension("log");

        let start = Instant::now();
        let success = self.run_renderer(&ly_path, &log_path)?;
        let render_time = start.elapsed();
        let log = fs::read_to_string(&log_path).unwrap_or_default();
        if success {
            info!("rendered {} in {:?}", pdf_path.display(), render_time);
        } else {
            warn!("renderer failed on {}", ly_path.display());
        }
        Ok(PdfReport {
            ly_path,
            pdf_path,
            format_time,
            render_time,
            success,
            log,
        })
    }

    fn run_renderer(&self, ly_path: &Path, log_path: &Path) -> ScoreResult<bool> {
        let log_file = File::create(log_path)?;
        let stderr = log_file.try_clone()?;
        info!("running {} on {}", self.config.renderer, ly_path.display());
        let mut child = Command::new(&self.config.renderer)
            .arg("-dno-point-and-click")
            .arg("-o")
            .arg(ly_path.with_extension(""))
            .arg(ly_path)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|e| ScoreError::Render(format!("can not start {}: {}", self.config.renderer, e)))?;

        let timeout = self.config.renderer_timeout();
        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status.success());
            }
            if start.elapsed() >= timeout {
                child.kill()?;
                child.wait()?;
                return Err(ScoreError::Render(format!(
                    "{} timed out after {:?}",
                    self.config.renderer, timeout
                )));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::models::duration::Duration as NoteDuration;
    use crate::models::pitch::Pitch;

    use super::*;

    fn one_note() -> (ScoreTree, ComponentId) {
        let mut tree = ScoreTree::new();
        let staff = tree.staff();
        let note = tree
            .note(Pitch::from_name("c'").unwrap(), NoteDuration::new(1, 4))
            .unwrap();
        tree.append(staff, note).unwrap();
        (tree, staff)
    }

    #[test]
    fn test_as_ly_writes_document() {
        let dir = tempfile::tempdir().unwrap();
        let (tree, staff) = one_note();
        let report = Persister::new(&tree, staff)
            .as_ly(dir.path().join("nested/score.txt"))
            .unwrap();
        assert_eq!(report.ly_path, dir.path().join("nested/score.ly"));
        let text = fs::read_to_string(&report.ly_path).unwrap();
        assert!(text.contains("\\new Staff"));
        assert!(text.contains("c'4"));
    }

    #[test]
    fn test_missing_renderer_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (tree, staff) = one_note();
        let config = Configuration {
            renderer: "definitely-not-a-lilypond-binary".to_string(),
            ..Configuration::default()
        };
        let result = Persister::with_config(&tree, staff, config).as_pdf(dir.path().join("score"));
        assert!(matches!(result, Err(ScoreError::Render(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_renderer_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let (tree, staff) = one_note();
        for (renderer, expected) in [("true", true), ("false", false)] {
            let config = Configuration {
                renderer: renderer.to_string(),
                ..Configuration::default()
            };
            let report = Persister::with_config(&tree, staff, config)
                .as_pdf(dir.path().join(renderer))
                .unwrap();
            assert_eq!(report.success, expected);
            assert_eq!(report.pdf_path, dir.path().join(format!("{}.pdf", renderer)));
        }
    }
}
