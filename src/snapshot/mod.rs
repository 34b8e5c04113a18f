//! Fixed-layout snapshots of bookmark notes
//!
//! Bookmark notes get a PDF rendering of their HTML form next to the
//! attachments. Rendering is delegated to an external headless browser; a
//! failing browser never costs the note its Markdown file.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use thiserror::Error;
use url::Url;

use crate::config::SnapshotConfig;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot rendering is disabled")]
    Disabled,

    #[error("Failed to launch renderer '{command}': {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Renderer exited with {status}: {stderr}")]
    Render { status: ExitStatus, stderr: String },

    #[error("Renderer produced no output at {0:?}")]
    NoOutput(PathBuf),

    #[error("Failed to write scratch page {path:?}: {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scratch page {0:?} has no file URL")]
    PageUrl(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SnapshotError {
    /// Failures of the renderer itself, its scratch page included. These are
    /// expected in the field (no browser installed, page failed to load) and
    /// are only logged.
    pub fn is_render_failure(&self) -> bool {
        !matches!(self, SnapshotError::Io(_))
    }
}

/// Renders an HTML document into a fixed-layout file at `target`.
pub trait SnapshotWriter {
    fn write_snapshot(&self, html: &str, target: &Path) -> Result<(), SnapshotError>;
}

/// Used when snapshots are turned off; every call reports [`SnapshotError::Disabled`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSnapshot;

impl SnapshotWriter for DisabledSnapshot {
    fn write_snapshot(&self, _html: &str, _target: &Path) -> Result<(), SnapshotError> {
        Err(SnapshotError::Disabled)
    }
}

/// Percent-encoded `file://` URL for a local page.
pub fn file_url(page: &Path) -> Result<String, SnapshotError> {
    Url::from_file_path(page)
        .map(String::from)
        .map_err(|()| SnapshotError::PageUrl(page.to_path_buf()))
}

/// Prints pages to PDF with a Chromium-compatible browser in headless mode.
#[derive(Debug, Clone)]
pub struct HeadlessBrowser {
    command: String,
    args: Vec<String>,
    scratch_dir: PathBuf,
}

impl HeadlessBrowser {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    pub fn from_config(config: &SnapshotConfig) -> Self {
        Self {
            args: config.args.clone(),
            ..Self::new(config.browser.clone())
        }
    }

    /// Directory for the HTML page handed to the browser (the system temp
    /// directory by default).
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Scratch HTML file the browser loads; named after the target so
    /// concurrent runs into different directories do not clash.
    fn scratch_path(&self, target: &Path) -> PathBuf {
        let digest = md5::compute(target.to_string_lossy().as_bytes());
        self.scratch_dir.join(format!("enex2md-{:x}.html", digest))
    }

    fn build_command(&self, page: &Path, target: &Path) -> Result<Command, SnapshotError> {
        let mut cmd = Command::new(&self.command);
        cmd.arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-pdf-header-footer")
            .arg(format!("--print-to-pdf={}", target.display()));
        for arg in &self.args {
            cmd.arg(arg);
        }
        cmd.arg(file_url(page)?);
        Ok(cmd)
    }
}

impl SnapshotWriter for HeadlessBrowser {
    fn write_snapshot(&self, html: &str, target: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let page = self.scratch_path(target);
        fs::write(&page, html).map_err(|source| SnapshotError::Scratch {
            path: page.clone(),
            source,
        })?;

        let output = self.build_command(&page, target).map(|mut cmd| cmd.output());
        let _ = fs::remove_file(&page);

        let output = output?.map_err(|source| SnapshotError::Launch {
            command: self.command.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(SnapshotError::Render {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !target.exists() {
            return Err(SnapshotError::NoOutput(target.to_path_buf()));
        }

        log::info!("Rendered snapshot {:?}", target);
        Ok(())
    }
}
