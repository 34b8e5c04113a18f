use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use enex2md::snapshot::{DisabledSnapshot, HeadlessBrowser, SnapshotWriter};
use enex2md::{ConvertConfig, Notepad};

use crate::Cli;

/// Resolved settings shared by the CLI commands
pub struct App {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub attachment_dir: PathBuf,
    pub config: ConvertConfig,
}

impl App {
    /// Merge the config file (if any) with command-line overrides
    pub fn new(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => ConvertConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ConvertConfig::default(),
        };

        if let Some(dir) = &cli.attachments {
            config.attachment_dir = dir.clone();
        }
        if cli.no_resources {
            config.dump_resources = false;
        }
        if cli.no_snapshots {
            config.snapshot.enabled = false;
        }
        if let Some(browser) = &cli.browser {
            config.snapshot.browser = browser.clone();
        }

        let base = match &cli.output {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to get current directory")?,
        };
        let output_dir = base.join(import_folder_name(&cli.input));
        let attachment_dir = output_dir.join(&config.attachment_dir);

        Ok(Self {
            input: cli.input.clone(),
            output_dir,
            attachment_dir,
            config,
        })
    }

    pub fn load_notepad(&self) -> Result<Notepad> {
        Notepad::open(&self.input)
            .with_context(|| format!("Failed to read {}", self.input.display()))
    }

    pub fn snapshot_writer(&self) -> Box<dyn SnapshotWriter> {
        if self.config.snapshot.enabled {
            Box::new(HeadlessBrowser::from_config(&self.config.snapshot))
        } else {
            Box::new(DisabledSnapshot)
        }
    }
}

/// Folder created for one import: the input file name without extension
fn import_folder_name(input: &Path) -> String {
    input
        .file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "Imported from Evernote".to_string())
}
