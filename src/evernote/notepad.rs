//! A whole Evernote export, converted note by note.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::enex::parse_enex;
use super::error::{ConvertError, Result};
use super::naming::NamingScope;
use super::note::{Note, RenderContext};

/// Preview metadata for an export
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotepadPreview {
    /// Number of notes found
    pub note_count: usize,
    /// Number of resources/attachments
    pub resource_count: usize,
    /// Number of saved web pages
    pub bookmark_count: usize,
    pub notes: Vec<NotePreview>,
}

/// Preview info for a single note
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePreview {
    pub index: usize,
    pub title: String,
    pub tags: Vec<String>,
    pub is_bookmark: bool,
    pub resource_count: usize,
    /// Created date (if available)
    pub created: Option<String>,
}

/// Progress of a batch write. Displays as `<index>/<total>`, where `index`
/// is the 1-based position of the note that produced `path`.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    pub index: usize,
    pub total: usize,
    pub path: &'a Path,
}

impl fmt::Display for Progress<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.total)
    }
}

/// All notes of one export, in document order, plus the naming scope they
/// were allocated in.
#[derive(Debug, Clone)]
pub struct Notepad {
    notes: Vec<Note>,
    scope: NamingScope,
}

impl Notepad {
    /// Read and parse an `.enex` file.
    pub fn open(enex_path: &Path) -> Result<Self> {
        if !enex_path.exists() {
            return Err(ConvertError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("ENEX file not found: {}", enex_path.display()),
            )));
        }

        let content = fs::read_to_string(enex_path)?;
        Self::parse(&content)
    }

    /// Build every note in document order against one shared naming scope.
    pub fn parse(document: &str) -> Result<Self> {
        let records = parse_enex(document)?;
        let mut scope = NamingScope::new();
        let mut notes = Vec::with_capacity(records.len());

        for record in records {
            notes.push(Note::from_record(record, &mut scope)?);
        }

        log::debug!(
            "Parsed {} notes, {} names allocated",
            notes.len(),
            scope.len()
        );
        Ok(Self { notes, scope })
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn naming_scope(&self) -> &NamingScope {
        &self.scope
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Write every note in order, reporting each written path.
    ///
    /// The first note that fails to write aborts the batch.
    pub fn write_all<F>(
        &self,
        output_dir: &Path,
        attachment_dir: &Path,
        dump_resources: bool,
        ctx: &RenderContext,
        mut on_progress: F,
    ) -> Result<Vec<PathBuf>>
    where
        F: FnMut(Progress<'_>),
    {
        let total = self.notes.len();
        let mut written = Vec::new();

        for (i, note) in self.notes.iter().enumerate() {
            let paths = note.write(output_dir, attachment_dir, dump_resources, ctx)?;
            for path in &paths {
                on_progress(Progress {
                    index: i + 1,
                    total,
                    path,
                });
            }
            written.extend(paths);
        }

        Ok(written)
    }

    /// One `"<index> | <title>"` line per note, tagged ` #bookmark` for
    /// saved web pages. Indices start at 1.
    pub fn list_summary(&self) -> Vec<String> {
        self.notes
            .iter()
            .enumerate()
            .map(|(i, note)| {
                let tag = if note.is_bookmark() { " #bookmark" } else { "" };
                format!("{} | {}{}", i + 1, note.title(), tag)
            })
            .collect()
    }

    pub fn preview(&self) -> NotepadPreview {
        let notes: Vec<NotePreview> = self
            .notes
            .iter()
            .enumerate()
            .map(|(i, note)| NotePreview {
                index: i + 1,
                title: note.title().to_string(),
                tags: note.tags().to_vec(),
                is_bookmark: note.is_bookmark(),
                resource_count: note.resources().len(),
                created: note.created_at().ok().map(|d| d.to_rfc3339()),
            })
            .collect();

        NotepadPreview {
            note_count: notes.len(),
            resource_count: notes.iter().map(|n| n.resource_count).sum(),
            bookmark_count: notes.iter().filter(|n| n.is_bookmark).count(),
            notes,
        }
    }
}
