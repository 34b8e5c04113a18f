//! A single Evernote note and the artifacts written for it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};

use super::enex::{parse_evernote_date, NoteRecord};
use super::error::{ConvertError, Result};
use super::naming::{sanitize_filename, truncate_bytes, NamingScope, MAX_NAME_LEN};
use super::resource::Resource;
use crate::markdown::{collapse_blank_lines, MarkupRenderer, ResourceResolver};
use crate::snapshot::SnapshotWriter;

/// Name substituted for attachment references that match no resource.
pub const MISSING_RESOURCE_NAME: &str = "missing-resource";

/// Attribute key that marks a note as a saved web page.
pub const SOURCE_URL_KEY: &str = "source-url";

/// Attribute key holding the full title when the file name had to be cut.
pub const ORIGINAL_TITLE_KEY: &str = "original_title";

const DATE_PREFIX_LEN: usize = "YYYY-MM-DD-".len();

/// Longest title, in UTF-8 bytes, kept in a note's base name.
pub const MAX_TITLE_LEN: usize = MAX_NAME_LEN - DATE_PREFIX_LEN;

static SRC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"src="([^"]*)""#).unwrap());

/// Insertion-ordered key/value pairs from `<note-attributes>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set `key`, keeping its original position when it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Resolves attachment hashes against one note's resources during rendering.
pub struct ResourceLookup<'a> {
    resources: &'a [Resource],
}

impl<'a> ResourceLookup<'a> {
    pub fn new(resources: &'a [Resource]) -> Self {
        Self { resources }
    }

    pub fn find(&self, hash: &str) -> Option<&'a Resource> {
        self.resources
            .iter()
            .find(|r| r.content_hash().eq_ignore_ascii_case(hash))
    }
}

impl ResourceResolver for ResourceLookup<'_> {
    fn resolve(&self, hash: &str, mime: &str) -> String {
        match self.find(hash) {
            Some(resource) => resource.resolved_file_name().to_string(),
            None => {
                log::warn!(
                    "No resource with hash '{}' ({}); using placeholder '{}'",
                    hash,
                    mime,
                    MISSING_RESOURCE_NAME
                );
                MISSING_RESOURCE_NAME.to_string()
            }
        }
    }
}

/// The external collaborators a note needs to write itself.
pub struct RenderContext<'a> {
    pub markup: &'a dyn MarkupRenderer,
    pub snapshot: &'a dyn SnapshotWriter,
}

/// One note with its decoded resources and reserved file names.
#[derive(Debug, Clone)]
pub struct Note {
    title: String,
    created: Option<String>,
    updated: Option<String>,
    raw_content: String,
    tags: Vec<String>,
    attributes: Attributes,
    is_bookmark: bool,
    resources: Vec<Resource>,
    base_name: String,
    /// `<date>-<base_name>` as allocated in the naming scope; `None` when the
    /// created timestamp is missing or unreadable.
    stem: Option<String>,
}

impl Note {
    /// Build a note from its export record.
    ///
    /// Resources claim their names in `scope` one by one in document order,
    /// then the note reserves its own file names. Any resource that fails to
    /// decode fails the whole note.
    pub fn from_record(record: NoteRecord, scope: &mut NamingScope) -> Result<Self> {
        let mut resources = Vec::with_capacity(record.resources.len());
        for resource in &record.resources {
            resources.push(Resource::from_record(resource, scope)?);
        }

        let mut attributes = Attributes::new();
        for (key, value) in record.attributes {
            attributes.insert(key, value);
        }
        let is_bookmark = attributes.contains_key(SOURCE_URL_KEY);

        let mut base_name = sanitize_filename(&record.title);
        if base_name.len() > MAX_TITLE_LEN {
            base_name = truncate_bytes(&base_name, MAX_TITLE_LEN).to_string();
            attributes.insert(ORIGINAL_TITLE_KEY, record.title.clone());
        }
        if base_name.is_empty() {
            base_name = "Untitled".to_string();
        }

        let stem = record
            .created
            .as_deref()
            .and_then(parse_evernote_date)
            .map(|created| {
                let stem = format!("{}-{}", created.format("%Y-%m-%d"), base_name);
                if is_bookmark {
                    scope.allocate_stem(&stem, &["md", "pdf"])
                } else {
                    scope.allocate_stem(&stem, &["md"])
                }
            });

        Ok(Self {
            title: record.title,
            created: record.created,
            updated: record.updated,
            raw_content: record.content,
            tags: record.tags,
            attributes,
            is_bookmark,
            resources,
            base_name,
            stem,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn raw_content(&self) -> &str {
        &self.raw_content
    }

    pub fn is_bookmark(&self) -> bool {
        self.is_bookmark
    }

    /// Sanitized, length-capped title.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn created_at(&self) -> Result<DateTime<Utc>> {
        self.created
            .as_deref()
            .and_then(parse_evernote_date)
            .ok_or_else(|| ConvertError::MissingTimestamp(self.title.clone()))
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated.as_deref().and_then(parse_evernote_date)
    }

    /// `<YYYY-MM-DD>-<base name>.<kind>`, suffixed if the name was taken.
    pub fn file_name(&self, kind: &str) -> Result<String> {
        self.stem
            .as_ref()
            .map(|stem| format!("{}.{}", stem, kind))
            .ok_or_else(|| ConvertError::MissingTimestamp(self.title.clone()))
    }

    pub fn lookup(&self) -> ResourceLookup<'_> {
        ResourceLookup::new(&self.resources)
    }

    pub fn render_markdown(&self, renderer: &dyn MarkupRenderer) -> String {
        let markdown = renderer.to_markdown(&self.raw_content, &self.lookup());
        collapse_blank_lines(&markdown)
    }

    /// Render as HTML with every resolved attachment inlined as a data URI.
    pub fn render_html(&self, renderer: &dyn MarkupRenderer) -> String {
        let html = renderer.to_html(&self.raw_content, &self.lookup());
        let inlined = SRC_RE.replace_all(&html, |caps: &Captures| {
            let name = html_escape::decode_html_entities(&caps[1]);
            match self
                .resources
                .iter()
                .find(|r| r.resolved_file_name() == name)
            {
                Some(resource) => format!(r#"src="{}""#, resource.data_uri()),
                None => caps[0].to_string(),
            }
        });
        collapse_blank_lines(&inlined)
    }

    /// `---` delimited `key: value` lines, one per attribute.
    pub fn front_matter(&self) -> String {
        let mut output = String::from("---\n");
        for (key, value) in self.attributes.iter() {
            output.push_str(&format!("{}: {}\n", key, value));
        }
        if !self.tags.is_empty() {
            let tags: Vec<String> = self
                .tags
                .iter()
                .map(|tag| format!("\"{}\"", escape_yaml_string(tag)))
                .collect();
            output.push_str(&format!("tags: [{}]\n", tags.join(", ")));
        }
        output.push_str("---\n");
        output
    }

    /// Write every artifact of this note and return the paths written:
    /// the Markdown file, then the snapshot (if one was produced), then the
    /// resources (if `dump_resources`).
    ///
    /// The Markdown file goes first, so a snapshot error can never cost the
    /// note its text.
    pub fn write(
        &self,
        note_dir: &Path,
        attachment_dir: &Path,
        dump_resources: bool,
        ctx: &RenderContext,
    ) -> Result<Vec<PathBuf>> {
        let markdown_name = self.file_name("md")?;
        let pdf_name = if self.is_bookmark {
            Some(self.file_name("pdf")?)
        } else {
            None
        };
        let prefix = pdf_name
            .as_ref()
            .map(|name| format!("![[{}]]\n\n", name))
            .unwrap_or_default();

        fs::create_dir_all(note_dir)?;
        let markdown_path = note_dir.join(&markdown_name);
        let content = format!(
            "{}\n{}{}\n",
            self.front_matter(),
            prefix,
            self.render_markdown(ctx.markup)
        );
        fs::write(&markdown_path, content)?;
        log::info!("Wrote note '{}' to {:?}", self.title, markdown_path);

        let mut paths = vec![markdown_path];

        if let Some(pdf_name) = pdf_name {
            let target = attachment_dir.join(pdf_name);
            let html = self.render_html(ctx.markup);

            match ctx.snapshot.write_snapshot(&html, &target) {
                Ok(()) => paths.push(target),
                Err(e) if e.is_render_failure() => {
                    log::warn!("Snapshot of '{}' failed: {}", self.title, e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        if dump_resources {
            for resource in &self.resources {
                match resource.write(attachment_dir) {
                    Ok(path) => paths.push(path),
                    Err(e) => log::error!(
                        "Failed to write resource '{}' of note '{}': {}",
                        resource.resolved_file_name(),
                        self.title,
                        e
                    ),
                }
            }
        }

        Ok(paths)
    }
}

fn escape_yaml_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
