//! Evernote export conversion
//!
//! Converts Evernote export files (.enex) into a folder of Markdown notes.
//! Supports:
//! - Note content (ENML rendered to Markdown)
//! - Note attributes as front matter, plus tags
//! - Attachments/resources, written under collision-free names
//! - PDF snapshots for saved web pages (bookmark notes)

mod enex;
mod error;
mod naming;
mod note;
mod notepad;
mod resource;

pub use enex::{parse_enex, parse_evernote_date, NoteRecord, ResourceRecord};
pub use error::{ConvertError, Result};
pub use naming::{
    sanitize_filename, split_extension, truncate_bytes, NamingScope, MAX_EXTENSION_LEN,
    MAX_FILE_NAME_LEN, MAX_NAME_LEN,
};
pub use note::{
    Attributes, Note, RenderContext, ResourceLookup, MAX_TITLE_LEN, MISSING_RESOURCE_NAME,
    ORIGINAL_TITLE_KEY, SOURCE_URL_KEY,
};
pub use notepad::{NotePreview, Notepad, NotepadPreview, Progress};
pub use resource::{extension_for_mime, Resource, SUPPORTED_ENCODING, UNKNOWN_EXTENSION};
