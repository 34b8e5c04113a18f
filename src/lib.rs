//! Convert Evernote `.enex` exports into Markdown files with attachments.

pub mod config;
pub mod evernote;
pub mod markdown;
pub mod snapshot;

pub use config::{ConvertConfig, SnapshotConfig};
pub use evernote::{ConvertError, Note, Notepad, Resource};
