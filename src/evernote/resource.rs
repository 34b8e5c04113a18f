//! Note attachments

use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use super::enex::ResourceRecord;
use super::error::{ConvertError, Result};
use super::naming::{
    sanitize_filename, split_extension, truncate_bytes, NamingScope, MAX_EXTENSION_LEN,
};

/// The only payload encoding Evernote exports use.
pub const SUPPORTED_ENCODING: &str = "base64";

/// Extension used when neither the mime type nor the declared name gives one.
pub const UNKNOWN_EXTENSION: &str = "unknown";

/// Map a mime type to the file extension written to disk.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let ext = match mime.trim().to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        "image/heic" => "heic",
        "application/pdf" => "pdf",
        "application/zip" => "zip",
        "application/json" => "json",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "application/vnd.ms-excel" => "xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "xlsx",
        "application/vnd.ms-powerpoint" => "ppt",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => "pptx",
        "text/plain" => "txt",
        "text/html" => "html",
        "text/csv" => "csv",
        "text/markdown" => "md",
        "audio/mpeg" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/mp4" | "audio/x-m4a" | "audio/m4a" => "m4a",
        "audio/ogg" => "ogg",
        "audio/amr" => "amr",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/webm" => "webm",
        _ => return None,
    };
    Some(ext)
}

/// A decoded attachment with its final on-disk name.
#[derive(Debug, Clone)]
pub struct Resource {
    mime: String,
    payload: Vec<u8>,
    content_hash: String,
    preferred_name: String,
    file_name: String,
    source_url: Option<String>,
}

impl Resource {
    /// Decode `record` and claim a file name for it in `scope`.
    ///
    /// The chosen name is recorded in `scope` before returning, so the next
    /// resource (in this note or a later one) sees it as taken.
    pub fn from_record(record: &ResourceRecord, scope: &mut NamingScope) -> Result<Self> {
        let encoding = record.encoding.as_deref().unwrap_or_default();
        if encoding != SUPPORTED_ENCODING {
            return Err(ConvertError::UnsupportedEncoding(encoding.to_string()));
        }

        let compact: String = record
            .data
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let payload = BASE64.decode(compact)?;
        let content_hash = format!("{:x}", md5::compute(&payload));

        let preferred_name = record
            .file_name
            .as_deref()
            .map(sanitize_filename)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| content_hash.clone());

        let (stem, declared_ext) = split_extension(&preferred_name);
        let extension = extension_for_mime(&record.mime)
            .map(str::to_string)
            .or_else(|| {
                declared_ext.map(|ext| truncate_bytes(ext, MAX_EXTENSION_LEN).to_ascii_lowercase())
            })
            .unwrap_or_else(|| UNKNOWN_EXTENSION.to_string());

        let file_name = scope.allocate(stem, &extension);
        log::debug!(
            "Resource {} ({}) named '{}'",
            content_hash,
            record.mime,
            file_name
        );

        Ok(Self {
            mime: record.mime.clone(),
            payload,
            content_hash,
            preferred_name,
            file_name,
            source_url: record.source_url.clone().filter(|url| !url.is_empty()),
        })
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// MD5 of the decoded payload, as referenced by `<en-media hash="...">`.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn preferred_name(&self) -> &str {
        &self.preferred_name
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    /// Final file name: the allocated stem plus the mime-derived extension.
    pub fn resolved_file_name(&self) -> &str {
        &self.file_name
    }

    /// Payload as a `data:` URI for self-contained HTML.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(&self.payload))
    }

    /// Write the payload into `directory`, creating it if needed.
    ///
    /// Existing files with the same name are overwritten.
    pub fn write(&self, directory: &Path) -> Result<PathBuf> {
        fs::create_dir_all(directory)?;
        let path = directory.join(&self.file_name);
        fs::write(&path, &self.payload)?;
        Ok(path)
    }
}
