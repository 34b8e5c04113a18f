//! ENEX document reader
//!
//! Streams an Evernote export with `quick-xml` and collects the raw note
//! records. Nothing is decoded or named here; that happens when the records
//! are turned into [`Note`](super::Note)s.

use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::error::{ConvertError, Result};

/// Timestamp layout used by Evernote exports (`20231231T235959Z`).
pub const EVERNOTE_DATE_FORMAT: &str = "%Y%m%dT%H%M%S";

/// One `<resource>` element, as found in the export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceRecord {
    pub mime: String,
    /// Value of the `encoding` attribute on `<data>`
    pub encoding: Option<String>,
    /// Encoded payload text
    pub data: String,
    pub file_name: Option<String>,
    pub source_url: Option<String>,
}

/// One `<note>` element, as found in the export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteRecord {
    pub title: String,
    pub created: Option<String>,
    pub updated: Option<String>,
    /// ENML markup from `<content>`
    pub content: String,
    pub tags: Vec<String>,
    pub resources: Vec<ResourceRecord>,
    /// Children of `<note-attributes>`, in document order
    pub attributes: Vec<(String, String)>,
}

/// Parse Evernote date format (YYYYMMDDTHHmmssZ)
pub fn parse_evernote_date(date_str: &str) -> Option<DateTime<Utc>> {
    let clean = date_str.trim();
    if clean.len() < 15 {
        return None;
    }

    let without_z = clean.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(without_z, EVERNOTE_DATE_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}

/// Accumulates records while the reader walks the element tree.
#[derive(Default)]
struct RecordBuilder {
    notes: Vec<NoteRecord>,
    note: Option<NoteRecord>,
    resource: Option<ResourceRecord>,
}

impl RecordBuilder {
    fn open(&mut self, name: &str, element: &BytesStart) {
        match name {
            "note" => self.note = Some(NoteRecord::default()),
            "resource" => self.resource = Some(ResourceRecord::default()),
            "data" => {
                if let Some(resource) = self.resource.as_mut() {
                    resource.encoding = attribute(element, "encoding");
                }
            }
            _ => {}
        }
    }

    /// `path` still ends with the element being closed.
    fn close(&mut self, path: &[String], text: &str) {
        let Some(name) = path.last().map(String::as_str) else {
            return;
        };
        let parent = path
            .len()
            .checked_sub(2)
            .map(|i| path[i].as_str())
            .unwrap_or_default();

        match (parent, name) {
            (_, "note") => {
                if let Some(note) = self.note.take() {
                    self.notes.push(note);
                }
            }
            (_, "resource") => {
                if let (Some(note), Some(resource)) = (self.note.as_mut(), self.resource.take()) {
                    note.resources.push(resource);
                }
            }
            ("resource", "data") => {
                if let Some(resource) = self.resource.as_mut() {
                    resource.data = text.to_string();
                }
            }
            ("resource", "mime") => {
                if let Some(resource) = self.resource.as_mut() {
                    resource.mime = text.trim().to_string();
                }
            }
            ("resource-attributes", "file-name") => {
                if let Some(resource) = self.resource.as_mut() {
                    resource.file_name = Some(text.to_string());
                }
            }
            ("resource-attributes", "source-url") => {
                if let Some(resource) = self.resource.as_mut() {
                    resource.source_url = Some(text.to_string());
                }
            }
            ("note-attributes", key) => {
                if let Some(note) = self.note.as_mut() {
                    note.attributes.push((key.to_string(), text.to_string()));
                }
            }
            ("note", field) => {
                if let Some(note) = self.note.as_mut() {
                    match field {
                        "title" => note.title = text.to_string(),
                        "created" => note.created = Some(text.to_string()),
                        "updated" => note.updated = Some(text.to_string()),
                        "content" => note.content = text.to_string(),
                        "tag" => note.tags.push(text.to_string()),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
}

fn element_name(element: &BytesStart) -> String {
    String::from_utf8_lossy(element.name().as_ref()).to_string()
}

fn attribute(element: &BytesStart, key: &str) -> Option<String> {
    element
        .try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Parse ENEX file and extract note records in document order
pub fn parse_enex(content: &str) -> Result<Vec<NoteRecord>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut builder = RecordBuilder::default();
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = element_name(e);
                builder.open(&name, e);
                path.push(name);
                text.clear();
            }
            Ok(Event::Empty(ref e)) => {
                let name = element_name(e);
                builder.open(&name, e);
                path.push(name);
                builder.close(&path, "");
                path.pop();
                text.clear();
            }
            Ok(Event::End(_)) => {
                builder.close(&path, &text);
                path.pop();
                text.clear();
            }
            Ok(Event::Text(e)) => {
                let unescaped = e
                    .unescape()
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                text.push_str(&unescaped);
            }
            Ok(Event::CData(e)) => {
                // Content is typically in CDATA
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ConvertError::Xml(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(builder.notes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE en-export SYSTEM "http://xml.evernote.com/pub/evernote-export3.dtd">
<en-export export-date="20230105T120000Z" application="Evernote" version="10.0">
  <note>
    <title>Trip &amp; Plans</title>
    <created>20230101T000000Z</created>
    <updated>20230102T101500Z</updated>
    <tag>travel</tag>
    <tag>todo</tag>
    <note-attributes>
      <author>someone</author>
      <source-url>https://example.com/trip</source-url>
    </note-attributes>
    <content><![CDATA[<?xml version="1.0" encoding="UTF-8"?><en-note><div>Hello</div></en-note>]]></content>
    <resource>
      <data encoding="base64">
aGVs
bG8=
      </data>
      <mime>image/png</mime>
      <resource-attributes>
        <file-name>image.png</file-name>
        <source-url>https://example.com/image.png</source-url>
      </resource-attributes>
    </resource>
  </note>
  <note>
    <title>Second</title>
    <content>&lt;en-note&gt;plain&lt;/en-note&gt;</content>
    <updated/>
  </note>
</en-export>"#;

    #[test]
    fn test_parse_evernote_date() {
        let date = parse_evernote_date("20231231T235959Z");
        assert!(date.is_some());

        let dt = date.unwrap();
        assert_eq!(dt.year(), 2023);
        assert_eq!(dt.month(), 12);
        assert_eq!(dt.day(), 31);
    }

    #[test]
    fn test_parse_evernote_date_rejects_garbage() {
        assert!(parse_evernote_date("yesterday").is_none());
        assert!(parse_evernote_date("").is_none());
        assert!(parse_evernote_date("2023-01-01T00:00:00Z").is_none());
    }

    #[test]
    fn test_parse_enex_notes_in_order() {
        let notes = parse_enex(SAMPLE).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].title, "Trip & Plans");
        assert_eq!(notes[1].title, "Second");
    }

    #[test]
    fn test_parse_enex_scalar_fields() {
        let notes = parse_enex(SAMPLE).unwrap();
        let note = &notes[0];
        assert_eq!(note.created.as_deref(), Some("20230101T000000Z"));
        assert_eq!(note.updated.as_deref(), Some("20230102T101500Z"));
        assert_eq!(note.tags, vec!["travel", "todo"]);
        assert!(note.content.contains("<div>Hello</div>"));

        // Escaped (non-CDATA) content is unescaped
        assert_eq!(notes[1].content, "<en-note>plain</en-note>");
        assert_eq!(notes[1].created, None);
        assert_eq!(notes[1].updated.as_deref(), Some(""));
    }

    #[test]
    fn test_parse_enex_attributes_keep_order() {
        let notes = parse_enex(SAMPLE).unwrap();
        assert_eq!(
            notes[0].attributes,
            vec![
                ("author".to_string(), "someone".to_string()),
                ("source-url".to_string(), "https://example.com/trip".to_string()),
            ]
        );
        assert!(notes[1].attributes.is_empty());
    }

    #[test]
    fn test_parse_enex_resource_fields() {
        let notes = parse_enex(SAMPLE).unwrap();
        let resource = &notes[0].resources[0];
        assert_eq!(resource.mime, "image/png");
        assert_eq!(resource.encoding.as_deref(), Some("base64"));
        assert_eq!(resource.file_name.as_deref(), Some("image.png"));
        assert_eq!(
            resource.source_url.as_deref(),
            Some("https://example.com/image.png")
        );
        assert!(resource.data.contains("aGVs"));
        // Resource source-url does not leak into note attributes
        assert_eq!(notes[0].attributes.len(), 2);
    }

    #[test]
    fn test_parse_enex_malformed_document() {
        let result = parse_enex("<en-export><note><title>x</note></en-export>");
        assert!(matches!(result, Err(ConvertError::Xml(_))));
    }
}
