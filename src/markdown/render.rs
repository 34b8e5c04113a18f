//! ENML rendering
//!
//! Turns Evernote's ENML markup into Markdown or standalone HTML. Attachment
//! references (`<en-media hash="...">`) are resolved through a
//! [`ResourceResolver`] supplied by the caller, so the renderer never needs
//! to know where attachments end up on disk.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Maps an attachment hash found in the markup to the file name it was
/// written under.
///
/// Called zero or more times per render, in markup order.
pub trait ResourceResolver {
    fn resolve(&self, hash: &str, mime: &str) -> String;
}

/// Markup transformer seam. [`EnmlRenderer`] is the built-in implementation.
pub trait MarkupRenderer {
    fn to_markdown(&self, markup: &str, resolver: &dyn ResourceResolver) -> String;
    fn to_html(&self, markup: &str, resolver: &dyn ResourceResolver) -> String;
}

static XML_DECL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<\?xml[^>]*\?>").unwrap());
static DOCTYPE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<!DOCTYPE[^>]*>").unwrap());
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static EN_NOTE_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<en-note([^>]*)>").unwrap()
});
static EN_NOTE_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</en-note\s*>").unwrap()
});
static MEDIA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<en-media\b([^>]*?)/?>(?:\s*</en-media>)?").unwrap()
});
static TODO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<en-todo\b([^>]*?)/?>(?:\s*</en-todo>)?").unwrap()
});
static CRYPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<en-crypt\b[^>]*>.*?</en-crypt>").unwrap()
});
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([\w-]+)\s*=\s*"([^"]*)""#).unwrap()
});
static STYLE_SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(style|script)[^>]*>.*?</(style|script)>").unwrap()
});
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h([1-6])[^>]*>(.*?)</h[1-6]>").unwrap()
});
static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:b|strong)(?:\s[^>]*)?>(.*?)</(?:b|strong)>").unwrap()
});
static ITALIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:i|em)(?:\s[^>]*)?>(.*?)</(?:i|em)>").unwrap()
});
static STRIKE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:s|strike|del)(?:\s[^>]*)?>(.*?)</(?:s|strike|del)>").unwrap()
});
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<code(?:\s[^>]*)?>(.*?)</code>").unwrap()
});
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href="([^"]*)"[^>]*>(.*?)</a>"#).unwrap()
});
static BR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static HR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<hr[^>]*>").unwrap());
static LI_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<li(?:\s[^>]*)?>").unwrap());
static LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(ul|ol|li)(?:\s[^>]*)?>").unwrap()
});
static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?(div|p|blockquote|table|thead|tbody|tr|pre|section|article)(?:\s[^>]*)?>",
    )
    .unwrap()
});
static CELL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</t[dh]\s*>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static TRAILING_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)[ \t]+$").unwrap());
static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").unwrap());

/// Collapse every run of two or more blank lines into a single blank line.
///
/// Idempotent: a second pass never changes the output again.
pub fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUN_RE.replace_all(text, "\n\n").to_string()
}

fn attributes(raw: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(raw)
        .map(|caps| (caps[1].to_ascii_lowercase(), caps[2].to_string()))
        .collect()
}

fn attribute<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Drop the XML prolog and comments every ENML document carries.
fn strip_prolog(markup: &str) -> String {
    let text = XML_DECL_RE.replace_all(markup, "");
    let text = DOCTYPE_RE.replace_all(&text, "");
    COMMENT_RE.replace_all(&text, "").to_string()
}

/// Default ENML renderer, built on regular expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnmlRenderer;

impl EnmlRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl MarkupRenderer for EnmlRenderer {
    fn to_markdown(&self, markup: &str, resolver: &dyn ResourceResolver) -> String {
        let mut text = strip_prolog(markup);
        text = EN_NOTE_OPEN_RE.replace_all(&text, "").to_string();
        text = EN_NOTE_CLOSE_RE.replace_all(&text, "").to_string();
        text = STYLE_SCRIPT_RE.replace_all(&text, "").to_string();

        text = MEDIA_RE
            .replace_all(&text, |caps: &Captures| {
                let attrs = attributes(&caps[1]);
                let hash = attribute(&attrs, "hash").unwrap_or_default();
                let mime = attribute(&attrs, "type").unwrap_or_default();
                format!("![[{}]]", resolver.resolve(hash, mime))
            })
            .to_string();

        text = TODO_RE
            .replace_all(&text, |caps: &Captures| {
                let attrs = attributes(&caps[1]);
                if attribute(&attrs, "checked") == Some("true") {
                    "[x] "
                } else {
                    "[ ] "
                }
            })
            .to_string();
        text = CRYPT_RE.replace_all(&text, "[encrypted content]").to_string();

        text = HEADER_RE
            .replace_all(&text, |caps: &Captures| {
                let level: usize = caps[1].parse().unwrap_or(1);
                format!("\n\n{} {}\n\n", "#".repeat(level), caps[2].trim())
            })
            .to_string();
        text = BOLD_RE.replace_all(&text, "**$1**").to_string();
        text = ITALIC_RE.replace_all(&text, "*$1*").to_string();
        text = STRIKE_RE.replace_all(&text, "~~$1~~").to_string();
        text = CODE_RE.replace_all(&text, "`$1`").to_string();
        text = LINK_RE
            .replace_all(&text, |caps: &Captures| {
                let label = caps[2].trim();
                if label.is_empty() {
                    format!("<{}>", &caps[1])
                } else {
                    format!("[{}]({})", label, &caps[1])
                }
            })
            .to_string();

        text = BR_RE.replace_all(&text, "\n").to_string();
        text = HR_RE.replace_all(&text, "\n\n---\n\n").to_string();
        text = LI_RE.replace_all(&text, "\n- ").to_string();
        text = LIST_RE.replace_all(&text, "\n").to_string();
        text = CELL_RE.replace_all(&text, " | ").to_string();
        text = BLOCK_RE.replace_all(&text, "\n").to_string();

        // Remove remaining tags
        text = TAG_RE.replace_all(&text, "").to_string();

        // Decode HTML entities
        text = html_escape::decode_html_entities(&text)
            .replace('\u{a0}', " ");

        text = TRAILING_SPACE_RE.replace_all(&text, "").to_string();
        collapse_blank_lines(text.trim())
    }

    fn to_html(&self, markup: &str, resolver: &dyn ResourceResolver) -> String {
        let mut body = strip_prolog(markup);
        body = EN_NOTE_OPEN_RE.replace_all(&body, "<div$1>").to_string();
        body = EN_NOTE_CLOSE_RE.replace_all(&body, "</div>").to_string();

        body = MEDIA_RE
            .replace_all(&body, |caps: &Captures| {
                let attrs = attributes(&caps[1]);
                let hash = attribute(&attrs, "hash").unwrap_or_default();
                let mime = attribute(&attrs, "type").unwrap_or_default();
                let name = resolver.resolve(hash, mime);
                let name_attr = html_escape::encode_double_quoted_attribute(&name);

                if mime.starts_with("image/") {
                    let mut img = format!(r#"<img src="{}""#, name_attr);
                    for key in ["width", "height", "style"] {
                        if let Some(value) = attribute(&attrs, key) {
                            img.push_str(&format!(r#" {}="{}""#, key, value));
                        }
                    }
                    img.push_str(" />");
                    img
                } else {
                    format!(
                        r#"<a href="{}">{}</a>"#,
                        name_attr,
                        html_escape::encode_text(&name)
                    )
                }
            })
            .to_string();

        body = TODO_RE
            .replace_all(&body, |caps: &Captures| {
                let attrs = attributes(&caps[1]);
                if attribute(&attrs, "checked") == Some("true") {
                    r#"<input type="checkbox" checked disabled />"#
                } else {
                    r#"<input type="checkbox" disabled />"#
                }
            })
            .to_string();
        body = CRYPT_RE
            .replace_all(&body, "<span>[encrypted content]</span>")
            .to_string();

        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\" />\n</head>\n<body>\n{}\n</body>\n</html>\n",
            body.trim()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Resolves every hash to `<hash>.<ext>` and remembers the calls.
    #[derive(Default)]
    struct EchoResolver {
        calls: RefCell<Vec<(String, String)>>,
    }

    impl ResourceResolver for EchoResolver {
        fn resolve(&self, hash: &str, mime: &str) -> String {
            self.calls
                .borrow_mut()
                .push((hash.to_string(), mime.to_string()));
            let ext = mime.rsplit('/').next().unwrap_or("bin");
            format!("{}.{}", hash, ext)
        }
    }

    fn enml(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><!DOCTYPE en-note SYSTEM "http://xml.evernote.com/pub/enml2.dtd"><en-note>{}</en-note>"#,
            body
        )
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n \n\t\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb\nc"), "a\n\nb\nc");
    }

    #[test]
    fn test_collapse_blank_lines_idempotent() {
        let input = "one\n\n\n\ntwo\n \n \n \nthree\n\n\nfour\n";
        let once = collapse_blank_lines(input);
        assert_eq!(collapse_blank_lines(&once), once);
    }

    #[test]
    fn test_markdown_plain_text() {
        let renderer = EnmlRenderer::new();
        let md = renderer.to_markdown(&enml("Hello"), &EchoResolver::default());
        assert_eq!(md, "Hello");
    }

    #[test]
    fn test_markdown_blocks_and_inline() {
        let renderer = EnmlRenderer::new();
        let md = renderer.to_markdown(
            &enml("<h2>Title</h2><div><b>bold</b> and <i>italic</i></div><div><br/></div><div>next &amp; last</div>"),
            &EchoResolver::default(),
        );
        assert!(md.starts_with("## Title"));
        assert!(md.contains("**bold** and *italic*"));
        assert!(md.contains("next & last"));
        assert!(!md.contains("\n\n\n"));
    }

    #[test]
    fn test_markdown_lists_and_todos() {
        let renderer = EnmlRenderer::new();
        let md = renderer.to_markdown(
            &enml(r#"<ul><li>one</li><li>two</li></ul><div><en-todo checked="true"/>Done</div><div><en-todo checked="false"/>Not done</div>"#),
            &EchoResolver::default(),
        );
        assert!(md.contains("- one\n"));
        assert!(md.contains("- two"));
        assert!(md.contains("[x] Done"));
        assert!(md.contains("[ ] Not done"));
    }

    #[test]
    fn test_markdown_links() {
        let renderer = EnmlRenderer::new();
        let md = renderer.to_markdown(
            &enml(r#"<div><a href="https://example.com" target="_blank">site</a></div>"#),
            &EchoResolver::default(),
        );
        assert_eq!(md, "[site](https://example.com)");
    }

    #[test]
    fn test_markdown_media_uses_resolver() {
        let renderer = EnmlRenderer::new();
        let resolver = EchoResolver::default();
        let md = renderer.to_markdown(
            &enml(r#"<div><en-media type="image/png" hash="abc123"/></div><en-media hash="def456" type="application/pdf"></en-media>"#),
            &resolver,
        );
        assert!(md.contains("![[abc123.png]]"));
        assert!(md.contains("![[def456.pdf]]"));
        assert_eq!(
            resolver.calls.borrow().as_slice(),
            &[
                ("abc123".to_string(), "image/png".to_string()),
                ("def456".to_string(), "application/pdf".to_string()),
            ]
        );
    }

    #[test]
    fn test_markdown_does_not_touch_img_or_input_as_italic() {
        let renderer = EnmlRenderer::new();
        let md = renderer.to_markdown(
            &enml(r#"<div><img src="x.png"/>text<input type="text"/></div>"#),
            &EchoResolver::default(),
        );
        assert_eq!(md, "text");
    }

    #[test]
    fn test_html_document_shape() {
        let renderer = EnmlRenderer::new();
        let html = renderer.to_html(&enml("<div>Hello</div>"), &EchoResolver::default());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<meta charset=\"utf-8\" />"));
        assert!(html.contains("<div><div>Hello</div></div>"));
        assert!(!html.contains("<?xml"));
        assert!(!html.contains("en-note"));
    }

    #[test]
    fn test_html_media_and_todos() {
        let renderer = EnmlRenderer::new();
        let html = renderer.to_html(
            &enml(r#"<en-media type="image/png" hash="abc" width="20"/><en-media type="application/pdf" hash="doc"/><en-todo checked="true"/>"#),
            &EchoResolver::default(),
        );
        assert!(html.contains(r#"<img src="abc.png" width="20" />"#));
        assert!(html.contains(r#"<a href="doc.pdf">doc.pdf</a>"#));
        assert!(html.contains(r#"<input type="checkbox" checked disabled />"#));
    }
}
