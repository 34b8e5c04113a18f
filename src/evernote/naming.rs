//! Collision-free file naming shared by every note and resource of one run.

use std::collections::HashSet;

/// Maximum length, in UTF-8 bytes, of a file name stem (extension excluded).
pub const MAX_NAME_LEN: usize = 100;

/// Maximum length, in UTF-8 bytes, of a whole file name. Most filesystems
/// reject anything longer.
pub const MAX_FILE_NAME_LEN: usize = 255;

/// Maximum length, in UTF-8 bytes, of an extension taken from a declared name.
pub const MAX_EXTENSION_LEN: usize = 16;

/// Replace characters that are unsafe in file names.
///
/// Whitespace becomes `_` too, so `My Note` turns into `My_Note`.
pub fn sanitize_filename(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() || c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

/// Cut `s` down to at most `max` bytes without splitting a character.
pub fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let end = s
        .char_indices()
        .take_while(|(idx, ch)| idx + ch.len_utf8() <= max)
        .last()
        .map_or(0, |(idx, ch)| idx + ch.len_utf8());
    &s[..end]
}

/// Split `name` into stem and extension. Leading-dot names have no extension.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

/// Bytes left for the stem once the longest extension and its dot are counted.
fn stem_budget(extensions: &[&str]) -> usize {
    let extension_len = extensions
        .iter()
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.len() + 1)
        .max()
        .unwrap_or(0);
    MAX_NAME_LEN.min(MAX_FILE_NAME_LEN.saturating_sub(extension_len))
}

fn join_name(stem: &str, extension: &str) -> String {
    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, extension)
    }
}

/// The set of file names already taken during one conversion run.
///
/// Names are only ever added. Allocation order decides who keeps the plain
/// name, so callers must allocate in document order.
#[derive(Debug, Clone, Default)]
pub struct NamingScope {
    used: HashSet<String>,
    order: Vec<String>,
}

impl NamingScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    /// Every allocated name, oldest first.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Allocate a free `stem.extension` name and record it.
    pub fn allocate(&mut self, stem: &str, extension: &str) -> String {
        let stem = self.allocate_stem(stem, &[extension]);
        join_name(&stem, extension)
    }

    /// Find a stem that is free with every one of `extensions` and record
    /// all of the resulting names.
    ///
    /// The stem is capped first, at [`MAX_NAME_LEN`] bytes or less if the
    /// longest extension would push the full name past [`MAX_FILE_NAME_LEN`].
    /// On collision `_1`, `_2`, ... is appended, shortening the stem further
    /// so the suffix still fits.
    pub fn allocate_stem(&mut self, stem: &str, extensions: &[&str]) -> String {
        let budget = stem_budget(extensions);
        let base = truncate_bytes(stem, budget);

        let mut candidate = base.to_string();
        let mut counter = 1usize;
        while !self.is_free(&candidate, extensions) {
            let suffix = format!("_{}", counter);
            let room = budget.saturating_sub(suffix.len());
            candidate = format!("{}{}", truncate_bytes(base, room), suffix);
            counter += 1;
        }

        if candidate != base {
            log::debug!("Name '{}' taken, using '{}'", base, candidate);
        }

        for extension in extensions {
            self.insert(join_name(&candidate, extension));
        }
        candidate
    }

    fn is_free(&self, stem: &str, extensions: &[&str]) -> bool {
        extensions
            .iter()
            .all(|ext| !self.used.contains(&join_name(stem, ext)))
    }

    fn insert(&mut self, name: String) {
        if self.used.insert(name.clone()) {
            self.order.push(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My Note"), "My_Note");
        assert_eq!(sanitize_filename(r#"a*b"c/d<e>f:g|h?i\j"#), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_filename("  padded  "), "padded");
        assert_eq!(sanitize_filename("Überblick"), "Überblick");
    }

    #[test]
    fn test_truncate_bytes_respects_char_boundaries() {
        assert_eq!(truncate_bytes("hello", 3), "hel");
        assert_eq!(truncate_bytes("hello", 10), "hello");
        // 'ä' is two bytes, '日' three
        assert_eq!(truncate_bytes("ääää", 5), "ää");
        assert_eq!(truncate_bytes("日本語", 8), "日本");
        assert_eq!(truncate_bytes("日本語", 2), "");
        assert_eq!(truncate_bytes("a😀", 4), "a");
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("image.png"), ("image", Some("png")));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", Some("gz")));
        assert_eq!(split_extension("README"), ("README", None));
        assert_eq!(split_extension(".hidden"), (".hidden", None));
        assert_eq!(split_extension("trailing."), ("trailing.", None));
    }

    #[test]
    fn test_allocate_unused_name_verbatim() {
        let mut scope = NamingScope::new();
        assert_eq!(scope.allocate("image", "png"), "image.png");
        assert!(scope.contains("image.png"));
    }

    #[test]
    fn test_allocate_suffixes_collisions_in_order() {
        let mut scope = NamingScope::new();
        assert_eq!(scope.allocate("image", "png"), "image.png");
        assert_eq!(scope.allocate("image", "png"), "image_1.png");
        assert_eq!(scope.allocate("image", "png"), "image_2.png");
        // A different extension is a different name
        assert_eq!(scope.allocate("image", "jpg"), "image.jpg");
        assert_eq!(
            scope.names(),
            &["image.png", "image_1.png", "image_2.png", "image.jpg"]
        );
    }

    #[test]
    fn test_allocate_skips_names_taken_by_suffix_lookalikes() {
        let mut scope = NamingScope::new();
        scope.allocate("image_1", "png");
        assert_eq!(scope.allocate("image", "png"), "image.png");
        assert_eq!(scope.allocate("image", "png"), "image_2.png");
    }

    #[test]
    fn test_allocate_truncates_before_suffixing() {
        let mut scope = NamingScope::new();
        let long = "x".repeat(MAX_NAME_LEN + 40);

        let first = scope.allocate(&long, "txt");
        assert_eq!(first, format!("{}.txt", "x".repeat(MAX_NAME_LEN)));

        let second = scope.allocate(&long, "txt");
        let (stem, ext) = split_extension(&second);
        assert_eq!(ext, Some("txt"));
        assert_eq!(stem.len(), MAX_NAME_LEN);
        assert!(stem.ends_with("_1"));
        assert!(!scope.contains(&format!("{}.txt", long)));
    }

    #[test]
    fn test_allocate_caps_multibyte_stems_in_bytes() {
        let mut scope = NamingScope::new();
        let long = "日".repeat(MAX_NAME_LEN);

        let first = scope.allocate(&long, "md");
        let (stem, _) = split_extension(&first);
        // 33 three-byte characters fit in 100 bytes
        assert_eq!(stem, "日".repeat(33));

        let second = scope.allocate(&long, "md");
        let (stem, _) = split_extension(&second);
        assert_eq!(stem, format!("{}_1", "日".repeat(32)));
        assert!(stem.len() <= MAX_NAME_LEN);
    }

    #[test]
    fn test_allocate_keeps_whole_name_within_limit() {
        let mut scope = NamingScope::new();
        let extension = "e".repeat(200);

        let name = scope.allocate(&"x".repeat(MAX_NAME_LEN), &extension);
        assert_eq!(name.len(), MAX_FILE_NAME_LEN);

        let name = scope.allocate(&"x".repeat(MAX_NAME_LEN), &extension);
        assert!(name.len() <= MAX_FILE_NAME_LEN);
        assert!(name.contains("_1."));
    }

    #[test]
    fn test_allocate_stem_for_several_extensions() {
        let mut scope = NamingScope::new();
        scope.allocate("note", "pdf");

        let stem = scope.allocate_stem("note", &["md", "pdf"]);
        assert_eq!(stem, "note_1");
        assert!(scope.contains("note_1.md"));
        assert!(scope.contains("note_1.pdf"));
        assert!(!scope.contains("note.md"));
    }

    #[test]
    fn test_allocate_without_extension() {
        let mut scope = NamingScope::new();
        assert_eq!(scope.allocate("LICENSE", ""), "LICENSE");
        assert_eq!(scope.allocate("LICENSE", ""), "LICENSE_1");
    }
}
