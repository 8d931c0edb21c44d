//! Note data types.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::front_matter;
use crate::tags;

/// A fully loaded note: body text plus parsed front matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Vault-relative path with forward slashes, e.g. `projects/alpha.md`.
    pub path: String,
    /// Body text after the front matter block.
    pub body: String,
    /// Front matter attributes. Empty when the block is missing or malformed.
    pub attributes: BTreeMap<String, Value>,
    /// Sorted union of front matter and inline tags.
    pub tags: Vec<String>,
    /// Fingerprint of the backing file at read time.
    pub fingerprint: String,
}

impl Note {
    /// Builds a note from raw file content, parsing front matter and tags.
    pub fn from_content(
        path: impl Into<String>,
        content: &str,
        fingerprint: impl Into<String>,
    ) -> Self {
        let (attributes, body) = front_matter::parse(content);
        let tags = tags::extract(body, &attributes);
        Self {
            path: path.into(),
            body: body.to_string(),
            attributes,
            tags,
            fingerprint: fingerprint.into(),
        }
    }
}

/// A lightweight listing entry: enough to decide whether a note needs
/// re-reading without opening the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRef {
    /// Vault-relative path with forward slashes.
    pub path: String,
    /// Fingerprint derived from file metadata.
    pub fingerprint: String,
    /// Last modification time, when the file system reports one.
    pub modified: Option<DateTime<Utc>>,
}

/// Derives a compact fingerprint from file metadata.
///
/// Size and modification time are enough to detect edits without reading
/// the file; the fingerprint changes whenever either does.
pub fn metadata_fingerprint(size: u64, modified: Option<DateTime<Utc>>) -> String {
    let mut hasher = DefaultHasher::new();
    size.hash(&mut hasher);
    if let Some(modified) = modified {
        modified.timestamp_millis().hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn from_content_parses_attributes_and_tags() {
        let content = "---\ntitle: Alpha\ntags: [work]\n---\nBody with #inline tag.\n";
        let note = Note::from_content("projects/alpha.md", content, "abc123");

        assert_eq!(note.path, "projects/alpha.md");
        assert_eq!(note.body, "Body with #inline tag.\n");
        assert_eq!(note.attributes.get("title"), Some(&Value::from("Alpha")));
        assert_eq!(note.tags, vec!["inline", "work"]);
        assert_eq!(note.fingerprint, "abc123");
    }

    #[test]
    fn plain_content_becomes_the_body() {
        let note = Note::from_content("plain.md", "Just text.\n", "f");

        assert!(note.attributes.is_empty());
        assert!(note.tags.is_empty());
        assert_eq!(note.body, "Just text.\n");
    }

    #[test]
    fn fingerprint_is_stable_for_identical_metadata() {
        let modified = Some(Utc::now());
        assert_eq!(
            metadata_fingerprint(42, modified),
            metadata_fingerprint(42, modified),
        );
    }

    #[test]
    fn fingerprint_changes_with_size_or_mtime() {
        let modified = Some(Utc::now());
        let base = metadata_fingerprint(42, modified);

        assert_ne!(base, metadata_fingerprint(43, modified));
        assert_ne!(base, metadata_fingerprint(42, None));
    }

    #[test]
    fn fingerprint_is_sixteen_hex_chars() {
        let fingerprint = metadata_fingerprint(7, None);
        assert_eq!(fingerprint.len(), 16);
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
