//! Tag extraction.

use std::collections::{BTreeMap, BTreeSet};

use regex_lite::Regex;
use serde_yaml::Value;

/// Inline tags: `#word` at the start of the text or after whitespace.
const INLINE_TAG_PATTERN: &str = r"(?:^|\s)#([a-zA-Z][a-zA-Z0-9_/-]*)";

/// Collects the tags of a note.
///
/// Tags come from two places: the `tags` front matter attribute (a list of
/// scalars or a single string) and inline `#tag` tokens in the body. The
/// union is deduplicated and sorted; tag case is preserved as written.
pub fn extract(body: &str, attributes: &BTreeMap<String, Value>) -> Vec<String> {
    let mut tags = BTreeSet::new();

    if let Some(value) = attributes.get("tags") {
        match value {
            Value::Sequence(items) => {
                for item in items {
                    if let Some(tag) = scalar_to_string(item) {
                        tags.insert(tag);
                    }
                }
            }
            Value::String(tag) => {
                tags.insert(tag.clone());
            }
            _ => {}
        }
    }

    if let Ok(re) = Regex::new(INLINE_TAG_PATTERN) {
        for capture in re.captures_iter(body) {
            if let Some(tag) = capture.get(1) {
                tags.insert(tag.as_str().to_string());
            }
        }
    }

    tags.into_iter().collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
