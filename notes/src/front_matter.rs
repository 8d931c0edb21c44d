//! YAML front matter parsing.
//!
//! Notes may open with a `---`-delimited YAML block carrying arbitrary
//! attributes. Parsing is forgiving: anything that is not a well-formed
//! mapping simply yields no attributes, never an error.

use std::collections::BTreeMap;

use serde_yaml::Value;
use tracing::warn;

/// Splits `content` into front matter attributes and the note body.
///
/// The front matter block must start on the first line and be closed by a
/// line consisting of `---`. Malformed YAML and unterminated blocks are
/// ignored: the attributes come back empty and the body is the entire
/// content. A block that parses to something other than a mapping (a bare
/// scalar, a list) also yields no attributes, but the body still starts
/// after the closing delimiter.
pub fn parse(content: &str) -> (BTreeMap<String, Value>, &str) {
    let Some(rest) = after_opening(content) else {
        return (BTreeMap::new(), content);
    };
    let Some((block, body)) = split_at_terminator(rest) else {
        warn!("front matter opened but never closed; treating it as body text");
        return (BTreeMap::new(), content);
    };
    let body = body.trim_start_matches('\n');
    if block.trim().is_empty() {
        return (BTreeMap::new(), body);
    }
    match serde_yaml::from_str::<Value>(block) {
        Ok(Value::Mapping(mapping)) => {
            let attributes = mapping
                .into_iter()
                .filter_map(|(key, value)| key.as_str().map(|key| (key.to_string(), value)))
                .collect();
            (attributes, body)
        }
        Ok(_) => (BTreeMap::new(), body),
        Err(err) => {
            warn!("malformed front matter ignored: {err}");
            (BTreeMap::new(), content)
        }
    }
}

/// Returns the text after the opening `---` line, or `None` when the
/// content does not open a front matter block.
fn after_opening(content: &str) -> Option<&str> {
    let rest = content.strip_prefix("---")?;
    let rest = rest.strip_prefix('\r').unwrap_or(rest);
    rest.strip_prefix('\n')
}

/// Splits the remainder at the first line consisting of `---`.
fn split_at_terminator(rest: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\n', '\r']) == "---" {
            let body_start = offset + line.len();
            return Some((&rest[..offset], &rest[body_start..]));
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_a_mapping_block() {
        let content = "---\ntitle: Alpha\ncount: 3\n---\n\nBody text.\n";
        let (attributes, body) = parse(content);

        assert_eq!(attributes.get("title"), Some(&Value::from("Alpha")));
        assert_eq!(attributes.get("count"), Some(&Value::from(3)));
        assert_eq!(body, "Body text.\n");
    }

    #[test]
    fn content_without_front_matter_passes_through() {
        let content = "No delimiters here.\n";
        let (attributes, body) = parse(content);

        assert!(attributes.is_empty());
        assert_eq!(body, content);
    }

    #[test]
    fn malformed_yaml_keeps_the_entire_content() {
        let content = "---\ntags: [alpha, beta\n---\nBody\n";
        let (attributes, body) = parse(content);

        assert!(attributes.is_empty());
        assert_eq!(body, content, "a broken block should not eat the body");
    }

    #[test]
    fn unterminated_block_keeps_the_entire_content() {
        let content = "---\ntitle: open\nno terminator after this";
        let (attributes, body) = parse(content);

        assert!(attributes.is_empty());
        assert_eq!(body, content);
    }

    #[test]
    fn scalar_block_yields_no_attributes() {
        let content = "---\njust a sentence\n---\nBody\n";
        let (attributes, body) = parse(content);

        assert!(attributes.is_empty());
        assert_eq!(body, "Body\n", "body still starts after the terminator");
    }

    #[test]
    fn empty_block_yields_no_attributes() {
        let (attributes, body) = parse("---\n---\nBody\n");

        assert!(attributes.is_empty());
        assert_eq!(body, "Body\n");
    }

    #[test]
    fn handles_crlf_line_endings() {
        let content = "---\r\ntitle: crlf\r\n---\r\nBody\r\n";
        let (attributes, body) = parse(content);

        assert_eq!(attributes.get("title"), Some(&Value::from("crlf")));
        assert_eq!(body, "Body\r\n");
    }

    #[test]
    fn a_dash_run_that_is_not_a_delimiter_is_body() {
        let content = "----\nnot front matter\n";
        let (attributes, body) = parse(content);

        assert!(attributes.is_empty());
        assert_eq!(body, content);
    }
}
