//! Splits note bodies into bounded chunks for embedding.
//!
//! Chunking runs in three passes:
//!
//! 1. Split on markdown headings (`#` through `######`), so every chunk
//!    knows the heading of the section it came from.
//! 2. Within a section, greedily pack whole paragraphs up to the size
//!    limit, joining them with blank lines.
//! 3. A paragraph too large on its own falls back to word packing, and a
//!    single word longer than the limit is hard-split at the limit.
//!
//! All sizes are counted in characters, not bytes, so multibyte text can
//! never be split inside a code point. Chunking is pure text
//! transformation; it does no IO.

use serde::{Deserialize, Serialize};

/// Chunking parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Upper bound on chunk length, in characters.
    pub max_chars: usize,

    /// Overlap window, in characters. The packer itself is greedy and
    /// non-overlapping; this knob is carried for callers that re-window
    /// chunk boundaries as a post-pass.
    pub overlap: usize,
}

impl ChunkerConfig {
    /// Sets the chunk length bound.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Sets the overlap window.
    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: 500,
            overlap: 50,
        }
    }
}

/// A bounded piece of note text, tagged with its section heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Heading of the enclosing section; empty for text before the first
    /// heading or in notes without headings.
    pub heading: String,

    /// The chunk text.
    pub text: String,
}

/// Splits text into chunks according to a [`ChunkerConfig`].
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Creates a chunker with the given configuration.
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Splits `text` into chunks in document order.
    ///
    /// Empty or whitespace-only input produces no chunks. Concatenating
    /// the returned texts reproduces the input body up to whitespace
    /// normalization at the split points.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let max_chars = self.config.max_chars.max(1);
        let mut chunks = Vec::new();
        for section in split_sections(text) {
            for piece in pack_section(&section.content, max_chars) {
                chunks.push(Chunk {
                    heading: section.heading.clone(),
                    text: piece,
                });
            }
        }
        chunks
    }
}

struct Section {
    heading: String,
    content: String,
}

/// Splits text on markdown heading lines. Content before the first
/// heading becomes a section with an empty heading.
fn split_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut heading = String::new();
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        if let Some(title) = heading_title(line) {
            push_section(&mut sections, &heading, &lines);
            lines.clear();
            heading = title.to_string();
        } else {
            lines.push(line);
        }
    }
    push_section(&mut sections, &heading, &lines);
    sections
}

fn push_section(sections: &mut Vec<Section>, heading: &str, lines: &[&str]) {
    let content = lines.join("\n");
    if content.trim().is_empty() {
        return;
    }
    sections.push(Section {
        heading: heading.to_string(),
        content,
    });
}

/// Returns the title of a markdown heading line: one to six `#` marks,
/// a space, then non-empty text. Anything else is body text, including
/// `#tag` tokens, which have no space after the hash.
fn heading_title(line: &str) -> Option<&str> {
    let hashes = line.bytes().take_while(|byte| *byte == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let title = line[hashes..].strip_prefix(' ')?.trim();
    if title.is_empty() { None } else { Some(title) }
}

/// Greedily packs a section's paragraphs into pieces of at most
/// `max_chars` characters.
fn pack_section(content: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;
    for paragraph in content.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        let paragraph_chars = paragraph.chars().count();
        if paragraph_chars > max_chars {
            flush(&mut pieces, &mut current, &mut current_chars);
            pieces.extend(pack_words(paragraph, max_chars));
            continue;
        }
        let separator = if current.is_empty() { 0 } else { 2 };
        if current_chars + separator + paragraph_chars > max_chars {
            flush(&mut pieces, &mut current, &mut current_chars);
        }
        if !current.is_empty() {
            current.push_str("\n\n");
            current_chars += 2;
        }
        current.push_str(paragraph);
        current_chars += paragraph_chars;
    }
    flush(&mut pieces, &mut current, &mut current_chars);
    pieces
}

/// Packs the words of an oversize paragraph. A word longer than the
/// limit is the one case where a split lands mid-word.
fn pack_words(paragraph: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;
    for word in paragraph.split_whitespace() {
        let word_chars = word.chars().count();
        if word_chars > max_chars {
            flush(&mut pieces, &mut current, &mut current_chars);
            pieces.extend(split_word(word, max_chars));
            continue;
        }
        let separator = usize::from(!current.is_empty());
        if current_chars + separator + word_chars > max_chars {
            flush(&mut pieces, &mut current, &mut current_chars);
        }
        if !current.is_empty() {
            current.push(' ');
            current_chars += 1;
        }
        current.push_str(word);
        current_chars += word_chars;
    }
    flush(&mut pieces, &mut current, &mut current_chars);
    pieces
}

/// Hard-splits a single word at `max_chars` character boundaries.
fn split_word(word: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut count = 0usize;
    for ch in word.chars() {
        if count == max_chars {
            pieces.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn flush(pieces: &mut Vec<String>, current: &mut String, current_chars: &mut usize) {
    if !current.is_empty() {
        pieces.push(std::mem::take(current));
        *current_chars = 0;
    }
}
