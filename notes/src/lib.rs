//! Note access for Lodestone.
//!
//! This crate owns everything about reading a vault of plain-text notes:
//! walking the directory tree, parsing YAML front matter, extracting tags,
//! and fingerprinting files so callers can skip unchanged ones.
//!
//! ```text
//!   vault directory
//!        |
//!        v
//!   Vault::list  ->  [NoteRef { path, fingerprint, modified }]
//!        |
//!        v
//!   Vault::read  ->  Note { body, attributes, tags, fingerprint }
//! ```
//!
//! The [`NoteSource`] trait is the seam the indexing pipeline builds on;
//! [`Vault`] is its file system implementation.

pub mod error;
pub mod front_matter;
pub mod note;
pub mod source;
pub mod tags;
pub mod vault;

pub use error::{NoteError, Result};
pub use note::{Note, NoteRef, metadata_fingerprint};
pub use source::NoteSource;
pub use vault::{Vault, VaultConfig};
