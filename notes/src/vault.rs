//! File system vault.
//!
//! A [`Vault`] is a directory tree of plain-text notes. Scans skip hidden
//! entries and a configurable set of directories, and every path handed
//! out is vault-relative with forward slashes so it can double as a
//! stable identifier.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::{NoteError, Result};
use crate::note::{Note, NoteRef, metadata_fingerprint};
use crate::source::NoteSource;

/// Scanning rules for a vault directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// File extensions treated as notes.
    pub extensions: Vec<String>,
    /// Directory names skipped entirely during scans.
    pub excluded_dirs: Vec<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["md".to_string()],
            excluded_dirs: vec![
                ".git".to_string(),
                ".obsidian".to_string(),
                ".trash".to_string(),
                "node_modules".to_string(),
            ],
        }
    }
}

/// A directory of notes on the local file system.
#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
    config: VaultConfig,
}

impl Vault {
    /// Creates a vault rooted at `root` with default scanning rules.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: VaultConfig::default(),
        }
    }

    /// Replaces the scanning rules.
    pub fn with_config(mut self, config: VaultConfig) -> Self {
        self.config = config;
        self
    }

    /// The vault root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        // Depth 0 is the root itself, which may legitimately be hidden.
        if entry.depth() == 0 {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            return true;
        }
        entry.file_type().is_dir()
            && self
                .config
                .excluded_dirs
                .iter()
                .any(|dir| dir == name.as_ref())
    }

    fn has_note_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.config.extensions.iter().any(|allowed| allowed == ext))
    }

    /// Joins `path` onto the root, rejecting anything that could escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        if relative.is_absolute() {
            return Err(NoteError::OutsideVault(path.to_string()));
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => return Err(NoteError::OutsideVault(path.to_string())),
            }
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl NoteSource for Vault {
    async fn list(&self) -> Result<Vec<NoteRef>> {
        let mut refs = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();
        for entry in walker.filter_entry(|entry| !self.is_excluded(entry)) {
            let entry = entry?;
            if !entry.file_type().is_file() || !self.has_note_extension(entry.path()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let metadata = entry.metadata()?;
            let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
            refs.push(NoteRef {
                path: relative_key(relative),
                fingerprint: metadata_fingerprint(metadata.len(), modified),
                modified,
            });
        }
        debug!(count = refs.len(), root = %self.root.display(), "listed vault notes");
        Ok(refs)
    }

    async fn read(&self, path: &str) -> Result<Note> {
        let full = self.resolve(path)?;
        let metadata = match tokio::fs::metadata(&full).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(NoteError::NotFound(path.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        if !metadata.is_file() {
            return Err(NoteError::NotFound(path.to_string()));
        }
        let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
        let fingerprint = metadata_fingerprint(metadata.len(), modified);
        let content = tokio::fs::read_to_string(&full).await?;
        debug!(path, bytes = content.len(), "read note");
        Ok(Note::from_content(path, &content, fingerprint))
    }
}

/// Renders a relative path with forward slashes on every platform.
fn relative_key(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
