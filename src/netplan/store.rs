//! Persistence for netplan documents.
//!
//! Every store reads and writes the whole document. There is no locking:
//! two processes reconciling the same file concurrently can lose updates,
//! so callers must ensure a single writer.

use super::document::{DocumentError, NetplanDocument};
use std::fs;
use std::path::{Path, PathBuf};

/// Where a netplan document is loaded from and saved to
pub trait DocumentStore {
    /// Human-readable location used in logs and errors
    fn location(&self) -> String;

    fn load(&self) -> Result<NetplanDocument, DocumentError>;

    fn save(&mut self, document: &NetplanDocument) -> Result<(), DocumentError>;
}

/// A netplan YAML file on disk
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for FileStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<NetplanDocument, DocumentError> {
        let content = fs::read_to_string(&self.path).map_err(|source| DocumentError::Read {
            location: self.location(),
            source,
        })?;
        NetplanDocument::from_yaml_str(&content, self.location())
    }

    fn save(&mut self, document: &NetplanDocument) -> Result<(), DocumentError> {
        let content = document.to_yaml_string()?;
        fs::write(&self.path, content).map_err(|source| DocumentError::Write {
            location: self.location(),
            source,
        })
    }
}

/// Keeps the document as YAML text in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    content: String,
    saves: usize,
}

impl MemoryStore {
    pub fn new(content: impl Into<String>) -> Self {
        MemoryStore {
            content: content.into(),
            saves: 0,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Number of times `save` has been called
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl DocumentStore for MemoryStore {
    fn location(&self) -> String {
        "<memory>".to_string()
    }

    fn load(&self) -> Result<NetplanDocument, DocumentError> {
        NetplanDocument::from_yaml_str(&self.content, self.location())
    }

    fn save(&mut self, document: &NetplanDocument) -> Result<(), DocumentError> {
        self.content = document.to_yaml_string()?;
        self.saves += 1;
        Ok(())
    }
}
