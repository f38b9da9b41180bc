use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::io::atomic::atomic_write;
use crate::io::progress_store::ProgressStore;
use crate::model::config::MatchingConfig;
use crate::model::document::{Document, SourceFormat};
use crate::model::id::path_identity;
use crate::ops::reconcile::{Reconciled, reconcile};
use crate::parse::{ParseError, decode_source, parse};

/// Error type for checklist file I/O
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not decode {path}: {source}")]
    DecodeError { path: PathBuf, source: ParseError },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Everything a (re)load produces, before it is applied to a document
#[derive(Debug)]
pub struct LoadedSource {
    pub path: PathBuf,
    pub source: String,
    pub format: SourceFormat,
    pub reconciled: Reconciled,
}

/// Result of writing edited text back to a checklist file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Content already matched
    Unchanged,
    /// The file no longer holds the text we expected; nothing was written
    Conflict,
}

/// Canonical absolute path, the basis of the file's progress key.
pub fn absolute_path(path: &Path) -> Result<PathBuf, DocumentError> {
    fs::canonicalize(path).map_err(|e| DocumentError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Display name for a checklist file
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn read_source(path: &Path) -> Result<(String, SourceFormat), DocumentError> {
    let bytes = fs::read(path).map_err(|e| DocumentError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    decode_source(&bytes).map_err(|e| DocumentError::DecodeError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read, parse and reconcile a checklist file against its saved progress.
pub fn load_source(
    path: &Path,
    store: &ProgressStore,
    policy: &MatchingConfig,
) -> Result<LoadedSource, DocumentError> {
    let path = absolute_path(path)?;
    let (source, format) = read_source(&path)?;
    let items = parse(&source);
    let snapshot = store.load(&path_identity(&path));
    let reconciled = reconcile(items, snapshot.as_ref(), policy);
    info!(
        path = %path.display(),
        items = reconciled.items.len(),
        reused = reconciled.reused,
        "loaded checklist"
    );
    Ok(LoadedSource {
        path,
        source,
        format,
        reconciled,
    })
}

pub fn load_document(
    path: &Path,
    store: &ProgressStore,
    policy: &MatchingConfig,
) -> Result<Document, DocumentError> {
    Ok(document_from(load_source(path, store, policy)?))
}

pub fn document_from(loaded: LoadedSource) -> Document {
    Document::from_reconciled(display_name(&loaded.path), loaded.reconciled).with_source(
        loaded.path,
        loaded.source,
        loaded.format,
    )
}

/// Replace `expected` with `content` in the file at `path`, unless the file
/// was changed by someone else in the meantime.
pub fn write_back(path: &Path, expected: &str, content: &str) -> Result<WriteOutcome, DocumentError> {
    let current = fs::read(path).map_err(|e| DocumentError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    if current != expected.as_bytes() {
        return Ok(WriteOutcome::Conflict);
    }
    if content == expected {
        return Ok(WriteOutcome::Unchanged);
    }
    atomic_write(path, content.as_bytes()).map_err(|e| DocumentError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(WriteOutcome::Written)
}
