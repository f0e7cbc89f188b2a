//! Typed errors for the boundaries callers need to tell apart.
//!
//! Everything else flows through `anyhow::Result`.

use std::io;
use std::path::PathBuf;

/// Failure while unpacking a project archive.
///
/// Apart from `Io` raised while creating the derivative directories, the
/// source archive is still on disk when one of these is returned, so the
/// next scan retries it.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The archive could not be opened or its directory could not be read.
    #[error("failed to open archive {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// An entry would land outside the destination directory.
    #[error("archive entry '{name}' escapes the destination directory")]
    UnsafeEntry { name: String },

    /// An entry could not be read from the archive.
    #[error("failed to read archive entry {index}: {source}")]
    Entry {
        index: usize,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove archive {}: {source}", path.display())]
    RemoveArchive {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectError {
    /// Slugs are single path components; anything else could leave the root.
    #[error("invalid project slug: {0:?}")]
    InvalidSlug(String),

    #[error("invalid photo filename: {0:?}")]
    InvalidFilename(String),
}

/// Check that `slug` names a single directory directly below the root.
pub fn validate_slug(slug: &str) -> Result<(), ProjectError> {
    if is_single_component(slug) {
        Ok(())
    } else {
        Err(ProjectError::InvalidSlug(slug.to_string()))
    }
}

pub fn validate_filename(filename: &str) -> Result<(), ProjectError> {
    if is_single_component(filename) {
        Ok(())
    } else {
        Err(ProjectError::InvalidFilename(filename.to_string()))
    }
}

fn is_single_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_control)
}
