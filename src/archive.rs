//! Project archive unpacking.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::ExtractionError;
use crate::thumbnails::DerivativeSize;

/// What an extraction produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub files: usize,
    pub directories: usize,
}

/// Unpack `zip_path` into `dest_dir`, delete the archive, then make sure the
/// derivative directories exist.
///
/// Every entry name is checked before anything is written: a single entry
/// that would land outside `dest_dir` rejects the whole archive. On any
/// error the archive is left in place.
pub fn process_archive(
    zip_path: &Path,
    dest_dir: &Path,
) -> Result<ExtractionSummary, ExtractionError> {
    let file = File::open(zip_path).map_err(|e| ExtractionError::Open {
        path: zip_path.to_path_buf(),
        source: e.into(),
    })?;
    let mut archive = ZipArchive::new(file).map_err(|source| ExtractionError::Open {
        path: zip_path.to_path_buf(),
        source,
    })?;

    let entries = plan_entries(&mut archive)?;
    let summary = extract_entries(&mut archive, &entries, dest_dir)?;
    drop(archive);

    fs::remove_file(zip_path).map_err(|source| ExtractionError::RemoveArchive {
        path: zip_path.to_path_buf(),
        source,
    })?;

    ensure_derivative_dirs(dest_dir).map_err(|source| ExtractionError::Io {
        path: dest_dir.to_path_buf(),
        source,
    })?;

    info!(
        "Extracted {} files from {} into {}",
        summary.files,
        zip_path.display(),
        dest_dir.display()
    );

    Ok(summary)
}

/// Create `small/` and `large/` under `dir` if they are missing.
pub fn ensure_derivative_dirs(dir: &Path) -> io::Result<()> {
    for size in DerivativeSize::ALL {
        let path = dir.join(size.dir_name());
        if !path.is_dir() {
            fs::create_dir(&path)?;
        }
    }
    Ok(())
}

struct PlannedEntry {
    index: usize,
    relative: PathBuf,
    is_dir: bool,
}

fn plan_entries(archive: &mut ZipArchive<File>) -> Result<Vec<PlannedEntry>, ExtractionError> {
    let mut entries = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|source| ExtractionError::Entry { index, source })?;

        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ExtractionError::UnsafeEntry {
                name: entry.name().to_string(),
            })?;

        entries.push(PlannedEntry {
            index,
            relative,
            is_dir: entry.is_dir(),
        });
    }

    Ok(entries)
}

fn extract_entries(
    archive: &mut ZipArchive<File>,
    entries: &[PlannedEntry],
    dest_dir: &Path,
) -> Result<ExtractionSummary, ExtractionError> {
    let mut summary = ExtractionSummary::default();

    for planned in entries {
        let out_path = dest_dir.join(&planned.relative);
        let io_err = |source| ExtractionError::Io {
            path: out_path.clone(),
            source,
        };

        if planned.is_dir {
            fs::create_dir_all(&out_path).map_err(io_err)?;
            summary.directories += 1;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut entry = archive
            .by_index(planned.index)
            .map_err(|source| ExtractionError::Entry {
                index: planned.index,
                source,
            })?;
        let mut out = File::create(&out_path).map_err(io_err)?;
        io::copy(&mut entry, &mut out).map_err(io_err)?;

        debug!("Extracted {}", out_path.display());
        summary.files += 1;
    }

    Ok(summary)
}
