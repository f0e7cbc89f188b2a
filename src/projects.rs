//! Project discovery and archive ingestion.
//!
//! Every directory directly under the projects root is a project. A project
//! holding a `*.zip` upload gets a gallery (and the photographer an email),
//! then the archive is unpacked in place and removed.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::archive::{process_archive, ExtractionSummary};
use crate::db::Database;
use crate::error::validate_slug;
use crate::gallery::{GalleryProvisioner, Provisioned};
use crate::leases::ProjectLeases;

#[derive(Debug, Clone)]
pub enum ScanProgress {
    Started { total_projects: usize },
    Ingesting { slug: String, archive: PathBuf },
    Ingested { slug: String, files: usize },
    /// Another process holds or just finished this project.
    Busy { slug: String },
    Error { slug: String, message: String },
    Completed { projects: usize, ingested: usize, failed: usize },
}

/// One project whose archive was processed during a scan.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub slug: String,
    pub archive: PathBuf,
    pub gallery_id: i64,
    pub provisioned: Provisioned,
    pub extracted: ExtractionSummary,
}

#[derive(Debug, Clone)]
pub struct ScanFailure {
    pub slug: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Every project found, in name order.
    pub projects: Vec<String>,
    pub ingested: Vec<IngestOutcome>,
    /// Projects skipped because another process holds their lease.
    pub busy: Vec<String>,
    pub failures: Vec<ScanFailure>,
}

pub struct ProjectScanner<'a> {
    db: &'a Database,
    provisioner: GalleryProvisioner<'a>,
    leases: &'a ProjectLeases,
}

impl<'a> ProjectScanner<'a> {
    pub fn new(
        db: &'a Database,
        provisioner: GalleryProvisioner<'a>,
        leases: &'a ProjectLeases,
    ) -> Self {
        Self {
            db,
            provisioner,
            leases,
        }
    }

    /// List projects under `root_dir` and ingest any pending archives.
    ///
    /// A project that fails to ingest is reported in `ScanReport::failures`
    /// and keeps its archive for the next scan; the other projects proceed.
    pub fn scan_projects(
        &self,
        root_dir: &Path,
        progress_tx: Option<mpsc::Sender<ScanProgress>>,
    ) -> Result<ScanReport> {
        let projects = list_projects(root_dir)?;

        if let Some(ref tx) = progress_tx {
            let _ = tx.send(ScanProgress::Started {
                total_projects: projects.len(),
            });
        }

        let mut report = ScanReport::default();

        for slug in &projects {
            let project_dir = root_dir.join(slug);
            let Some(archive) = find_archive(&project_dir) else {
                continue;
            };

            info!("Found archive {} in project {}", archive.display(), slug);
            if let Some(ref tx) = progress_tx {
                let _ = tx.send(ScanProgress::Ingesting {
                    slug: slug.clone(),
                    archive: archive.clone(),
                });
            }

            match self.ingest_project(slug, &project_dir, &archive) {
                Ok(None) => {
                    info!("Project {} is being ingested elsewhere, skipping", slug);
                    if let Some(ref tx) = progress_tx {
                        let _ = tx.send(ScanProgress::Busy { slug: slug.clone() });
                    }
                    report.busy.push(slug.clone());
                }
                Ok(Some(outcome)) => {
                    if let Some(ref tx) = progress_tx {
                        let _ = tx.send(ScanProgress::Ingested {
                            slug: slug.clone(),
                            files: outcome.extracted.files,
                        });
                    }
                    report.ingested.push(outcome);
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    warn!("Failed to ingest project {}: {}", slug, message);
                    if let Some(ref tx) = progress_tx {
                        let _ = tx.send(ScanProgress::Error {
                            slug: slug.clone(),
                            message: message.clone(),
                        });
                    }
                    report.failures.push(ScanFailure {
                        slug: slug.clone(),
                        message,
                    });
                }
            }
        }

        if let Some(ref tx) = progress_tx {
            let _ = tx.send(ScanProgress::Completed {
                projects: projects.len(),
                ingested: report.ingested.len(),
                failed: report.failures.len(),
            });
        }

        report.projects = projects;
        Ok(report)
    }

    /// Provision the gallery, then unpack `archive` into `project_dir`.
    ///
    /// Runs under the project's lease and returns `Ok(None)` when another
    /// process holds it or has already consumed the archive. The gallery
    /// comes first so the archive is only consumed once the photographer
    /// has been told about it.
    pub fn ingest_project(
        &self,
        slug: &str,
        project_dir: &Path,
        archive: &Path,
    ) -> Result<Option<IngestOutcome>> {
        validate_slug(slug)?;

        let Some(_lease) = self.leases.try_acquire(self.db, slug)? else {
            return Ok(None);
        };

        // The previous holder may have consumed the archive already.
        if !archive.exists() {
            debug!("Archive {} was ingested by another process", archive.display());
            return Ok(None);
        }

        let (gallery, provisioned) = self
            .provisioner
            .ensure_gallery(slug)
            .with_context(|| format!("Failed to provision gallery for {}", slug))?;

        let extracted = process_archive(archive, project_dir)?;

        Ok(Some(IngestOutcome {
            slug: slug.to_string(),
            archive: archive.to_path_buf(),
            gallery_id: gallery.id,
            provisioned,
            extracted,
        }))
    }
}

/// Names of the directories directly under `root_dir`, sorted.
pub fn list_projects(root_dir: &Path) -> Result<Vec<String>> {
    if !root_dir.is_dir() {
        anyhow::bail!("Projects directory {} does not exist", root_dir.display());
    }

    let mut projects = Vec::new();
    for entry in WalkDir::new(root_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to read {}", root_dir.display()))?;
        if !entry.path().is_dir() {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) => projects.push(name.to_string()),
            None => warn!("Skipping project with non UTF-8 name: {:?}", entry.file_name()),
        }
    }

    Ok(projects)
}

/// The archive waiting in `project_dir`, if any.
///
/// Any file whose name contains `.zip` counts. With several candidates the
/// last in name order wins; the rest are picked up by later scans.
pub fn find_archive(project_dir: &Path) -> Option<PathBuf> {
    WalkDir::new(project_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.path().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().contains(".zip"))
        .map(|entry| entry.into_path())
        .last()
}
