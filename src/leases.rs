//! Project leases.
//!
//! Ingestion creates the gallery, sends the email and consumes the archive.
//! Two processes doing that for the same project (the daemon and a manual
//! `proofer scan`) would send the email twice and fight over the archive,
//! so every ingestion runs under a lease row in the shared database.

use anyhow::Result;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::Database;

/// Hands out leases under one holder id per process.
#[derive(Debug, Clone)]
pub struct ProjectLeases {
    holder: String,
    stale_after_secs: u64,
}

impl ProjectLeases {
    pub fn new(stale_after_secs: u64) -> Self {
        Self {
            holder: format!("{}:{}", std::process::id(), Uuid::new_v4().simple()),
            stale_after_secs,
        }
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Lease `slug`, or `None` while another holder has it.
    pub fn try_acquire<'a>(
        &self,
        db: &'a Database,
        slug: &str,
    ) -> Result<Option<ProjectLease<'a>>> {
        if !db.try_acquire_lease(slug, &self.holder, self.stale_after_secs)? {
            debug!("Project {} is leased by another process", slug);
            return Ok(None);
        }
        Ok(Some(ProjectLease {
            db,
            slug: slug.to_string(),
            holder: self.holder.clone(),
        }))
    }
}

/// Held lease; released on drop.
#[derive(Debug)]
pub struct ProjectLease<'a> {
    db: &'a Database,
    slug: String,
    holder: String,
}

impl Drop for ProjectLease<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.db.release_lease(&self.slug, &self.holder) {
            // Left to expire after the stale timeout.
            warn!("Failed to release lease on {}: {:#}", self.slug, e);
        }
    }
}
