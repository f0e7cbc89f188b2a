//! Gallery provisioning: token, record and "gallery created" email.

use anyhow::Result;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{Database, Gallery};
use crate::notify::{MailMessage, Mailer};
use crate::urls::UrlBuilder;

/// What `ensure_gallery` did for a slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    /// New record, photographer notified.
    Created,
    /// Record existed but its notification had failed before; sent now.
    Renotified,
    /// Record existed and was already announced; nothing sent.
    Existing,
}

pub struct GalleryProvisioner<'a> {
    db: &'a Database,
    mailer: &'a dyn Mailer,
    urls: &'a UrlBuilder,
    recipient: String,
    sender: String,
}

/// Unguessable access token: SHA-256 over 244 bits of randomness, hex encoded.
pub fn generate_token() -> String {
    let mut hasher = Sha256::new();
    hasher.update(Uuid::new_v4().as_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    format!("{:x}", hasher.finalize())
}

impl<'a> GalleryProvisioner<'a> {
    pub fn new(
        db: &'a Database,
        mailer: &'a dyn Mailer,
        urls: &'a UrlBuilder,
        recipient: &str,
        sender: &str,
    ) -> Self {
        Self {
            db,
            mailer,
            urls,
            recipient: recipient.to_string(),
            sender: sender.to_string(),
        }
    }

    /// Create the gallery for `slug` unless it already exists.
    ///
    /// The record is persisted before the email goes out. If sending fails
    /// the error is returned and the gallery stays un-notified, so the next
    /// call retries the notification instead of minting a second gallery.
    pub fn ensure_gallery(&self, slug: &str) -> Result<(Gallery, Provisioned)> {
        if let Some(gallery) = self.db.get_gallery(slug)? {
            if gallery.is_notified() {
                return Ok((gallery, Provisioned::Existing));
            }
            warn!("Gallery for {} was never announced, retrying notification", slug);
            let gallery = self.notify(gallery)?;
            return Ok((gallery, Provisioned::Renotified));
        }

        let gallery = self.insert_gallery(slug)?;
        let gallery = self.notify(gallery)?;
        Ok((gallery, Provisioned::Created))
    }

    /// Create and announce a gallery for `slug`.
    /// Fails if the slug already has one; use `ensure_gallery` when scanning.
    pub fn create_gallery(&self, slug: &str) -> Result<i64> {
        let gallery = self.insert_gallery(slug)?;
        Ok(self.notify(gallery)?.id)
    }

    fn insert_gallery(&self, slug: &str) -> Result<Gallery> {
        let token = generate_token();
        let id = self.db.insert_gallery(slug, &token)?;
        info!("Created gallery {} for project {}", id, slug);

        self.db
            .get_gallery(slug)?
            .ok_or_else(|| anyhow::anyhow!("Gallery {} vanished after insert", slug))
    }

    pub fn gallery_created_message(&self, gallery: &Gallery) -> MailMessage {
        let url = self.urls.gallery_url(&gallery.slug, &gallery.token);
        MailMessage {
            from: self.sender.clone(),
            to: self.recipient.clone(),
            subject: format!("Photoshoot \"{}\" created", gallery.slug),
            text: format!(
                "A new gallery has been created.\n\nProject: {}\nToken: {}\nLink: {}\n",
                gallery.slug, gallery.token, url
            ),
        }
    }

    fn notify(&self, gallery: Gallery) -> Result<Gallery> {
        let message = self.gallery_created_message(&gallery);
        self.mailer.send(&message)?;
        self.db.mark_gallery_notified(gallery.id)?;
        info!(
            "Notified {} about gallery {} via {}",
            self.recipient,
            gallery.slug,
            self.mailer.transport_name()
        );

        Ok(self.db.get_gallery(&gallery.slug)?.unwrap_or(gallery))
    }

    /// Does `token` open the gallery for `slug`?
    pub fn verify_access(&self, slug: &str, token: &str) -> Result<bool> {
        Ok(self.db.find_gallery_by_token(slug, token)?.is_some())
    }
}
