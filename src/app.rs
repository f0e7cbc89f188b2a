use anyhow::Result;
use std::sync::mpsc;
use tracing::info;

use crate::config::Config;
use crate::db::Database;
use crate::gallery::GalleryProvisioner;
use crate::leases::ProjectLeases;
use crate::notify::{create_mailer, Mailer};
use crate::photos::PhotoLibrary;
use crate::projects::{ProjectScanner, ScanProgress, ScanReport};
use crate::thumbnails::ThumbnailGenerator;
use crate::urls::UrlBuilder;

/// Everything the components need, built once from a `Config`.
///
/// One `App` per process; processes coordinate through the database.
pub struct App {
    pub config: Config,
    pub db: Database,
    mailer: Box<dyn Mailer>,
    urls: UrlBuilder,
    thumbnails: ThumbnailGenerator,
    leases: ProjectLeases,
}

impl App {
    /// Open the database at the configured path and build the mail transport.
    pub fn new(config: Config) -> Result<Self> {
        let db = Database::open(config.db_path())?;
        db.initialize()?;
        let mailer = create_mailer(&config.mail);
        info!(
            "Projects at {}, mail via {}",
            config.projects.root_dir.display(),
            mailer.transport_name()
        );
        Ok(Self::with_parts(config, db, mailer))
    }

    pub fn with_parts(config: Config, db: Database, mailer: Box<dyn Mailer>) -> Self {
        Self {
            urls: UrlBuilder::new(&config.projects.base_url),
            thumbnails: ThumbnailGenerator::new(&config.derivatives),
            leases: ProjectLeases::new(config.projects.lease_timeout),
            config,
            db,
            mailer,
        }
    }

    pub fn provisioner(&self) -> GalleryProvisioner<'_> {
        GalleryProvisioner::new(
            &self.db,
            self.mailer.as_ref(),
            &self.urls,
            &self.config.mail.recipient,
            &self.config.mail.sender,
        )
    }

    pub fn scanner(&self) -> ProjectScanner<'_> {
        ProjectScanner::new(&self.db, self.provisioner(), &self.leases)
    }

    pub fn library(&self) -> PhotoLibrary<'_> {
        PhotoLibrary::new(
            &self.config.projects.root_dir,
            &self.db,
            &self.thumbnails,
            &self.urls,
        )
    }

    /// One pass over the configured projects directory.
    pub fn scan(&self, progress_tx: Option<mpsc::Sender<ScanProgress>>) -> Result<ScanReport> {
        self.scanner()
            .scan_projects(&self.config.projects.root_dir, progress_tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::testing::write_zip;
    use crate::config::MailTransport;
    use crate::db::AcceptedStatus;
    use crate::thumbnails::testing::write_image;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_upload_to_selection() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.database.sqlite_path = dir.path().join("data/proofer.db");
        config.projects.root_dir = dir.path().join("projects");
        config.projects.base_url = "https://proofs.example.com/".to_string();
        config.mail.transport = MailTransport::Outbox;
        config.mail.outbox_dir = dir.path().join("outbox");

        // Build an upload holding one real photo.
        let scratch = dir.path().join("scratch.jpg");
        write_image(&scratch, 1600, 900);
        let photo = fs::read(&scratch).unwrap();
        let project = config.projects.root_dir.join("smith-wedding");
        fs::create_dir_all(&project).unwrap();
        write_zip(&project.join("upload.zip"), &[("a.jpg", photo.as_slice())]);

        let app = App::new(config).unwrap();
        let report = app.scan(None).unwrap();
        assert_eq!(report.ingested.len(), 1);

        let outbox: Vec<_> = fs::read_dir(dir.path().join("outbox"))
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(outbox.len(), 1);
        let mail = fs::read_to_string(outbox[0].path()).unwrap();
        let gallery = app.db.get_gallery("smith-wedding").unwrap().unwrap();
        assert!(mail.contains(&format!(
            "https://proofs.example.com/project/smith-wedding/{}",
            gallery.token
        )));

        let photos = app.library().list_photos("smith-wedding").unwrap().unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(
            photos[0].thumbnail,
            "https://proofs.example.com/projects/smith-wedding/small/a.jpg"
        );
        assert!(project.join("small/a.jpg").exists());

        app.library().toggle_accepted("smith-wedding", "a.jpg").unwrap();
        assert_eq!(
            app.library().accepted_status("smith-wedding", "a.jpg").unwrap(),
            AcceptedStatus::Yes
        );
    }
}
