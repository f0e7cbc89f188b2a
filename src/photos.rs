//! Photo listing and selection for a single project.

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::db::{photo_hash, AcceptedStatus, Database};
use crate::error::{validate_filename, validate_slug};
use crate::thumbnails::{DerivativeSize, ThumbnailGenerator};
use crate::urls::UrlBuilder;

/// Extensions listed as photos. Matching is exact: `Jpg` is not a photo.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "png", "gif", "JPG", "PNG", "GIF"];

/// One photo as shown in a gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoDescriptor {
    pub full_path: PathBuf,
    pub filename: String,
    pub full_url: String,
    pub thumbnail: String,
    pub large: String,
    pub accepted: AcceptedStatus,
}

pub fn is_listed_image(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext))
}

pub struct PhotoLibrary<'a> {
    root_dir: &'a Path,
    db: &'a Database,
    thumbnails: &'a ThumbnailGenerator,
    urls: &'a UrlBuilder,
}

impl<'a> PhotoLibrary<'a> {
    pub fn new(
        root_dir: &'a Path,
        db: &'a Database,
        thumbnails: &'a ThumbnailGenerator,
        urls: &'a UrlBuilder,
    ) -> Self {
        Self {
            root_dir,
            db,
            thumbnails,
            urls,
        }
    }

    /// Photos directly inside the project directory, sorted by filename,
    /// generating missing derivatives on the way.
    ///
    /// Returns `Ok(None)` when the project does not exist. A photo whose
    /// derivatives cannot be produced is logged and left out.
    pub fn list_photos(&self, slug: &str) -> Result<Option<Vec<PhotoDescriptor>>> {
        if validate_slug(slug).is_err() {
            return Ok(None);
        }

        let project_dir = self.root_dir.join(slug);
        if !project_dir.is_dir() {
            return Ok(None);
        }

        let mut photos = Vec::new();
        for filename in list_image_files(&project_dir) {
            match self.thumbnails.ensure_all(&project_dir, &filename) {
                Ok(0) => {}
                Ok(generated) => {
                    debug!("Generated {} derivatives for {}/{}", generated, slug, filename)
                }
                Err(e) => {
                    warn!("Skipping {}/{}: {:#}", slug, filename, e);
                    continue;
                }
            }

            photos.push(PhotoDescriptor {
                full_path: project_dir.join(&filename),
                full_url: self.urls.photo_url(slug, &filename),
                thumbnail: self.urls.derivative_url(slug, DerivativeSize::Small, &filename),
                large: self.urls.derivative_url(slug, DerivativeSize::Large, &filename),
                accepted: self.get_accepted(&photo_hash(slug, &filename))?,
                filename,
            });
        }

        Ok(Some(photos))
    }

    /// Flip the accepted flag of a photo; the first toggle accepts it.
    /// Returns the new value.
    pub fn toggle_accepted(&self, slug: &str, filename: &str) -> Result<bool> {
        validate_slug(slug)?;
        validate_filename(filename)?;

        let accepted = self
            .db
            .toggle_accepted(&photo_hash(slug, filename), slug, filename)?;
        debug!("{}/{} accepted = {}", slug, filename, accepted);
        Ok(accepted)
    }

    /// `no` for photos that were never toggled.
    pub fn get_accepted(&self, hash: &str) -> Result<AcceptedStatus> {
        self.db.accepted_status(hash)
    }

    pub fn accepted_status(&self, slug: &str, filename: &str) -> Result<AcceptedStatus> {
        self.get_accepted(&photo_hash(slug, filename))
    }

    /// Filenames the photographer has accepted in `slug`.
    pub fn accepted_photos(&self, slug: &str) -> Result<Vec<String>> {
        validate_slug(slug)?;
        self.db.accepted_filenames(slug)
    }
}

fn list_image_files(project_dir: &Path) -> Vec<String> {
    WalkDir::new(project_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().to_str().map(String::from))
        .filter(|name| is_listed_image(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DerivativeConfig;
    use crate::thumbnails::testing::write_image;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        root: TempDir,
        db: Database,
        thumbnails: ThumbnailGenerator,
        urls: UrlBuilder,
    }

    impl Fixture {
        fn new() -> Self {
            let db = Database::open_in_memory().unwrap();
            db.initialize().unwrap();
            Self {
                root: tempdir().unwrap(),
                db,
                thumbnails: ThumbnailGenerator::new(&DerivativeConfig::default()),
                urls: UrlBuilder::new("http://localhost"),
            }
        }

        fn library(&self) -> PhotoLibrary<'_> {
            PhotoLibrary::new(self.root.path(), &self.db, &self.thumbnails, &self.urls)
        }

        fn project(&self, slug: &str) -> PathBuf {
            let dir = self.root.path().join(slug);
            fs::create_dir_all(&dir).unwrap();
            dir
        }
    }

    #[test]
    fn test_is_listed_image() {
        assert!(is_listed_image("a.jpg"));
        assert!(is_listed_image("c.PNG"));
        assert!(is_listed_image("archive.tar.gif"));
        assert!(!is_listed_image("b.txt"));
        assert!(!is_listed_image("mixed.Jpg"));
        assert!(!is_listed_image("photo.jpeg"));
        assert!(!is_listed_image("jpg"));
    }

    #[test]
    fn test_lists_only_whitelisted_images() {
        let fx = Fixture::new();
        let dir = fx.project("shoot");
        write_image(&dir.join("a.jpg"), 400, 300);
        fs::write(dir.join("b.txt"), "notes").unwrap();
        write_image(&dir.join("c.PNG"), 400, 300);

        let photos = fx.library().list_photos("shoot").unwrap().unwrap();
        let names: Vec<&str> = photos.iter().map(|p| p.filename.as_str()).collect();

        assert_eq!(names, vec!["a.jpg", "c.PNG"]);
        assert_eq!(photos[0].full_path, dir.join("a.jpg"));
        assert_eq!(photos[0].full_url, "http://localhost/projects/shoot/a.jpg");
        assert_eq!(photos[0].thumbnail, "http://localhost/projects/shoot/small/a.jpg");
        assert_eq!(photos[0].large, "http://localhost/projects/shoot/large/a.jpg");
        assert_eq!(photos[0].accepted, AcceptedStatus::No);
        assert!(dir.join("small/a.jpg").exists());
        assert!(dir.join("large/c.PNG").exists());
    }

    #[test]
    fn test_subdirectories_are_skipped() {
        let fx = Fixture::new();
        let dir = fx.project("shoot");
        fs::create_dir(dir.join("folder.jpg")).unwrap();
        write_image(&dir.join("a.jpg"), 50, 50);

        let photos = fx.library().list_photos("shoot").unwrap().unwrap();
        assert_eq!(photos.len(), 1);
        // Derivatives themselves are never listed.
        let photos = fx.library().list_photos("shoot").unwrap().unwrap();
        assert_eq!(photos.len(), 1);
    }

    #[test]
    fn test_second_listing_leaves_derivatives_untouched() {
        let fx = Fixture::new();
        let dir = fx.project("shoot");
        write_image(&dir.join("a.jpg"), 2000, 1500);

        fx.library().list_photos("shoot").unwrap().unwrap();
        let small = fs::read(dir.join("small/a.jpg")).unwrap();
        let large = fs::read(dir.join("large/a.jpg")).unwrap();

        fx.library().list_photos("shoot").unwrap().unwrap();
        assert_eq!(fs::read(dir.join("small/a.jpg")).unwrap(), small);
        assert_eq!(fs::read(dir.join("large/a.jpg")).unwrap(), large);
    }

    #[test]
    fn test_missing_project_is_none() {
        let fx = Fixture::new();
        assert!(fx.library().list_photos("nope").unwrap().is_none());
        assert!(fx.library().list_photos("../escape").unwrap().is_none());
    }

    #[test]
    fn test_broken_photo_is_skipped() {
        let fx = Fixture::new();
        let dir = fx.project("shoot");
        fs::write(dir.join("broken.jpg"), b"not a jpeg").unwrap();
        write_image(&dir.join("good.jpg"), 100, 100);

        let photos = fx.library().list_photos("shoot").unwrap().unwrap();
        let names: Vec<&str> = photos.iter().map(|p| p.filename.as_str()).collect();
        assert_eq!(names, vec!["good.jpg"]);
    }

    #[test]
    fn test_toggle_shows_up_in_listing() {
        let fx = Fixture::new();
        let dir = fx.project("shoot");
        write_image(&dir.join("a.jpg"), 64, 64);
        let library = fx.library();

        assert!(library.toggle_accepted("shoot", "a.jpg").unwrap());
        let photos = library.list_photos("shoot").unwrap().unwrap();
        assert_eq!(photos[0].accepted, AcceptedStatus::Yes);

        assert!(!library.toggle_accepted("shoot", "a.jpg").unwrap());
        assert!(library.toggle_accepted("shoot", "a.jpg").unwrap());
        assert_eq!(library.accepted_status("shoot", "a.jpg").unwrap(), AcceptedStatus::Yes);
    }

    #[test]
    fn test_get_accepted_by_hash() {
        let fx = Fixture::new();
        let library = fx.library();
        let hash = photo_hash("shoot", "a.jpg");

        assert_eq!(library.get_accepted(&hash).unwrap().as_str(), "no");
        library.toggle_accepted("shoot", "a.jpg").unwrap();
        assert_eq!(library.get_accepted(&hash).unwrap().as_str(), "yes");
    }

    #[test]
    fn test_toggle_rejects_path_like_input() {
        let fx = Fixture::new();
        assert!(fx.library().toggle_accepted("..", "a.jpg").is_err());
        assert!(fx.library().toggle_accepted("shoot", "x/a.jpg").is_err());
    }

    #[test]
    fn test_accepted_photos() {
        let fx = Fixture::new();
        let library = fx.library();
        library.toggle_accepted("shoot", "b.jpg").unwrap();
        library.toggle_accepted("shoot", "a.jpg").unwrap();

        assert_eq!(library.accepted_photos("shoot").unwrap(), vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_descriptor_json_keys() {
        let descriptor = PhotoDescriptor {
            full_path: PathBuf::from("/p/shoot/a.jpg"),
            filename: "a.jpg".to_string(),
            full_url: "u".to_string(),
            thumbnail: "t".to_string(),
            large: "l".to_string(),
            accepted: AcceptedStatus::No,
        };
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["fullPath"], "/p/shoot/a.jpg");
        assert_eq!(json["fullUrl"], "u");
        assert_eq!(json["accepted"], "no");
    }
}
