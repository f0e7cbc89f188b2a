//! Per-photo accepted flag.
//!
//! Rows are keyed by `md5("{slug}/{filename}")`. A missing row reads as
//! "not accepted"; the first toggle therefore creates the row as accepted.

use anyhow::Result;
use md5::{Digest, Md5};
use rusqlite::OptionalExtension;
use serde::Serialize;
use std::fmt;

use super::Database;

/// Accepted flag as presented to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceptedStatus {
    Yes,
    No,
}

impl AcceptedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcceptedStatus::Yes => "yes",
            AcceptedStatus::No => "no",
        }
    }
}

impl From<bool> for AcceptedStatus {
    fn from(accepted: bool) -> Self {
        if accepted {
            AcceptedStatus::Yes
        } else {
            AcceptedStatus::No
        }
    }
}

impl fmt::Display for AcceptedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lookup key for a photo's status row.
pub fn photo_hash(slug: &str, filename: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(format!("{}/{}", slug, filename).as_bytes());
    format!("{:x}", hasher.finalize())
}

impl Database {
    /// Stored flag, or `None` when the photo has never been toggled.
    pub fn get_accepted(&self, hash: &str) -> Result<Option<bool>> {
        let accepted = self
            .conn()
            .query_row(
                "SELECT accepted FROM photo_status WHERE hash = ?",
                [hash],
                |row| row.get::<_, bool>(0),
            )
            .optional()?;
        Ok(accepted)
    }

    pub fn accepted_status(&self, hash: &str) -> Result<AcceptedStatus> {
        Ok(self.get_accepted(hash)?.unwrap_or(false).into())
    }

    /// Flip the flag for `hash`, creating it as accepted on first use.
    /// Returns the new value.
    pub fn toggle_accepted(&self, hash: &str, slug: &str, filename: &str) -> Result<bool> {
        let accepted = self.conn().query_row(
            r#"
            INSERT INTO photo_status (hash, slug, filename, accepted)
            VALUES (?1, ?2, ?3, 1)
            ON CONFLICT(hash) DO UPDATE SET
                accepted = NOT photo_status.accepted,
                slug = COALESCE(photo_status.slug, excluded.slug),
                filename = COALESCE(photo_status.filename, excluded.filename),
                updated_at = CURRENT_TIMESTAMP
            RETURNING accepted
            "#,
            rusqlite::params![hash, slug, filename],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(accepted)
    }

    /// Filenames currently accepted in a project, sorted.
    pub fn accepted_filenames(&self, slug: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT filename FROM photo_status WHERE slug = ? AND accepted = 1 AND filename IS NOT NULL ORDER BY filename",
        )?;
        let filenames = stmt
            .query_map([slug], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(filenames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_photo_hash_is_md5_of_path() {
        let hash = photo_hash("shoot", "a.jpg");
        assert_eq!(hash.len(), 32);
        assert_eq!(hash, photo_hash("shoot", "a.jpg"));
        assert_ne!(hash, photo_hash("shoot", "b.jpg"));
        assert_ne!(photo_hash("a", "b/c"), photo_hash("a/b", "d"));
    }

    #[test]
    fn test_unknown_hash_reads_no() {
        let db = test_db();
        assert_eq!(db.get_accepted("nope").unwrap(), None);
        assert_eq!(db.accepted_status("nope").unwrap(), AcceptedStatus::No);
        assert_eq!(db.accepted_status("nope").unwrap().to_string(), "no");
    }

    #[test]
    fn test_toggle_sequence() {
        let db = test_db();
        let hash = photo_hash("shoot", "a.jpg");

        assert!(db.toggle_accepted(&hash, "shoot", "a.jpg").unwrap());
        assert_eq!(db.accepted_status(&hash).unwrap(), AcceptedStatus::Yes);

        assert!(!db.toggle_accepted(&hash, "shoot", "a.jpg").unwrap());
        assert_eq!(db.accepted_status(&hash).unwrap(), AcceptedStatus::No);

        assert!(db.toggle_accepted(&hash, "shoot", "a.jpg").unwrap());
        assert_eq!(db.get_accepted(&hash).unwrap(), Some(true));

        let rows: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM photo_status", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_accepted_filenames() {
        let db = test_db();
        for name in ["c.jpg", "a.jpg", "b.jpg"] {
            db.toggle_accepted(&photo_hash("shoot", name), "shoot", name)
                .unwrap();
        }
        // b.jpg toggled back off
        db.toggle_accepted(&photo_hash("shoot", "b.jpg"), "shoot", "b.jpg")
            .unwrap();
        db.toggle_accepted(&photo_hash("other", "z.jpg"), "other", "z.jpg")
            .unwrap();

        assert_eq!(db.accepted_filenames("shoot").unwrap(), vec!["a.jpg", "c.jpg"]);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&AcceptedStatus::Yes).unwrap(), "\"yes\"");
        assert_eq!(serde_json::to_string(&AcceptedStatus::No).unwrap(), "\"no\"");
    }
}
