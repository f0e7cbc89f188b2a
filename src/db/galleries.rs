//! Gallery records.

use anyhow::Result;
use rusqlite::{OptionalExtension, Row};
use serde::Serialize;

use super::Database;

/// A provisioned gallery: the shareable `(slug, token)` pair for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gallery {
    pub id: i64,
    pub slug: String,
    pub token: String,
    pub created_at: String,
    pub notified_at: Option<String>,
}

impl Gallery {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            slug: row.get(1)?,
            token: row.get(2)?,
            created_at: row.get(3)?,
            notified_at: row.get(4)?,
        })
    }

    pub fn is_notified(&self) -> bool {
        self.notified_at.is_some()
    }
}

const GALLERY_COLUMNS: &str = "id, slug, token, created_at, notified_at";

impl Database {
    pub fn insert_gallery(&self, slug: &str, token: &str) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO galleries (slug, token) VALUES (?, ?)",
            rusqlite::params![slug, token],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    pub fn get_gallery(&self, slug: &str) -> Result<Option<Gallery>> {
        let gallery = self
            .conn()
            .query_row(
                &format!("SELECT {GALLERY_COLUMNS} FROM galleries WHERE slug = ?"),
                [slug],
                Gallery::from_row,
            )
            .optional()?;
        Ok(gallery)
    }

    pub fn find_gallery_by_token(&self, slug: &str, token: &str) -> Result<Option<Gallery>> {
        let gallery = self
            .conn()
            .query_row(
                &format!("SELECT {GALLERY_COLUMNS} FROM galleries WHERE slug = ? AND token = ?"),
                [slug, token],
                Gallery::from_row,
            )
            .optional()?;
        Ok(gallery)
    }

    pub fn mark_gallery_notified(&self, gallery_id: i64) -> Result<()> {
        self.conn().execute(
            "UPDATE galleries SET notified_at = CURRENT_TIMESTAMP WHERE id = ?",
            [gallery_id],
        )?;
        Ok(())
    }

    pub fn get_all_galleries(&self) -> Result<Vec<Gallery>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {GALLERY_COLUMNS} FROM galleries ORDER BY slug"))?;
        let galleries = stmt
            .query_map([], Gallery::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(galleries)
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
    fn test_insert_and_get_gallery() {
        let db = test_db();
        let id = db.insert_gallery("smith-wedding", "abc123").unwrap();

        let gallery = db.get_gallery("smith-wedding").unwrap().unwrap();
        assert_eq!(gallery.id, id);
        assert_eq!(gallery.token, "abc123");
        assert!(!gallery.is_notified());

        assert!(db.get_gallery("missing").unwrap().is_none());
    }

    #[test]
    fn test_slug_is_unique() {
        let db = test_db();
        db.insert_gallery("shoot", "one").unwrap();
        assert!(db.insert_gallery("shoot", "two").is_err());
    }

    #[test]
    fn test_find_by_token_requires_matching_slug() {
        let db = test_db();
        db.insert_gallery("a", "token-a").unwrap();
        db.insert_gallery("b", "token-b").unwrap();

        assert!(db.find_gallery_by_token("a", "token-a").unwrap().is_some());
        assert!(db.find_gallery_by_token("a", "token-b").unwrap().is_none());
    }

    #[test]
    fn test_mark_notified() {
        let db = test_db();
        let id = db.insert_gallery("shoot", "tok").unwrap();
        db.mark_gallery_notified(id).unwrap();

        let gallery = db.get_gallery("shoot").unwrap().unwrap();
        assert!(gallery.is_notified());
    }

    #[test]
    fn test_get_all_galleries_sorted() {
        let db = test_db();
        db.insert_gallery("zeta", "z").unwrap();
        db.insert_gallery("alpha", "a").unwrap();

        let slugs: Vec<String> = db
            .get_all_galleries()
            .unwrap()
            .into_iter()
            .map(|g| g.slug)
            .collect();
        assert_eq!(slugs, vec!["alpha", "zeta"]);
    }
}
