//! Per-project leases shared by every process using the database.

use anyhow::Result;
use rusqlite::OptionalExtension;

use super::Database;

impl Database {
    /// Take the lease on `slug` for `holder`.
    ///
    /// Succeeds when nobody holds it, or when the current lease is older
    /// than `stale_after_secs` (its holder is presumed dead).
    pub fn try_acquire_lease(
        &self,
        slug: &str,
        holder: &str,
        stale_after_secs: u64,
    ) -> Result<bool> {
        let changed = self.conn().execute(
            r#"
            INSERT INTO project_leases (slug, holder, acquired_at)
            VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT(slug) DO UPDATE SET
                holder = excluded.holder,
                acquired_at = excluded.acquired_at
            WHERE project_leases.acquired_at <= datetime('now', ?3)
            "#,
            rusqlite::params![slug, holder, format!("-{} seconds", stale_after_secs)],
        )?;
        Ok(changed == 1)
    }

    /// Drop the lease on `slug` if `holder` still owns it.
    pub fn release_lease(&self, slug: &str, holder: &str) -> Result<()> {
        self.conn().execute(
            "DELETE FROM project_leases WHERE slug = ?1 AND holder = ?2",
            [slug, holder],
        )?;
        Ok(())
    }

    pub fn lease_holder(&self, slug: &str) -> Result<Option<String>> {
        let holder = self
            .conn()
            .query_row(
                "SELECT holder FROM project_leases WHERE slug = ?",
                [slug],
                |row| row.get(0),
            )
            .optional()?;
        Ok(holder)
    }
}
