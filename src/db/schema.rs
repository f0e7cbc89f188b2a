pub const SCHEMA: &str = r#"
-- Galleries: one per project, created the first time its archive is seen
CREATE TABLE IF NOT EXISTS galleries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    slug TEXT NOT NULL UNIQUE,
    token TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    notified_at TEXT          -- NULL until the photographer has been emailed
);

CREATE INDEX IF NOT EXISTS idx_galleries_token ON galleries(token);

-- Photo status: accepted flag keyed by md5("{slug}/{filename}")
CREATE TABLE IF NOT EXISTS photo_status (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hash TEXT NOT NULL UNIQUE,
    slug TEXT,
    filename TEXT,
    accepted INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_photo_status_slug ON photo_status(slug);

-- Project leases: at most one process ingests a project at a time
CREATE TABLE IF NOT EXISTS project_leases (
    slug TEXT PRIMARY KEY,
    holder TEXT NOT NULL,
    acquired_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;
