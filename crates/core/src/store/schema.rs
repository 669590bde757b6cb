use rusqlite::Connection;

use crate::error::{Error, Result};

const SCHEMA_VERSION: u32 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS albums (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_at  INTEGER
        );

        CREATE TABLE IF NOT EXISTS photos (
            id             TEXT PRIMARY KEY,
            title          TEXT NOT NULL,
            description    TEXT NOT NULL DEFAULT '',
            tags           TEXT NOT NULL DEFAULT '',
            date_taken     TEXT,
            uploaded_at    INTEGER NOT NULL DEFAULT 0,
            views          INTEGER NOT NULL DEFAULT 0,
            thumbnail_path TEXT,
            url_thumbnail  TEXT,
            url_original   TEXT,
            last_synced    INTEGER NOT NULL DEFAULT 0,
            removed        INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_photos_uploaded ON photos(uploaded_at);

        CREATE TABLE IF NOT EXISTS photo_albums (
            photo_id    TEXT NOT NULL REFERENCES photos(id),
            album_id    TEXT NOT NULL REFERENCES albums(id),
            PRIMARY KEY (photo_id, album_id)
        );

        CREATE INDEX IF NOT EXISTS idx_photo_albums_album ON photo_albums(album_id);

        CREATE TABLE IF NOT EXISTS comments (
            id          TEXT PRIMARY KEY,
            photo_id    TEXT NOT NULL REFERENCES photos(id),
            author      TEXT NOT NULL DEFAULT '',
            body        TEXT NOT NULL DEFAULT '',
            created_at  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_comments_photo ON comments(photo_id);

        CREATE TABLE IF NOT EXISTS config (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

pub fn migrate(conn: &Connection) -> Result<()> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM config WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .ok();

    match stored {
        None => {
            conn.execute(
                "INSERT INTO config (key, value) VALUES ('schema_version', ?1)",
                [SCHEMA_VERSION.to_string()],
            )?;
            Ok(())
        }
        Some(v) => {
            let db: u32 = v.parse().map_err(|_| Error::SchemaTooNew {
                db: u32::MAX,
                supported: SCHEMA_VERSION,
            })?;
            if db > SCHEMA_VERSION {
                return Err(Error::SchemaTooNew {
                    db,
                    supported: SCHEMA_VERSION,
                });
            }
            // Future versions branch on `db` here.
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        conn
    }

    #[test]
    fn test_initialize_creates_tables() {
        let conn = open();
        initialize(&conn).unwrap();

        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(tables, vec!["albums", "comments", "config", "photo_albums", "photos"]);
    }

    #[test]
    fn test_migrate_sets_version_on_fresh_db() {
        let conn = open();
        initialize(&conn).unwrap();
        migrate(&conn).unwrap();

        let v: String = conn
            .query_row("SELECT value FROM config WHERE key = 'schema_version'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(v, "1");
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = open();
        initialize(&conn).unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
    }

    #[test]
    fn test_migrate_rejects_future_version() {
        let conn = open();
        initialize(&conn).unwrap();
        conn.execute(
            "INSERT INTO config (key, value) VALUES ('schema_version', '999')",
            [],
        )
        .unwrap();

        let err = migrate(&conn).unwrap_err();
        assert!(matches!(err, Error::SchemaTooNew { db: 999, supported: 1 }));
    }
}
