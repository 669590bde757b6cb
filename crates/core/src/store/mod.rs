pub mod schema;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::*;
use crate::error::{Error, Result};

const WATERMARK_KEY: &str = "last_sync_watermark";

const PHOTO_COLUMNS: &str = "id, title, description, tags, date_taken, uploaded_at, views, \
     thumbnail_path, url_thumbnail, url_original, last_synced, removed";

/// SQLite-backed store for the mirrored photo collection.
///
/// Uniqueness of (photo_id, album_id) pairs and referential integrity of
/// association rows are enforced here, not assumed of callers. Writes that
/// must be atomic (per-photo sync, membership reconciliation, removal
/// pruning) run inside a transaction and take `&mut self`.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a library database at the given path with WAL mode.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::initialize(&conn)?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::initialize(&conn)?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    // ── Albums ───────────────────────────────────────────────────────

    /// Insert the album if absent, update it if any attribute differs.
    /// The comparison is field-by-field; remote timestamps are too coarse
    /// to detect changes on their own.
    pub fn upsert_album(&self, rec: &AlbumRecord) -> Result<UpsertOutcome> {
        let existing: Option<(String, String, Option<i64>)> = self
            .conn
            .query_row(
                "SELECT title, description, created_at FROM albums WHERE id = ?1",
                params![rec.id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match existing {
            None => {
                self.conn.execute(
                    "INSERT INTO albums (id, title, description, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![rec.id, rec.title, rec.description, rec.created_at],
                )?;
                Ok(UpsertOutcome::Inserted)
            }
            Some((title, description, created_at))
                if title == rec.title
                    && description == rec.description
                    && created_at == rec.created_at =>
            {
                Ok(UpsertOutcome::Unchanged)
            }
            Some(_) => {
                self.conn.execute(
                    "UPDATE albums SET title = ?2, description = ?3, created_at = ?4 WHERE id = ?1",
                    params![rec.id, rec.title, rec.description, rec.created_at],
                )?;
                Ok(UpsertOutcome::Updated)
            }
        }
    }

    /// List all albums with derived photo counts, ordered by title.
    pub fn list_albums(&self) -> Result<Vec<Album>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.title, a.description, a.created_at,
                    (SELECT COUNT(*) FROM photo_albums pa WHERE pa.album_id = a.id)
             FROM albums a
             ORDER BY a.title, a.id",
        )?;
        let albums = stmt
            .query_map([], |row| {
                Ok(Album {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    created_at: row.get(3)?,
                    photo_count: row.get::<_, i64>(4)? as usize,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(albums)
    }

    /// Number of photos in an album. Always counted from association rows.
    pub fn count_photos(&self, album_id: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM photo_albums WHERE album_id = ?1",
            params![album_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ── Photos ───────────────────────────────────────────────────────

    /// Apply one photo's remote state — attributes plus album membership —
    /// as a single transaction. Readers never observe a photo whose
    /// attributes and associations disagree.
    pub fn sync_photo(
        &mut self,
        rec: &PhotoRecord,
        memberships: &BTreeSet<String>,
        synced_at: i64,
    ) -> Result<PhotoSyncOutcome> {
        let tx = self.conn.transaction()?;
        let photo = upsert_photo_tx(&tx, rec, synced_at)?;
        let (links_added, links_removed) = apply_membership(&tx, &rec.id, memberships)?;
        tx.commit()?;
        Ok(PhotoSyncOutcome {
            photo,
            links_added,
            links_removed,
        })
    }

    pub fn get_photo(&self, id: &str) -> Result<Option<Photo>> {
        load_photo(&self.conn, id)
    }

    /// IDs of all photos not flagged removed.
    pub fn photo_ids(&self) -> Result<BTreeSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM photos WHERE removed = 0")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<BTreeSet<String>, _>>()?;
        Ok(ids)
    }

    /// Record the local thumbnail file for a photo.
    pub fn set_thumbnail_path(&self, photo_id: &str, path: &Path) -> Result<()> {
        self.conn.execute(
            "UPDATE photos SET thumbnail_path = ?2 WHERE id = ?1",
            params![photo_id, path.to_string_lossy()],
        )?;
        Ok(())
    }

    /// Drop photos a full pass no longer observed remotely. Association
    /// rows always go; the photo row is flagged or deleted per policy.
    /// Returns the number of photos removed.
    pub fn prune_unseen(
        &mut self,
        seen: &BTreeSet<String>,
        retention: RetentionPolicy,
    ) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let stale: Vec<String> = {
            let mut stmt = tx.prepare("SELECT id FROM photos WHERE removed = 0")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            ids.into_iter().filter(|id| !seen.contains(id)).collect()
        };

        for id in &stale {
            tx.execute("DELETE FROM photo_albums WHERE photo_id = ?1", params![id])?;
            match retention {
                RetentionPolicy::MarkRemoved => {
                    tx.execute("UPDATE photos SET removed = 1 WHERE id = ?1", params![id])?;
                }
                RetentionPolicy::Delete => {
                    tx.execute("DELETE FROM comments WHERE photo_id = ?1", params![id])?;
                    tx.execute("DELETE FROM photos WHERE id = ?1", params![id])?;
                }
            }
        }

        tx.commit()?;
        Ok(stale.len())
    }

    // ── Membership ───────────────────────────────────────────────────

    /// Album IDs the photo currently belongs to.
    pub fn get_membership(&self, photo_id: &str) -> Result<BTreeSet<String>> {
        membership_of(&self.conn, photo_id)
    }

    /// Replace a photo's membership with the desired set, atomically.
    /// Computes the set difference and applies only the changes; a
    /// duplicate pair is a no-op, and any failure rolls back everything.
    /// Returns (associations added, associations removed).
    pub fn set_membership(
        &mut self,
        photo_id: &str,
        desired: &BTreeSet<String>,
    ) -> Result<(usize, usize)> {
        let tx = self.conn.transaction()?;
        let diff = apply_membership(&tx, photo_id, desired)?;
        tx.commit()?;
        Ok(diff)
    }

    /// Albums a photo belongs to, with derived counts.
    pub fn albums_for_photo(&self, photo_id: &str) -> Result<Vec<Album>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.title, a.description, a.created_at,
                    (SELECT COUNT(*) FROM photo_albums pa2 WHERE pa2.album_id = a.id)
             FROM albums a
             JOIN photo_albums pa ON pa.album_id = a.id
             WHERE pa.photo_id = ?1
             ORDER BY a.title, a.id",
        )?;
        let albums = stmt
            .query_map(params![photo_id], |row| {
                Ok(Album {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    created_at: row.get(3)?,
                    photo_count: row.get::<_, i64>(4)? as usize,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(albums)
    }

    // ── Search ───────────────────────────────────────────────────────

    /// Case-insensitive substring search over title, description, and
    /// tags. With an album filter the result is intersected with that
    /// album's association rows, so multi-album photos are never missed.
    /// Ordering: most recently uploaded first, ties broken by ID.
    pub fn search(&self, text: &str, album: Option<&str>) -> Result<Vec<Photo>> {
        let pattern = format!("%{}%", text.to_lowercase());
        let base = format!(
            "SELECT {PHOTO_COLUMNS} FROM photos
             WHERE removed = 0
               AND (lower(title) LIKE ?1 OR lower(description) LIKE ?1 OR lower(tags) LIKE ?1)"
        );

        let photos = match album {
            Some(album_id) => {
                let sql = format!(
                    "{base} AND id IN (SELECT photo_id FROM photo_albums WHERE album_id = ?2)
                     ORDER BY uploaded_at DESC, id ASC"
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map(params![pattern, album_id], photo_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let sql = format!("{base} ORDER BY uploaded_at DESC, id ASC");
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map(params![pattern], photo_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(photos)
    }

    // ── Comments ─────────────────────────────────────────────────────

    /// Replace the stored comments for a photo with the remote snapshot.
    pub fn replace_comments(&mut self, photo_id: &str, comments: &[CommentRecord]) -> Result<()> {
        let tx = self.conn.transaction()?;
        if !photo_exists(&tx, photo_id)? {
            return Err(Error::DanglingReference {
                kind: "photo",
                id: photo_id.to_string(),
            });
        }
        tx.execute("DELETE FROM comments WHERE photo_id = ?1", params![photo_id])?;
        for c in comments {
            tx.execute(
                "INSERT INTO comments (id, photo_id, author, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![c.id, photo_id, c.author, c.body, c.created_at],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn comments_for_photo(&self, photo_id: &str) -> Result<Vec<PhotoComment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, author, body, created_at FROM comments
             WHERE photo_id = ?1 ORDER BY created_at, id",
        )?;
        let comments = stmt
            .query_map(params![photo_id], |row| {
                Ok(PhotoComment {
                    id: row.get(0)?,
                    author: row.get(1)?,
                    body: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    // ── Watermark & stats ────────────────────────────────────────────

    /// The last successfully completed sync boundary, unix seconds.
    pub fn watermark(&self) -> Result<Option<i64>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![WATERMARK_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.and_then(|v| v.parse().ok()))
    }

    pub fn set_watermark(&self, timestamp: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![WATERMARK_KEY, timestamp.to_string()],
        )?;
        Ok(())
    }

    pub fn stats(&self) -> Result<LibraryStats> {
        let (total_photos, removed_photos, total_albums, total_associations) =
            self.conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM photos WHERE removed = 0),
                    (SELECT COUNT(*) FROM photos WHERE removed = 1),
                    (SELECT COUNT(*) FROM albums),
                    (SELECT COUNT(*) FROM photo_albums)",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)? as usize,
                        row.get::<_, i64>(1)? as usize,
                        row.get::<_, i64>(2)? as usize,
                        row.get::<_, i64>(3)? as usize,
                    ))
                },
            )?;
        Ok(LibraryStats {
            total_photos,
            removed_photos,
            total_albums,
            total_associations,
            last_sync: self.watermark()?,
        })
    }
}

// ── Row helpers (shared between direct calls and transactions) ───────

fn photo_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Photo> {
    let tags: String = row.get(3)?;
    Ok(Photo {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        tags: tags.split_whitespace().map(str::to_string).collect(),
        date_taken: row.get(4)?,
        uploaded_at: row.get(5)?,
        views: row.get(6)?,
        thumbnail_path: row.get::<_, Option<String>>(7)?.map(PathBuf::from),
        url_thumbnail: row.get(8)?,
        url_original: row.get(9)?,
        last_synced: row.get(10)?,
        removed: row.get::<_, i64>(11)? != 0,
    })
}

fn load_photo(conn: &Connection, id: &str) -> Result<Option<Photo>> {
    let sql = format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE id = ?1");
    let photo = conn
        .query_row(&sql, params![id], photo_from_row)
        .optional()?;
    Ok(photo)
}

fn photo_exists(conn: &Connection, id: &str) -> Result<bool> {
    let hit = conn
        .query_row("SELECT 1 FROM photos WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?;
    Ok(hit.is_some())
}

fn album_exists(conn: &Connection, id: &str) -> Result<bool> {
    let hit = conn
        .query_row("SELECT 1 FROM albums WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?;
    Ok(hit.is_some())
}

/// The remote record is authoritative: on any field difference all
/// attributes are overwritten rather than merged. A photo flagged removed
/// that reappears remotely is resurrected.
fn upsert_photo_tx(conn: &Connection, rec: &PhotoRecord, synced_at: i64) -> Result<UpsertOutcome> {
    let existing = load_photo(conn, &rec.id)?;
    let tags = rec.tags.join(" ");

    match existing {
        None => {
            conn.execute(
                "INSERT INTO photos (id, title, description, tags, date_taken, uploaded_at,
                 views, url_thumbnail, url_original, last_synced, removed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0)",
                params![
                    rec.id,
                    rec.title,
                    rec.description,
                    tags,
                    rec.date_taken,
                    rec.uploaded_at,
                    rec.views,
                    rec.url_thumbnail,
                    rec.url_original,
                    synced_at,
                ],
            )?;
            Ok(UpsertOutcome::Inserted)
        }
        Some(p) if photo_matches(&p, rec) => Ok(UpsertOutcome::Unchanged),
        Some(_) => {
            conn.execute(
                "UPDATE photos SET title = ?2, description = ?3, tags = ?4, date_taken = ?5,
                 uploaded_at = ?6, views = ?7, url_thumbnail = ?8, url_original = ?9,
                 last_synced = ?10, removed = 0
                 WHERE id = ?1",
                params![
                    rec.id,
                    rec.title,
                    rec.description,
                    tags,
                    rec.date_taken,
                    rec.uploaded_at,
                    rec.views,
                    rec.url_thumbnail,
                    rec.url_original,
                    synced_at,
                ],
            )?;
            Ok(UpsertOutcome::Updated)
        }
    }
}

fn photo_matches(p: &Photo, rec: &PhotoRecord) -> bool {
    !p.removed
        && p.title == rec.title
        && p.description == rec.description
        && p.tags == rec.tags
        && p.date_taken == rec.date_taken
        && p.uploaded_at == rec.uploaded_at
        && p.views == rec.views
        && p.url_thumbnail == rec.url_thumbnail
        && p.url_original == rec.url_original
}

fn membership_of(conn: &Connection, photo_id: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn.prepare("SELECT album_id FROM photo_albums WHERE photo_id = ?1")?;
    let ids = stmt
        .query_map(params![photo_id], |row| row.get(0))?
        .collect::<std::result::Result<BTreeSet<String>, _>>()?;
    Ok(ids)
}

/// Set-difference reconciliation of one photo's associations. Must run
/// inside a transaction: on a dangling reference the caller drops the
/// transaction and nothing is applied.
fn apply_membership(
    conn: &Connection,
    photo_id: &str,
    desired: &BTreeSet<String>,
) -> Result<(usize, usize)> {
    if !photo_exists(conn, photo_id)? {
        return Err(Error::DanglingReference {
            kind: "photo",
            id: photo_id.to_string(),
        });
    }

    let current = membership_of(conn, photo_id)?;
    let mut added = 0;
    let mut removed = 0;

    for album_id in desired.difference(&current) {
        if !album_exists(conn, album_id)? {
            return Err(Error::DanglingReference {
                kind: "album",
                id: album_id.clone(),
            });
        }
        added += conn.execute(
            "INSERT OR IGNORE INTO photo_albums (photo_id, album_id) VALUES (?1, ?2)",
            params![photo_id, album_id],
        )?;
    }
    for album_id in current.difference(desired) {
        removed += conn.execute(
            "DELETE FROM photo_albums WHERE photo_id = ?1 AND album_id = ?2",
            params![photo_id, album_id],
        )?;
    }

    Ok((added, removed))
}
