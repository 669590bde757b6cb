use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A photo as stored locally. Identity is the remote photo ID, which is
/// stable across syncs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Photo {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Tags in the order the remote service reports them.
    pub tags: Vec<String>,
    /// Capture time as reported remotely, kept verbatim ("YYYY-MM-DD HH:MM:SS").
    pub date_taken: Option<String>,
    /// Upload time, unix seconds.
    pub uploaded_at: i64,
    pub views: i64,
    /// Local thumbnail file, if one has been downloaded.
    pub thumbnail_path: Option<PathBuf>,
    pub url_thumbnail: Option<String>,
    pub url_original: Option<String>,
    /// Unix seconds of the pass that last wrote this row.
    pub last_synced: i64,
    /// Set when a full sync no longer observes the photo remotely.
    pub removed: bool,
}

/// An album as stored locally. `photo_count` is always derived from
/// association rows, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_at: Option<i64>,
    pub photo_count: usize,
}

/// A comment on a photo, mirrored for offline display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoComment {
    pub id: String,
    pub author: String,
    pub body: String,
    pub created_at: Option<String>,
}

// ── Remote records ───────────────────────────────────────────────
//
// Strongly-typed output of the remote metadata client. The sync engine
// and store never see raw JSON.

#[derive(Debug, Clone, PartialEq)]
pub struct AlbumRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub date_taken: Option<String>,
    pub uploaded_at: i64,
    pub views: i64,
    pub url_thumbnail: Option<String>,
    pub url_original: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentRecord {
    pub id: String,
    pub author: String,
    pub body: String,
    pub created_at: Option<String>,
}

// ── Sync control ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Everything since the persisted watermark.
    Incremental,
    /// Everything since the epoch, with removal detection afterwards.
    Full,
}

/// What happens to a photo a full sync no longer observes remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Keep the row but flag it removed; associations are still deleted.
    MarkRemoved,
    /// Delete the row (and its comments) outright.
    Delete,
}

/// Outcome of one compare-and-update upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Outcome of one per-photo transaction: attribute upsert plus
/// membership reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoSyncOutcome {
    pub photo: UpsertOutcome,
    pub links_added: usize,
    pub links_removed: usize,
}

impl PhotoSyncOutcome {
    pub fn changed(&self) -> bool {
        self.photo != UpsertOutcome::Unchanged || self.links_added > 0 || self.links_removed > 0
    }
}

/// Tally of one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Summary counts for the status view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryStats {
    pub total_photos: usize,
    pub removed_photos: usize,
    pub total_albums: usize,
    pub total_associations: usize,
    pub last_sync: Option<i64>,
}

/// API credentials, loaded from the credentials file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: String,
    pub user_id: String,
    /// Only needed for the (out-of-scope) OAuth flow; kept for file
    /// compatibility with existing setups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
}
