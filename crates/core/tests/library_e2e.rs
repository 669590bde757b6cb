use std::collections::HashMap;

use photomirror_core::{
    AlbumRecord, CommentRecord, Library, MetadataSource, PhotoRecord, Result, RetryPolicy,
    SyncMode, SyncOptions, SyncProgress,
};

/// Scripted remote source for driving the facade end-to-end.
#[derive(Default)]
struct ScriptedRemote {
    albums: Vec<AlbumRecord>,
    photos: Vec<PhotoRecord>,
    memberships: HashMap<String, Vec<String>>,
    comments: HashMap<String, Vec<CommentRecord>>,
}

impl ScriptedRemote {
    fn album(mut self, id: &str, title: &str) -> Self {
        self.albums.push(AlbumRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            created_at: Some(1_600_000_000),
        });
        self
    }

    fn photo(
        mut self,
        id: &str,
        title: &str,
        tags: &[&str],
        uploaded_at: i64,
        albums: &[&str],
    ) -> Self {
        self.photos.push(PhotoRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            date_taken: None,
            uploaded_at,
            views: 0,
            url_thumbnail: None,
            url_original: None,
        });
        self.memberships
            .insert(id.to_string(), albums.iter().map(|s| s.to_string()).collect());
        self
    }
}

impl MetadataSource for ScriptedRemote {
    fn list_albums(&self) -> Result<Vec<AlbumRecord>> {
        Ok(self.albums.clone())
    }

    fn list_photos_since(&self, watermark: i64) -> Result<Vec<PhotoRecord>> {
        Ok(self
            .photos
            .iter()
            .filter(|p| p.uploaded_at >= watermark)
            .cloned()
            .collect())
    }

    fn photo_albums(&self, photo_id: &str) -> Result<Vec<String>> {
        Ok(self.memberships.get(photo_id).cloned().unwrap_or_default())
    }

    fn photo_comments(&self, photo_id: &str) -> Result<Vec<CommentRecord>> {
        Ok(self.comments.get(photo_id).cloned().unwrap_or_default())
    }

    fn fetch_thumbnail(&self, _url: &str) -> Result<Vec<u8>> {
        Ok(vec![])
    }
}

fn options() -> SyncOptions {
    SyncOptions {
        retry: RetryPolicy::immediate(3),
        ..SyncOptions::default()
    }
}

// ── Library::open ────────────────────────────────────────────────

#[test]
fn test_open_creates_database_with_parents() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("sub/dir/library.db");

    let _library = Library::open(&db_path).unwrap();
    assert!(db_path.exists());
}

#[test]
fn test_library_persists_across_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("library.db");
    let remote = ScriptedRemote::default()
        .album("a1", "Summer")
        .photo("p1", "Beach Day", &[], 100, &["a1"]);

    {
        let mut library = Library::open(&db_path).unwrap();
        library.sync(&remote, options(), None).unwrap();
    }

    let library = Library::open(&db_path).unwrap();
    let albums = library.albums().unwrap();
    assert_eq!(albums.len(), 1);
    assert_eq!(albums[0].photo_count, 1);
}

// ── Sync scenarios ───────────────────────────────────────────────

#[test]
fn test_photo_gains_second_album_between_syncs() {
    let tmp = tempfile::tempdir().unwrap();
    let mut library = Library::open(&tmp.path().join("library.db")).unwrap();

    let first = ScriptedRemote::default()
        .album("a1", "Summer")
        .photo("p1", "Beach Day", &[], 100, &["a1"]);
    library.sync(&first, options(), None).unwrap();

    let (_, albums, _) = library.photo("p1").unwrap().unwrap();
    assert_eq!(albums.len(), 1);
    assert_eq!(albums[0].title, "Summer");

    // Full mode so the unchanged upload date does not scope the photo out.
    let second = ScriptedRemote::default()
        .album("a1", "Summer")
        .album("a2", "Favorites")
        .photo("p1", "Beach Day", &[], 100, &["a1", "a2"]);
    library
        .sync(
            &second,
            SyncOptions {
                mode: SyncMode::Full,
                ..options()
            },
            None,
        )
        .unwrap();

    let (_, albums, _) = library.photo("p1").unwrap().unwrap();
    let titles: Vec<&str> = albums.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["Favorites", "Summer"]);
    assert!(albums.iter().all(|a| a.photo_count == 1));
}

#[test]
fn test_full_sync_drops_vanished_photo_from_search_and_counts() {
    let tmp = tempfile::tempdir().unwrap();
    let mut library = Library::open(&tmp.path().join("library.db")).unwrap();

    let first = ScriptedRemote::default()
        .album("a1", "Summer")
        .photo("p1", "Beach Day", &[], 100, &["a1"])
        .photo("p2", "Deleted Later", &[], 200, &["a1"]);
    library.sync(&first, options(), None).unwrap();
    assert_eq!(library.search("", None).unwrap().len(), 2);

    let second = ScriptedRemote::default()
        .album("a1", "Summer")
        .photo("p1", "Beach Day", &[], 100, &["a1"]);
    let report = library
        .sync(
            &second,
            SyncOptions {
                mode: SyncMode::Full,
                ..options()
            },
            None,
        )
        .unwrap();

    assert_eq!(report.removed, 1);
    assert_eq!(library.search("", None).unwrap().len(), 1);
    assert_eq!(library.albums().unwrap()[0].photo_count, 1);
    assert_eq!(library.status().unwrap().removed_photos, 1);
}

#[test]
fn test_progress_events_cover_the_pass() {
    let tmp = tempfile::tempdir().unwrap();
    let mut library = Library::open(&tmp.path().join("library.db")).unwrap();
    let remote = ScriptedRemote::default()
        .album("a1", "Summer")
        .photo("p1", "Beach Day", &[], 100, &["a1"]);

    let mut events = Vec::new();
    library
        .sync(
            &remote,
            options(),
            Some(&mut |p: SyncProgress| {
                events.push(match p {
                    SyncProgress::AlbumsStart { count } => format!("albums:{count}"),
                    SyncProgress::PhotosStart { count } => format!("photos:{count}"),
                    SyncProgress::PhotoProcessed { id, .. } => format!("done:{id}"),
                    SyncProgress::PhotoFailed { id } => format!("failed:{id}"),
                    SyncProgress::RemovedStale { count } => format!("removed:{count}"),
                });
            }),
        )
        .unwrap();

    assert_eq!(events, vec!["albums:1", "photos:1", "done:p1"]);
}

// ── Read side ────────────────────────────────────────────────────

#[test]
fn test_search_by_tag_case_insensitive_through_facade() {
    let tmp = tempfile::tempdir().unwrap();
    let mut library = Library::open(&tmp.path().join("library.db")).unwrap();
    let remote = ScriptedRemote::default()
        .photo("p1", "Evening", &["sunset"], 100, &[])
        .photo("p2", "Morning", &["sunrise"], 200, &[]);
    library.sync(&remote, options(), None).unwrap();

    let hits = library.search("SUNSET", None).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "p1");
}

#[test]
fn test_search_with_album_filter_through_facade() {
    let tmp = tempfile::tempdir().unwrap();
    let mut library = Library::open(&tmp.path().join("library.db")).unwrap();
    let remote = ScriptedRemote::default()
        .album("a1", "Summer")
        .album("a2", "Favorites")
        .photo("p1", "Beach Day", &[], 100, &["a1", "a2"])
        .photo("p2", "Beach Bonfire", &[], 200, &["a1"]);
    library.sync(&remote, options(), None).unwrap();

    let hits = library.search("beach", Some("a2")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "p1");
}

#[test]
fn test_photo_detail_includes_comments() {
    let tmp = tempfile::tempdir().unwrap();
    let mut library = Library::open(&tmp.path().join("library.db")).unwrap();
    let mut remote = ScriptedRemote::default().photo("p1", "Discussed", &[], 100, &[]);
    remote.comments.insert(
        "p1".to_string(),
        vec![CommentRecord {
            id: "c1".to_string(),
            author: "ann".to_string(),
            body: "great shot".to_string(),
            created_at: Some("1700000000".to_string()),
        }],
    );
    library.sync(&remote, options(), None).unwrap();

    let (photo, _, comments) = library.photo("p1").unwrap().unwrap();
    assert_eq!(photo.title, "Discussed");
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].body, "great shot");
}

#[test]
fn test_photo_detail_missing_photo() {
    let tmp = tempfile::tempdir().unwrap();
    let library = Library::open(&tmp.path().join("library.db")).unwrap();
    assert!(library.photo("ghost").unwrap().is_none());
}

#[test]
fn test_status_counts() {
    let tmp = tempfile::tempdir().unwrap();
    let mut library = Library::open(&tmp.path().join("library.db")).unwrap();
    let remote = ScriptedRemote::default()
        .album("a1", "Summer")
        .album("a2", "Favorites")
        .photo("p1", "One", &[], 100, &["a1", "a2"])
        .photo("p2", "Two", &[], 200, &["a1"]);
    library.sync(&remote, options(), None).unwrap();

    let stats = library.status().unwrap();
    assert_eq!(stats.total_photos, 2);
    assert_eq!(stats.total_albums, 2);
    assert_eq!(stats.total_associations, 3);
    assert!(stats.last_sync.is_some());
}
