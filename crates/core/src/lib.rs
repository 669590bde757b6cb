pub mod config;
pub mod domain;
pub mod error;
pub mod remote;
pub mod store;
pub mod sync;

use std::path::Path;

pub use domain::{
    Album, AlbumRecord, CommentRecord, Credentials, LibraryStats, Photo, PhotoComment,
    PhotoRecord, RetentionPolicy, SyncMode, SyncReport,
};
pub use error::{Error, Result};
pub use remote::flickr::FlickrClient;
pub use remote::{MetadataSource, RetryPolicy};
pub use store::Store;
pub use sync::{SyncEngine, SyncOptions};

/// Callback for reporting sync progress.
pub enum SyncProgress {
    /// Remote album listing fetched.
    AlbumsStart { count: usize },
    /// Remote photo listing fetched.
    PhotosStart { count: usize },
    /// A photo has been reconciled and committed.
    PhotoProcessed { id: String, title: String },
    /// A photo was skipped after exhausting retries.
    PhotoFailed { id: String },
    /// Full-mode removal detection dropped stale photos.
    RemovedStale { count: usize },
}

/// The main entry point: a locally mirrored photo library.
///
/// Writes go through [`Library::sync`]; everything else is a read against
/// committed state and never observes a half-reconciled photo.
pub struct Library {
    store: Store,
}

impl Library {
    /// Open or create a library database at the given path.
    pub fn open(db_path: &Path) -> Result<Self> {
        let store = Store::open(db_path)?;
        Ok(Self { store })
    }

    /// Run one sync pass against a remote metadata source.
    pub fn sync(
        &mut self,
        source: &impl MetadataSource,
        options: SyncOptions,
        progress: Option<&mut dyn FnMut(SyncProgress)>,
    ) -> Result<SyncReport> {
        SyncEngine::new(&mut self.store, source, options).synchronize(progress)
    }

    /// Search photos by title, description, or tag, optionally restricted
    /// to one album. Case-insensitive; most recent uploads first.
    pub fn search(&self, text: &str, album: Option<&str>) -> Result<Vec<Photo>> {
        self.store.search(text, album)
    }

    /// All albums with derived photo counts.
    pub fn albums(&self) -> Result<Vec<Album>> {
        self.store.list_albums()
    }

    /// One photo with its album memberships and comments, if present.
    pub fn photo(&self, id: &str) -> Result<Option<(Photo, Vec<Album>, Vec<PhotoComment>)>> {
        let Some(photo) = self.store.get_photo(id)? else {
            return Ok(None);
        };
        let albums = self.store.albums_for_photo(id)?;
        let comments = self.store.comments_for_photo(id)?;
        Ok(Some((photo, albums, comments)))
    }

    /// Summary counts for the status view.
    pub fn status(&self) -> Result<LibraryStats> {
        self.store.stats()
    }
}
