use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::*;
use crate::error::{Error, Result};
use crate::remote::{MetadataSource, RetryPolicy};
use crate::store::Store;
use crate::SyncProgress;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub mode: SyncMode,
    pub retention: RetentionPolicy,
    pub retry: RetryPolicy,
    /// When set, thumbnails of newly inserted photos are downloaded here.
    pub thumbnail_dir: Option<PathBuf>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            mode: SyncMode::Incremental,
            retention: RetentionPolicy::MarkRemoved,
            retry: RetryPolicy::default(),
            thumbnail_dir: None,
        }
    }
}

fn wall_clock() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Reconciles local state against a remote metadata source.
///
/// Holding `&mut Store` makes the engine the single writer for the
/// duration of a pass; readers open their own connections and only ever
/// observe fully committed per-photo states.
pub struct SyncEngine<'a, S: MetadataSource> {
    store: &'a mut Store,
    source: &'a S,
    options: SyncOptions,
    cancel: Arc<AtomicBool>,
    clock: fn() -> i64,
}

impl<'a, S: MetadataSource> SyncEngine<'a, S> {
    pub fn new(store: &'a mut Store, source: &'a S, options: SyncOptions) -> Self {
        Self {
            store,
            source,
            options,
            cancel: Arc::new(AtomicBool::new(false)),
            clock: wall_clock,
        }
    }

    /// Inject a deterministic clock (tests).
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Shared flag for cooperative cancellation. The pass stops between
    /// per-photo transactions, leaving the watermark unchanged.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run one sync pass. The watermark only advances if the whole pass
    /// succeeds, so a failed or interrupted run resumes from the prior
    /// consistent point.
    pub fn synchronize(
        &mut self,
        mut progress: Option<&mut dyn FnMut(SyncProgress)>,
    ) -> Result<SyncReport> {
        let pass_started = (self.clock)();
        let watermark = match self.options.mode {
            SyncMode::Full => 0,
            SyncMode::Incremental => self.store.watermark()?.unwrap_or(0),
        };
        tracing::info!(mode = ?self.options.mode, watermark, "starting sync pass");

        let mut report = SyncReport::default();

        // Album listing failure is pass-fatal: membership reconciliation
        // cannot proceed against an unknown album set.
        let albums = self.options.retry.run(|| self.source.list_albums())?;
        emit(&mut progress, SyncProgress::AlbumsStart { count: albums.len() });
        for album in &albums {
            match self.store.upsert_album(album)? {
                UpsertOutcome::Inserted => report.added += 1,
                UpsertOutcome::Updated => report.updated += 1,
                UpsertOutcome::Unchanged => report.unchanged += 1,
            }
        }

        let photos = self
            .options
            .retry
            .run(|| self.source.list_photos_since(watermark))?;
        emit(&mut progress, SyncProgress::PhotosStart { count: photos.len() });

        let mut seen = BTreeSet::new();
        for rec in &photos {
            if self.cancel.load(Ordering::Relaxed) {
                tracing::info!("sync pass cancelled");
                return Err(Error::Interrupted);
            }
            // Listed means observed: even if reconciling the photo fails
            // below, a full pass must not prune it.
            seen.insert(rec.id.clone());

            match self.sync_one(rec, &mut report) {
                Ok(()) => emit(
                    &mut progress,
                    SyncProgress::PhotoProcessed {
                        id: rec.id.clone(),
                        title: rec.title.clone(),
                    },
                ),
                Err(e) if e.is_fatal_for_pass() => return Err(e),
                Err(e) => {
                    tracing::warn!(photo = %rec.id, error = %e, "skipping photo after failure");
                    report.failed += 1;
                    emit(&mut progress, SyncProgress::PhotoFailed { id: rec.id.clone() });
                }
            }
        }

        if self.options.mode == SyncMode::Full {
            let removed = self.store.prune_unseen(&seen, self.options.retention)?;
            report.removed = removed;
            if removed > 0 {
                emit(&mut progress, SyncProgress::RemovedStale { count: removed });
            }
        }

        self.store.set_watermark(pass_started)?;
        tracing::info!(
            added = report.added,
            updated = report.updated,
            unchanged = report.unchanged,
            removed = report.removed,
            failed = report.failed,
            "sync pass complete"
        );
        Ok(report)
    }

    /// One photo: fetch its remote membership, then commit attributes and
    /// association diff as a single transaction.
    fn sync_one(&mut self, rec: &PhotoRecord, report: &mut SyncReport) -> Result<()> {
        let membership: BTreeSet<String> = self
            .options
            .retry
            .run(|| self.source.photo_albums(&rec.id))?
            .into_iter()
            .collect();

        let outcome = self.store.sync_photo(rec, &membership, (self.clock)())?;
        match outcome.photo {
            UpsertOutcome::Inserted => {
                report.added += 1;
                self.fetch_extras(rec);
            }
            _ if outcome.changed() => report.updated += 1,
            _ => report.unchanged += 1,
        }
        Ok(())
    }

    /// Thumbnail and comments for a newly inserted photo. Best-effort:
    /// failures are logged and never fail the photo itself.
    fn fetch_extras(&mut self, rec: &PhotoRecord) {
        if let Some(dir) = self.options.thumbnail_dir.clone() {
            if let Some(url) = &rec.url_thumbnail {
                if let Err(e) = self.download_thumbnail(&dir, &rec.id, url) {
                    tracing::warn!(photo = %rec.id, error = %e, "thumbnail download failed");
                }
            }
        }

        match self.options.retry.run(|| self.source.photo_comments(&rec.id)) {
            Ok(comments) if !comments.is_empty() => {
                if let Err(e) = self.store.replace_comments(&rec.id, &comments) {
                    tracing::warn!(photo = %rec.id, error = %e, "storing comments failed");
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(photo = %rec.id, error = %e, "comment fetch failed");
            }
        }
    }

    fn download_thumbnail(&mut self, dir: &Path, photo_id: &str, url: &str) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let bytes = self.options.retry.run(|| self.source.fetch_thumbnail(url))?;
        let path = dir.join(format!("{photo_id}.jpg"));
        std::fs::write(&path, bytes)?;
        self.store.set_thumbnail_path(photo_id, &path)?;
        Ok(())
    }
}

fn emit(progress: &mut Option<&mut dyn FnMut(SyncProgress)>, event: SyncProgress) {
    if let Some(cb) = progress {
        cb(event);
    }
}
