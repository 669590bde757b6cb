use std::path::{Path, PathBuf};

use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use photomirror_core::{
    Credentials, FlickrClient, Library, RetentionPolicy, SyncMode, SyncOptions, SyncProgress,
};

fn active_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "  {bar:30.cyan/blue} {spinner:.green} {pos:>5}/{len:<5} {prefix:.dim} {msg}",
    )
    .unwrap()
    .progress_chars("━╸─")
}

fn done_style() -> ProgressStyle {
    ProgressStyle::with_template("  {bar:30.green} {prefix:.green} {msg:.dim}").unwrap()
}

pub fn run(
    library: &mut Library,
    credentials_path: &Path,
    full: bool,
    purge_removed: bool,
    thumbnails: Option<PathBuf>,
) -> Result<()> {
    let credentials = Credentials::load(credentials_path)?;
    let client = FlickrClient::new(&credentials)?;

    let options = SyncOptions {
        mode: if full {
            SyncMode::Full
        } else {
            SyncMode::Incremental
        },
        retention: if purge_removed {
            RetentionPolicy::Delete
        } else {
            RetentionPolicy::MarkRemoved
        },
        thumbnail_dir: thumbnails,
        ..SyncOptions::default()
    };

    let mp = MultiProgress::new();
    let mut photo_pb: Option<ProgressBar> = None;
    let mut photo_total: u64 = 0;

    let report = library.sync(
        &client,
        options,
        Some(&mut |progress| match progress {
            SyncProgress::AlbumsStart { count } => {
                mp.println(format!("  Fetched {count} albums")).ok();
            }
            SyncProgress::PhotosStart { count } => {
                photo_total = count as u64;
                let pb = mp.add(ProgressBar::new(photo_total));
                pb.set_style(active_style());
                pb.set_prefix("Syncing");
                pb.enable_steady_tick(std::time::Duration::from_millis(80));
                photo_pb = Some(pb);
            }
            SyncProgress::PhotoProcessed { title, .. } => {
                if let Some(ref pb) = photo_pb {
                    pb.set_message(title);
                    pb.inc(1);
                }
            }
            SyncProgress::PhotoFailed { id } => {
                if let Some(ref pb) = photo_pb {
                    pb.inc(1);
                }
                mp.println(format!("  Skipped photo {id} after repeated failures"))
                    .ok();
            }
            SyncProgress::RemovedStale { count } => {
                mp.println(format!("  Dropped {count} photos no longer present remotely"))
                    .ok();
            }
        }),
    )?;

    if let Some(pb) = photo_pb.take() {
        pb.set_style(done_style());
        pb.set_prefix("done");
        pb.finish_with_message(format!("Processed {photo_total} photos"));
    }

    println!();
    println!(
        "  Sync complete: {} added, {} updated, {} unchanged, {} removed, {} failed",
        report.added, report.updated, report.unchanged, report.removed, report.failed
    );
    println!();
    Ok(())
}
