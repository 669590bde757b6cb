use anyhow::Result;
use photomirror_core::Library;

pub fn run(library: &Library) -> Result<()> {
    let stats = library.status()?;

    let last_sync = match stats.last_sync {
        Some(ts) => chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        None => "never".to_string(),
    };

    println!();
    println!("  Photomirror Status");
    println!("  ==================");
    println!();
    println!(
        "   Photos:       {:>8}        Albums:       {:>8}",
        stats.total_photos, stats.total_albums
    );
    println!(
        "   Removed:      {:>8}        Associations: {:>8}",
        stats.removed_photos, stats.total_associations
    );
    println!("   Last sync:    {last_sync}");
    println!();
    println!("  Run 'photomirror sync' to pull remote changes.");
    println!();

    Ok(())
}
