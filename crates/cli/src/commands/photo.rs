use anyhow::Result;
use photomirror_core::Library;

pub fn run(library: &Library, id: &str) -> Result<()> {
    let Some((photo, albums, comments)) = library.photo(id)? else {
        println!("No photo with ID {id} in the library.");
        return Ok(());
    };

    println!();
    println!("  {} ({})", photo.title, photo.id);
    println!("  {}", "-".repeat(photo.title.len() + photo.id.len() + 3));
    if !photo.description.is_empty() {
        println!("  {}", photo.description);
    }
    if let Some(taken) = &photo.date_taken {
        println!("  Taken:    {taken}");
    }
    let uploaded = chrono::DateTime::from_timestamp(photo.uploaded_at, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!("  Uploaded: {uploaded}");
    println!("  Views:    {}", photo.views);
    if !photo.tags.is_empty() {
        println!("  Tags:     {}", photo.tags.join(" "));
    }
    if photo.removed {
        println!("  Removed remotely; kept locally for history.");
    }
    if let Some(path) = &photo.thumbnail_path {
        println!("  Thumbnail: {}", path.display());
    }

    if albums.is_empty() {
        println!("  Albums:   none");
    } else {
        println!("  Albums:");
        for album in &albums {
            println!("    {} ({})", album.title, album.id);
        }
    }

    if !comments.is_empty() {
        println!();
        println!("  Comments ({})", comments.len());
        for comment in &comments {
            println!("    {}: {}", comment.author, comment.body);
        }
    }
    println!();

    Ok(())
}
