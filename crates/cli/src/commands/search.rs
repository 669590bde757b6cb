use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use photomirror_core::Library;

pub fn run(library: &Library, query: &str, album: Option<&str>) -> Result<()> {
    let photos = library.search(query, album)?;

    if photos.is_empty() {
        println!("No photos match '{query}'.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("Title"),
        Cell::new("Uploaded"),
        Cell::new("Views"),
        Cell::new("Tags"),
    ]);

    for photo in &photos {
        let uploaded = chrono::DateTime::from_timestamp(photo.uploaded_at, 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        table.add_row(vec![
            Cell::new(&photo.id),
            Cell::new(&photo.title),
            Cell::new(uploaded),
            Cell::new(photo.views),
            Cell::new(photo.tags.join(" ")),
        ]);
    }

    println!("{table}");
    println!("{} photos", photos.len());
    Ok(())
}
