use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use photomirror_core::Library;

pub fn run(library: &Library) -> Result<()> {
    let albums = library.albums()?;

    if albums.is_empty() {
        println!("No albums in the library. Run 'photomirror sync' first.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("Title"),
        Cell::new("Photos"),
        Cell::new("Created"),
    ]);

    for album in &albums {
        let created = match album.created_at {
            Some(ts) => chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            None => "unknown".to_string(),
        };
        table.add_row(vec![
            Cell::new(&album.id),
            Cell::new(&album.title),
            Cell::new(album.photo_count),
            Cell::new(created),
        ]);
    }

    println!("{table}");
    Ok(())
}
