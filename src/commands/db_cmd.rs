use anyhow::Result;
use colored::Colorize;

use crate::storage::Storage;

pub async fn init_db(force: bool) -> Result<()> {
    let path = Storage::db_path()?;

    if path.exists() && !force {
        println!("Database already exists at: {}", path.display());
        println!("Use --force to drop and recreate it.");
        return Ok(());
    }

    let storage = Storage::open()?;
    storage.init_schema(force)?;

    println!(
        "{} Database initialized at: {}",
        "✓".green(),
        path.display()
    );

    Ok(())
}
