use anyhow::Result;
use colored::Colorize;
use std::process::Command;

use crate::config::Config;

pub async fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("{}", "TuneCapsule configuration".bold());
    println!();
    print!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}

pub async fn edit_config() -> Result<()> {
    let config_file = Config::config_file()?;

    if !config_file.exists() {
        Config::default().save()?;
    }

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());
    Command::new(editor).arg(&config_file).status()?;

    println!("{} Configuration saved", "✓".green());

    Ok(())
}

pub async fn init_config(force: bool) -> Result<()> {
    let config_file = Config::config_file()?;

    if config_file.exists() && !force {
        println!(
            "Configuration file already exists at: {}",
            config_file.display()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let config = Config::default();
    config.save()?;

    println!(
        "{} Configuration initialized at: {}",
        "✓".green(),
        config_file.display()
    );
    println!();
    println!(
        "Season sizing lives under [seasons]: ideal_length (currently {})",
        config.seasons.ideal_length
    );
    println!("and exclusion_certifications keep certified projects out of seasons.");
    println!();
    println!("Edit it with: tunecapsule config edit");

    Ok(())
}
