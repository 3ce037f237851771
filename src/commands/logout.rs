use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::Config;

#[derive(Args)]
pub struct LogoutCommand {}

impl LogoutCommand {
    pub async fn execute(self) -> Result<()> {
        let mut config = Config::load()?;

        if !config.is_authenticated() {
            println!("No Spotify account is connected.");
            return Ok(());
        }

        config.clear_tokens();
        config.save()?;

        println!("{} Disconnected from Spotify.", "✓".green());

        Ok(())
    }
}
