use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::api::SpotifyClient;
use crate::config::Config;

#[derive(Args)]
pub struct WhoamiCommand {}

impl WhoamiCommand {
    pub async fn execute(self) -> Result<()> {
        let config = Config::load()?;

        if !config.is_authenticated() {
            println!("No Spotify account is connected.");
            println!();
            println!("Use 'tunecapsule login' to connect one.");
            return Ok(());
        }

        let client = SpotifyClient::new(config)?;

        match client.current_user().await {
            Ok(profile) => {
                println!("{} Connected as:", "✓".green());
                println!();
                if let Some(name) = profile.display_name {
                    println!("  Name:    {name}");
                }
                if let Some(email) = profile.email {
                    println!("  Email:   {email}");
                }
                println!("  User ID: {}", profile.id);

                Ok(())
            }
            Err(e) => {
                println!("{} Failed to fetch profile: {}", "✗".red(), e);
                println!();
                println!("Your tokens may have expired. Use 'tunecapsule login' again.");
                Err(e)
            }
        }
    }
}
