use anyhow::Result;
use clap::Args;
use colored::Colorize;
use dialoguer::Input;

use crate::api::{authorization_url, extract_code, PkceChallenge, SpotifyClient};
use crate::config::Config;

#[derive(Args)]
pub struct LoginCommand {}

impl LoginCommand {
    pub async fn execute(self) -> Result<()> {
        println!("Connect your Spotify account to TuneCapsule");
        println!();

        let mut config = Config::load()?;
        if config.auth.client_id.is_empty() {
            let client_id: String = Input::new()
                .with_prompt("Spotify application client ID")
                .interact_text()?;
            config.auth.client_id = client_id.trim().to_string();
            config.save()?;
        }

        let challenge = PkceChallenge::new();
        let url = authorization_url(
            &config.api.accounts_base_url,
            &config.auth.client_id,
            &config.auth.redirect_uri,
            &challenge,
        )?;

        println!("Open this URL in your browser and approve access:");
        println!();
        println!("  {url}");
        println!();

        let pasted: String = Input::new()
            .with_prompt("Paste the redirect URL (or just the code)")
            .interact_text()?;
        let code = extract_code(&pasted)?;

        let client = SpotifyClient::new(config)?;
        client.exchange_code(&code, &challenge.code_verifier).await?;

        match client.current_user().await {
            Ok(profile) => {
                println!();
                println!("{} Connected!", "✓".green());
                if let Some(name) = profile.display_name {
                    println!("Welcome, {name}!");
                }
                Ok(())
            }
            Err(e) => {
                println!("{} Login failed: {}", "✗".red(), e);
                Err(e)
            }
        }
    }
}
