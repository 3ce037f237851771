use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::stats::{heat_check, street_cred};
use crate::storage::Storage;

#[derive(Subcommand)]
pub enum StatsSubcommands {
    /// Street cred: cumulative volume of quality music
    Cred(StatsArgs),

    /// Heat check: minutes of recent music holding a high quality level
    Heat(StatsArgs),
}

#[derive(Args)]
pub struct StatsArgs {
    /// Artist: Spotify ID or exact stored name
    artist: String,

    /// Compute the score as of this date (YYYY-MM-DD)
    #[arg(long)]
    as_of: Option<String>,
}

impl StatsSubcommands {
    pub async fn execute(self) -> Result<()> {
        type ScoreFn = fn(&[crate::storage::ScoredProject], Option<NaiveDate>) -> f64;
        let (label, args, score_fn): (&str, StatsArgs, ScoreFn) = match self {
            StatsSubcommands::Cred(args) => ("Street cred", args, street_cred),
            StatsSubcommands::Heat(args) => ("Heat check", args, heat_check),
        };

        let as_of = args
            .as_of
            .as_deref()
            .map(|raw| {
                raw.parse::<NaiveDate>()
                    .with_context(|| format!("Invalid date: {raw} (expected YYYY-MM-DD)"))
            })
            .transpose()?;

        let storage = Storage::open()?;
        let projects = storage.ranked_projects_for_artist(&args.artist)?;
        let score = score_fn(&projects, as_of);

        println!(
            "{}: {} for {}",
            label,
            format!("{score:.1}").bold(),
            args.artist
        );
        if let Some(date) = as_of {
            println!("  as of {date}");
        }
        println!("  over {} ranked projects", projects.len());

        Ok(())
    }
}
