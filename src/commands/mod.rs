mod classify;
mod config_cmd;
mod db_cmd;
mod login;
mod logout;
mod season;
mod season_query;
mod stats;
mod whoami;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use classify::ClassifyCommand;
pub use login::LoginCommand;
pub use logout::LogoutCommand;
pub use season::SeasonCommand;
pub use stats::StatsSubcommands;
pub use whoami::WhoamiCommand;

#[derive(Parser)]
#[command(name = "tunecapsule")]
#[command(about = "Keep your music close and your favorites closer", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration directory
    #[arg(long, global = true, env = "TUNECAPSULE_CONFIG_DIR")]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect a Spotify account
    Login(LoginCommand),

    /// Disconnect the Spotify account
    Logout(LogoutCommand),

    /// Show the connected Spotify account
    Whoami(WhoamiCommand),

    /// Rank or certify albums
    Classify(ClassifyCommand),

    /// Create or refresh season playlists
    Season(SeasonCommand),

    /// Show artist statistics
    #[command(subcommand)]
    Stats(StatsSubcommands),

    /// Manage the local database
    #[command(subcommand)]
    Db(DbSubcommands),

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigSubcommands),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum DbSubcommands {
    /// Initialize the database schema
    Init {
        /// Drop and recreate existing tables
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Show current configuration
    Show,

    /// Edit configuration file
    Edit,

    /// Initialize configuration with defaults
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        if self.verbose {
            tracing::info!("Verbose mode enabled");
        }

        if let Some(dir) = &self.config {
            std::env::set_var("TUNECAPSULE_CONFIG_DIR", dir);
        }

        match self.command {
            Commands::Login(cmd) => cmd.execute().await,
            Commands::Logout(cmd) => cmd.execute().await,
            Commands::Whoami(cmd) => cmd.execute().await,
            Commands::Classify(cmd) => cmd.execute().await,
            Commands::Season(cmd) => cmd.execute().await,
            Commands::Stats(subcmd) => subcmd.execute().await,
            Commands::Db(subcmd) => match subcmd {
                DbSubcommands::Init { force } => db_cmd::init_db(force).await,
            },
            Commands::Config(subcmd) => match subcmd {
                ConfigSubcommands::Show => config_cmd::show_config().await,
                ConfigSubcommands::Edit => config_cmd::edit_config().await,
                ConfigSubcommands::Init { force } => config_cmd::init_config(force).await,
            },
            Commands::Completions { shell } => {
                generate_completions(shell);
                Ok(())
            }
        }
    }
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
