use clap::{Args, Parser, Subcommand};
use heraldconfig::Config;

mod commands;
mod logging;

use commands::RunOptions;

#[derive(Parser)]
#[command(
    name = "herald",
    version,
    about = "Speaks the artist name when Spotify moves on to a new artist"
)]
struct Cli {
    /// Configuration directory (default: $HERALD_CONFIG, ./.herald, ~/.herald)
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start announcing until Ctrl-C
    Run(RunArgs),
    /// Authorize Herald to read and control your Spotify player
    Authorize {
        #[arg(long)]
        client_id: Option<String>,
        #[arg(long)]
        client_secret: Option<String>,
        #[arg(long)]
        redirect_uri: Option<String>,
    },
    /// Show what Spotify is playing right now
    Status,
}

#[derive(Args)]
struct RunArgs {
    /// Include song titles in announcements
    #[arg(long)]
    songs: bool,
    /// Include album titles in announcements
    #[arg(long)]
    albums: bool,
    /// Announce at the start of the new artist's track
    #[arg(long)]
    at_start: bool,
    /// Store these options in the configuration file
    #[arg(long)]
    save: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load_config(cli.config_dir.as_deref().unwrap_or(""))?;
    logging::init_logging(&config);

    match cli.command {
        Commands::Run(args) => {
            let options = RunOptions {
                songs: args.songs,
                albums: args.albums,
                at_start: args.at_start,
                save: args.save,
            };
            commands::run(&config, options).await
        }
        Commands::Authorize {
            client_id,
            client_secret,
            redirect_uri,
        } => commands::authorize(&config, client_id, client_secret, redirect_uri),
        Commands::Status => commands::status(&config),
    }
}
