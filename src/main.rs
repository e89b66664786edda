use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use humbaba_lib::commands;
use humbaba_lib::config::{self, DEFAULT_CONFIG_FILE};
use humbaba_lib::models::Snowflake;
use humbaba_lib::state::AppState;

#[derive(Parser)]
#[command(name = "humbaba", version, about = "Sad panda scraper and guild tooling")]
struct Cli {
    /// The config file for Humbaba
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Overrides the data directory from the config file
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape a gallery's metadata
    Comic { url: String },
    /// List every image page of a gallery
    Pages { url: String },
    /// Download a single page, or re-host it with --upload
    Page {
        url: String,
        #[arg(long)]
        upload: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Find sad panda links in text
    Scan {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Inspect or change a guild's config
    Guild {
        guild_id: Snowflake,
        #[command(subcommand)]
        action: GuildAction,
    },
}

#[derive(Subcommand)]
enum GuildAction {
    Show,
    Nsfw {
        #[arg(action = clap::ArgAction::Set)]
        allowed: bool,
    },
    Snooping {
        #[arg(action = clap::ArgAction::Set)]
        allowed: bool,
    },
    AddArtChannel { channel_id: Snowflake },
    RemoveArtChannel { channel_id: Snowflake },
    Reset,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

async fn run(cli: Cli, state: &AppState) -> Result<(), String> {
    match cli.command {
        Command::Comic { url } => print_json(&commands::fetch_comic(state, &url).await?),
        Command::Pages { url } => print_json(&commands::fetch_comic_pages(state, &url).await?),
        Command::Page { url, upload: true, .. } => {
            println!("{}", commands::upload_page(state, &url).await?);
            Ok(())
        }
        Command::Page { url, out, .. } => {
            let path = commands::save_page(state, &url, out.as_deref()).await?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Scan { text } => print_json(&commands::scan_text(&text.join(" "))),
        Command::Guild { guild_id, action } => {
            let message = match action {
                GuildAction::Show => return print_json(&commands::guild_show(state, guild_id)?),
                GuildAction::Nsfw { allowed } => commands::guild_set_nsfw_content(state, guild_id, allowed)?,
                GuildAction::Snooping { allowed } => {
                    commands::guild_set_message_snooping(state, guild_id, allowed)?
                }
                GuildAction::AddArtChannel { channel_id } => {
                    commands::guild_add_art_channel(state, guild_id, channel_id)?
                }
                GuildAction::RemoveArtChannel { channel_id } => {
                    commands::guild_remove_art_channel(state, guild_id, channel_id)?
                }
                GuildAction::Reset => commands::guild_reset(state, guild_id)?,
            };
            println!("{}", message);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match config::load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
    };
    if let Some(dir) = cli.data_dir.clone() {
        config.data_directory = Some(dir);
    }

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
    };

    let result = run(cli, &state).await;
    state.shutdown();

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
