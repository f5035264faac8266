use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatharvest::{Harvester, ReplayDriver};
use chatharvest_common::{ChatSummary, ChatType, Config};

#[derive(Parser)]
#[command(name = "chatharvest", about = "Harvest chats, posts and members from a chat web UI")]
struct Cli {
    /// Replay page fixture (JSON) to run against
    #[arg(long)]
    fixture: PathBuf,

    /// Keep the configured waits and settle delays instead of replay timing
    #[arg(long)]
    realtime: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every chat, archived ones included unless disabled
    Chats,
    /// Posts of one chat, sorted by message id
    Posts {
        #[command(flatten)]
        chat: ChatArgs,
        #[arg(long)]
        max_posts: Option<usize>,
    },
    /// Members of one chat, enriched from their profiles
    Subscribers {
        #[command(flatten)]
        chat: ChatArgs,
    },
    /// Side panel details of one chat
    Details {
        #[command(flatten)]
        chat: ChatArgs,
    },
}

#[derive(Args)]
struct ChatArgs {
    /// Chat URL as returned by `chats`
    #[arg(long)]
    url: String,
    #[arg(long, default_value = "")]
    title: String,
    /// Treat the chat as private so posts are attributed to its title
    #[arg(long)]
    private: bool,
}

impl ChatArgs {
    fn summary(self) -> ChatSummary {
        ChatSummary {
            title: self.title,
            url: self.url,
            chat_type: if self.private {
                ChatType::Private
            } else {
                ChatType::Group
            },
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("chatharvest=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if !cli.realtime {
        config = config.with_replay_timing();
    }
    config.log_summary();

    let driver = ReplayDriver::from_json_file(&cli.fixture)?;
    info!(fixture = %cli.fixture.display(), "Replay driver ready");

    let harvester = Harvester::builder()
        .driver(Arc::new(driver))
        .config(config)
        .build();

    match cli.command {
        Command::Chats => print_json(&harvester.chats().await?)?,
        Command::Posts { chat, max_posts } => {
            print_json(&harvester.posts(&chat.summary(), max_posts).await?)?
        }
        Command::Subscribers { chat } => {
            print_json(&harvester.subscribers(&chat.summary()).await?)?
        }
        Command::Details { chat } => print_json(&harvester.details(&chat.summary()).await?)?,
    }

    Ok(())
}
