//! Canopy message feed CLI
//!
//! Posts, lists and watches messages in a Realtime Database collection.
//!
//! Usage:
//!   canopy-feed --database-url https://example.firebaseio.com post alice "hello"
//!   canopy-feed list --limit 10
//!   canopy-feed watch --after -NxYz...
//!
//! The `memory` backend keeps everything in process, which is only useful
//! for trying the commands out.

use anyhow::{Context, Result};
use canopy_feed::{FeedConfig, Message, MessageFeed};
use canopy_provider::DataProviderFactory;
use canopy_rest::{RestConfig, RestTree};
use canopy_store::{MemoryTree, TreeStore};
use canopy_types::ObservationType;
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "canopy-feed")]
#[command(about = "Post, list and watch Canopy feed messages")]
struct Args {
    /// Store backend
    #[arg(short, long, value_enum, default_value = "rest")]
    backend: Backend,

    /// Database root URL (rest backend)
    #[arg(long, default_value = "http://localhost:9000")]
    database_url: String,

    /// Auth token sent with every request (rest backend)
    #[arg(long)]
    auth_token: Option<String>,

    /// Collection holding the messages
    #[arg(long, default_value = "messages")]
    path: String,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Backend {
    Memory,
    Rest,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Post a message
    Post { name: String, text: String },

    /// List messages, newest first
    List {
        /// Page size
        #[arg(short, long)]
        limit: Option<usize>,

        /// Only messages older than this id
        #[arg(long)]
        before: Option<String>,
    },

    /// Print messages as they arrive, until Ctrl-C
    Watch {
        /// Only messages newer than this id
        #[arg(long)]
        after: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let store = open_store(&args)?;
    info!(backend = store.backend_name(), path = %args.path, "canopy-feed starting");

    let factory = Arc::new(DataProviderFactory::new(store));
    let config = FeedConfig {
        messages_path: args.path.clone(),
        ..Default::default()
    };
    let feed = MessageFeed::new(factory.clone(), config);

    match args.command {
        Command::Post { name, text } => {
            let mut message = Message::new(name, text);
            let id = feed
                .post_message_confirmed(&mut message)
                .await
                .context("failed to post message")?;
            println!("{id}");
        }
        Command::List { limit, before } => {
            let messages = feed
                .recent_messages(limit, before.as_deref())
                .await
                .context("failed to list messages")?;
            for message in messages {
                print_message(&message);
            }
        }
        Command::Watch { after } => {
            let handler = Box::new(|kind: ObservationType, message: Message| match kind {
                ObservationType::ChildRemoved => println!("- {}", message.id),
                ObservationType::ChildChanged => {
                    print!("~ ");
                    print_message(&message);
                }
                ObservationType::ChildAdded => print_message(&message),
            });
            let handle = match after.as_deref() {
                Some(after) => feed.observe_messages_after(after, handler),
                None => feed.observe_messages(handler),
            }
            .context("failed to start watching")?;

            tokio::signal::ctrl_c().await.context("failed to wait for Ctrl-C")?;
            feed.cancel_observation(&handle);
            info!("stopped watching");
        }
    }

    factory.teardown_all();
    Ok(())
}

fn open_store(args: &Args) -> Result<Arc<dyn TreeStore>> {
    let store: Arc<dyn TreeStore> = match args.backend {
        Backend::Memory => Arc::new(MemoryTree::new()),
        Backend::Rest => {
            let config = RestConfig {
                database_url: args.database_url.clone(),
                auth_token: args.auth_token.clone(),
                ..Default::default()
            };
            Arc::new(RestTree::new(config).context("failed to open database")?)
        }
    };
    Ok(store)
}

fn print_message(message: &Message) {
    println!(
        "{}  {}  {}: {}",
        message.id,
        message.date.format("%Y-%m-%d %H:%M:%S"),
        message.name,
        message.text
    );
}
