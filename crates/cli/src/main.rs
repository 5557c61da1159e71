mod auth;
mod backend;
mod config;
mod items_cmd;
mod list_ref;
mod lists_cmd;
mod output;
mod watch;

use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "shoplist", about = "shoplist - shared shopping lists with live sync")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        /// Email to sign in with (prompted when omitted)
        #[arg(long)]
        email: Option<String>,
    },

    /// Sign out and discard the stored token
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Show or manage your shopping lists
    Lists {
        #[command(subcommand)]
        action: Option<ListsAction>,
    },

    /// Show or manage the items of one list
    Items {
        /// List id or exact name
        list: String,
        #[command(subcommand)]
        action: Option<ItemsAction>,
    },

    /// Follow a list live until interrupted; with no list, follow the
    /// list of lists
    Watch {
        /// List id or exact name
        list: Option<String>,
    },

    /// Show or set configuration
    Config {
        /// Set the server URL
        #[arg(long)]
        server: Option<String>,

        /// Set the change-feed poll interval in milliseconds
        #[arg(long)]
        poll_interval_ms: Option<u64>,
    },
}

#[derive(Subcommand)]
enum ListsAction {
    /// Create a list
    Add { name: String },
    /// Rename a list
    Rename { id: Uuid, name: String },
    /// Delete a list and its items
    Rm { id: Uuid },
}

#[derive(Subcommand)]
enum ItemsAction {
    /// Add an item to the list
    Add { name: String },
    /// Toggle an item's checked state
    Check { id: Uuid },
    /// Delete an item
    Rm { id: Uuid },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Login { email } => auth::run_login(email).await,
        Commands::Logout => auth::run_logout().await,
        Commands::Whoami => auth::run_whoami().await,
        Commands::Lists { action } => lists_cmd::run_lists(action).await,
        Commands::Items { list, action } => items_cmd::run_items(&list, action).await,
        Commands::Watch { list } => watch::run_watch(list.as_deref()).await,
        Commands::Config {
            server,
            poll_interval_ms,
        } => {
            if server.is_none() && poll_interval_ms.is_none() {
                config::show_config()
            } else {
                config::set_config(server, poll_interval_ms)
            }
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
