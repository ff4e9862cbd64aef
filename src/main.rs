use concierge::cli;
use concierge::config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "concierge",
    version,
    about = "Tool-using party-planning chat agent with per-user quotas"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start an interactive chat (default)
    Chat {
        /// Email to sign in with (prompted when omitted)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Send a single message and print the reply
    Ask {
        #[arg(short, long)]
        user: Option<String>,
        /// Message to send
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },
    /// Show tool-usage quota for a user
    Status {
        #[arg(short, long)]
        user: Option<String>,
    },
    /// List a user's saved sessions
    Sessions {
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Delete all sessions and usage data for a user
    Reset {
        #[arg(short, long)]
        user: Option<String>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so the transcript on stdout stays clean.
    {
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;

        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }

    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(|| concierge::concierge_home().join("config.yaml"));
    let cfg = config::Config::load(&config_path).await?;

    match cli.command.unwrap_or(Command::Chat { user: None }) {
        Command::Chat { user } => {
            let identity = cli::resolve_identity(user)?;
            cli::run_chat(&cfg, identity).await
        }
        Command::Ask { user, prompt } => {
            let identity = cli::resolve_identity(user)?;
            cli::ask(&cfg, identity, &prompt.join(" ")).await
        }
        Command::Status { user } => {
            let identity = cli::resolve_identity(user)?;
            cli::show_status(&cfg, &identity).await
        }
        Command::Sessions { user } => {
            let identity = cli::resolve_identity(user)?;
            cli::list_sessions(&cfg, &identity).await
        }
        Command::Reset { user, yes } => {
            let identity = cli::resolve_identity(user)?;
            cli::reset_user(&cfg, &identity, yes).await
        }
    }
}
