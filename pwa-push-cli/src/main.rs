//! pwa-push CLI - VAPID keys, tokens and Web Push delivery.
//!
//! # Commands
//!
//! - `pwa-push keygen` - Generate a VAPID key pair
//! - `pwa-push jwt --endpoint <url>` - Print a signed VAPID token
//! - `pwa-push send --subscriptions <file> --title .. --body ..` - Deliver a notification
//! - `pwa-push publish --event <file> --subscriptions <file>` - Run trigger scenarios
//!
//! Settings come from `--config` (JSON, TOML or `.env`) and `PWA_PUSH_*`
//! environment variables.

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use pwa_push_log::{Level, LogConfig};
use std::path::PathBuf;

mod commands;
mod error;

use commands::{jwt, keygen, publish, send};
use error::CliResult;

/// Web Push delivery with VAPID authentication
#[derive(Parser)]
#[command(name = "pwa-push")]
#[command(version)]
#[command(about = "VAPID key management and Web Push delivery")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (JSON, TOML or .env)
    #[arg(short, long, global = true, env = "PWA_PUSH_CONFIG")]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors and the summary
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a VAPID key pair
    #[command(alias = "k")]
    Keygen(KeygenArgs),

    /// Print a signed VAPID token for a push endpoint
    Jwt(JwtArgs),

    /// Send a notification to a list of subscriptions
    #[command(alias = "s")]
    Send(SendArgs),

    /// Run trigger scenarios for a publish event
    #[command(alias = "p")]
    Publish(PublishArgs),
}

#[derive(Args)]
struct KeygenArgs {
    /// Write the keys to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit JSON instead of .env lines
    #[arg(long)]
    json: bool,

    /// Overwrite an existing output file
    #[arg(short, long)]
    force: bool,
}

#[derive(Args)]
struct JwtArgs {
    /// Push service endpoint URL
    #[arg(short, long)]
    endpoint: String,

    /// Print the full Authorization header value
    #[arg(long)]
    header: bool,
}

#[derive(Args)]
struct SendArgs {
    /// JSON file with an array of subscriptions
    #[arg(short, long)]
    subscriptions: PathBuf,

    /// Notification title
    #[arg(short, long)]
    title: String,

    /// Notification body
    #[arg(short, long)]
    body: String,

    /// URL opened on click
    #[arg(short, long)]
    url: Option<String>,

    /// Icon URL
    #[arg(long)]
    icon: Option<String>,

    /// Grouping tag
    #[arg(long)]
    tag: Option<String>,

    /// Write endpoints reported as gone to this file
    #[arg(long)]
    gone_output: Option<PathBuf>,
}

#[derive(Args)]
struct PublishArgs {
    /// JSON file describing the published content
    #[arg(short, long)]
    event: PathBuf,

    /// JSON file with an array of subscriptions
    #[arg(short, long)]
    subscriptions: PathBuf,

    /// JSON file with an array of scenarios
    #[arg(long)]
    scenarios: Option<PathBuf>,
}

fn init_logging(cli: &Cli) {
    let mut config = LogConfig::from_env();
    if cli.verbose {
        config = config.level(Level::Debug);
    } else if cli.quiet {
        config = config.level(Level::Error);
    }
    if cli.no_color {
        config.color = false;
    }
    let _ = pwa_push_log::try_init_with(&config);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    init_logging(&cli);

    let config = cli.config.as_deref();
    let result: CliResult<()> = match cli.command {
        Commands::Keygen(args) => keygen::execute(args.output.as_deref(), args.json, args.force),
        Commands::Jwt(args) => jwt::execute(config, &args.endpoint, args.header),
        Commands::Send(args) => {
            let args = send::SendArgs {
                subscriptions: args.subscriptions,
                title: args.title,
                body: args.body,
                url: args.url,
                icon: args.icon,
                tag: args.tag,
                gone_output: args.gone_output,
            };
            send::run(config, args, cli.quiet).await
        }
        Commands::Publish(args) => {
            publish::run(
                config,
                &args.event,
                &args.subscriptions,
                args.scenarios.as_deref(),
                cli.quiet,
            )
            .await
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
