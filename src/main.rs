//! xcat-web - HTTP adapter that runs xCAT commands and returns their output as JSON

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xcat_web::api::{self, AppState};
use xcat_web::config::Config;
use xcat_web::dispatch;
use xcat_web::flatten;
use xcat_web::types::CmdParams;

#[derive(Parser)]
#[command(name = "xcat-web")]
#[command(about = "Runs xCAT commands over HTTP and returns their output as JSON")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file with the effective settings
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one command and print the JSON reply
    Run {
        /// xCAT command, e.g. rinv
        cmd: String,

        /// Target node or group
        #[arg(short, long)]
        tgt: Option<String>,

        /// Arguments, separated by semicolons
        #[arg(short, long)]
        args: Option<String>,

        /// Message echoed back in the reply
        #[arg(short, long)]
        msg: Option<String>,
    },

    /// Print the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("xcat_web={},tower_http=debug", log_level).into()
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load environment
    let _ = dotenvy::dotenv();

    // Load config
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Init { force } => {
            let path = match cli.config.clone().or_else(Config::default_path) {
                Some(path) => path,
                None => anyhow::bail!("No home directory; pass --config <path>"),
            };
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }

            tracing::info!("Writing config to {:?}", path);
            config.save_to(&path)?;

            println!("✓ Config written to {}", path.display());
            println!("\nNext steps:");
            println!("  1. Point [dispatcher] at your xcatd in {}", path.display());
            println!("  2. Run `xcat-web run nodels --tgt all` to check the connection");
            println!("  3. Run `xcat-web serve` to start the HTTP server");
        }

        Commands::Serve { port } => {
            let port = port.unwrap_or(config.http_port);
            let state = AppState::new(dispatch::from_config(&config));
            let router = api::create_router(state);

            let addr = format!("{}:{}", config.bind_address, port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            tracing::info!("Starting HTTP server on {}", addr);
            tracing::info!("Dispatcher: {:?}", config.dispatcher);

            println!("xcat-web running at http://localhost:{}", port);
            println!("  Commands: http://localhost:{}/api/cmd?cmd=...", port);
            println!("  API Docs: http://localhost:{}/api/docs", port);
            println!("  Health:   http://localhost:{}/health", port);

            axum::serve(listener, router).await?;
        }

        Commands::Run { cmd, tgt, args, msg } => {
            let params = CmdParams {
                cmd: Some(cmd),
                tgt,
                args,
                msg,
            };
            let dispatcher = dispatch::from_config(&config);
            let out = flatten::run(dispatcher.as_ref(), &params).await?;
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Commands::ShowConfig => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
