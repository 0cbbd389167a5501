mod config;
mod serve_cmd;

use clap::{Parser, Subcommand};

use config::{CliOverrides, ReplyConfig};

#[derive(Parser)]
#[command(name = "reply", about = "Serve request handlers that return response descriptors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a reply config file with a fresh CSRF secret
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Start the demo HTTP server
    Serve {
        /// Address to bind (overrides REPLY_BIND and the config file)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides REPLY_PORT and the config file)
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Execute the `reply init` command: write config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let secret = config::generate_secret();

    let cfg = config::ConfigFile {
        server: config::ServerSection::default(),
        adapter: reply_core::AdapterConfig::default(),
        csrf: Some(config::CsrfSection {
            secret: secret.clone(),
        }),
    };

    config::save_config(&path, &cfg)?;

    println!("Config written to {}", path.display());
    println!("  server = {}:{}", cfg.server.bind, cfg.server.port);
    println!("  csrf.secret = {}...{}", &secret[..8], &secret[56..]);
    println!();
    println!("Next: run `reply serve` to start the demo server.");

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            cmd_init(force)?;
        }
        Commands::Serve { bind, port } => {
            let resolved = ReplyConfig::resolve(CliOverrides { bind, port })?;
            serve_cmd::run_serve(resolved).await?;
        }
    }

    Ok(())
}
