//! QrSlot - Main Entry Point
//!
//! Operator CLI: loads configuration, wires the reqwest adapters into the
//! credential service and runs one command. Ctrl-C abandons an in-flight
//! handshake.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qrslot_application::{
    CancellationToken, ChallengePresenter, CommandError, CredentialService, IssuerClient,
    RenderedChallenge, SessionPurpose,
};
use qrslot_domain::OwnerId;
use qrslot_infrastructure::{HttpIssuerApi, HttpPanelClient, TempFileRenderer, load_config};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// qrslot - QR-login credential slots
#[derive(Parser, Debug)]
#[command(name = "qrslot")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, used when `RUST_LOG` is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in with a QR code and store the credential
    Create {
        /// Numeric account id
        owner: OwnerId,
    },

    /// Prove account ownership with a QR code, then remove its credential
    #[command(alias = "logout")]
    Verify {
        /// Numeric account id
        owner: OwnerId,
    },

    /// Remove a credential without verification
    Remove {
        /// Numeric account id
        owner: OwnerId,
    },

    /// Show slot usage and mapped panel settings
    Status,
}

/// Prints challenges to the terminal.
struct TerminalPresenter;

impl ChallengePresenter for TerminalPresenter {
    fn present(&self, purpose: SessionPurpose, owner: &OwnerId, challenge: &RenderedChallenge) {
        println!("Scan this QR code to confirm {purpose} for account {owner}:");
        println!("  {}", challenge.payload());
        if let Some(path) = challenge.location() {
            println!("  (also written to {})", path.display());
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<String> {
    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    let issuer = IssuerClient::new(
        HttpIssuerApi::new(&config.issuer).context("failed to set up issuer client")?,
        TempFileRenderer::new(),
    );
    let panel = HttpPanelClient::new(&config.panel).context("failed to set up panel client")?;
    let service = CredentialService::new(issuer, panel, &config).context("invalid env mapping")?;

    let (token, cancel) = CancellationToken::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            token.cancel();
        }
    });

    let presenter = TerminalPresenter;
    let outcome = match cli.command {
        Command::Create { owner } => service
            .create(&owner, &presenter, &cancel)
            .await
            .map(|r| r.to_string()),
        Command::Verify { owner } => service
            .verify_then_remove(&owner, &presenter, &cancel)
            .await
            .map(|r| r.to_string()),
        Command::Remove { owner } => service.remove(&owner).await.map(|r| r.to_string()),
        Command::Status => service.status().await.map(|r| r.to_string()),
    };

    match outcome {
        Ok(message) => Ok(message),
        Err(e @ CommandError::TestMode(_)) => Ok(e.to_string()),
        Err(e) => Err(e.into()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli).await {
        Ok(message) => {
            println!("{message}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
