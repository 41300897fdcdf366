//! Command line console for payment terminals.

mod commands;
mod repl;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use ecrlink_client::{ChannelKind, CommConfig, Terminal};
use ecrlink_protocol::{BatchType, CardBrand, EdcType, Money, ReportType, TenderType};

use commands::{parse_batch_op, parse_brand, parse_edc, parse_money, parse_report_kind, parse_tender};

#[derive(Parser)]
#[command(name = "ecrlink", version, about = "Drive a payment terminal over serial, network or bluetooth")]
struct Cli {
    /// Link configuration file (YAML)
    #[arg(long, env = "ECRLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Channel kind: serial, network or wireless
    #[arg(long)]
    kind: Option<String>,

    /// Terminal host (network channel)
    #[arg(long, env = "ECRLINK_HOST")]
    host: Option<String>,

    /// Terminal port (network channel)
    #[arg(long, env = "ECRLINK_PORT")]
    port: Option<u16>,

    /// Serial device node (serial channel)
    #[arg(long, env = "ECRLINK_DEVICE")]
    device: Option<String>,

    /// Exchange timeout in milliseconds; -1 waits forever
    #[arg(long)]
    timeout_ms: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a sale
    Sale {
        /// Amount as a decimal, e.g. 10.99
        #[arg(value_parser = parse_money)]
        amount: Money,
        /// Tender type by name, e.g. credit, debit, ebt
        #[arg(long, default_value = "credit", value_parser = parse_tender)]
        tender: TenderType,
        /// Tip amount
        #[arg(long, value_parser = parse_money)]
        tip: Option<Money>,
        /// Clerk identifier
        #[arg(long)]
        clerk: Option<String>,
        /// Invoice number
        #[arg(long)]
        invoice: Option<String>,
    },
    /// Authorize without capture
    Auth {
        #[arg(value_parser = parse_money)]
        amount: Money,
        #[arg(long, default_value = "credit", value_parser = parse_tender)]
        tender: TenderType,
    },
    /// Return funds to the customer
    Refund {
        #[arg(value_parser = parse_money)]
        amount: Money,
        #[arg(long, default_value = "credit", value_parser = parse_tender)]
        tender: TenderType,
    },
    /// Void a prior transaction by its reference number
    Void {
        reference: String,
        #[arg(long, default_value = "credit", value_parser = parse_tender)]
        tender: TenderType,
    },
    /// Adjust the tip on a prior transaction
    Adjust {
        reference: String,
        #[arg(value_parser = parse_money)]
        tip: Money,
        #[arg(long, default_value = "credit", value_parser = parse_tender)]
        tender: TenderType,
    },
    /// Force an offline-approved transaction through
    Force {
        #[arg(value_parser = parse_money)]
        amount: Money,
        /// Approval code from the voice authorization
        auth_code: String,
        #[arg(long, default_value = "credit", value_parser = parse_tender)]
        tender: TenderType,
    },
    /// Verify a card without moving funds
    Verify,
    /// Query a card balance
    Inquiry {
        #[arg(long, default_value = "gift", value_parser = parse_tender)]
        tender: TenderType,
    },
    /// Initialize the terminal and report its identity
    Init,
    /// Reset the terminal display
    Reset,
    /// Reboot the terminal
    Reboot,
    /// Capture a signature from the terminal pad
    Signature,
    /// Show message lines on the terminal display
    ShowMessage {
        /// Lines, top to bottom
        #[arg(required = true)]
        lines: Vec<String>,
    },
    /// Set a terminal variable
    SetVar { name: String, value: String },
    /// Read a terminal variable
    GetVar { name: String },
    /// Run a batch operation
    Batch {
        /// close, force-close, clear, purge, saf-upload or delete-saf
        #[arg(value_parser = parse_batch_op)]
        op: BatchType,
        /// Channel scope by name, e.g. all, credit
        #[arg(long, default_value = "all", value_parser = parse_edc)]
        edc: EdcType,
        /// Batch timestamp for force-close, YYYYMMDDhhmmss
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Query a report
    Report {
        /// totals, detail, failed, host, history or saf
        #[arg(value_parser = parse_report_kind)]
        kind: ReportType,
        #[arg(long, default_value = "all", value_parser = parse_edc)]
        edc: EdcType,
        /// Record number for detail queries
        #[arg(long)]
        record: Option<u32>,
        /// Card brand filter by name, e.g. visa
        #[arg(long, value_parser = parse_brand)]
        brand: Option<CardBrand>,
    },
    /// Ask the terminal whether it is ready
    Status,
    /// Interactive console
    Repl,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    tracing::debug!(target = %config.target(), "connecting");

    let mut terminal = Terminal::connect(&config).await?;
    match cli.command {
        Commands::Repl => repl::run(&mut terminal).await?,
        command => {
            let output = commands::execute(&mut terminal, command).await?;
            println!("{output}");
        }
    }
    terminal.close().await?;
    Ok(())
}

fn build_config(cli: &Cli) -> Result<CommConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => CommConfig::from_file(path)?,
        None => CommConfig::default(),
    };
    config.apply_env_overrides();

    if let Some(kind) = &cli.kind {
        config.kind = match kind.as_str() {
            "serial" => ChannelKind::Serial,
            "network" => ChannelKind::Network,
            "wireless" => ChannelKind::Wireless,
            other => return Err(format!("unknown channel kind: {other}").into()),
        };
    }
    if let Some(host) = &cli.host {
        config.network.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    if let Some(device) = &cli.device {
        config.serial.device = device.clone();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    config.validate()?;
    Ok(config)
}
