//! Command-line interface

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use bts_detect::DetectionStatus;
use bts_protocol::{list_bands, parse_output, Band, ScanRecord};
use bts_scan::{ScanConfig, ScanConsole, ScanRequest, ScanState, ScanStatus};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

/// How often `scan` polls the session
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// GSM base-station scanner
#[derive(Parser, Debug)]
#[command(name = "btsscan")]
#[command(author, version, about = "Scan for GSM base stations with a HackRF")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file (defaults to ~/.config/btsscan/settings.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether a HackRF is connected
    Detect,

    /// List the bands a scan can cover
    Bands,

    /// Run a scan and print the towers found
    Scan {
        /// Band to scan (GSM900, DCS1800, PCS1900)
        #[arg(long)]
        band: Option<Band>,

        /// Sample rate in Hz
        #[arg(long)]
        sample_rate: Option<u32>,

        /// Receiver gain
        #[arg(long)]
        gain: Option<u32>,

        /// Simulate instead of using the HackRF
        #[arg(long)]
        simulate: bool,
    },

    /// Parse a captured scanner log
    Parse {
        /// Log file
        file: PathBuf,

        /// Band the log was captured on
        #[arg(long)]
        band: Option<Band>,
    },
}

/// Run a parsed command line
pub async fn execute(cli: Cli, mut config: ScanConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Detect => {
            let console = ScanConsole::from_config(config);
            let status = console.detect().await;
            if cli.json {
                print_json(&status)?;
            } else {
                print_detection(&status);
            }
        }
        Commands::Bands => {
            if cli.json {
                print_json(list_bands())?;
            } else {
                for band in list_bands() {
                    println!(
                        "{:<8} {:<28} {}",
                        band.name,
                        band.description,
                        band.range_display()
                    );
                }
            }
        }
        Commands::Scan {
            band,
            sample_rate,
            gain,
            simulate,
        } => {
            if simulate {
                config.prefer_simulation = true;
            }
            let request = ScanRequest {
                band,
                sample_rate,
                gain,
            };
            run_scan(ScanConsole::from_config(config), request, cli.json).await?;
        }
        Commands::Parse { file, band } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let records = parse_output(&text, band);
            info!("Parsed {} towers from {}", records.len(), file.display());
            if cli.json {
                print_json(&records)?;
            } else {
                print_records(&records);
            }
        }
    }

    Ok(())
}

/// Start a scan, follow it to the end and print the results
///
/// Ctrl-C stops the scan and prints what was found so far.
async fn run_scan(
    console: ScanConsole<bts_detect::HackRfDetector>,
    request: ScanRequest,
    json: bool,
) -> anyhow::Result<()> {
    let started = console.start(request).await?;
    eprintln!("{}", started);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(POLL_INTERVAL);

    let status = loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                let stopped = console.stop().await?;
                eprintln!("{}", stopped);
                break console.status().await;
            }
            _ = ticker.tick() => {
                let status = console.status().await;
                eprint!("\r{:<40} {:>3}%", status.operation, status.progress_percent);
                if status.state.is_terminal() {
                    eprintln!();
                    break status;
                }
            }
        }
    };

    let results = console.results();
    if json {
        print_json(&ScanReport {
            status: &status,
            results: &results,
        })?;
    } else {
        print_records(&results);
        if let Some(message) = &status.message {
            println!("{}", message);
        }
    }

    if status.state == ScanState::Failed {
        anyhow::bail!(
            "scan failed: {}",
            status.message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct ScanReport<'a> {
    status: &'a ScanStatus,
    results: &'a [ScanRecord],
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_detection(status: &DetectionStatus) {
    println!("{}: {}", status.reason.display_text(), status.summary());
    if let Some(info) = &status.device_info {
        let fields = [
            ("Board", &info.board_id),
            ("Firmware", &info.firmware),
            ("Serial", &info.serial),
            ("Part ID", &info.part_id),
            ("Hardware", &info.hardware_revision),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                println!("  {:<9} {}", label, value);
            }
        }
    }
}

fn print_records(records: &[ScanRecord]) {
    for record in records {
        println!(
            "{:<7} {:>8.2} MHz {:>7.1} dBm  {:<8} {}  LAC {:<5} CID {:<4}{}",
            record.label(),
            record.frequency_mhz,
            record.signal_dbm,
            record.band,
            record.operator(),
            record.lac,
            record.cell_id,
            if record.simulated { " [SIM]" } else { "" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_arguments() {
        let cli = Cli::parse_from([
            "btsscan",
            "scan",
            "--band",
            "dcs",
            "--gain",
            "32",
            "--simulate",
        ]);

        match cli.command {
            Commands::Scan {
                band,
                sample_rate,
                gain,
                simulate,
            } => {
                assert_eq!(band, Some(Band::Dcs1800));
                assert_eq!(sample_rate, None);
                assert_eq!(gain, Some(32));
                assert!(simulate);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["btsscan", "bands", "--json", "--config", "/tmp/bts.json"]);
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/bts.json")));
        assert!(matches!(cli.command, Commands::Bands));
    }

    #[test]
    fn test_unknown_band_is_rejected() {
        assert!(Cli::try_parse_from(["btsscan", "scan", "--band", "LTE"]).is_err());
    }

    #[tokio::test]
    async fn test_parse_command() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("kal.log");
        std::fs::write(
            &log,
            "kal: Scanning for GSM-900 base stations.\n\
             chan: 51 (935.2MHz + 0Hz)\tpower: 50000.00\n",
        )
        .unwrap();

        let cli = Cli::parse_from(["btsscan", "parse", log.to_str().unwrap()]);
        execute(cli, ScanConfig::default()).await.unwrap();

        let missing = Cli::parse_from(["btsscan", "parse", "/definitely/not/here.log"]);
        assert!(execute(missing, ScanConfig::default()).await.is_err());
    }
}
