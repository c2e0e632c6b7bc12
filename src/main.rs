//! Jitter Entropy CLI
//!
//! Command-line front-end for the jitter entropy collector. Verifies
//! the platform timer, then emits entropy to stdout either as a fixed
//! number of bytes or as a continuous stream.

use clap::{Parser, Subcommand};
use jitter_entropy::{init, CollectorConfig, EntropyCollector, FileConfig};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

/// Bytes emitted per collector read in stream mode.
const STREAM_CHUNK: usize = 256;

#[derive(Parser)]
#[command(name = "jitter-entropy")]
#[command(about = "True random number generator based on CPU timing jitter")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Oversampling rate (overrides config file)
    #[arg(long)]
    osr: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the startup health test and report the verdict
    Check,
    /// Generate random bytes to stdout
    Generate {
        /// Number of bytes to generate
        #[arg(short = 'n', long, default_value = "32")]
        bytes: usize,
        /// Output as hex instead of raw bytes
        #[arg(long)]
        hex: bool,
    },
    /// Stream raw random bytes to stdout until interrupted
    Stream,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli);

    match cli.command {
        Some(Commands::Check) => run_check(),
        Some(Commands::Generate { bytes, hex }) => generate(&config, bytes, hex),
        Some(Commands::Stream) => stream(&config),
        None => generate(&config, config_bytes(&cli), false),
    }
}

fn load_config(cli: &Cli) -> CollectorConfig {
    let mut collector = cli
        .config
        .as_ref()
        .map(|path| {
            FileConfig::from_file(path).unwrap_or_else(|e| {
                eprintln!("Failed to load config file: {}", e);
                std::process::exit(1);
            })
        })
        .map(|file| file.collector)
        .unwrap_or_default();

    // CLI overrides
    if let Some(osr) = cli.osr {
        collector.osr = osr;
    }
    collector
}

fn config_bytes(cli: &Cli) -> usize {
    cli.config
        .as_ref()
        .and_then(|path| FileConfig::from_file(path).ok())
        .map(|file| file.output.bytes)
        .unwrap_or(32)
}

fn run_check() {
    match init() {
        Ok(()) => {
            println!("timer ok: platform is fit for jitter collection");
        }
        Err(e) => {
            eprintln!("timer unfit: {}", e);
            std::process::exit(1);
        }
    }
}

fn verified_collector(config: &CollectorConfig) -> EntropyCollector {
    if let Err(e) = init() {
        eprintln!("Platform timer unfit for jitter collection: {}", e);
        eprintln!("\nTroubleshooting:");
        eprintln!("  - Run 'jitter-entropy check' for the specific failure");
        eprintln!("  - Virtualized guests may lack a high-resolution timer");
        std::process::exit(1);
    }

    match EntropyCollector::with_config(config) {
        Ok(collector) => collector,
        Err(e) => {
            eprintln!("Failed to allocate collector: {}", e);
            std::process::exit(1);
        }
    }
}

fn generate(config: &CollectorConfig, byte_count: usize, hex_output: bool) {
    let mut collector = verified_collector(config);

    let mut output = vec![0u8; byte_count];
    if let Err(e) = collector.read(&mut output) {
        eprintln!("Entropy read failed: {}", e);
        std::process::exit(1);
    }

    if hex_output {
        println!(
            "{}",
            output.iter().map(|b| format!("{:02x}", b)).collect::<String>()
        );
    } else {
        std::io::stdout().write_all(&output).unwrap_or_else(|e| {
            eprintln!("Failed to write output: {}", e);
            std::process::exit(1);
        });
    }
}

fn stream(config: &CollectorConfig) {
    info!("Jitter Entropy v{}", jitter_entropy::VERSION);

    let mut collector = verified_collector(config);

    // Set up Ctrl+C handler
    let running = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, std::sync::atomic::Ordering::SeqCst);
    })
    .ok();

    info!("Streaming entropy to stdout...");

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    let mut buf = [0u8; STREAM_CHUNK];
    let mut chunks = 0u64;

    while running.load(std::sync::atomic::Ordering::SeqCst) {
        if let Err(e) = collector.read(&mut buf) {
            warn!("Entropy read failed: {}", e);
            std::process::exit(1);
        }
        if handle.write_all(&buf).is_err() {
            // Reader went away (broken pipe); a normal way to stop.
            break;
        }
        chunks += 1;

        // Periodic status update
        if chunks % 1000 == 0 {
            info!(
                "Status: {} chunks, {} bytes emitted",
                chunks,
                chunks * STREAM_CHUNK as u64
            );
        }
    }

    info!(
        "Finished: {} chunks, {} bytes emitted",
        chunks,
        chunks * STREAM_CHUNK as u64
    );
}
