//! Zephyr node binary.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use zephyr_node::config::{NodeConfig, CONFIG_FILE, DEFAULT_HOME_DIR};
use zephyr_node::util::unix_time;
use zephyr_snapshot::{builtin_manifest, can_serve_snapshots, ChunkStore, RateLimiter};

#[derive(Parser)]
#[command(name = "zephyrd")]
#[command(about = "Zephyr node daemon", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Home directory for node data
        #[arg(long, default_value = DEFAULT_HOME_DIR)]
        home: PathBuf,
    },
    /// Start the node
    Start {
        /// Home directory for node data
        #[arg(long, default_value = DEFAULT_HOME_DIR)]
        home: PathBuf,
    },
    /// Display version information
    Version,
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { home } => {
            init_tracing();
            let path = home.join(CONFIG_FILE);
            if path.exists() {
                error!(path = %path.display(), "config file already exists");
                return ExitCode::FAILURE;
            }
            let config = NodeConfig {
                data_dir: home.join("data"),
                ..NodeConfig::default()
            };
            if let Err(err) = config.save(&path) {
                error!(%err, "failed to write config");
                return ExitCode::FAILURE;
            }
            info!(path = %path.display(), "wrote default configuration");
            ExitCode::SUCCESS
        }
        Commands::Start { home } => {
            init_tracing();
            match start(&home) {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    error!(%err, "node failed to start");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Version => {
            println!("zephyrd {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
    }
}

fn start(home: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = NodeConfig::load_or_default(home)?;
    std::fs::create_dir_all(&config.data_dir)?;

    let store = Arc::new(ChunkStore::open(&config.data_dir, builtin_manifest())?);
    let _limiter = Arc::new(RateLimiter::new(
        config.snapshot.limiter_config(),
        unix_time(),
    ));

    let serving = can_serve_snapshots(&store, config.listen);
    info!(
        data_dir = %config.data_dir.display(),
        snapshot_enabled = config.snapshot.enabled,
        snapshot_chunks = store.manifest().chunk_count(),
        snapshot_chunks_present = store.manifest().chunk_count() - store.missing_chunks().len() as u32,
        serving_snapshots = serving,
        "zephyrd starting"
    );

    // The connection manager and validation engine attach here; the
    // snapshot engine is wired to them through SnapshotNetwork channels
    // (fetch path) and SnapshotServer (serve path).
    Ok(())
}
