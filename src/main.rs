use clap::{Parser, Subcommand};
use std::path::PathBuf;

use distributed_kvs::config::{CoordinatorConfig, WorkerConfig};
use distributed_kvs::{coordinator, worker};

#[derive(Parser)]
#[command(name = "kvs", about = "Distributed key-value store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the coordinator (liveness registry).
    Coordinator {
        /// Port to listen on.
        #[arg(long, env = "KVS_PORT", default_value = "8000")]
        port: u16,
    },
    /// Run a storage worker.
    Worker {
        /// Port to listen on; reported to the coordinator.
        #[arg(long, env = "KVS_PORT")]
        port: u16,

        /// Directory holding the worker id and persistent tables.
        #[arg(long, env = "KVS_STORAGE_DIR")]
        storage_dir: PathBuf,

        /// Coordinator address as host:port.
        #[arg(long, env = "KVS_COORDINATOR")]
        coordinator: String,
    },
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
        Command::Coordinator { port } => {
            tracing::info!("Starting coordinator on port {}", port);
            coordinator::run(CoordinatorConfig::new(port)).await
        }
        Command::Worker {
            port,
            storage_dir,
            coordinator,
        } => {
            tracing::info!(
                "Starting worker on port {} (storage {}, coordinator {})",
                port,
                storage_dir.display(),
                coordinator
            );
            worker::run(WorkerConfig::new(port, storage_dir, coordinator)).await
        }
    }
}
