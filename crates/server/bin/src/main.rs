//! Workload Launcher
//!
//! Entry point: launches one workload, evicts the pods holding a mutex key,
//! or checks whether pods exist for an auto id.

mod commands;
mod startup;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

/// CLI arguments for workload-launcher
#[derive(clap::Parser, Debug)]
#[command(name = "workload-launcher")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Translates workloads into Kubernetes pods and waits for them", long_about = None)]
struct Args {
    /// Optional .env file loaded before reading the environment
    #[arg(long, env = "LAUNCHER_ENV_FILE", global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Launch the workload described by a JSON request file
    Launch {
        #[arg(long)]
        request: PathBuf,
    },
    /// Delete every active pod labeled with a mutex key
    Evict {
        #[arg(long)]
        mutex_key: String,
    },
    /// Report whether pods labeled with an auto id are pending or running
    Exists {
        #[arg(long)]
        auto_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = startup::load_config(args.env_file)?;
    startup::setup_logging(&config);
    let launcher = startup::build_orchestrator(&config).await?;

    match args.command {
        Command::Launch { request } => commands::launch(&launcher, &request).await,
        Command::Evict { mutex_key } => commands::evict(&launcher, &mutex_key).await,
        Command::Exists { auto_id } => commands::exists(&launcher, auto_id).await,
    }
}
