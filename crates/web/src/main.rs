use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use lookout_web::{Config, Server, ServerError};
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

/// Serves static files and diagnostic pages described by a JSON configuration.
#[derive(Debug, Parser)]
#[command(name = "lookout", version, about)]
struct Cli {
    /// Path of the configuration file.
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Most verbose level that gets logged.
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder().with_max_level(cli.log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(cause = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), ServerError> {
    let config = Config::load(&cli.config)?;

    let mut runtime = tokio::runtime::Builder::new_multi_thread();
    runtime.enable_all().thread_name("lookout-io");
    if let Some(io_threads) = config.server_info.io_threads {
        runtime.worker_threads(io_threads);
    }

    runtime.build()?.block_on(async { Server::from_config(&config)?.start().await })
}
