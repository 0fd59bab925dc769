use clap::Parser;
use exam_scheduler::config::{self, Args};
use exam_scheduler::data::Catalog;
use exam_scheduler::server;
use log::{error, info};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let catalog = match &args.catalog {
        Some(path) => match config::load_catalog(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                error!("Could not load catalog {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            info!("No catalog file given; starting empty.");
            Catalog::default()
        }
    };

    if let Err(e) = server::run_server(&args, catalog).await {
        error!("Server stopped: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
