use clap::Parser;
use log::{error, info};
use std::process;

use labelstudio2yolo::{prepare_dataset, train, PrepareArgs};

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = PrepareArgs::parse();

    if !args.export_dir.exists() {
        error!(
            "The specified export_dir does not exist: {}",
            args.export_dir.display()
        );
        process::exit(1);
    }

    info!("Preparing dataset in {}...", args.export_dir.display());
    let config_path = match prepare_dataset(&args) {
        Ok(path) => path,
        Err(e) => {
            error!("Failed to prepare dataset: {}", e);
            process::exit(1);
        }
    };

    if args.train {
        if let Err(e) = train(&config_path, &args.training) {
            error!("Training failed: {}", e);
            process::exit(1);
        }
    }
}
