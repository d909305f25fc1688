use clap::Parser;
use log::{error, info};
use std::process;

use labelstudio2yolo::{train, TrainArgs};

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = TrainArgs::parse();

    let data = args.data_path();
    info!("Training on {}", data.display());
    if let Err(e) = train(&data, &args.training) {
        error!("Training failed: {}", e);
        process::exit(1);
    }
}
