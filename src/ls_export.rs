use clap::Parser;
use log::{error, info, warn};
use std::process;
use std::time::Duration;

use labelstudio2yolo::export::DownloadOptions;
use labelstudio2yolo::{
    download_images, extract_archive, images_to_fetch, ExportArgs, LabelStudioClient, Result,
};

fn run(args: &ExportArgs) -> Result<()> {
    let client = LabelStudioClient::new(
        &args.url,
        &args.token,
        Duration::from_secs(args.timeout_secs),
    )?;

    let zip_path = client.export_project(args.project, &args.export_type, &args.export_dir)?;
    extract_archive(&zip_path, &args.export_dir)?;

    // The export only carries annotations, the images have to be fetched one by one
    let labels_dir = args.export_dir.join("labels");
    if !labels_dir.is_dir() {
        warn!(
            "No labels folder in {}, nothing to download.",
            args.export_dir.display()
        );
        return Ok(());
    }
    let names = images_to_fetch(&labels_dir, &args.image_ext)?;
    info!("Downloading {} images...", names.len());

    let options = DownloadOptions {
        delay: Duration::from_millis(args.delay_ms),
        skip_existing: args.skip_existing,
    };
    let stats = download_images(
        &client,
        args.project,
        &names,
        &args.export_dir.join("images"),
        &options,
    )?;
    stats.print_summary();
    Ok(())
}

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = ExportArgs::parse();

    info!("Starting the export process...");
    if let Err(e) = run(&args) {
        error!("Export failed: {}", e);
        process::exit(1);
    }
    info!("Export complete.");
}
