use clap::Parser;
use log::{error, info};
use std::process;
use std::time::Duration;

use labelstudio2yolo::{
    collect_frames, export_frames, run_slideshow, RenderOptions, Result, ReviewArgs, WindowViewer,
};

fn run(args: &ReviewArgs) -> Result<()> {
    let frames = collect_frames(&args.images_dir(), &args.labels_dir())?;
    info!("Found {} images.", frames.len());

    let opts = RenderOptions {
        target_width: args.target_width,
        thickness: args.thickness,
        require_confidence: args.require_confidence,
    };

    match &args.output_dir {
        Some(out_dir) => {
            let stats = export_frames(&frames, &opts, out_dir)?;
            stats.print_summary();
            Ok(())
        }
        None => {
            let mut viewer = WindowViewer::new("YOLO Detections");
            run_slideshow(
                &frames,
                &mut viewer,
                &opts,
                Duration::from_millis(args.interval_ms),
            )
        }
    }
}

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = ReviewArgs::parse();

    if !args.dir.exists() {
        error!("The specified dir does not exist: {}", args.dir.display());
        process::exit(1);
    }

    if let Err(e) = run(&args) {
        error!("Review failed: {}", e);
        process::exit(1);
    }
}
