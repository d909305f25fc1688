use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::annotation::label_path_for;
use crate::classes::{merge_labels, read_class_names, ClassMerge};
use crate::config::PrepareArgs;
use crate::error::Result;
use crate::io::{create_dataset_config, setup_output_directories, write_dataset_config};
use crate::types::{DatasetLayout, MoveStats, SplitData};
use crate::utils::{create_progress_bar, is_dir_empty, list_images};

/// A split is needed when neither images/train nor images/val holds anything yet
pub fn needs_split(layout: &DatasetLayout) -> io::Result<bool> {
    Ok(is_dir_empty(&layout.train_images_dir)? && is_dir_empty(&layout.val_images_dir)?)
}

/// Split the images into training, validation, and testing sets
pub fn split_images(mut images: Vec<PathBuf>, val_size: f32, test_size: f32, seed: u64) -> SplitData {
    let mut rng = StdRng::seed_from_u64(seed);
    images.shuffle(&mut rng);

    let total = images.len();
    let test_size = ((total as f32 * test_size).ceil() as usize).min(total);
    let val_size = ((total as f32 * val_size).ceil() as usize).min(total - test_size);

    let test = images.drain(0..test_size).collect();
    let val = images.drain(0..val_size).collect();

    SplitData {
        train: images,
        val,
        test,
    }
}

fn move_file(src: &Path, dst_dir: &Path) -> io::Result<PathBuf> {
    let file_name = src
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let dst = dst_dir.join(file_name);
    if fs::rename(src, &dst).is_err() {
        // rename fails across file systems
        fs::copy(src, &dst)?;
        fs::remove_file(src)?;
    }
    Ok(dst)
}

enum MoveOutcome {
    Labelled,
    Background,
    Failed,
}

fn move_group(
    images: &[PathBuf],
    labels_dir: &Path,
    images_dst: &Path,
    labels_dst: &Path,
    label: &str,
) -> Vec<MoveOutcome> {
    let pb = create_progress_bar(images.len() as u64, label);
    let outcomes = images
        .par_iter()
        .map(|image| {
            let label_path = label_path_for(image, labels_dir);
            let outcome = match move_file(image, images_dst) {
                Err(e) => {
                    warn!("Failed to move {}: {}", image.display(), e);
                    MoveOutcome::Failed
                }
                Ok(_) if label_path.exists() => match move_file(&label_path, labels_dst) {
                    Ok(_) => MoveOutcome::Labelled,
                    Err(e) => {
                        warn!("Failed to move {}: {}", label_path.display(), e);
                        MoveOutcome::Failed
                    }
                },
                Ok(_) => MoveOutcome::Background,
            };
            pb.inc(1);
            outcome
        })
        .collect();
    pb.finish_with_message(format!("{} split complete", label));
    outcomes
}

/// Move every image (and its label, if any) into its split folder
pub fn move_split(layout: &DatasetLayout, split: &SplitData) -> MoveStats {
    let mut stats = MoveStats::default();
    let groups = [
        (&split.train, &layout.train_images_dir, &layout.train_labels_dir, "Train"),
        (&split.val, &layout.val_images_dir, &layout.val_labels_dir, "Val"),
        (&split.test, &layout.test_images_dir, &layout.test_labels_dir, "Test"),
    ];

    for (images, images_dst, labels_dst, label) in groups {
        if images.is_empty() {
            continue;
        }
        let mut moved = 0;
        for outcome in move_group(images, &layout.labels_dir, images_dst, labels_dst, label) {
            match outcome {
                MoveOutcome::Labelled => moved += 1,
                MoveOutcome::Background => {
                    moved += 1;
                    stats.background += 1;
                }
                MoveOutcome::Failed => stats.failed += 1,
            }
        }
        match label {
            "Train" => stats.train = moved,
            "Val" => stats.val = moved,
            _ => stats.test = moved,
        }
    }
    stats
}

/// Collect the class merge rules from the command line and the optional mapping file.
/// Command line rules win over the file.
pub fn class_merge_from_args(args: &PrepareArgs) -> Result<ClassMerge> {
    let mut merge = match &args.merge_file {
        Some(path) => ClassMerge::from_yaml_file(path)?,
        None => ClassMerge::default(),
    };
    merge.extend(ClassMerge::from_rules(&args.merge)?);
    Ok(merge)
}

/// Merge classes, split into train/val/test when needed and write the training config.
/// Returns the path of the written config.
pub fn prepare_dataset(args: &PrepareArgs) -> Result<PathBuf> {
    let layout = DatasetLayout::new(&args.export_dir);
    if !layout.images_dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no images folder in {}", layout.root.display()),
        )
        .into());
    }

    let original = read_class_names(&layout.root)?;
    info!("Original classes: {:?}", original);

    let merge = class_merge_from_args(args)?;
    // Once a backup exists the labels may carry merged ids, so they are always
    // rebuilt from it, with the identity remap when no rules are given
    let names = if merge.is_empty() && !layout.backup_labels_dir().exists() {
        original.clone()
    } else {
        let stats = merge_labels(&layout, &original, &merge)?;
        stats.print_summary();
        let merged = merge.merged_names(&original);
        info!("Merged classes: {:?}", merged);
        merged
    };

    setup_output_directories(&layout, args.test_size > 0.0)?;

    if needs_split(&layout)? {
        let images = list_images(&layout.images_dir)?;
        if images.is_empty() {
            warn!("No images found in {}", layout.images_dir.display());
        }
        let split = split_images(images, args.val_size, args.test_size, args.seed);
        info!(
            "Splitting {} images: {} train, {} val, {} test",
            split.len(),
            split.train.len(),
            split.val.len(),
            split.test.len()
        );
        move_split(&layout, &split).print_summary();
    } else {
        info!("Existing train/val split found, keeping it.");
    }

    let with_test = args.test_size > 0.0 || !is_dir_empty(&layout.test_images_dir)?;
    let config = create_dataset_config(&layout, &names, with_test)?;
    let config_path = layout.root.join(&args.config_name);
    write_dataset_config(&config_path, &config)?;
    info!("Configuration file created at {}", config_path.display());

    Ok(config_path)
}
