use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::DatasetLayout;
use crate::utils::ensure_directory;

/// Training data description consumed by the Ultralytics trainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub path: String,
    pub train: String,
    pub val: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    pub nc: usize,
    pub names: Vec<String>,
}

/// Set up the train/val (and optionally test) folders, keeping existing content
pub fn setup_output_directories(layout: &DatasetLayout, with_test: bool) -> std::io::Result<()> {
    ensure_directory(&layout.train_images_dir)?;
    ensure_directory(&layout.val_images_dir)?;
    ensure_directory(&layout.train_labels_dir)?;
    ensure_directory(&layout.val_labels_dir)?;
    if with_test {
        ensure_directory(&layout.test_images_dir)?;
        ensure_directory(&layout.test_labels_dir)?;
    }
    Ok(())
}

/// Build the config with absolute split paths
pub fn create_dataset_config(
    layout: &DatasetLayout,
    names: &[String],
    with_test: bool,
) -> std::io::Result<DatasetConfig> {
    let absolute = |path: &Path| -> std::io::Result<String> {
        Ok(fs::canonicalize(path)?.to_string_lossy().into_owned())
    };
    Ok(DatasetConfig {
        path: absolute(&layout.root)?,
        train: absolute(&layout.train_images_dir)?,
        val: absolute(&layout.val_images_dir)?,
        test: if with_test {
            Some(absolute(&layout.test_images_dir)?)
        } else {
            None
        },
        nc: names.len(),
        names: names.to_vec(),
    })
}

pub fn write_dataset_config(path: &Path, config: &DatasetConfig) -> Result<()> {
    let yaml = serde_yaml::to_string(config).map_err(|source| Error::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(yaml.as_bytes())?;
    writer.flush()?;
    Ok(())
}

pub fn read_dataset_config(path: &Path) -> Result<DatasetConfig> {
    let content = fs::read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(|source| Error::Yaml {
        path: path.to_path_buf(),
        source,
    })
}
