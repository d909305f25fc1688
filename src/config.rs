use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

/// Default directory the exporter writes to and the other tools read from.
pub const DEFAULT_EXPORT_DIR: &str = "exported_data/yolo";

/// Download a Label Studio project as a YOLO dataset, including its images.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct ExportArgs {
    /// Root URL of the Label Studio server, e.g. https://labelstudio.example.org
    #[arg(short = 'u', long = "url")]
    pub url: String,

    /// Project id to export
    #[arg(short = 'p', long = "project")]
    pub project: u32,

    /// API token used for the `Authorization: Token` header
    #[arg(long = "token", env = "LABEL_STUDIO_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Directory to save the exported data in
    #[arg(short = 'o', long = "export_dir", default_value = DEFAULT_EXPORT_DIR)]
    pub export_dir: PathBuf,

    /// Export type requested from the server
    #[arg(long = "export_type", default_value = "YOLO")]
    pub export_type: String,

    /// Extension of the uploaded images, used to derive image names from label files
    #[arg(long = "image_ext", default_value = "jpg")]
    pub image_ext: String,

    /// Delay between consecutive image downloads in milliseconds
    #[arg(long = "delay_ms", default_value_t = 1000)]
    pub delay_ms: u64,

    /// Skip images that already exist in the images directory
    #[arg(long = "skip_existing")]
    pub skip_existing: bool,

    /// Request timeout in seconds
    #[arg(long = "timeout_secs", default_value_t = 300)]
    pub timeout_secs: u64,
}

/// Options forwarded to the external YOLO trainer.
#[derive(clap::Args, Debug, Clone)]
pub struct TrainOptions {
    /// Pretrained weights to start from
    #[arg(long = "model", default_value = "yolov8n.pt")]
    pub model: String,

    /// Number of training epochs
    #[arg(long = "epochs", default_value_t = 100)]
    pub epochs: u32,

    /// Training image size
    #[arg(long = "imgsz", default_value_t = 640)]
    pub imgsz: u32,

    /// Batch size
    #[arg(long = "batch", default_value_t = 1)]
    pub batch: u32,

    /// Trainer executable
    #[arg(long = "yolo_bin", default_value = "yolo")]
    pub yolo_bin: PathBuf,

    /// Device to train on, e.g. `0` or `cpu`
    #[arg(long = "device")]
    pub device: Option<String>,

    /// Directory the trainer writes its runs to
    #[arg(long = "project")]
    pub runs_dir: Option<String>,

    /// Name of the training run
    #[arg(long = "name")]
    pub run_name: Option<String>,

    /// Only log the command that would be run
    #[arg(long = "dry_run")]
    pub dry_run: bool,
}

/// Merge classes, split an exported dataset into train/val and write the training config.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct PrepareArgs {
    /// Directory holding the exported images/, labels/ and classes.txt
    #[arg(short = 'd', long = "export_dir", default_value = DEFAULT_EXPORT_DIR)]
    pub export_dir: PathBuf,

    /// Proportion of the dataset to use for validation
    #[arg(long = "val_size", default_value_t = 0.2, value_parser = validate_size)]
    pub val_size: f32,

    /// Proportion of the dataset to use for testing
    #[arg(long = "test_size", default_value_t = 0.0, value_parser = validate_size)]
    pub test_size: f32,

    /// Seed for random shuffling
    #[arg(long = "seed", default_value_t = 42)]
    pub seed: u64,

    /// Class merge rule `FROM=TO`, may be repeated
    #[arg(long = "merge")]
    pub merge: Vec<String>,

    /// YAML file mapping original class names to merged names
    #[arg(long = "merge_file")]
    pub merge_file: Option<PathBuf>,

    /// File name of the generated training config
    #[arg(long = "config_name", default_value = "config.yaml")]
    pub config_name: String,

    /// Launch training once the dataset is prepared
    #[arg(long = "train")]
    pub train: bool,

    #[command(flatten)]
    pub training: TrainOptions,
}

/// Train a YOLO model on a prepared dataset.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct TrainArgs {
    /// Training config; defaults to config.yaml inside the export directory
    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    /// Directory holding the prepared dataset
    #[arg(short = 'd', long = "export_dir", default_value = DEFAULT_EXPORT_DIR)]
    pub export_dir: PathBuf,

    #[command(flatten)]
    pub training: TrainOptions,
}

impl TrainArgs {
    pub fn data_path(&self) -> PathBuf {
        self.data
            .clone()
            .unwrap_or_else(|| self.export_dir.join("config.yaml"))
    }
}

/// Slideshow of images with their YOLO boxes drawn in red.
///
/// Space pauses and resumes, left/right step through frames while paused,
/// escape exits.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct ReviewArgs {
    /// Base folder containing images/ and labels/
    #[arg(short = 'd', long = "dir")]
    pub dir: PathBuf,

    /// Override the images folder
    #[arg(long = "images_dir")]
    pub images_dir: Option<PathBuf>,

    /// Override the labels folder
    #[arg(long = "labels_dir")]
    pub labels_dir: Option<PathBuf>,

    /// Width frames are rescaled to, keeping the aspect ratio
    #[arg(
        long = "target_width",
        default_value_t = 1200,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub target_width: u32,

    /// Time each frame is shown while playing, in milliseconds
    #[arg(long = "interval_ms", default_value_t = 100)]
    pub interval_ms: u64,

    /// Box border thickness in pixels
    #[arg(long = "thickness", default_value_t = 2)]
    pub thickness: u32,

    /// Only accept prediction lines carrying a confidence column
    #[arg(long = "require_confidence")]
    pub require_confidence: bool,

    /// Write annotated frames to this folder instead of opening a window
    #[arg(short = 'o', long = "output_dir")]
    pub output_dir: Option<PathBuf>,
}

impl ReviewArgs {
    pub fn images_dir(&self) -> PathBuf {
        self.images_dir
            .clone()
            .unwrap_or_else(|| self.dir.join("images"))
    }

    pub fn labels_dir(&self) -> PathBuf {
        self.labels_dir
            .clone()
            .unwrap_or_else(|| self.dir.join("labels"))
    }
}

// Validate that the size is between 0.0 and 1.0
pub fn validate_size(s: &str) -> Result<f32, String> {
    match f32::from_str(s) {
        Ok(val) if (0.0..=1.0).contains(&val) => Ok(val),
        _ => Err("SIZE must be between 0.0 and 1.0".to_string()),
    }
}
