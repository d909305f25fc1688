use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// Supported image formats
pub const IMG_FORMATS: &[&str] = &[
    "bmp", "dng", "jpeg", "jpg", "mpo", "png", "tif", "tiff", "webp", "pfm",
];

// Formats the review tool shows
pub const REVIEW_FORMATS: &[&str] = &["jpg", "jpeg", "png"];

// Precomputed HashSet of image extensions for fast lookup
pub static IMAGE_EXTENSIONS_SET: OnceLock<HashSet<String>> = OnceLock::new();

/// Get the image extensions set
pub fn get_image_extensions_set() -> &'static HashSet<String> {
    IMAGE_EXTENSIONS_SET.get_or_init(|| IMG_FORMATS.iter().map(|ext| ext.to_lowercase()).collect())
}

/// Whether `path` has one of `formats` as extension, ignoring case
pub fn has_image_extension(path: &Path, formats: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            formats.iter().any(|f| *f == ext)
        })
        .unwrap_or(false)
}

/// The `images/` + `labels/` directory pair of an exported dataset and its split folders
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    pub root: PathBuf,
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
    pub train_images_dir: PathBuf,
    pub val_images_dir: PathBuf,
    pub test_images_dir: PathBuf,
    pub train_labels_dir: PathBuf,
    pub val_labels_dir: PathBuf,
    pub test_labels_dir: PathBuf,
}

impl DatasetLayout {
    pub fn new(root: &Path) -> Self {
        let images_dir = root.join("images");
        let labels_dir = root.join("labels");
        Self {
            root: root.to_path_buf(),
            train_images_dir: images_dir.join("train"),
            val_images_dir: images_dir.join("val"),
            test_images_dir: images_dir.join("test"),
            train_labels_dir: labels_dir.join("train"),
            val_labels_dir: labels_dir.join("val"),
            test_labels_dir: labels_dir.join("test"),
            images_dir,
            labels_dir,
        }
    }

    /// Backup of the labels as exported, before any class merge
    pub fn backup_labels_dir(&self) -> PathBuf {
        self.root.join("labels_original")
    }

    /// Every folder a label file can live in, flat export first
    pub fn label_dirs(&self) -> [&Path; 4] {
        [
            self.labels_dir.as_path(),
            self.train_labels_dir.as_path(),
            self.val_labels_dir.as_path(),
            self.test_labels_dir.as_path(),
        ]
    }
}

// Struct to hold the split image lists for training, validation, and testing
#[derive(Debug, Default, Clone)]
pub struct SplitData {
    pub train: Vec<PathBuf>,
    pub val: Vec<PathBuf>,
    pub test: Vec<PathBuf>,
}

impl SplitData {
    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Image download statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadStats {
    pub requested: usize,
    pub downloaded: usize,
    pub skipped_existing: usize,
    pub failed: usize,
}

impl DownloadStats {
    pub fn print_summary(&self) {
        log::info!("=== Download Summary ===");
        log::info!("Images requested: {}", self.requested);
        log::info!("Downloaded: {}", self.downloaded);
        log::info!("Skipped (already present): {}", self.skipped_existing);
        if self.failed > 0 {
            log::warn!("Failed downloads: {}", self.failed);
        } else {
            log::info!("Failed downloads: 0");
        }
    }
}

// Class merge statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeStats {
    pub files_rewritten: usize,
    pub files_missing: usize,
    pub files_failed: usize,
    pub lines_dropped: usize,
}

impl MergeStats {
    pub fn print_summary(&self) {
        log::info!("=== Merge Summary ===");
        log::info!("Label files rewritten: {}", self.files_rewritten);
        if self.files_missing > 0 {
            log::warn!(
                "Label files in backup with no current copy: {}",
                self.files_missing
            );
        }
        if self.files_failed > 0 {
            log::warn!("Label files left untouched after errors: {}", self.files_failed);
        }
        if self.lines_dropped > 0 {
            log::warn!("Malformed lines dropped: {}", self.lines_dropped);
        }
    }
}

// Train/val/test move statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MoveStats {
    pub train: usize,
    pub val: usize,
    pub test: usize,
    pub background: usize,
    pub failed: usize,
}

impl MoveStats {
    pub fn print_summary(&self) {
        log::info!("=== Split Summary ===");
        log::info!("Train images: {}", self.train);
        log::info!("Val images: {}", self.val);
        if self.test > 0 {
            log::info!("Test images: {}", self.test);
        }
        log::info!("Images without labels (background): {}", self.background);
        if self.failed > 0 {
            log::warn!("Images that could not be moved: {}", self.failed);
        }
    }
}

// Headless review statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReviewStats {
    pub rendered: usize,
    pub failed: usize,
    pub boxes: usize,
}

impl ReviewStats {
    pub fn print_summary(&self) {
        log::info!("=== Review Summary ===");
        log::info!("Frames written: {}", self.rendered);
        log::info!("Boxes drawn: {}", self.boxes);
        if self.failed > 0 {
            log::warn!("Frames that could not be rendered: {}", self.failed);
        }
    }
}
