//! Label Studio to YOLO tooling
//!
//! Exports annotated projects from a Label Studio server, prepares them as a
//! YOLO training dataset, launches the Ultralytics trainer and reviews boxes
//! drawn over the images.

pub mod annotation;
pub mod classes;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod io;
pub mod render;
pub mod review;
pub mod train;
pub mod types;
pub mod utils;
pub mod window;

// Re-export commonly used types and functions
pub use annotation::{parse_line, read_label_file, write_label_file, PixelRect, YoloBox};
pub use classes::{merge_labels, read_class_names, ClassMerge};
pub use config::{ExportArgs, PrepareArgs, ReviewArgs, TrainArgs, TrainOptions};
pub use dataset::{prepare_dataset, split_images};
pub use error::{Error, Result};
pub use export::{download_images, extract_archive, images_to_fetch, LabelStudioClient};
pub use io::DatasetConfig;
pub use render::{render_frame, Frame, RenderOptions};
pub use review::{collect_frames, export_frames, run_slideshow, ReviewKey, Slideshow, Viewer};
pub use train::{train, TrainCommand};
pub use types::{DatasetLayout, SplitData};
pub use window::WindowViewer;
