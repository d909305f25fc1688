use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the export, preparation, training and review tools.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server returned {status} for {url}: {body}")]
    Http {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to read archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to parse YAML ({path}): {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to parse JSON ({path}): {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid annotation line: {line:?}")]
    AnnotationParse { line: String },

    #[error("class id {class_id} is out of range for {count} class(es) in {path}")]
    UnknownClass {
        path: PathBuf,
        class_id: usize,
        count: usize,
    },

    #[error("no class list found in {0} (expected classes.txt or notes.json)")]
    MissingClasses(PathBuf),

    #[error("invalid merge rule {0:?}, expected FROM=TO")]
    MergeRule(String),

    #[error("invalid dataset config {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    #[error("display error: {0}")]
    Window(String),

    #[error("training process exited with {0}")]
    Training(String),
}

pub type Result<T> = std::result::Result<T, Error>;
