use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::get_image_extensions_set;

/// Helper function to infer image format from image bytes
pub fn infer_image_format(image_bytes: &[u8]) -> Option<&'static str> {
    if image_bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if image_bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("png")
    } else if image_bytes.starts_with(b"BM") {
        Some("bmp")
    } else if image_bytes.starts_with(&[0x47, 0x49, 0x46]) {
        Some("gif")
    } else if image_bytes.len() >= 12 && &image_bytes[0..4] == b"RIFF" && &image_bytes[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
                label
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Create a directory if it is missing, keeping whatever it already holds
pub fn ensure_directory(path: &Path) -> std::io::Result<PathBuf> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(path.to_path_buf())
}

/// Whether a directory is missing or has no entries
pub fn is_dir_empty(path: &Path) -> std::io::Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    Ok(fs::read_dir(path)?.next().is_none())
}

/// List the image files directly inside `dir`, sorted by file name
pub fn list_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let extensions = get_image_extensions_set();
    let mut images: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.contains(&ext.to_lowercase()))
        })
        .collect();
    images.sort();
    Ok(images)
}

/// Recursively copy a directory tree
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<u64> {
    fs::create_dir_all(dst)?;
    let mut copied = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copied += copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_image_format() {
        assert_eq!(infer_image_format(&[0xFF, 0xD8, 0xFF]), Some("jpg"));
        assert_eq!(infer_image_format(&[0x89, b'P', b'N', b'G']), Some("png"));
        assert_eq!(infer_image_format(b"BM"), Some("bmp"));
        assert_eq!(infer_image_format(b"RIFF\0\0\0\0WEBPVP8 "), Some("webp"));
        assert_eq!(infer_image_format(b"<!DOCTYPE html>"), None);
    }

    #[test]
    fn test_list_images_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.JPG", "a.png", "notes.txt", "c.jpeg"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("train.jpg")).unwrap();

        let names: Vec<_> = list_images(dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.JPG", "c.jpeg"]);
    }

    #[test]
    fn test_is_dir_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(is_dir_empty(&dir.path().join("missing")).unwrap());
        assert!(is_dir_empty(dir.path()).unwrap());
        fs::write(dir.path().join("f"), b"").unwrap();
        assert!(!is_dir_empty(dir.path()).unwrap());
    }

    #[test]
    fn test_copy_dir_recursive() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::create_dir(src.path().join("train")).unwrap();
        fs::write(src.path().join("a.txt"), b"0 0.5 0.5 0.1 0.1\n").unwrap();
        fs::write(src.path().join("train/b.txt"), b"").unwrap();

        let target = dst.path().join("backup");
        assert_eq!(copy_dir_recursive(src.path(), &target).unwrap(), 2);
        assert!(target.join("train/b.txt").exists());
        assert_eq!(
            fs::read_to_string(target.join("a.txt")).unwrap(),
            "0 0.5 0.5 0.1 0.1\n"
        );
    }
}
