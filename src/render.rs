use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use log::{debug, warn};
use std::fs;
use std::path::PathBuf;

use crate::annotation::{parse_label_str, LabelFile, PixelRect};
use crate::error::{Error, Result};

pub const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// An image and the label file that may belong to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub image_path: PathBuf,
    pub label_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub target_width: u32,
    pub thickness: u32,
    /// Only accept six-field prediction lines
    pub require_confidence: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            target_width: 1200,
            thickness: 2,
            require_confidence: false,
        }
    }
}

pub struct RenderedFrame {
    pub image: RgbImage,
    pub boxes: usize,
}

/// Size of an image rescaled to `target_width`, keeping the aspect ratio
pub fn scaled_size(width: u32, height: u32, target_width: u32) -> (u32, u32) {
    let scale = target_width as f64 / width as f64;
    let new_height = (height as f64 * scale) as u32;
    (target_width, new_height.max(1))
}

/// Draw a hollow rectangle `thickness` pixels wide, growing inwards from the
/// corners and clipped at the image borders
pub fn draw_box(image: &mut RgbImage, rect: PixelRect, thickness: u32, color: Rgb<u8>) {
    let (image_width, image_height) = image.dimensions();
    let thickness = i64::from(thickness.min(image_width.max(image_height)));

    // Pull far-off edges in to just outside the image, where no inset can reach it
    let x1 = i64::from(rect.x1).max(-thickness);
    let y1 = i64::from(rect.y1).max(-thickness);
    let x2 = i64::from(rect.x2).min(i64::from(image_width) - 1 + thickness);
    let y2 = i64::from(rect.y2).min(i64::from(image_height) - 1 + thickness);

    for t in 0..thickness {
        let width = x2 - x1 + 1 - 2 * t;
        let height = y2 - y1 + 1 - 2 * t;
        if width <= 0 || height <= 0 {
            break;
        }
        let inset =
            Rect::at((x1 + t) as i32, (y1 + t) as i32).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(image, inset, color);
    }
}

/// Load an image, rescale it and draw the boxes of its label file, if there is one
pub fn render_frame(frame: &Frame, opts: &RenderOptions) -> Result<RenderedFrame> {
    let image = image::open(&frame.image_path)
        .map_err(|source| Error::Image {
            path: frame.image_path.clone(),
            source,
        })?
        .into_rgb8();

    let (width, height) = image.dimensions();
    let (new_width, new_height) = scaled_size(width, height, opts.target_width);
    let mut image = imageops::resize(&image, new_width, new_height, FilterType::Triangle);

    let mut boxes = 0;
    if frame.label_path.exists() {
        let label_file = match fs::read(&frame.label_path) {
            Ok(bytes) => parse_label_str(&String::from_utf8_lossy(&bytes)),
            Err(e) => {
                warn!("Cannot read {}: {}", frame.label_path.display(), e);
                LabelFile::default()
            }
        };
        for line in &label_file.invalid_lines {
            warn!("Invalid line in {}: {}", frame.label_path.display(), line);
        }
        for yolo_box in &label_file.boxes {
            if opts.require_confidence && yolo_box.confidence.is_none() {
                warn!(
                    "Invalid line in {}: {}",
                    frame.label_path.display(),
                    yolo_box.to_line()
                );
                continue;
            }
            let rect = yolo_box.to_pixel_rect(new_width, new_height);
            draw_box(&mut image, rect, opts.thickness, BOX_COLOR);
            debug!(
                "Detected object at ({}, {}) to ({}, {})",
                rect.x1, rect.y1, rect.x2, rect.y2
            );
            boxes += 1;
        }
    }

    Ok(RenderedFrame { image, boxes })
}
