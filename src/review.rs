//! Bounding-box slideshow
//!
//! Frames are shown in file name order. While playing, each frame stays up for
//! a fixed interval; space pauses, the arrow keys step while paused and escape
//! quits.

use image::RgbImage;
use log::{info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::annotation::label_path_for;
use crate::error::{Error, Result};
use crate::render::{render_frame, Frame, RenderOptions};
use crate::types::{has_image_extension, ReviewStats, REVIEW_FORMATS};
use crate::utils::{create_progress_bar, ensure_directory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewKey {
    Escape,
    Space,
    Left,
    Right,
    Other,
}

/// Display surface of the slideshow
pub trait Viewer {
    fn show(&mut self, frame: &RgbImage) -> Result<()>;

    /// Block until a key is pressed or `timeout` elapses (`None` waits forever).
    /// Returns `None` on timeout.
    fn wait_key(&mut self, timeout: Option<Duration>) -> Option<ReviewKey>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Redraw,
    Stay,
    Exit,
}

/// Cursor over a fixed number of frames
#[derive(Debug, Clone)]
pub struct Slideshow {
    len: usize,
    current: usize,
    paused: bool,
}

impl Slideshow {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            current: 0,
            paused: false,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn step(&mut self, delta: isize) {
        if self.len > 0 {
            self.current = (self.current as isize + delta).rem_euclid(self.len as isize) as usize;
        }
    }

    /// Move past a frame that could not be shown
    pub fn skip(&mut self) {
        self.step(1);
    }

    /// How long to wait for a key before the next frame
    pub fn wait_timeout(&self, interval: Duration) -> Option<Duration> {
        if self.paused {
            None
        } else {
            Some(interval)
        }
    }

    /// Apply a key press, `None` meaning the wait timed out
    pub fn handle(&mut self, key: Option<ReviewKey>) -> Transition {
        match (key, self.paused) {
            (Some(ReviewKey::Escape), _) => Transition::Exit,
            (Some(ReviewKey::Space), false) => {
                self.paused = true;
                Transition::Stay
            }
            (Some(ReviewKey::Space), true) => {
                self.paused = false;
                self.step(1);
                Transition::Redraw
            }
            (Some(ReviewKey::Left), true) => {
                self.step(-1);
                Transition::Redraw
            }
            (Some(ReviewKey::Right), true) => {
                self.step(1);
                Transition::Redraw
            }
            (None, false) => {
                self.step(1);
                Transition::Redraw
            }
            _ => Transition::Stay,
        }
    }
}

/// Images in `images_dir` shown by the slideshow, sorted, paired with their labels
pub fn collect_frames(images_dir: &Path, labels_dir: &Path) -> Result<Vec<Frame>> {
    let mut images: Vec<_> = fs::read_dir(images_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_image_extension(path, REVIEW_FORMATS))
        .collect();
    images.sort();

    Ok(images
        .into_iter()
        .map(|image_path| Frame {
            label_path: label_path_for(&image_path, labels_dir),
            image_path,
        })
        .collect())
}

/// Run the slideshow until escape is pressed or the viewer closes
pub fn run_slideshow<V: Viewer>(
    frames: &[Frame],
    viewer: &mut V,
    opts: &RenderOptions,
    interval: Duration,
) -> Result<()> {
    if frames.is_empty() {
        info!("No image files found in the images folder.");
        return Ok(());
    }

    let mut slideshow = Slideshow::new(frames.len());
    let mut redraw = true;
    let mut consecutive_failures = 0;

    loop {
        if redraw {
            let frame = &frames[slideshow.current()];
            match render_frame(frame, opts) {
                Ok(rendered) => {
                    consecutive_failures = 0;
                    viewer.show(&rendered.image)?;
                }
                Err(e) => {
                    warn!("Could not read image {}: {}", frame.image_path.display(), e);
                    consecutive_failures += 1;
                    if consecutive_failures >= frames.len() {
                        warn!("None of the images could be read.");
                        return Ok(());
                    }
                    slideshow.skip();
                    continue;
                }
            }
        }

        let key = viewer.wait_key(slideshow.wait_timeout(interval));
        match slideshow.handle(key) {
            Transition::Redraw => redraw = true,
            Transition::Stay => redraw = false,
            Transition::Exit => {
                info!("Exiting...");
                return Ok(());
            }
        }
    }
}

/// Render every frame to `out_dir` instead of showing it
pub fn export_frames(frames: &[Frame], opts: &RenderOptions, out_dir: &Path) -> Result<ReviewStats> {
    ensure_directory(out_dir)?;
    let pb = create_progress_bar(frames.len() as u64, "Review");

    let results: Vec<Option<usize>> = frames
        .par_iter()
        .map(|frame| {
            let result = render_frame(frame, opts).and_then(|rendered| {
                let file_name = frame.image_path.file_name().unwrap_or_default();
                rendered
                    .image
                    .save(out_dir.join(file_name))
                    .map_err(|source| Error::Image {
                        path: out_dir.join(file_name),
                        source,
                    })?;
                Ok(rendered.boxes)
            });
            pb.inc(1);
            match result {
                Ok(boxes) => Some(boxes),
                Err(e) => {
                    warn!("Skipping {}: {}", frame.image_path.display(), e);
                    None
                }
            }
        })
        .collect();
    pb.finish_with_message("Review frames written");

    let mut stats = ReviewStats::default();
    for result in results {
        match result {
            Some(boxes) => {
                stats.rendered += 1;
                stats.boxes += boxes;
            }
            None => stats.failed += 1,
        }
    }
    Ok(stats)
}
