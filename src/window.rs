use image::RgbImage;
use minifb::{Key, KeyRepeat, ScaleMode, Window, WindowOptions};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::review::{ReviewKey, Viewer};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Desktop window showing the slideshow frames
pub struct WindowViewer {
    title: String,
    window: Option<Window>,
    buffer: Vec<u32>,
}

impl WindowViewer {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            window: None,
            buffer: Vec::new(),
        }
    }

    fn open(&mut self, width: usize, height: usize) -> Result<&mut Window> {
        if self.window.is_none() {
            let window = Window::new(
                &self.title,
                width,
                height,
                WindowOptions {
                    resize: true,
                    scale_mode: ScaleMode::AspectRatioStretch,
                    ..WindowOptions::default()
                },
            )
            .map_err(|e| Error::Window(e.to_string()))?;
            self.window = Some(window);
        }
        self.window
            .as_mut()
            .ok_or_else(|| Error::Window("window is not open".to_string()))
    }
}

fn map_key(key: Key) -> ReviewKey {
    match key {
        Key::Escape => ReviewKey::Escape,
        Key::Space => ReviewKey::Space,
        Key::Left => ReviewKey::Left,
        Key::Right => ReviewKey::Right,
        _ => ReviewKey::Other,
    }
}

impl Viewer for WindowViewer {
    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        let (width, height) = (frame.width() as usize, frame.height() as usize);
        self.buffer.clear();
        self.buffer.extend(
            frame
                .pixels()
                .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32),
        );

        let buffer = std::mem::take(&mut self.buffer);
        let result = self
            .open(width, height)?
            .update_with_buffer(&buffer, width, height)
            .map_err(|e| Error::Window(e.to_string()));
        self.buffer = buffer;
        result
    }

    fn wait_key(&mut self, timeout: Option<Duration>) -> Option<ReviewKey> {
        let Some(window) = self.window.as_mut() else {
            return Some(ReviewKey::Escape);
        };
        let started = Instant::now();

        loop {
            window.update();
            if !window.is_open() {
                return Some(ReviewKey::Escape);
            }
            if let Some(key) = window.get_keys_pressed(KeyRepeat::No).into_iter().next() {
                return Some(map_key(key));
            }
            if timeout.is_some_and(|t| started.elapsed() >= t) {
                return None;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}
