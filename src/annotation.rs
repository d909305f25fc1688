//! YOLO text annotations
//!
//! One object per line: `<class_id> <x_center> <y_center> <width> <height> [<confidence>]`,
//! coordinates normalized to the image size. Each image has a label file with the same
//! stem and a `.txt` extension.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A single bounding box in normalized center format
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloBox {
    pub class_id: usize,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: Option<f64>,
}

/// Pixel corners of a box, truncated toward zero and not clipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl YoloBox {
    pub fn new(class_id: usize, x_center: f64, y_center: f64, width: f64, height: f64) -> Self {
        Self {
            class_id,
            x_center,
            y_center,
            width,
            height,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Convert to pixel corners for an image of `width` x `height` pixels
    pub fn to_pixel_rect(&self, width: u32, height: u32) -> PixelRect {
        let (w, h) = (width as f64, height as f64);
        PixelRect {
            x1: ((self.x_center - self.width / 2.0) * w) as i32,
            y1: ((self.y_center - self.height / 2.0) * h) as i32,
            x2: ((self.x_center + self.width / 2.0) * w) as i32,
            y2: ((self.y_center + self.height / 2.0) * h) as i32,
        }
    }

    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id, self.x_center, self.y_center, self.width, self.height
        );
        if let Some(confidence) = self.confidence {
            line.push_str(&format!(" {:.6}", confidence));
        }
        line
    }
}

fn parse_class_id(token: &str) -> Option<usize> {
    if let Ok(id) = token.parse::<usize>() {
        return Some(id);
    }
    // Some exporters write class ids as floats
    let value = token.parse::<f64>().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
        Some(value as usize)
    } else {
        None
    }
}

/// Parse one annotation line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<YoloBox>> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.is_empty() {
        return Ok(None);
    }
    let invalid = || Error::AnnotationParse {
        line: line.trim_end().to_string(),
    };
    if fields.len() != 5 && fields.len() != 6 {
        return Err(invalid());
    }

    let class_id = parse_class_id(fields[0]).ok_or_else(invalid)?;
    let mut values = [0.0f64; 5];
    for (slot, token) in values.iter_mut().zip(&fields[1..]) {
        *slot = token.parse::<f64>().map_err(|_| invalid())?;
        if !slot.is_finite() {
            return Err(invalid());
        }
    }

    Ok(Some(YoloBox {
        class_id,
        x_center: values[0],
        y_center: values[1],
        width: values[2],
        height: values[3],
        confidence: (fields.len() == 6).then_some(values[4]),
    }))
}

/// Rewrite the class id of a line, keeping the coordinate text as written
pub fn remap_line(line: &str, remap: &[usize]) -> Result<Option<String>> {
    let Some(parsed) = parse_line(line)? else {
        return Ok(None);
    };
    let new_id = remap.get(parsed.class_id).ok_or(Error::UnknownClass {
        path: PathBuf::new(),
        class_id: parsed.class_id,
        count: remap.len(),
    })?;
    let coords: Vec<&str> = line.split_whitespace().skip(1).collect();
    Ok(Some(format!("{} {}", new_id, coords.join(" "))))
}

/// Contents of a label file: the boxes that parsed and the lines that did not
#[derive(Debug, Default, Clone)]
pub struct LabelFile {
    pub boxes: Vec<YoloBox>,
    pub invalid_lines: Vec<String>,
}

pub fn parse_label_str(content: &str) -> LabelFile {
    let mut label_file = LabelFile::default();
    for line in content.lines() {
        match parse_line(line) {
            Ok(Some(yolo_box)) => label_file.boxes.push(yolo_box),
            Ok(None) => {}
            Err(_) => label_file.invalid_lines.push(line.to_string()),
        }
    }
    label_file
}

pub fn read_label_file(path: &Path) -> Result<LabelFile> {
    let content = fs::read_to_string(path)?;
    Ok(parse_label_str(&content))
}

pub fn write_label_file(path: &Path, boxes: &[YoloBox]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for yolo_box in boxes {
        writeln!(writer, "{}", yolo_box.to_line())?;
    }
    writer.flush()?;
    Ok(())
}

/// Label file that belongs to `image_path` inside `labels_dir`
pub fn label_path_for(image_path: &Path, labels_dir: &Path) -> PathBuf {
    // `with_extension` would eat a dotted stem like `a.b`
    let mut name = image_path.file_stem().unwrap_or_default().to_os_string();
    name.push(".txt");
    labels_dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_five_fields() {
        let parsed = parse_line("2 0.5 0.25 0.1 0.2").unwrap().unwrap();
        assert_eq!(parsed, YoloBox::new(2, 0.5, 0.25, 0.1, 0.2));
    }

    #[test]
    fn test_parse_line_with_confidence() {
        let parsed = parse_line("0 0.5 0.5 0.2 0.2 0.87\n").unwrap().unwrap();
        assert_eq!(parsed.confidence, Some(0.87));
    }

    #[test]
    fn test_parse_line_float_class_id() {
        let parsed = parse_line("3.0 0.5 0.5 0.2 0.2").unwrap().unwrap();
        assert_eq!(parsed.class_id, 3);
        assert!(parse_line("3.5 0.5 0.5 0.2 0.2").is_err());
        assert!(parse_line("-1 0.5 0.5 0.2 0.2").is_err());
    }

    #[test]
    fn test_parse_line_blank_and_invalid() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("   \t").unwrap().is_none());
        assert!(parse_line("0 0.5 0.5 0.2").is_err());
        assert!(parse_line("0 0.5 0.5 0.2 0.2 0.9 1").is_err());
        assert!(parse_line("0 0.5 abc 0.2 0.2").is_err());
        assert!(parse_line("0 0.5 NaN 0.2 0.2").is_err());
    }

    #[test]
    fn test_to_pixel_rect_truncates() {
        let yolo_box = YoloBox::new(0, 0.5, 0.5, 0.25, 0.5);
        let rect = yolo_box.to_pixel_rect(1200, 900);
        assert_eq!(
            rect,
            PixelRect {
                x1: 450,
                y1: 225,
                x2: 750,
                y2: 675
            }
        );

        // 0.333 * 100 = 33.3 truncates to 33
        let rect = YoloBox::new(0, 0.4, 0.4, 0.134, 0.134).to_pixel_rect(100, 100);
        assert_eq!(rect.x1, 33);
        assert_eq!(rect.x2, 46);
    }

    #[test]
    fn test_to_line() {
        assert_eq!(
            YoloBox::new(1, 0.15, 0.15, 0.1, 0.1).to_line(),
            "1 0.150000 0.150000 0.100000 0.100000"
        );
        assert_eq!(
            YoloBox::new(0, 0.5, 0.5, 0.2, 0.2)
                .with_confidence(0.9)
                .to_line(),
            "0 0.500000 0.500000 0.200000 0.200000 0.900000"
        );
    }

    #[test]
    fn test_remap_line_keeps_coordinate_text() {
        let remap = vec![0, 0, 1];
        assert_eq!(
            remap_line("2 0.51234567 0.5 0.2 0.2", &remap).unwrap(),
            Some("1 0.51234567 0.5 0.2 0.2".to_string())
        );
        assert_eq!(remap_line("", &remap).unwrap(), None);
        assert!(matches!(
            remap_line("7 0.5 0.5 0.2 0.2", &remap),
            Err(Error::UnknownClass { class_id: 7, .. })
        ));
    }

    #[test]
    fn test_parse_label_str_collects_invalid_lines() {
        let label_file = parse_label_str("0 0.5 0.5 0.2 0.2\nbroken line\n\n1 0.1 0.1 0.1 0.1 0.4\n");
        assert_eq!(label_file.boxes.len(), 2);
        assert_eq!(label_file.invalid_lines, vec!["broken line".to_string()]);
    }

    #[test]
    fn test_write_then_read_label_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.txt");
        let boxes = vec![
            YoloBox::new(0, 0.5, 0.5, 0.2, 0.2),
            YoloBox::new(1, 0.25, 0.75, 0.1, 0.3).with_confidence(0.5),
        ];
        write_label_file(&path, &boxes).unwrap();
        let read = read_label_file(&path).unwrap();
        assert_eq!(read.boxes, boxes);
        assert!(read.invalid_lines.is_empty());
    }

    #[test]
    fn test_label_path_for() {
        assert_eq!(
            label_path_for(Path::new("/data/images/DJI_0001.JPG"), Path::new("/data/labels")),
            PathBuf::from("/data/labels/DJI_0001.txt")
        );
        assert_eq!(
            label_path_for(Path::new("a.b.png"), Path::new("labels")),
            PathBuf::from("labels/a.b.txt")
        );
    }
}
