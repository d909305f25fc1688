use labelstudio2yolo::annotation::{label_path_for, parse_label_str};
use labelstudio2yolo::io::{create_dataset_config, setup_output_directories, write_dataset_config};
use labelstudio2yolo::utils::infer_image_format;
use labelstudio2yolo::{split_images, ClassMerge, DatasetLayout, YoloBox};
use std::fs;
use std::path::{Path, PathBuf};

#[test]
fn test_infer_image_format() {
    let jpg_bytes = vec![0xFF, 0xD8, 0xFF];
    let png_bytes = vec![0x89, b'P', b'N', b'G'];
    let bmp_bytes = vec![b'B', b'M'];
    let gif_bytes = vec![0x47, 0x49, 0x46];
    let unknown_bytes = vec![0x00, 0x00, 0x00];

    assert_eq!(infer_image_format(&jpg_bytes), Some("jpg"));
    assert_eq!(infer_image_format(&png_bytes), Some("png"));
    assert_eq!(infer_image_format(&bmp_bytes), Some("bmp"));
    assert_eq!(infer_image_format(&gif_bytes), Some("gif"));
    assert_eq!(infer_image_format(&unknown_bytes), None);
}

#[test]
fn test_split_images() {
    let images = vec![
        PathBuf::from("image1.jpg"),
        PathBuf::from("image2.jpg"),
        PathBuf::from("image3.jpg"),
        PathBuf::from("image4.jpg"),
        PathBuf::from("image5.jpg"),
    ];

    let split_data = split_images(images, 0.2, 0.2, 42);

    assert_eq!(split_data.train.len(), 3);
    assert_eq!(split_data.val.len(), 1);
    assert_eq!(split_data.test.len(), 1);
}

#[test]
fn test_prediction_file_to_pixels() {
    let label_file = parse_label_str("0 0.25 0.25 0.125 0.125 0.93\n1 0.5 0.5 1.0 1.0\n");
    assert!(label_file.invalid_lines.is_empty());

    let rects: Vec<_> = label_file
        .boxes
        .iter()
        .map(|b| b.to_pixel_rect(100, 100))
        .collect();
    assert_eq!((rects[0].x1, rects[0].y1, rects[0].x2, rects[0].y2), (18, 18, 31, 31));
    assert_eq!((rects[1].x1, rects[1].y1, rects[1].x2, rects[1].y2), (0, 0, 100, 100));
    assert_eq!(label_file.boxes[0].confidence, Some(0.93));
}

#[test]
fn test_yolo_box_line() {
    let yolo_box = YoloBox::new(0, 0.15, 0.15, 0.1, 0.1);
    assert_eq!(yolo_box.to_line(), "0 0.150000 0.150000 0.100000 0.100000");
}

#[test]
fn test_label_path_matches_image_stem() {
    assert_eq!(
        label_path_for(Path::new("images/DJI_0042.jpg"), Path::new("labels")),
        PathBuf::from("labels/DJI_0042.txt")
    );
}

#[test]
fn test_create_dataset_yaml() {
    let temp_dir = tempfile::tempdir().unwrap();
    let layout = DatasetLayout::new(temp_dir.path());
    setup_output_directories(&layout, true).unwrap();

    let merge = ClassMerge::from_rules(&["adult=murre".to_string()]).unwrap();
    let names = merge.merged_names(&["adult".to_string(), "shag".to_string()]);
    let config = create_dataset_config(&layout, &names, true).unwrap();

    let dataset_yaml_path = temp_dir.path().join("config.yaml");
    write_dataset_config(&dataset_yaml_path, &config).unwrap();
    let yaml_content = fs::read_to_string(dataset_yaml_path).unwrap();

    assert!(yaml_content.contains("path:"));
    assert!(yaml_content.contains("train:"));
    assert!(yaml_content.contains("images/train"));
    assert!(yaml_content.contains("images/val"));
    assert!(yaml_content.contains("images/test"));
    assert!(yaml_content.contains("nc: 2"));
    assert!(yaml_content.contains("names:"));
    assert!(yaml_content.contains("- murre"));
    assert!(yaml_content.contains("- shag"));
}
