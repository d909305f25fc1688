use clap::Parser;
use labelstudio2yolo::io::read_dataset_config;
use labelstudio2yolo::utils::list_images;
use labelstudio2yolo::{merge_labels, prepare_dataset, ClassMerge, DatasetLayout, PrepareArgs};
use std::fs;
use std::path::{Path, PathBuf};

const CLASSES: [&str; 4] = [
    "Beak with fish",
    "Common murre adult",
    "Common murre chick",
    "European shag",
];

/// Export layout as written by Label Studio: flat images/ and labels/ plus classes.txt.
/// The last image has no label file.
fn create_export(root: &Path, count: usize) {
    fs::create_dir_all(root.join("images")).unwrap();
    fs::create_dir_all(root.join("labels")).unwrap();
    fs::write(root.join("classes.txt"), CLASSES.join("\n")).unwrap();
    for i in 0..count {
        fs::write(root.join(format!("images/img{}.jpg", i)), [0xFF, 0xD8, 0xFF]).unwrap();
        if i + 1 < count {
            fs::write(
                root.join(format!("labels/img{}.txt", i)),
                format!("{} 0.5 0.5 0.1 0.1\n{} 0.25 0.25 0.05 0.05\n", i % 4, i % 4),
            )
            .unwrap();
        }
    }
}

fn prepare_args(root: &Path, extra: &[&str]) -> PrepareArgs {
    let mut argv = vec![
        "yolo-prepare".to_string(),
        "-d".to_string(),
        root.display().to_string(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    PrepareArgs::parse_from(argv)
}

fn label_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    files.sort();
    files
}

fn original_class(label: &Path) -> usize {
    let stem = label.file_stem().unwrap().to_str().unwrap();
    stem.trim_start_matches("img").parse::<usize>().unwrap() % 4
}

fn class_ids(label: &Path) -> Vec<usize> {
    fs::read_to_string(label)
        .unwrap()
        .lines()
        .map(|line| line.split_whitespace().next().unwrap().parse().unwrap())
        .collect()
}

#[test]
fn test_prepare_splits_merges_and_writes_config() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    create_export(root, 10);

    let args = prepare_args(
        root,
        &[
            "--merge",
            "Common murre adult=Common murre",
            "--merge",
            "Common murre chick=Common murre",
        ],
    );
    let config_path = prepare_dataset(&args).unwrap();
    assert_eq!(config_path, root.join("config.yaml"));

    let layout = DatasetLayout::new(root);
    assert_eq!(list_images(&layout.train_images_dir).unwrap().len(), 8);
    assert_eq!(list_images(&layout.val_images_dir).unwrap().len(), 2);
    assert!(list_images(&layout.images_dir).unwrap().is_empty());

    let train_labels = label_files(&layout.train_labels_dir);
    let val_labels = label_files(&layout.val_labels_dir);
    assert_eq!(train_labels.len() + val_labels.len(), 9);
    assert!(label_files(&layout.labels_dir).is_empty());

    // every label follows its image into the same split
    for label in &val_labels {
        let stem = label.file_stem().unwrap().to_str().unwrap();
        assert!(layout.val_images_dir.join(format!("{}.jpg", stem)).exists());
    }

    let remap = [0, 1, 1, 2];
    for label in train_labels.iter().chain(&val_labels) {
        let expected = remap[original_class(label)];
        assert_eq!(class_ids(label), vec![expected, expected]);
    }

    // the backup keeps the exported ids
    let backup = label_files(&layout.backup_labels_dir());
    assert_eq!(backup.len(), 9);
    for label in &backup {
        let original = original_class(label);
        assert_eq!(class_ids(label), vec![original, original]);
    }

    let config = read_dataset_config(&config_path).unwrap();
    assert_eq!(config.nc, 3);
    assert_eq!(
        config.names,
        vec!["Beak with fish", "Common murre", "European shag"]
    );
    assert!(config.train.ends_with("train"));
    assert!(config.test.is_none());
}

#[test]
fn test_prepare_twice_keeps_split_and_ids() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    create_export(root, 6);
    let args = prepare_args(root, &["--merge", "European shag=Beak with fish"]);

    prepare_dataset(&args).unwrap();
    let layout = DatasetLayout::new(root);
    let first_train = list_images(&layout.train_images_dir).unwrap();
    let first_labels: Vec<_> = label_files(&layout.train_labels_dir)
        .iter()
        .map(|p| fs::read_to_string(p).unwrap())
        .collect();

    prepare_dataset(&args).unwrap();
    assert_eq!(list_images(&layout.train_images_dir).unwrap(), first_train);
    let second_labels: Vec<_> = label_files(&layout.train_labels_dir)
        .iter()
        .map(|p| fs::read_to_string(p).unwrap())
        .collect();
    assert_eq!(first_labels, second_labels);

    for label in label_files(&layout.train_labels_dir) {
        let expected = [0, 1, 2, 0][original_class(&label)];
        assert_eq!(class_ids(&label)[0], expected);
    }
}

#[test]
fn test_prepare_without_merge_keeps_classes() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    create_export(root, 5);

    let config_path = prepare_dataset(&prepare_args(root, &["--test_size", "0.2"])).unwrap();
    let layout = DatasetLayout::new(root);

    assert!(!layout.backup_labels_dir().exists());
    assert_eq!(list_images(&layout.test_images_dir).unwrap().len(), 1);
    assert_eq!(list_images(&layout.val_images_dir).unwrap().len(), 1);
    assert_eq!(list_images(&layout.train_images_dir).unwrap().len(), 3);

    let config = read_dataset_config(&config_path).unwrap();
    assert_eq!(config.nc, 4);
    assert_eq!(config.names, CLASSES.to_vec());
    assert!(config.test.is_some());
}

#[test]
fn test_prepare_merge_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    create_export(root, 4);
    let merge_file = root.join("merge.yaml");
    fs::write(
        &merge_file,
        "Common murre adult: Common murre\nCommon murre chick: Common murre\n",
    )
    .unwrap();

    let args = prepare_args(
        root,
        &[
            "--merge_file",
            merge_file.to_str().unwrap(),
            "--config_name",
            "seabirds.yaml",
        ],
    );
    let config_path = prepare_dataset(&args).unwrap();
    assert_eq!(config_path, root.join("seabirds.yaml"));
    assert_eq!(read_dataset_config(&config_path).unwrap().nc, 3);
}

#[test]
fn test_prepare_missing_images_folder() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("classes.txt"), "gull\n").unwrap();
    assert!(prepare_dataset(&prepare_args(dir.path(), &[])).is_err());
}

#[test]
fn test_merge_leaves_file_with_unknown_class_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    create_export(root, 3);
    fs::write(root.join("labels/bad.txt"), "9 0.5 0.5 0.1 0.1\n").unwrap();
    fs::write(
        root.join("labels/messy.txt"),
        "1 0.5 0.5 0.1 0.1\ngarbage\n",
    )
    .unwrap();

    let original: Vec<String> = CLASSES.iter().map(|s| s.to_string()).collect();
    let merge =
        ClassMerge::from_rules(&["Common murre adult=Beak with fish".to_string()]).unwrap();
    let layout = DatasetLayout::new(root);

    let stats = merge_labels(&layout, &original, &merge).unwrap();
    assert_eq!(stats.files_failed, 1);
    assert_eq!(stats.files_rewritten, 3);
    assert_eq!(stats.lines_dropped, 1);
    assert_eq!(
        fs::read_to_string(root.join("labels/bad.txt")).unwrap(),
        "9 0.5 0.5 0.1 0.1\n"
    );
    assert_eq!(
        fs::read_to_string(root.join("labels/messy.txt")).unwrap(),
        "0 0.5 0.5 0.1 0.1\n"
    );
}

#[test]
fn test_prepare_without_merge_restores_original_ids() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    create_export(root, 6);

    prepare_dataset(&prepare_args(
        root,
        &["--merge", "Common murre adult=Beak with fish"],
    ))
    .unwrap();
    let config_path = prepare_dataset(&prepare_args(root, &[])).unwrap();

    let config = read_dataset_config(&config_path).unwrap();
    assert_eq!(config.names, CLASSES.to_vec());

    let layout = DatasetLayout::new(root);
    let labels: Vec<PathBuf> = label_files(&layout.train_labels_dir)
        .into_iter()
        .chain(label_files(&layout.val_labels_dir))
        .collect();
    assert_eq!(labels.len(), 5);
    for label in &labels {
        let original = original_class(label);
        assert_eq!(class_ids(label), vec![original, original]);
    }
}

#[test]
fn test_merge_under_path_with_glob_characters() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("colony[2024]");
    create_export(&root, 3);

    let original: Vec<String> = CLASSES.iter().map(|s| s.to_string()).collect();
    let merge =
        ClassMerge::from_rules(&["Common murre adult=Beak with fish".to_string()]).unwrap();
    let stats = merge_labels(&DatasetLayout::new(&root), &original, &merge).unwrap();

    assert_eq!(stats.files_rewritten, 2);
    assert_eq!(class_ids(&root.join("labels/img1.txt")), vec![0, 0]);
}
