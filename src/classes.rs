//! Class lists and class merging
//!
//! Label Studio writes `classes.txt` (and `notes.json`) next to the labels.
//! Merging folds several annotated classes into one training class by
//! rewriting the class ids of every label file from a pristine backup.

use glob::{glob, Pattern};
use log::{info, warn};
use rayon::prelude::*;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::annotation::remap_line;
use crate::error::{Error, Result};
use crate::types::{DatasetLayout, MergeStats};
use crate::utils::copy_dir_recursive;

#[derive(Debug, Deserialize)]
struct Notes {
    categories: Vec<NoteCategory>,
}

#[derive(Debug, Deserialize)]
struct NoteCategory {
    id: usize,
    name: String,
}

/// Read the class names of an export, in class id order
pub fn read_class_names(export_dir: &Path) -> Result<Vec<String>> {
    let classes_txt = export_dir.join("classes.txt");
    if classes_txt.exists() {
        let content = fs::read_to_string(&classes_txt)?;
        return Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect());
    }

    let notes_json = export_dir.join("notes.json");
    if notes_json.exists() {
        let file = fs::File::open(&notes_json)?;
        let mut notes: Notes = serde_json::from_reader(io::BufReader::new(file))
            .map_err(|source| Error::Json {
                path: notes_json.clone(),
                source,
            })?;
        notes.categories.sort_by_key(|category| category.id);
        return Ok(notes
            .categories
            .into_iter()
            .map(|category| category.name)
            .collect());
    }

    Err(Error::MissingClasses(export_dir.to_path_buf()))
}

/// Ordered mapping from annotated class names to training class names.
/// Names without a rule keep their own name.
#[derive(Debug, Clone, Default)]
pub struct ClassMerge {
    rules: Vec<(String, String)>,
}

impl ClassMerge {
    /// Parse `FROM=TO` rules
    pub fn from_rules(rules: &[String]) -> Result<Self> {
        let mut merge = ClassMerge::default();
        for rule in rules {
            let (from, to) = rule
                .split_once('=')
                .map(|(from, to)| (from.trim(), to.trim()))
                .filter(|(from, to)| !from.is_empty() && !to.is_empty())
                .ok_or_else(|| Error::MergeRule(rule.clone()))?;
            merge.insert(from, to);
        }
        Ok(merge)
    }

    /// Read a YAML mapping of `original: merged` names
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mapping: serde_yaml::Mapping =
            serde_yaml::from_str(&content).map_err(|source| Error::Yaml {
                path: path.to_path_buf(),
                source,
            })?;

        let mut merge = ClassMerge::default();
        for (from, to) in &mapping {
            match (from.as_str(), to.as_str()) {
                (Some(from), Some(to)) => merge.insert(from, to),
                _ => {
                    return Err(Error::MergeRule(format!("{:?}: {:?}", from, to)));
                }
            }
        }
        Ok(merge)
    }

    pub fn insert(&mut self, from: &str, to: &str) {
        if let Some(rule) = self.rules.iter_mut().find(|(f, _)| f == from) {
            rule.1 = to.to_string();
        } else {
            self.rules.push((from.to_string(), to.to_string()));
        }
    }

    pub fn extend(&mut self, other: ClassMerge) {
        for (from, to) in other.rules {
            self.insert(&from, &to);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn target<'a>(&'a self, name: &'a str) -> &'a str {
        self.rules
            .iter()
            .find(|(from, _)| from == name)
            .map(|(_, to)| to.as_str())
            .unwrap_or(name)
    }

    /// Merged class names, in order of first appearance along the original list
    pub fn merged_names(&self, original: &[String]) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in original {
            let target = self.target(name);
            if !names.iter().any(|n| n == target) {
                names.push(target.to_string());
            }
        }
        names
    }

    /// Original class id -> merged class id
    pub fn id_remap(&self, original: &[String]) -> Vec<usize> {
        let merged = self.merged_names(original);
        original
            .iter()
            .map(|name| {
                let target = self.target(name);
                merged.iter().position(|n| n == target).unwrap_or_default()
            })
            .collect()
    }

    /// Rule sources that do not name any original class
    pub fn unknown_sources<'a>(&'a self, original: &[String]) -> Vec<&'a str> {
        self.rules
            .iter()
            .map(|(from, _)| from.as_str())
            .filter(|from| !original.iter().any(|name| name == from))
            .collect()
    }
}

enum RewriteOutcome {
    Rewritten { dropped: usize },
    Missing,
    Failed,
}

fn current_location(layout: &DatasetLayout, file_name: &std::ffi::OsStr) -> Option<PathBuf> {
    layout
        .label_dirs()
        .into_iter()
        .map(|dir| dir.join(file_name))
        .find(|path| path.is_file())
}

fn rewrite_from_backup(backup: &Path, target: &Path, remap: &[usize]) -> Result<usize> {
    let content = fs::read_to_string(backup)?;
    let mut output = String::with_capacity(content.len());
    let mut dropped = 0;

    for line in content.lines() {
        match remap_line(line, remap) {
            Ok(Some(line)) => {
                output.push_str(&line);
                output.push('\n');
            }
            Ok(None) => {}
            Err(Error::UnknownClass { class_id, count, .. }) => {
                return Err(Error::UnknownClass {
                    path: backup.to_path_buf(),
                    class_id,
                    count,
                });
            }
            Err(e) => {
                warn!("{}: {}", backup.display(), e);
                dropped += 1;
            }
        }
    }

    fs::write(target, output)?;
    Ok(dropped)
}

/// Rewrite every label file with merged class ids.
///
/// The labels are backed up to `labels_original/` on first use and always
/// rewritten from that backup, so repeated runs give the same result.
pub fn merge_labels(
    layout: &DatasetLayout,
    original: &[String],
    merge: &ClassMerge,
) -> Result<MergeStats> {
    for unknown in merge.unknown_sources(original) {
        warn!("Merge rule for unknown class {:?} is ignored", unknown);
    }

    let backup_dir = layout.backup_labels_dir();
    if !backup_dir.exists() {
        let copied = copy_dir_recursive(&layout.labels_dir, &backup_dir)?;
        info!(
            "Backup of {} original label files created at {}",
            copied,
            backup_dir.display()
        );
    }

    let pattern = format!(
        "{}/**/*.txt",
        Pattern::escape(&backup_dir.to_string_lossy())
    );
    let backups: Vec<PathBuf> = glob(&pattern)
        .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidInput, e)))?
        .filter_map(|entry| entry.ok())
        .collect();

    let remap = merge.id_remap(original);
    let outcomes: Vec<RewriteOutcome> = backups
        .par_iter()
        .map(|backup| {
            let Some(file_name) = backup.file_name() else {
                return RewriteOutcome::Missing;
            };
            let Some(target) = current_location(layout, file_name) else {
                return RewriteOutcome::Missing;
            };
            match rewrite_from_backup(backup, &target, &remap) {
                Ok(dropped) => RewriteOutcome::Rewritten { dropped },
                Err(e) => {
                    warn!("Leaving {} untouched: {}", target.display(), e);
                    RewriteOutcome::Failed
                }
            }
        })
        .collect();

    let mut stats = MergeStats::default();
    for outcome in outcomes {
        match outcome {
            RewriteOutcome::Rewritten { dropped } => {
                stats.files_rewritten += 1;
                stats.lines_dropped += dropped;
            }
            RewriteOutcome::Missing => stats.files_missing += 1,
            RewriteOutcome::Failed => stats.files_failed += 1,
        }
    }
    Ok(stats)
}
