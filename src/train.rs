//! Launching the external Ultralytics trainer
//!
//! Training itself happens in the `yolo` CLI; this module validates the dataset
//! config, assembles the command line and waits for the process.

use log::info;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::TrainOptions;
use crate::error::{Error, Result};
use crate::io::read_dataset_config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl TrainCommand {
    /// Build `yolo detect train data=... model=... ...` for a dataset config
    pub fn new(data: &Path, opts: &TrainOptions) -> Self {
        let mut args: Vec<String> = vec!["detect".into(), "train".into()];
        args.push(format!("data={}", data.display()));
        args.push(format!("model={}", opts.model));
        args.push(format!("epochs={}", opts.epochs));
        args.push(format!("imgsz={}", opts.imgsz));
        args.push(format!("batch={}", opts.batch));
        args.push("save=True".into());
        if let Some(device) = &opts.device {
            args.push(format!("device={}", device));
        }
        if let Some(runs_dir) = &opts.runs_dir {
            args.push(format!("project={}", runs_dir));
        }
        if let Some(run_name) = &opts.run_name {
            args.push(format!("name={}", run_name));
        }
        TrainCommand {
            program: opts.yolo_bin.clone(),
            args,
        }
    }

    /// Shell-like rendering for logs
    pub fn display(&self) -> String {
        let mut line = quote(&self.program.display().to_string());
        for arg in &self.args {
            line.push(' ');
            line.push_str(&quote(arg));
        }
        line
    }

    /// Run the trainer with inherited stdio and wait for it
    pub fn run(&self) -> Result<()> {
        info!("Running {}", self.display());
        let status = Command::new(&self.program).args(&self.args).status()?;
        if status.success() {
            info!("Training finished.");
            Ok(())
        } else {
            Err(Error::Training(
                status
                    .code()
                    .map(|code| format!("exit code {}", code))
                    .unwrap_or_else(|| "a signal".to_string()),
            ))
        }
    }
}

fn quote(arg: &str) -> String {
    if arg.contains(char::is_whitespace) {
        format!("'{}'", arg.replace('\'', r"'\''"))
    } else {
        arg.to_string()
    }
}

/// Make sure the dataset config exists and is consistent before starting a long run
pub fn check_config(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(Error::InvalidConfig {
            path: path.to_path_buf(),
            message: "file not found".to_string(),
        });
    }
    let config = read_dataset_config(path)?;
    if config.nc != config.names.len() {
        return Err(Error::InvalidConfig {
            path: path.to_path_buf(),
            message: format!(
                "nc is {} but {} names are listed",
                config.nc,
                config.names.len()
            ),
        });
    }
    if config.nc == 0 {
        return Err(Error::InvalidConfig {
            path: path.to_path_buf(),
            message: "no classes".to_string(),
        });
    }
    for split in [&config.train, &config.val] {
        if !Path::new(split).is_dir() {
            return Err(Error::InvalidConfig {
                path: path.to_path_buf(),
                message: format!("split folder {} does not exist", split),
            });
        }
    }
    Ok(())
}

/// Validate the config, then train unless `dry_run` is set
pub fn train(data: &Path, opts: &TrainOptions) -> Result<()> {
    check_config(data)?;
    let command = TrainCommand::new(data, opts);
    if opts.dry_run {
        info!("Dry run, would execute: {}", command.display());
        return Ok(());
    }
    command.run()
}
