//! Label Studio export client
//!
//! Pulls a project export as a ZIP archive, unpacks it, then downloads the
//! source images one by one since the export does not carry them.

use log::{debug, info, warn};
use reqwest::blocking::{Client, Response};
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::DownloadStats;
use crate::utils::{create_progress_bar, ensure_directory, infer_image_format};

/// Source of uploaded project files
pub trait UploadSource {
    fn fetch_upload(&self, project: u32, file_name: &str) -> Result<Vec<u8>>;
}

/// Blocking client for the Label Studio REST API, authenticated with an API token
pub struct LabelStudioClient {
    client: Client,
    base_url: String,
    token: String,
}

impl LabelStudioClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, token))
    }

    pub fn with_client(client: Client, base_url: &str, token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn export_url(&self, project: u32, export_type: &str) -> String {
        format!(
            "{}/api/projects/{}/export?exportType={}",
            self.base_url, project, export_type
        )
    }

    pub fn upload_url(&self, project: u32, file_name: &str) -> String {
        format!("{}/data/upload/{}/{}", self.base_url, project, file_name)
    }

    fn get(&self, url: &str) -> Result<Response> {
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .send()?;
        Ok(response)
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url)?;
        let status = response.status();
        let body = response.bytes()?;
        check_response(url, status, &body)?;
        Ok(body.to_vec())
    }

    /// Request a project export and save it as `project_<id>_<type>.zip` inside `export_dir`
    pub fn export_project(
        &self,
        project: u32,
        export_type: &str,
        export_dir: &Path,
    ) -> Result<PathBuf> {
        ensure_directory(export_dir)?;
        let url = self.export_url(project, export_type);
        info!("Exporting project {} in {} format...", project, export_type);

        let bytes = self.get_bytes(&url)?;
        let zip_path = archive_path(export_dir, project, export_type);
        fs::write(&zip_path, &bytes)?;
        info!(
            "Export saved to {} ({} bytes)",
            zip_path.display(),
            bytes.len()
        );
        Ok(zip_path)
    }
}

impl UploadSource for LabelStudioClient {
    fn fetch_upload(&self, project: u32, file_name: &str) -> Result<Vec<u8>> {
        self.get_bytes(&self.upload_url(project, file_name))
    }
}

/// Anything but `200 OK` is an error carrying the status and the body text
pub fn check_response(url: &str, status: StatusCode, body: &[u8]) -> Result<()> {
    if status == StatusCode::OK {
        return Ok(());
    }
    Err(Error::Http {
        url: url.to_string(),
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).into_owned(),
    })
}

pub fn archive_path(export_dir: &Path, project: u32, export_type: &str) -> PathBuf {
    export_dir.join(format!(
        "project_{}_{}.zip",
        project,
        export_type.to_lowercase()
    ))
}

/// Extract every file of a ZIP archive into `dest`, returning the number of files written.
/// Entries whose path would leave `dest` are skipped.
pub fn extract_archive(zip_path: &Path, dest: &Path) -> Result<usize> {
    let mut archive = zip::ZipArchive::new(File::open(zip_path)?)?;
    let mut written = 0;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping archive entry with unsafe path: {}", entry.name());
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out_file = File::create(&out_path)?;
        io::copy(&mut entry, &mut out_file)?;
        written += 1;
    }

    info!("Extracted {} files to {}", written, dest.display());
    Ok(written)
}

/// Image names to download: one per label file, same stem with `image_ext`
pub fn images_to_fetch(labels_dir: &Path, image_ext: &str) -> Result<Vec<String>> {
    let image_ext = image_ext.trim_start_matches('.');
    let mut names: Vec<String> = fs::read_dir(labels_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "txt"))
        .filter_map(|path| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .map(|stem| format!("{}.{}", stem, image_ext))
        })
        .collect();
    names.sort();
    Ok(names)
}

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Pause between two consecutive requests
    pub delay: Duration,
    pub skip_existing: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            skip_existing: false,
        }
    }
}

/// Download uploaded images sequentially into `images_dir`.
///
/// Failures are logged and counted; the remaining files are still fetched.
pub fn download_images<S: UploadSource>(
    source: &S,
    project: u32,
    names: &[String],
    images_dir: &Path,
    options: &DownloadOptions,
) -> Result<DownloadStats> {
    ensure_directory(images_dir)?;
    let mut stats = DownloadStats::default();
    let pb = create_progress_bar(names.len() as u64, "Images");
    let mut requested_before = false;

    for name in names {
        pb.inc(1);
        let target = images_dir.join(sanitize_filename::sanitize(name));

        if options.skip_existing && target.metadata().is_ok_and(|m| m.len() > 0) {
            debug!("Already present, skipping {}", target.display());
            stats.skipped_existing += 1;
            continue;
        }

        // Gap between consecutive requests only
        if requested_before && !options.delay.is_zero() {
            thread::sleep(options.delay);
        }
        requested_before = true;
        stats.requested += 1;

        match source.fetch_upload(project, name) {
            Ok(bytes) => {
                if infer_image_format(&bytes).is_none() {
                    warn!("Downloaded {} does not look like an image", name);
                }
                match fs::write(&target, &bytes) {
                    Ok(()) => {
                        debug!("Saved {}", target.display());
                        stats.downloaded += 1;
                    }
                    Err(e) => {
                        warn!("Failed to save {}: {}", target.display(), e);
                        stats.failed += 1;
                    }
                }
            }
            Err(e) => {
                warn!("Failed to download {}: {}", name, e);
                stats.failed += 1;
            }
        }
    }

    pb.finish_with_message("Image download complete");
    Ok(stats)
}
