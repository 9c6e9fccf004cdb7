//! Recursive Drive tree materializer.
//!
//! Mirrors a remote folder subtree into a local directory:
//!   - every remote folder becomes a local directory named after it
//!   - every binary file is streamed to disk unchanged
//!   - every native document is exported (see [`crate::export`]) and written
//!     with the export format's extension
//!
//! Traversal is depth-first and strictly sequential, in server listing order.
//!
//! # Error Handling
//! A failed folder listing abandons that branch only; a failed file transfer
//! abandons that file only. Both are logged and recorded in the
//! [`MaterializeReport`]. Only failing to create the root destination
//! directory aborts the whole run.

use futures::future::BoxFuture;
use futures::StreamExt;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::contract::{ByteStream, DriveClient, DriveFile, ServiceError};
use crate::error::SyncError;
use crate::export::ExportFormat;

/// Page size for child listings.
pub const CHILD_PAGE_SIZE: u32 = 100;

/// Outcome of one materialization run.
#[derive(Debug, Default)]
pub struct MaterializeReport {
    /// Folders whose local directory exists after the run, root included.
    pub folders_synced: usize,
    pub files_written: Vec<PathBuf>,
    /// Remote ids of files that could not be written.
    pub failed_files: Vec<String>,
    /// Remote ids of folders whose listing or directory creation failed.
    pub failed_folders: Vec<String>,
    /// Folder ids reached a second time in one run and not re-entered.
    pub skipped_revisits: usize,
}

/// Fetch every child of `folder_id`, following continuation tokens until the
/// server stops returning one.
pub async fn list_all_children<D>(
    drive: &D,
    folder_id: &str,
) -> Result<Vec<DriveFile>, ServiceError>
where
    D: DriveClient + ?Sized,
{
    let mut children = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;
    loop {
        let page = drive
            .list_children(folder_id, page_token.take(), CHILD_PAGE_SIZE)
            .await?;
        pages += 1;
        debug!(
            folder_id,
            page = pages,
            entries = page.files.len(),
            "Fetched listing page"
        );
        children.extend(page.files);
        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }
    Ok(children)
}

/// Mirror the remote subtree rooted at `folder_id` into `local_dir`.
pub async fn materialize_tree<D>(
    drive: &D,
    folder_id: &str,
    local_dir: &Path,
) -> Result<MaterializeReport, SyncError>
where
    D: DriveClient + ?Sized,
{
    info!(folder_id, local_dir = %local_dir.display(), "[SYNC] Materializing tree");

    if let Err(e) = tokio::fs::create_dir_all(local_dir).await {
        error!(error = ?e, path = %local_dir.display(), "[SYNC][ERROR] Failed to create destination directory");
        return Err(SyncError::Io(e));
    }

    let mut report = MaterializeReport::default();
    let mut visited = HashSet::new();
    materialize_folder(drive, folder_id, local_dir, &mut visited, &mut report).await;

    info!(
        folders = report.folders_synced,
        files = report.files_written.len(),
        failed_files = report.failed_files.len(),
        failed_folders = report.failed_folders.len(),
        "[SYNC] Tree materialized"
    );
    Ok(report)
}

fn materialize_folder<'a, D>(
    drive: &'a D,
    folder_id: &'a str,
    local_dir: &'a Path,
    visited: &'a mut HashSet<String>,
    report: &'a mut MaterializeReport,
) -> BoxFuture<'a, ()>
where
    D: DriveClient + ?Sized,
{
    Box::pin(async move {
        if !visited.insert(folder_id.to_string()) {
            warn!(folder_id, path = %local_dir.display(), "Folder already visited in this run, skipping");
            report.skipped_revisits += 1;
            return;
        }

        if let Err(e) = tokio::fs::create_dir_all(local_dir).await {
            error!(error = ?e, path = %local_dir.display(), "Failed to create local directory");
            report.failed_folders.push(folder_id.to_string());
            return;
        }

        let children = match list_all_children(drive, folder_id).await {
            Ok(children) => children,
            Err(e) => {
                error!(error = %e, folder_id, "Listing failed, skipping branch");
                report.failed_folders.push(folder_id.to_string());
                return;
            }
        };
        report.folders_synced += 1;

        for child in &children {
            let child_path = local_dir.join(safe_component(&child.name));
            if child.is_folder() {
                materialize_folder(drive, &child.id, &child_path, visited, report).await;
                continue;
            }
            match materialize_file(drive, child, local_dir).await {
                Ok(path) => {
                    info!(file = %child.name, path = %path.display(), "Downloaded");
                    report.files_written.push(path);
                }
                Err(e) => {
                    error!(error = %e, file = %child.name, file_id = %child.id, "Download failed, skipping");
                    report.failed_files.push(child.id.clone());
                }
            }
        }
    })
}

/// Write one remote file into `dir`, exporting native documents.
///
/// Returns the path written. On a stream error the partially written file is
/// left on disk.
pub async fn materialize_file<D>(
    drive: &D,
    file: &DriveFile,
    dir: &Path,
) -> Result<PathBuf, SyncError>
where
    D: DriveClient + ?Sized,
{
    let (stream, target) = match ExportFormat::for_mime_type(&file.mime_type) {
        Some(format) => {
            debug!(file = %file.name, export_mime = format.mime_type, "Exporting native document");
            let stream = drive.export_file(&file.id, format.mime_type).await?;
            let name = format.local_file_name(&safe_component(&file.name));
            (stream, dir.join(name))
        }
        None => {
            let stream = drive.download_file(&file.id).await?;
            (stream, dir.join(safe_component(&file.name)))
        }
    };
    let bytes = write_stream(stream, &target).await?;
    debug!(path = %target.display(), bytes, "Stream written");
    Ok(target)
}

async fn write_stream(mut stream: ByteStream, path: &Path) -> Result<u64, SyncError> {
    let mut out = tokio::fs::File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        out.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    out.flush().await?;
    Ok(written)
}

/// Remote names become single path components.
fn safe_component(name: &str) -> String {
    match name {
        "" | "." | ".." => "_".to_string(),
        _ => name.replace(['/', '\\'], "_"),
    }
}
