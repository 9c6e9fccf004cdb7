//! Repository → Drive mirror.
//!
//! Copies every file at the top level of a repository into one Drive folder,
//! matching by exact file name: an existing same-named file is updated in
//! place, otherwise a new file is created.
//!
//! Only the repository root is enumerated. Subdirectories, symlinks and
//! submodules are skipped and listed in [`MirrorReport::skipped`].
//!
//! # Error Handling
//! Failing to list the repository root fails the run. Any per-file failure
//! (fetch, decode, lookup, upload) is logged, recorded in
//! [`MirrorReport::failed`], and the next file is attempted.

use base64::Engine;
use tracing::{debug, error, info};

use crate::contract::{DriveClient, DriveFile, RepoEntry, RepoEntryKind, RepositoryClient};
use crate::error::SyncError;

#[derive(Debug, Default)]
pub struct MirrorReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
}

/// Whether an upsert created a new remote file or replaced an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(DriveFile),
    Updated(DriveFile),
}

pub async fn mirror_repository<R, D>(
    repo: &R,
    drive: &D,
    target_folder_id: &str,
) -> Result<MirrorReport, SyncError>
where
    R: RepositoryClient + ?Sized,
    D: DriveClient + ?Sized,
{
    info!(target_folder_id, "[MIRROR] Starting repository mirror");

    let entries = match repo.list_root().await {
        Ok(entries) => entries,
        Err(e) => {
            error!(error = %e, "[MIRROR][ERROR] Failed to list repository contents");
            return Err(SyncError::Service(e));
        }
    };
    info!(entries = entries.len(), "[MIRROR] Listed repository root");

    let mut report = MirrorReport::default();
    // TODO: recurse into `Dir` entries once the Drive side can mirror nested folders.
    for entry in &entries {
        if entry.kind != RepoEntryKind::File {
            debug!(name = %entry.name, kind = ?entry.kind, "[MIRROR] Skipping non-file entry");
            report.skipped.push(entry.name.clone());
            continue;
        }
        match mirror_entry(repo, drive, target_folder_id, entry).await {
            Ok(UpsertOutcome::Created(file)) => {
                info!(name = %entry.name, file_id = %file.id, "[MIRROR] Created");
                report.created.push(entry.name.clone());
            }
            Ok(UpsertOutcome::Updated(file)) => {
                info!(name = %entry.name, file_id = %file.id, "[MIRROR] Updated");
                report.updated.push(entry.name.clone());
            }
            Err(e) => {
                error!(error = %e, name = %entry.name, "[MIRROR][ERROR] Failed to mirror file");
                report.failed.push(entry.name.clone());
            }
        }
    }

    info!(
        created = report.created.len(),
        updated = report.updated.len(),
        failed = report.failed.len(),
        skipped = report.skipped.len(),
        "[MIRROR] Repository mirror complete"
    );
    Ok(report)
}

async fn mirror_entry<R, D>(
    repo: &R,
    drive: &D,
    target_folder_id: &str,
    entry: &RepoEntry,
) -> Result<UpsertOutcome, SyncError>
where
    R: RepositoryClient + ?Sized,
    D: DriveClient + ?Sized,
{
    let remote = repo.fetch_file(&entry.path).await?;
    if remote.encoding != "base64" {
        return Err(SyncError::Input(format!(
            "unsupported content encoding {:?} for {}",
            remote.encoding, entry.path
        )));
    }
    let content = decode_content(&remote.content)?;
    debug!(name = %entry.name, bytes = content.len(), "[MIRROR] Decoded repository file");
    upsert_file(drive, target_folder_id, &entry.name, content).await
}

/// Update the same-named file in `folder_id`, or create it when absent.
pub async fn upsert_file<D>(
    drive: &D,
    folder_id: &str,
    name: &str,
    content: Vec<u8>,
) -> Result<UpsertOutcome, SyncError>
where
    D: DriveClient + ?Sized,
{
    match drive.find_file_by_name(folder_id, name).await? {
        Some(existing) => {
            let file = drive.update_file_content(&existing.id, content).await?;
            Ok(UpsertOutcome::Updated(file))
        }
        None => {
            let file = drive.create_file(folder_id, name, content).await?;
            Ok(UpsertOutcome::Created(file))
        }
    }
}

/// Decode a contents-API base64 payload, which is wrapped with newlines.
pub fn decode_content(encoded: &str) -> Result<Vec<u8>, SyncError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| SyncError::Input(format!("invalid base64 content: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_line_wrapped_base64() {
        let encoded = "aGVsbG8g\nd29ybGQ=\n";
        assert_eq!(decode_content(encoded).unwrap(), b"hello world");
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode_content("***"), Err(SyncError::Input(_))));
    }
}
