//! Interactive folder selection.
//!
//! Lists every folder the credential can see (one flat, global query), shows
//! them as a numbered list, reads a comma-separated 1-based selection and
//! persists the chosen folders as a [`FolderMapping`] JSON file.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::contract::{DriveClient, FolderRef};
use crate::error::SyncError;

/// Page size for the global folder listing.
pub const FOLDER_PAGE_SIZE: u32 = 50;

/// Root directory recorded in every mapping file.
pub const SYNC_ROOT_PATH: &str = "drive_sync";

/// Default mapping file name, relative to the working directory.
pub const MAPPING_FILE_NAME: &str = "folder-mapping.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedFolder {
    pub name: String,
    pub id: String,
}

impl From<&FolderRef> for SelectedFolder {
    fn from(folder: &FolderRef) -> Self {
        Self {
            name: folder.name.clone(),
            id: folder.id.clone(),
        }
    }
}

/// The persisted selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderMapping {
    pub timestamp: String,
    pub folders: Vec<SelectedFolder>,
    pub sync_root_path: String,
}

impl FolderMapping {
    pub fn new(folders: Vec<SelectedFolder>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            folders,
            sync_root_path: SYNC_ROOT_PATH.to_string(),
        }
    }
}

/// Every non-trashed folder visible to the credential, all pages concatenated.
pub async fn fetch_all_folders<D>(drive: &D) -> Result<Vec<FolderRef>, SyncError>
where
    D: DriveClient + ?Sized,
{
    let mut folders = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let page = drive
            .list_folders(page_token.take(), FOLDER_PAGE_SIZE)
            .await?;
        debug!(entries = page.folders.len(), "[SELECT] Fetched folder page");
        folders.extend(page.folders);
        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }
    info!(count = folders.len(), "[SELECT] Folders fetched");
    Ok(folders)
}

pub fn render_folder_list<W: Write>(folders: &[FolderRef], out: &mut W) -> std::io::Result<()> {
    writeln!(out, "\nAvailable Google Drive folders:\n")?;
    writeln!(out, "Select folder numbers (comma separated), e.g. 1,3,5\n")?;
    for (index, folder) in folders.iter().enumerate() {
        writeln!(out, "  [{}] {}", index + 1, folder.name)?;
        writeln!(out, "     ID: {}", folder.id)?;
    }
    Ok(())
}

/// Parse a comma-separated list of 1-based indices into 0-based positions.
///
/// Each entry is read from its leading digits, so `2.` and `3a` select 2 and
/// 3. Entries without leading digits (blank, `x`, `-1`) and out-of-range
/// numbers are dropped without error. Repeated indices are kept once, in
/// first-seen order, so a folder never appears twice in the mapping.
pub fn parse_selection(input: &str, count: usize) -> Vec<usize> {
    let mut selected = Vec::new();
    for part in input.split(',') {
        let part = part.trim();
        let digits = part
            .find(|c: char| !c.is_ascii_digit())
            .map_or(part, |end| &part[..end]);
        let Ok(number) = digits.parse::<usize>() else {
            continue;
        };
        if number == 0 || number > count {
            continue;
        }
        let index = number - 1;
        if !selected.contains(&index) {
            selected.push(index);
        }
    }
    selected
}

/// Prompt until a non-empty valid selection is entered.
///
/// There is no retry limit; end of input is the only way out without a
/// selection, and is reported as [`SyncError::Input`].
pub async fn prompt_selection<R, W>(
    folders: &[FolderRef],
    input: &mut R,
    out: &mut W,
) -> Result<Vec<SelectedFolder>, SyncError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    if folders.is_empty() {
        return Err(SyncError::Input("no folders available to select".into()));
    }
    loop {
        render_folder_list(folders, out)?;
        write!(out, "\nEnter selection: ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line).await? == 0 {
            return Err(SyncError::Input(
                "input closed before a selection was made".into(),
            ));
        }

        let indices = parse_selection(&line, folders.len());
        if indices.is_empty() {
            warn!(input = %line.trim(), "[SELECT] Empty or invalid selection");
            writeln!(out, "\nNo folder selected. Try again.\n")?;
            continue;
        }

        let selected: Vec<SelectedFolder> =
            indices.iter().map(|&i| SelectedFolder::from(&folders[i])).collect();
        writeln!(out, "\nSelected folders:")?;
        for folder in &selected {
            writeln!(out, "  - {} ({})", folder.name, folder.id)?;
        }
        return Ok(selected);
    }
}

/// Write `mapping` as pretty JSON to `path`.
pub async fn save_mapping(mapping: &FolderMapping, path: &Path) -> Result<(), SyncError> {
    let json = serde_json::to_string_pretty(mapping).map_err(std::io::Error::from)?;
    tokio::fs::write(path, json).await?;
    info!(path = %path.display(), folders = mapping.folders.len(), "[SELECT] Mapping file saved");
    Ok(())
}
