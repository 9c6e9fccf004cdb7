//! # contract: service interfaces and the data they exchange
//!
//! This module defines the two remote-service traits the sync pipelines are
//! written against, plus the plain data types flowing through them:
//!
//! - [`DriveClient`]: listing, downloading, exporting and uploading files in a
//!   Google Drive-like store.
//! - [`RepositoryClient`]: enumerating and fetching files from a hosted
//!   repository's contents API.
//!
//! ## Interface & Extensibility
//! - All methods are async and return [`ServiceError`] (a boxed error) so that
//!   concrete HTTP clients and test mocks share one error contract.
//! - Clients are constructed once per process and passed by reference into each
//!   operation; nothing in the core crate holds a global client handle.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`, so consumers can generate
//!   deterministic mocks (`MockDriveClient`, `MockRepositoryClient`).

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use mockall::automock;

/// Boxed error returned by every remote-service call.
pub type ServiceError = Box<dyn std::error::Error + Send + Sync>;

/// A chunked byte stream for a file body (raw download or export).
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, ServiceError>>;

/// MIME type Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// A remote object as returned by a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default)]
    pub modified_time: Option<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// A remote container. `id` is the only stable key; `name` is not unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parents: Vec<String>,
}

/// One page of a folder's children.
#[derive(Debug, Clone, Default)]
pub struct FileListPage {
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

/// One page of the global folder listing.
#[derive(Debug, Clone, Default)]
pub struct FolderListPage {
    pub folders: Vec<FolderRef>,
    pub next_page_token: Option<String>,
}

/// Kind of a top-level repository entry, as reported by the contents API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoEntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

/// An entry in a repository directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: RepoEntryKind,
}

/// The raw, still-encoded content of a single repository file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoContent {
    pub name: String,
    pub path: String,
    /// Transfer encoding of `content`; the contents API uses `base64`.
    #[serde(default)]
    pub encoding: String,
    #[serde(default)]
    pub content: String,
}

/// Remote file store the Drive-side pipelines talk to.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DriveClient: Send + Sync {
    /// List one page of the non-trashed children of `folder_id`.
    async fn list_children(
        &self,
        folder_id: &str,
        page_token: Option<String>,
        page_size: u32,
    ) -> Result<FileListPage, ServiceError>;

    /// List one page of every non-trashed folder visible to the credential.
    async fn list_folders(
        &self,
        page_token: Option<String>,
        page_size: u32,
    ) -> Result<FolderListPage, ServiceError>;

    /// Stream the raw bytes of a binary file.
    async fn download_file(&self, file_id: &str) -> Result<ByteStream, ServiceError>;

    /// Stream a native document converted to `export_mime_type`.
    async fn export_file(
        &self,
        file_id: &str,
        export_mime_type: &str,
    ) -> Result<ByteStream, ServiceError>;

    /// Find a non-trashed file by exact name inside `folder_id`.
    async fn find_file_by_name(
        &self,
        folder_id: &str,
        name: &str,
    ) -> Result<Option<DriveFile>, ServiceError>;

    /// Create a new file named `name` inside `folder_id`.
    async fn create_file(
        &self,
        folder_id: &str,
        name: &str,
        content: Vec<u8>,
    ) -> Result<DriveFile, ServiceError>;

    /// Replace the content of an existing file in place.
    async fn update_file_content(
        &self,
        file_id: &str,
        content: Vec<u8>,
    ) -> Result<DriveFile, ServiceError>;
}

/// Read access to a hosted repository's file contents.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// List the entries at the repository root.
    async fn list_root(&self) -> Result<Vec<RepoEntry>, ServiceError>;

    /// Fetch the encoded content of the file at `path`.
    async fn fetch_file(&self, path: &str) -> Result<RepoContent, ServiceError>;
}
