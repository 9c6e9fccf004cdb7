//! Google Drive v3 implementation of [`DriveClient`].
//!
//! Plain `reqwest` calls against the REST API, authorised with a bearer token
//! from a [`TokenSource`]. Base URLs are overridable so the client can be
//! pointed at a local mock server.

use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info};

use drive_mirror_core::contract::{
    ByteStream, DriveClient, DriveFile, FileListPage, FolderListPage, FolderRef, ServiceError,
    FOLDER_MIME_TYPE,
};

use crate::credentials::{ServiceAccountTokens, TokenSource};

const FILE_FIELDS: &str = "id, name, mimeType, modifiedTime";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: DeserializeOwned"))]
struct ListResponse<T> {
    #[serde(default)]
    files: Vec<T>,
    next_page_token: Option<String>,
}

pub struct GoogleDriveClient {
    http: reqwest::Client,
    tokens: Box<dyn TokenSource>,
    api_base: String,
    upload_base: String,
}

impl GoogleDriveClient {
    pub const DRIVE_API_BASE: &'static str = "https://www.googleapis.com/drive/v3";
    pub const UPLOAD_API_BASE: &'static str = "https://www.googleapis.com/upload/drive/v3";

    pub fn new(tokens: Box<dyn TokenSource>) -> Self {
        Self::with_base_urls(tokens, Self::DRIVE_API_BASE, Self::UPLOAD_API_BASE)
    }

    pub fn with_base_urls(
        tokens: Box<dyn TokenSource>,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            tokens,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            upload_base: upload_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a client from the environment's service-account key.
    ///
    /// A token is requested immediately, so bad credentials fail here rather
    /// than on the first API call.
    pub async fn connect(scope: &str) -> anyhow::Result<Self> {
        let tokens = ServiceAccountTokens::from_env(scope).await?;
        tokens
            .access_token()
            .await
            .context("Initial access token request was rejected")?;
        info!(scope, "Google Drive authentication completed");
        Ok(Self::new(Box::new(tokens)))
    }

    async fn bearer(&self) -> Result<String, ServiceError> {
        Ok(self.tokens.access_token().await?)
    }

    async fn list_files<T: DeserializeOwned>(
        &self,
        query: String,
        fields: &str,
        page_token: Option<String>,
        page_size: u32,
    ) -> Result<ListResponse<T>, ServiceError> {
        let token = self.bearer().await?;
        let mut params: Vec<(&str, String)> = vec![
            ("q", query),
            ("spaces", "drive".to_string()),
            ("pageSize", page_size.to_string()),
            ("fields", fields.to_string()),
        ];
        if let Some(page_token) = page_token {
            params.push(("pageToken", page_token));
        }
        let response = self
            .http
            .get(format!("{}/files", self.api_base))
            .bearer_auth(token)
            .query(&params)
            .send()
            .await?;
        let response = ensure_success(response, "list files").await?;
        Ok(response.json::<ListResponse<T>>().await?)
    }

    async fn get_stream(
        &self,
        url: String,
        params: &[(&str, &str)],
        action: &str,
    ) -> Result<ByteStream, ServiceError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(params)
            .send()
            .await?;
        let response = ensure_success(response, action).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ServiceError::from))
            .boxed())
    }
}

#[async_trait]
impl DriveClient for GoogleDriveClient {
    async fn list_children(
        &self,
        folder_id: &str,
        page_token: Option<String>,
        page_size: u32,
    ) -> Result<FileListPage, ServiceError> {
        debug!(folder_id, ?page_token, "Listing folder children");
        let query = format!("'{}' in parents and trashed=false", escape_query(folder_id));
        let fields = format!("nextPageToken, files({FILE_FIELDS})");
        let page: ListResponse<DriveFile> =
            self.list_files(query, &fields, page_token, page_size).await?;
        Ok(FileListPage {
            files: page.files,
            next_page_token: page.next_page_token,
        })
    }

    async fn list_folders(
        &self,
        page_token: Option<String>,
        page_size: u32,
    ) -> Result<FolderListPage, ServiceError> {
        debug!(?page_token, "Listing all folders");
        let query = format!("mimeType='{FOLDER_MIME_TYPE}' and trashed=false");
        let page: ListResponse<FolderRef> = self
            .list_files(
                query,
                "nextPageToken, files(id, name, parents)",
                page_token,
                page_size,
            )
            .await?;
        Ok(FolderListPage {
            folders: page.files,
            next_page_token: page.next_page_token,
        })
    }

    async fn download_file(&self, file_id: &str) -> Result<ByteStream, ServiceError> {
        debug!(file_id, "Downloading file");
        self.get_stream(
            format!("{}/files/{}", self.api_base, file_id),
            &[("alt", "media")],
            "download file",
        )
        .await
    }

    async fn export_file(
        &self,
        file_id: &str,
        export_mime_type: &str,
    ) -> Result<ByteStream, ServiceError> {
        debug!(file_id, export_mime_type, "Exporting file");
        self.get_stream(
            format!("{}/files/{}/export", self.api_base, file_id),
            &[("mimeType", export_mime_type)],
            "export file",
        )
        .await
    }

    async fn find_file_by_name(
        &self,
        folder_id: &str,
        name: &str,
    ) -> Result<Option<DriveFile>, ServiceError> {
        let query = format!(
            "name='{}' and trashed=false and '{}' in parents",
            escape_query(name),
            escape_query(folder_id)
        );
        let fields = format!("files({FILE_FIELDS})");
        let page: ListResponse<DriveFile> = self.list_files(query, &fields, None, 10).await?;
        Ok(page.files.into_iter().next())
    }

    async fn create_file(
        &self,
        folder_id: &str,
        name: &str,
        content: Vec<u8>,
    ) -> Result<DriveFile, ServiceError> {
        info!(folder_id, name, bytes = content.len(), "Creating Drive file");
        let token = self.bearer().await?;
        let metadata = serde_json::json!({ "name": name, "parents": [folder_id] });
        let boundary = format!("drive-mirror-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related(&boundary, &metadata, &content);

        let response = self
            .http
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(token)
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await?;
        let response = ensure_success(response, "create file").await?;
        Ok(response.json::<DriveFile>().await?)
    }

    async fn update_file_content(
        &self,
        file_id: &str,
        content: Vec<u8>,
    ) -> Result<DriveFile, ServiceError> {
        info!(file_id, bytes = content.len(), "Updating Drive file content");
        let token = self.bearer().await?;
        let response = self
            .http
            .patch(format!("{}/files/{}", self.upload_base, file_id))
            .bearer_auth(token)
            .query(&[("uploadType", "media"), ("fields", FILE_FIELDS)])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(content)
            .send()
            .await?;
        let response = ensure_success(response, "update file").await?;
        Ok(response.json::<DriveFile>().await?)
    }
}

/// Escape a value for a single-quoted Drive query literal.
pub fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn multipart_related(boundary: &str, metadata: &serde_json::Value, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 256);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/octet-stream\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

/// Pass successful responses through; turn anything else into an error
/// carrying the status and response body.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    action: &str,
) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
    error!(status = %status, url = %url, action, "API returned error. Response body: {body}");
    Err(format!("{action} failed with {status}: {body}").into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(escape_query("O'Brien's"), "O\\'Brien\\'s");
        assert_eq!(escape_query("a\\b"), "a\\\\b");
    }

    #[test]
    fn multipart_body_wraps_metadata_and_content() {
        let metadata = serde_json::json!({ "name": "a.txt" });
        let body = multipart_related("xyz", &metadata, b"hello");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("--xyz\r\nContent-Type: application/json"));
        assert!(text.contains("{\"name\":\"a.txt\"}"));
        assert!(text.contains("\r\n\r\nhello\r\n--xyz--\r\n"));
    }
}
