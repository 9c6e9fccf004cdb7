use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_bytes, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use drive_mirror::credentials::StaticToken;
use drive_mirror::google_drive::GoogleDriveClient;
use drive_mirror_core::contract::{ByteStream, DriveClient};
use drive_mirror_core::download::list_all_children;

async fn client_for(server: &MockServer) -> GoogleDriveClient {
    GoogleDriveClient::with_base_urls(
        Box::new(StaticToken("test-token".into())),
        format!("{}/drive/v3", server.uri()),
        format!("{}/upload/drive/v3", server.uri()),
    )
}

async fn collect(mut stream: ByteStream) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend(chunk.expect("chunk"));
    }
    out
}

#[tokio::test]
async fn test_list_children_follows_page_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", "'root-id' in parents and trashed=false"))
        .and(query_param_is_missing("pageToken"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nextPageToken": "page-2",
            "files": [
                { "id": "1", "name": "a.txt", "mimeType": "text/plain", "modifiedTime": "2026-01-01T00:00:00Z" },
                { "id": "2", "name": "Sub", "mimeType": "application/vnd.google-apps.folder" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [ { "id": "3", "name": "b.pdf", "mimeType": "application/pdf" } ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let children = list_all_children(&client, "root-id").await.unwrap();

    let names: Vec<&str> = children.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "Sub", "b.pdf"]);
    assert!(children[1].is_folder());
    assert_eq!(
        children[0].modified_time.as_deref(),
        Some("2026-01-01T00:00:00Z")
    );
}

#[tokio::test]
async fn test_list_folders_uses_global_folder_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param(
            "q",
            "mimeType='application/vnd.google-apps.folder' and trashed=false",
        ))
        .and(query_param("pageSize", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [ { "id": "f1", "name": "Contracts", "parents": ["root"] } ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let page = client.list_folders(None, 50).await.unwrap();

    assert_eq!(page.folders.len(), 1);
    assert_eq!(page.folders[0].parents, vec!["root".to_string()]);
    assert!(page.next_page_token.is_none());
}

#[tokio::test]
async fn test_download_and_export_stream_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/bin-1"))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x00\x01binary".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/doc-1/export"))
        .and(query_param("mimeType", "application/pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
        .mount(&server)
        .await;

    let client = client_for(&server).await;

    let raw = collect(client.download_file("bin-1").await.unwrap()).await;
    assert_eq!(raw, b"\x00\x01binary");
    let exported = collect(
        client
            .export_file("doc-1", "application/pdf")
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(exported, b"%PDF-1.7");
}

#[tokio::test]
async fn test_error_status_becomes_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("File not found"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = match client.download_file("missing").await {
        Ok(_) => panic!("expected an error for a 404"),
        Err(e) => e,
    };

    let msg = err.to_string();
    assert!(msg.contains("404"), "got: {msg}");
    assert!(msg.contains("File not found"), "got: {msg}");
}

#[tokio::test]
async fn test_find_file_by_name_escapes_quotes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param(
            "q",
            "name='O\\'Brien.txt' and trashed=false and 'folder-1' in parents",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [ { "id": "x1", "name": "O'Brien.txt", "mimeType": "text/plain" } ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let found = client
        .find_file_by_name("folder-1", "O'Brien.txt")
        .await
        .unwrap();

    assert_eq!(found.map(|f| f.id), Some("x1".to_string()));
}

#[tokio::test]
async fn test_create_file_posts_multipart_related() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "multipart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "new-1", "name": "README.md", "mimeType": "text/markdown"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let created = client
        .create_file("folder-1", "README.md", b"# Hello\n".to_vec())
        .await
        .unwrap();
    assert_eq!(created.id, "new-1");

    let requests = server.received_requests().await.unwrap();
    let request = &requests[0];
    let content_type = request
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("multipart/related; boundary="));
    let body = String::from_utf8(request.body.clone()).unwrap();
    assert!(body.contains("\"parents\":[\"folder-1\"]"));
    assert!(body.contains("# Hello\n"));
}

#[tokio::test]
async fn test_update_file_content_patches_media() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/upload/drive/v3/files/existing-1"))
        .and(query_param("uploadType", "media"))
        .and(body_bytes(b"new content".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "existing-1", "name": "notes.txt", "mimeType": "text/plain"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let updated = client
        .update_file_content("existing-1", b"new content".to_vec())
        .await
        .unwrap();

    assert_eq!(updated.name, "notes.txt");
}
