use serde_json::json;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use drive_mirror::github::GitHubClient;
use drive_mirror_core::contract::{RepoEntryKind, RepositoryClient};
use drive_mirror_core::mirror::decode_content;

#[tokio::test]
async fn test_list_root_parses_entry_kinds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/demo/contents/"))
        .and(header("accept", "application/vnd.github+json"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "README.md", "path": "README.md", "type": "file", "sha": "a1", "size": 12 },
            { "name": "src", "path": "src", "type": "dir" },
            { "name": "vendor", "path": "vendor", "type": "submodule" }
        ])))
        .mount(&server)
        .await;

    let client = GitHubClient::new("octo", "demo", None).with_api_base(server.uri());
    let entries = client.list_root().await.unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].kind, RepoEntryKind::File);
    assert_eq!(entries[1].kind, RepoEntryKind::Dir);
    assert_eq!(entries[2].kind, RepoEntryKind::Submodule);
}

#[tokio::test]
async fn test_fetch_file_returns_decodable_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/demo/contents/README.md"))
        .and(header("authorization", "Bearer gh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "README.md",
            "path": "README.md",
            "type": "file",
            "encoding": "base64",
            "content": "IyBEZW1v\nCg==\n"
        })))
        .mount(&server)
        .await;

    let client = GitHubClient::new("octo", "demo", Some("gh-token".into()))
        .with_api_base(server.uri());
    let file = client.fetch_file("README.md").await.unwrap();

    assert_eq!(file.encoding, "base64");
    assert_eq!(decode_content(&file.content).unwrap(), b"# Demo\n");
}

#[tokio::test]
async fn test_not_found_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/missing/contents/"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })),
        )
        .mount(&server)
        .await;

    let client = GitHubClient::new("octo", "missing", None).with_api_base(server.uri());
    let err = client.list_root().await.unwrap_err();

    assert!(err.to_string().contains("404"), "got: {err}");
}
