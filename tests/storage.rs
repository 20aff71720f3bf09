//! Tests of the storage service client against a mock server.

use bespin::api::ApiError;
use bespin::config::StorageConfig;
use bespin::storage::DukeDsStore;
use bespin::storage::FileInfo;
use bespin::storage::FileStore;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_json;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;

/// Creates a store pointing at the mock server.
fn store_for_server(server: &MockServer) -> DukeDsStore {
    let config = StorageConfig {
        url: server.uri(),
        token: String::from("secret"),
        ..Default::default()
    };
    DukeDsStore::new(&config, "bespin-test").expect("store creation should succeed")
}

/// Mounts a two page project listing with `project` (id `p1`) on the second
/// page.
async fn mount_projects(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(query_param("page", "1"))
        .and(header("authorization", "secret"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-total-pages", "2")
                .set_body_json(json!({ "results": [{ "id": "p0", "name": "other" }] })),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-total-pages", "2")
                .set_body_json(json!({ "results": [{ "id": "p1", "name": "project" }] })),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn finds_file_through_folders() {
    let server = MockServer::start().await;
    mount_projects(&server).await;
    Mock::given(method("GET"))
        .and(path("/projects/p1/children"))
        .and(query_param("name_contains", "reads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "id": "file-0", "name": "reads", "kind": "dds-file" },
                { "id": "folder-1", "name": "reads", "kind": "dds-folder" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/folders/folder-1/children"))
        .and(query_param("name_contains", "sample.fastq"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{
                "id": "file-1",
                "name": "sample.fastq",
                "kind": "dds-file",
                "current_version": { "upload": { "size": 2048 } }
            }]
        })))
        .mount(&server)
        .await;

    let file = store_for_server(&server)
        .find_file_by_uri("dds://project/reads/sample.fastq")
        .await
        .expect("lookup should succeed");
    assert_eq!(
        file,
        Some(FileInfo {
            id: String::from("file-1"),
            project_id: String::from("p1"),
            size: 2048,
        })
    );
}

#[tokio::test]
async fn missing_project_is_no_file() {
    let server = MockServer::start().await;
    mount_projects(&server).await;

    let file = store_for_server(&server)
        .find_file_by_uri("dds://unknown/reads.fastq")
        .await
        .expect("lookup should succeed");
    assert_eq!(file, None);
}

#[tokio::test]
async fn not_found_during_walk_is_no_file() {
    let server = MockServer::start().await;
    mount_projects(&server).await;
    Mock::given(method("GET"))
        .and(path("/projects/p1/children"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not found." })))
        .mount(&server)
        .await;

    let file = store_for_server(&server)
        .find_file_by_uri("dds://project/reads.fastq")
        .await
        .expect("lookup should succeed");
    assert_eq!(file, None);
}

#[tokio::test]
async fn other_errors_are_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let err = store_for_server(&server)
        .find_file_by_uri("dds://project/reads.fastq")
        .await
        .unwrap_err();
    assert!(
        matches!(err, ApiError::Status { status: 500, .. }),
        "unexpected error {err:?}"
    );
}

#[tokio::test]
async fn grants_download_permission() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/projects/p1/permissions/user-1"))
        .and(header("authorization", "secret"))
        .and(body_json(json!({ "auth_role": "file_downloader" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    store_for_server(&server)
        .grant_download_permission("p1", "user-1")
        .await
        .expect("permission should be granted");
}

#[tokio::test]
async fn refused_grant_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/projects/p1/permissions/user-1"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "detail": "Not allowed." })),
        )
        .mount(&server)
        .await;

    let err = store_for_server(&server)
        .grant_download_permission("p1", "user-1")
        .await
        .unwrap_err();
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "Not allowed.");
        }
        err => panic!("unexpected error {err:?}"),
    }
}
