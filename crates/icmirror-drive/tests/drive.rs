//! Integration tests for drive tree operations
//!
//! Runs the [`DriveNode`] implementation against a wiremock server
//! standing in for the iCloud drive and document web services.

use std::sync::Arc;

use icmirror_core::{RemoteError, RemoteNode};
use icmirror_drive::node::NodeData;
use icmirror_drive::{DriveClient, DriveNode};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A root folder record pointing at the mock server
fn root_data() -> NodeData {
    serde_json::from_value(serde_json::json!({
        "drivewsid": "FOLDER::com.apple.CloudDocs::root",
        "docwsid": "root",
        "zone": "com.apple.CloudDocs",
        "name": "",
        "type": "FOLDER",
        "etag": "1::1",
    }))
    .unwrap()
}

fn client(server: &MockServer) -> Arc<DriveClient> {
    Arc::new(DriveClient::new(
        reqwest::Client::new(),
        server.uri(),
        server.uri(),
        "client-0001",
        "dsid-0001",
    ))
}

fn listing_reply(items: serde_json::Value) -> serde_json::Value {
    serde_json::json!([{
        "drivewsid": "FOLDER::com.apple.CloudDocs::root",
        "docwsid": "root",
        "zone": "com.apple.CloudDocs",
        "name": "",
        "type": "FOLDER",
        "etag": "1::1",
        "items": items,
    }])
}

async fn mount_listing(server: &MockServer, items: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/retrieveItemDetailsInFolders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_reply(items)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn child_lookup_finds_files_and_folders() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        serde_json::json!([
            {
                "drivewsid": "FILE::com.apple.CloudDocs::f1",
                "docwsid": "f1",
                "zone": "com.apple.CloudDocs",
                "name": "a",
                "extension": "txt",
                "type": "FILE",
                "etag": "2::2",
                "size": 100,
                "dateModified": "2024-03-01T12:00:00Z",
            },
            {
                "drivewsid": "FOLDER::com.apple.CloudDocs::d1",
                "docwsid": "d1",
                "zone": "com.apple.CloudDocs",
                "name": "sub",
                "type": "FOLDER",
                "etag": "3::3",
            },
        ]),
    )
    .await;

    let node = DriveNode::new(client(&server), root_data());

    let file = node.child("a.txt").await.unwrap().expect("a.txt exists");
    assert!(!file.is_dir());
    assert_eq!(file.name(), "a.txt");
    assert_eq!(file.size(), Some(100));
    assert!(file.modified().is_some());

    let folder = node.child("sub").await.unwrap().expect("sub exists");
    assert!(folder.is_dir());
    assert_eq!(folder.size(), None);

    assert!(node.child("missing.txt").await.unwrap().is_none());
}

#[tokio::test]
async fn listing_is_cached_until_invalidated() {
    let server = MockServer::start().await;

    // First fetch sees an empty folder; each later fetch sees "sub".
    Mock::given(method("POST"))
        .and(path("/retrieveItemDetailsInFolders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_reply(serde_json::json!([]))))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_listing(
        &server,
        serde_json::json!([{
            "drivewsid": "FOLDER::com.apple.CloudDocs::d1",
            "docwsid": "d1",
            "zone": "com.apple.CloudDocs",
            "name": "sub",
            "type": "FOLDER",
        }]),
    )
    .await;

    let node = DriveNode::new(client(&server), root_data());

    assert!(node.child("sub").await.unwrap().is_none());
    // Cached: still absent, no second fetch happened.
    assert!(node.child("sub").await.unwrap().is_none());

    // Invalidation forces a fresh read, which now sees the folder.
    node.invalidate().await;
    assert!(node.child("sub").await.unwrap().is_some());
}

#[tokio::test]
async fn create_child_dir_posts_creation_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/createFolders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "destinationDrivewsId": "FOLDER::com.apple.CloudDocs::root",
            "folders": [{
                "drivewsid": "FOLDER::com.apple.CloudDocs::new",
                "name": "sub",
            }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let node = DriveNode::new(client(&server), root_data());
    node.create_child_dir("sub").await.unwrap();
}

#[tokio::test]
async fn delete_moves_node_to_trash() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        serde_json::json!([{
            "drivewsid": "FILE::com.apple.CloudDocs::f1",
            "docwsid": "f1",
            "zone": "com.apple.CloudDocs",
            "name": "a",
            "extension": "txt",
            "type": "FILE",
            "etag": "2::2",
            "size": 10,
        }]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/moveItemsToTrash"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let root = DriveNode::new(client(&server), root_data());
    let file = root.child("a.txt").await.unwrap().unwrap();
    file.delete().await.unwrap();
}

#[tokio::test]
async fn upload_runs_the_three_step_flow() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ws/com.apple.CloudDocs/upload/web"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "document_id": "doc-1",
            "url": format!("{}/content-upload", server.uri()),
        }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/content-upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "singleFile": {
                "fileChecksum": "c2lno==",
                "wrappingKey": "d3JhcA==",
                "referenceChecksum": "cmVm==",
                "size": 5,
                "receipt": "cmVjZWlwdA==",
            },
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ws/com.apple.CloudDocs/update/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status_code": 0,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let node = DriveNode::new(client(&server), root_data());
    node.upload("hello.txt", b"hello".to_vec()).await.unwrap();
}

#[tokio::test]
async fn zero_byte_upload_succeeds_without_receipt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ws/com.apple.CloudDocs/upload/web"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "document_id": "doc-2",
            "url": format!("{}/content-upload", server.uri()),
        }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/content-upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "singleFile": {
                "fileChecksum": "c2lno==",
                "wrappingKey": "d3JhcA==",
                "referenceChecksum": "cmVm==",
                "size": 0,
            },
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ws/com.apple.CloudDocs/update/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status_code": 0,
        })))
        .mount(&server)
        .await;

    let node = DriveNode::new(client(&server), root_data());
    node.upload("empty.txt", Vec::new()).await.unwrap();
}

#[tokio::test]
async fn service_outage_maps_to_transient_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/retrieveItemDetailsInFolders"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let node = DriveNode::new(client(&server), root_data());
    let err = node.child("a.txt").await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn non_ascii_error_body_still_maps_to_transient_error() {
    let server = MockServer::start().await;
    // 199 ASCII bytes, then a two-byte character straddling the
    // excerpt limit.
    let body = format!("{}é temporairement indisponible", "x".repeat(199));
    Mock::given(method("POST"))
        .and(path("/retrieveItemDetailsInFolders"))
        .respond_with(ResponseTemplate::new(503).set_body_string(body))
        .mount(&server)
        .await;

    let node = DriveNode::new(client(&server), root_data());
    let err = node.child("a.txt").await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn expired_session_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/retrieveItemDetailsInFolders"))
        .respond_with(ResponseTemplate::new(421).set_body_string("session expired"))
        .mount(&server)
        .await;

    let node = DriveNode::new(client(&server), root_data());
    let err = node.child("a.txt").await.unwrap_err();
    assert!(matches!(err, RemoteError::Auth(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn root_fetches_its_own_record() {
    let server = MockServer::start().await;
    mount_listing(&server, serde_json::json!([])).await;

    let root = DriveNode::root(client(&server)).await.unwrap();
    assert!(root.is_dir());
    assert!(root.child("anything").await.unwrap().is_none());
}
