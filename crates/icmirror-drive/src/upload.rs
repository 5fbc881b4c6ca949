//! The two-step document upload
//!
//! iCloud Drive has no single "put file" call. Sending a file is:
//!
//! 1. ask the document service for an upload target
//!    (`/ws/{zone}/upload/web`) - yields a `document_id` and a
//!    content URL;
//! 2. POST the bytes to the content URL as multipart form data - the
//!    content service answers with checksums, a wrapping key and a
//!    receipt;
//! 3. register the document (`/ws/{zone}/update/documents`), quoting
//!    those values so the drive links the uploaded content into the
//!    target folder.
//!
//! The receipt is absent for zero-byte files; the registration body
//!    simply omits it then.

use chrono::Utc;
use icmirror_core::RemoteError;
use serde::Deserialize;
use tracing::debug;

use crate::client::DriveClient;
use crate::node::NodeData;

/// Reply to the upload-target request
#[derive(Debug, Deserialize)]
struct UploadTarget {
    document_id: String,
    url: String,
}

/// Content-service reply wrapper
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentReply {
    single_file: SingleFile,
}

/// Checksums and receipt for one uploaded blob
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SingleFile {
    file_checksum: String,
    wrapping_key: String,
    reference_checksum: String,
    size: u64,
    #[serde(default)]
    receipt: Option<String>,
}

/// Uploads `data` as `name` into `folder`
pub(crate) async fn send_file(
    client: &DriveClient,
    folder: &NodeData,
    name: &str,
    data: Vec<u8>,
) -> Result<(), RemoteError> {
    let size = data.len() as u64;
    debug!(file = %name, size, folder = %folder.full_name(), "starting upload");

    // Step 1: request an upload target.
    let body = serde_json::json!({
        "filename": name,
        "type": "FILE",
        "content_type": "",
        "size": size,
    });
    let reply = client
        .post_docws(&format!("/ws/{}/upload/web", folder.zone), &body)
        .await?;
    let target: UploadTarget = serde_json::from_value(
        reply
            .as_array()
            .and_then(|targets| targets.first())
            .cloned()
            .ok_or_else(|| RemoteError::Protocol("empty upload target reply".into()))?,
    )
    .map_err(|e| RemoteError::Protocol(format!("malformed upload target: {e}")))?;

    // Step 2: send the bytes to the content service.
    let part = reqwest::multipart::Part::bytes(data).file_name(name.to_string());
    let form = reqwest::multipart::Form::new().part(name.to_string(), part);
    let reply = client.post_multipart(&target.url, form).await?;
    let content: ContentReply = serde_json::from_value(reply)
        .map_err(|e| RemoteError::Protocol(format!("malformed content reply: {e}")))?;

    // Step 3: register the document in the target folder.
    let now_ms = Utc::now().timestamp_millis();
    let mut file_data = serde_json::json!({
        "signature": content.single_file.file_checksum,
        "wrapping_key": content.single_file.wrapping_key,
        "reference_signature": content.single_file.reference_checksum,
        "size": content.single_file.size,
    });
    // Zero-byte uploads come back without a receipt.
    if let Some(receipt) = &content.single_file.receipt {
        file_data["receipt"] = serde_json::json!(receipt);
    }

    let registration = serde_json::json!({
        "data": file_data,
        "command": "add_file",
        "create_short_guid": true,
        "document_id": target.document_id,
        "path": {
            "starting_document_id": folder.docwsid,
            "path": name,
        },
        "allow_conflict": true,
        "file_flags": {
            "is_writable": true,
            "is_executable": false,
            "is_hidden": false,
        },
        "mtime": now_ms,
        "btime": now_ms,
    });
    client
        .post_docws(&format!("/ws/{}/update/documents", folder.zone), &registration)
        .await?;

    debug!(file = %name, "upload registered");
    Ok(())
}
