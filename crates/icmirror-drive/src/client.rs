//! HTTP client for the iCloud drive web services
//!
//! Wraps `reqwest::Client` with the query parameters every drive call
//! carries and maps HTTP outcomes onto the [`RemoteError`] taxonomy.
//! The session layer owns authentication; by the time a `DriveClient`
//! exists, the underlying client already carries the session cookies.

use icmirror_core::RemoteError;
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

/// Longest error-body excerpt carried into an error message
const ERROR_BODY_LIMIT: usize = 200;

/// Authenticated client for drive and document web service calls
pub struct DriveClient {
    http: Client,
    /// Service root for tree operations (retrieve, createFolders, trash)
    drive_url: String,
    /// Service root for document content operations (upload flow)
    docws_url: String,
    /// Per-session client identifier sent with every call
    client_id: String,
    /// Directory services identifier of the authenticated account
    dsid: String,
}

impl DriveClient {
    /// Creates a client over an already-authenticated HTTP session
    pub fn new(
        http: Client,
        drive_url: impl Into<String>,
        docws_url: impl Into<String>,
        client_id: impl Into<String>,
        dsid: impl Into<String>,
    ) -> Self {
        Self {
            http,
            drive_url: drive_url.into(),
            docws_url: docws_url.into(),
            client_id: client_id.into(),
            dsid: dsid.into(),
        }
    }

    /// Service root for tree operations
    pub fn drive_url(&self) -> &str {
        &self.drive_url
    }

    /// Service root for document operations
    pub fn docws_url(&self) -> &str {
        &self.docws_url
    }

    /// Session client identifier
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Query parameters every drive call carries
    pub(crate) fn params(&self) -> [(&str, &str); 2] {
        [("clientId", self.client_id.as_str()), ("dsid", self.dsid.as_str())]
    }

    /// POSTs a JSON body to a drive-service path and parses the reply
    pub(crate) async fn post_drive(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, RemoteError> {
        let url = format!("{}{}", self.drive_url, path);
        debug!(%url, "drive service call");
        let response = self
            .http
            .post(&url)
            .query(&self.params())
            .json(body)
            .send()
            .await
            .map_err(from_reqwest)?;
        parse_json(response).await
    }

    /// POSTs a JSON body to a document-service path and parses the reply
    pub(crate) async fn post_docws(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, RemoteError> {
        let url = format!("{}{}", self.docws_url, path);
        debug!(%url, "document service call");
        let response = self
            .http
            .post(&url)
            .query(&self.params())
            .json(body)
            .send()
            .await
            .map_err(from_reqwest)?;
        parse_json(response).await
    }

    /// POSTs multipart content to an absolute URL (content-upload step)
    pub(crate) async fn post_multipart(
        &self,
        url: &str,
        form: reqwest::multipart::Form,
    ) -> Result<serde_json::Value, RemoteError> {
        debug!(%url, "content upload");
        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(from_reqwest)?;
        parse_json(response).await
    }
}

/// Maps a transport failure onto the error taxonomy
pub(crate) fn from_reqwest(err: reqwest::Error) -> RemoteError {
    RemoteError::Network(err.to_string())
}

/// Maps a non-success HTTP status onto the error taxonomy
///
/// 401/403/421 are how the iCloud web services report an expired or
/// rejected session; everything else stays an API error, and the
/// transient split (408/429/5xx) lives on [`RemoteError`] itself.
pub(crate) fn map_status(status: StatusCode, message: String) -> RemoteError {
    match status.as_u16() {
        401 | 403 | 421 => RemoteError::Auth(message),
        code => RemoteError::Api {
            status: code,
            message,
        },
    }
}

/// Truncates to at most `limit` bytes without splitting a character
///
/// Error bodies are arbitrary service output; byte `limit` may land
/// inside a multi-byte sequence, which `String::truncate` rejects.
pub(crate) fn truncate_cleanly(message: &mut String, limit: usize) {
    if message.len() <= limit {
        return;
    }
    let mut cut = limit;
    while !message.is_char_boundary(cut) {
        cut -= 1;
    }
    message.truncate(cut);
}

/// Checks the status and deserializes a JSON body
pub(crate) async fn parse_json(response: Response) -> Result<serde_json::Value, RemoteError> {
    let status = response.status();
    if !status.is_success() {
        let mut message = response.text().await.unwrap_or_default();
        truncate_cleanly(&mut message, ERROR_BODY_LIMIT);
        return Err(map_status(status, message));
    }
    response
        .json()
        .await
        .map_err(|e| RemoteError::Protocol(format!("invalid JSON body: {e}")))
}
