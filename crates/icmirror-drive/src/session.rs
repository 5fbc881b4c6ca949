//! iCloud session establishment (boundary glue)
//!
//! Login, two-factor verification and session trust. The sync engine
//! never sees any of this: it consumes the root
//! [`RemoteNode`](icmirror_core::RemoteNode) that
//! [`drive_root`](Session::drive_root) hands out once the session is
//! established.
//!
//! The flow mirrors the iCloud web client: sign in against the auth
//! service (which may demand a two-factor code), then exchange the
//! session token for an account session carrying the per-account web
//! service URLs. All state a later call needs travels in cookies or in
//! the captured session headers.

use std::{collections::HashMap, sync::Arc};

use icmirror_core::{RemoteError, RemoteNodeRef};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::{from_reqwest, map_status, DriveClient};
use crate::node::DriveNode;

/// Default auth service root
const DEFAULT_AUTH_URL: &str = "https://idmsa.apple.com/appleauth/auth";

/// Default setup service root
const DEFAULT_SETUP_URL: &str = "https://setup.icloud.com/setup/ws/1";

/// Widget key the iCloud web client identifies itself with
const WIDGET_KEY: &str = "d39ba9916b7251055b22c7f910e2ea796ee65e98b2ddecea8f5dde8d9d1a815d";

/// Builder for a [`Session`]; service roots are overridable for tests
pub struct SessionBuilder {
    auth_url: String,
    setup_url: String,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            setup_url: DEFAULT_SETUP_URL.to_string(),
        }
    }
}

impl SessionBuilder {
    /// Overrides the auth service root
    pub fn auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Overrides the setup service root
    pub fn setup_url(mut self, url: impl Into<String>) -> Self {
        self.setup_url = url.into();
        self
    }

    /// Builds an unauthenticated session
    pub fn build(self) -> Result<Session, RemoteError> {
        let http = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(from_reqwest)?;
        Ok(Session {
            http,
            auth_url: self.auth_url,
            setup_url: self.setup_url,
            client_id: Uuid::new_v4().to_string(),
            session_token: None,
            session_id: None,
            scnt: None,
            requires_2fa: false,
            account: None,
        })
    }
}

/// Account-session reply from the setup service
#[derive(Debug, Deserialize)]
struct AccountSession {
    #[serde(rename = "dsInfo")]
    ds_info: DsInfo,
    webservices: HashMap<String, WebService>,
    #[serde(rename = "hsaChallengeRequired", default)]
    hsa_challenge_required: bool,
    #[serde(rename = "hsaTrustedBrowser", default)]
    hsa_trusted_browser: bool,
}

#[derive(Debug, Deserialize)]
struct DsInfo {
    dsid: String,
}

#[derive(Debug, Deserialize)]
struct WebService {
    url: String,
}

/// An (eventually) authenticated iCloud session
pub struct Session {
    http: Client,
    auth_url: String,
    setup_url: String,
    client_id: String,
    session_token: Option<String>,
    session_id: Option<String>,
    scnt: Option<String>,
    requires_2fa: bool,
    account: Option<AccountSession>,
}

impl Session {
    /// Starts building a session
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Signs in with an Apple ID and password
    ///
    /// On success the account session is established; when the account
    /// has two-factor authentication enabled,
    /// [`requires_2fa`](Session::requires_2fa) turns true and the
    /// caller must verify a code before the session is usable.
    pub async fn login(&mut self, apple_id: &str, password: &str) -> Result<(), RemoteError> {
        info!(apple_id = %apple_id, "signing in");
        let body = serde_json::json!({
            "accountName": apple_id,
            "password": password,
            "rememberMe": true,
            "trustTokens": [],
        });

        let response = self
            .http
            .post(format!("{}/signin", self.auth_url))
            .query(&[("isRememberMeEnabled", "true")])
            .header("Accept", "application/json")
            .header("X-Apple-Widget-Key", WIDGET_KEY)
            .header("X-Apple-OAuth-Client-Id", WIDGET_KEY)
            .header("X-Apple-OAuth-Client-Type", "firstPartyAuth")
            .header("X-Apple-OAuth-Redirect-URI", "https://www.icloud.com")
            .header("X-Apple-OAuth-Response-Mode", "web_message")
            .header("X-Apple-OAuth-Response-Type", "code")
            .header("X-Apple-OAuth-State", &self.client_id)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        self.capture_auth_headers(response.headers());

        let status = response.status();
        match status {
            // 409 is how the auth service says "signed in, but a
            // second factor is required".
            StatusCode::CONFLICT => {
                self.requires_2fa = true;
                debug!("two-factor verification required");
            }
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(RemoteError::Auth(
                    "invalid Apple ID or password".to_string(),
                ));
            }
            s => {
                let message = response.text().await.unwrap_or_default();
                return Err(map_status(s, message));
            }
        }

        self.account_login().await?;
        info!("signed in");
        Ok(())
    }

    /// Whether a two-factor code must be verified before the session
    /// is usable
    pub fn requires_2fa(&self) -> bool {
        self.requires_2fa
            || self
                .account
                .as_ref()
                .is_some_and(|a| a.hsa_challenge_required)
    }

    /// Whether the service already trusts this session
    pub fn is_trusted(&self) -> bool {
        self.account.as_ref().is_some_and(|a| a.hsa_trusted_browser)
    }

    /// Verifies a two-factor code received on a trusted device
    ///
    /// Returns `Ok(false)` for a wrong code (the caller may prompt
    /// again); transport and service failures are errors.
    pub async fn validate_2fa_code(&mut self, code: &str) -> Result<bool, RemoteError> {
        let body = serde_json::json!({ "securityCode": { "code": code } });
        let response = self
            .auth_request("/verify/trusteddevice/securitycode")
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = response.status();
        if status.is_success() {
            self.requires_2fa = false;
            // Re-establish the account session now that the factor is
            // verified.
            self.account_login().await?;
            return Ok(true);
        }
        if matches!(status.as_u16(), 400 | 412) {
            warn!("two-factor code rejected");
            return Ok(false);
        }
        let message = response.text().await.unwrap_or_default();
        Err(map_status(status, message))
    }

    /// Asks the service to trust this session so future runs skip the
    /// two-factor prompt
    pub async fn trust(&mut self) -> Result<(), RemoteError> {
        let response = self
            .auth_request("/2sv/trust")
            .send()
            .await
            .map_err(from_reqwest)?;

        if !response.status().is_success() {
            return Err(RemoteError::TrustNotGranted(format!(
                "trust request returned {}",
                response.status()
            )));
        }
        self.account_login().await
    }

    /// Builds the authenticated root node of the drive
    pub async fn drive_root(&self) -> Result<RemoteNodeRef, RemoteError> {
        let account = self
            .account
            .as_ref()
            .ok_or_else(|| RemoteError::Auth("session is not signed in".to_string()))?;

        let drive_url = account
            .webservices
            .get("drivews")
            .ok_or_else(|| RemoteError::Protocol("account has no drivews service".into()))?
            .url
            .clone();
        let docws_url = account
            .webservices
            .get("docws")
            .ok_or_else(|| RemoteError::Protocol("account has no docws service".into()))?
            .url
            .clone();

        let client = Arc::new(DriveClient::new(
            self.http.clone(),
            drive_url,
            docws_url,
            self.client_id.clone(),
            account.ds_info.dsid.clone(),
        ));
        DriveNode::root(client).await
    }

    /// Exchanges the auth-service token for an account session
    async fn account_login(&mut self) -> Result<(), RemoteError> {
        let token = self
            .session_token
            .clone()
            .ok_or_else(|| RemoteError::Auth("no session token after sign-in".to_string()))?;

        let body = serde_json::json!({
            "dsWebAuthToken": token,
            "extended_login": true,
        });
        let response = self
            .http
            .post(format!("{}/accountLogin", self.setup_url))
            .query(&[("clientId", self.client_id.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(map_status(status, message));
        }

        let account: AccountSession = response
            .json()
            .await
            .map_err(|e| RemoteError::Protocol(format!("malformed account session: {e}")))?;
        debug!(dsid = %account.ds_info.dsid, "account session established");
        self.account = Some(account);
        Ok(())
    }

    /// Request builder for auth-service calls carrying the captured
    /// session headers
    fn auth_request(&self, path: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .post(format!("{}{}", self.auth_url, path))
            .header("Accept", "application/json")
            .header("X-Apple-Widget-Key", WIDGET_KEY)
            .header("X-Apple-OAuth-State", &self.client_id);
        if let Some(session_id) = &self.session_id {
            request = request.header("X-Apple-ID-Session-Id", session_id);
        }
        if let Some(scnt) = &self.scnt {
            request = request.header("scnt", scnt);
        }
        request
    }

    /// Captures the session headers the auth service expects echoed
    fn capture_auth_headers(&mut self, headers: &reqwest::header::HeaderMap) {
        for (header, slot) in [
            ("X-Apple-Session-Token", &mut self.session_token),
            ("X-Apple-ID-Session-Id", &mut self.session_id),
            ("scnt", &mut self.scnt),
        ] {
            if let Some(value) = headers.get(header).and_then(|v| v.to_str().ok()) {
                *slot = Some(value.to_string());
            }
        }
    }
}
