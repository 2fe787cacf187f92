//! Device authentication against the ListenAI token endpoint.

use crate::error::AuthError;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Bound on the one-shot token request.
const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Immutable device credentials, created once at process start.
#[derive(Clone, Debug)]
pub struct DeviceIdentity {
    pub product_id: String,
    pub product_secret: String,
    pub device_id: String,
}

/// Opaque access token returned by the auth endpoint.
///
/// Obtained once per run, before the transport is opened; this client never
/// refreshes it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Keyed checksum binding the shared secret to a Unix timestamp.
///
/// The endpoint only accepts the checksum within its clock-skew window of
/// `timestamp`, so callers must sign with a freshly captured time.
pub fn sign(secret: &str, timestamp: u64) -> String {
    let mut hasher = Md5::new();
    hasher.update(secret.as_bytes());
    hasher.update(timestamp.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    product_id: &'a str,
    device_id: &'a str,
    curtime: u64,
    checksum: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: Option<String>,
}

/// Exchanges signed device credentials for an access token.
pub struct Authenticator {
    http: reqwest::Client,
    auth_url: String,
}

impl Authenticator {
    pub fn new(auth_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth_url: auth_url.into(),
        }
    }

    /// Issues the one-shot token request. No retries; a failure here is fatal
    /// to the session.
    pub async fn authenticate(&self, identity: &DeviceIdentity) -> Result<AccessToken, AuthError> {
        let curtime = unix_time();
        let request = TokenRequest {
            product_id: &identity.product_id,
            device_id: &identity.device_id,
            curtime,
            checksum: sign(&identity.product_secret, curtime),
        };

        let response = self
            .http
            .post(&self.auth_url)
            .timeout(AUTH_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        debug!(%body, "auth response");
        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|_| AuthError::MissingToken)?;
        parsed.token.map(AccessToken).ok_or(AuthError::MissingToken)
    }
}

fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
