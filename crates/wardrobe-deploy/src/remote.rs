//! Remote content server access

use crate::entity::PreparedDeployment;
use crate::identity::Identity;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use wardrobe_core::{ContentId, Result, WardrobeError};

const REQUEST_TIMEOUT_SECS: u64 = 60;
const MAX_RETRIES: usize = 3;
const RETRY_BASE_DELAY_MS: u64 = 500;
pub const IDENTITY_HEADER: &str = "x-identity-address";

/// A content-addressed store that accepts entity deployments
pub trait RemoteStore: Send + Sync {
    fn exists(&self, id: &ContentId) -> Result<bool>;

    fn upload(&self, id: &ContentId, bytes: &[u8]) -> Result<()>;

    /// Publish an entity whose files are already uploaded. Returns the
    /// server's deployment timestamp; zero means the deployment was refused.
    fn deploy(&self, deployment: &PreparedDeployment, identity: &Identity) -> Result<i64>;
}

/// Local targets are used as given; anything else is served under `/content`
pub fn normalize_target(target: &str) -> String {
    let target = target.trim_end_matches('/');
    if target.contains("localhost") {
        target.to_string()
    } else {
        format!("{}/content", target)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeployResponse {
    #[serde(default)]
    creation_timestamp: i64,
}

/// [`RemoteStore`] over HTTP
pub struct HttpRemoteStore {
    base_url: String,
}

impl HttpRemoteStore {
    /// `target` is normalised with [`normalize_target`]
    pub fn new(target: &str) -> Self {
        Self {
            base_url: normalize_target(target),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn content_url(&self, id: &ContentId) -> String {
        format!("{}/contents/{}", self.base_url, id)
    }

    fn entities_url(&self) -> String {
        format!("{}/entities", self.base_url)
    }
}

impl RemoteStore for HttpRemoteStore {
    fn exists(&self, id: &ContentId) -> Result<bool> {
        let url = self.content_url(id);
        for attempt in 0..MAX_RETRIES {
            let agent = build_agent();
            match agent.head(&url).call() {
                Ok(_) => return Ok(true),
                Err(ureq::Error::StatusCode(404)) => return Ok(false),
                Err(e) => {
                    if attempt + 1 < MAX_RETRIES && is_retryable_error(&e) {
                        sleep_backoff(attempt);
                        continue;
                    }
                    return Err(WardrobeError::Deploy(format!(
                        "cannot check {}: {}",
                        url, e
                    )));
                }
            }
        }

        Err(WardrobeError::Deploy(format!(
            "cannot check {} after retries",
            url
        )))
    }

    fn upload(&self, id: &ContentId, bytes: &[u8]) -> Result<()> {
        let url = self.content_url(id);
        for attempt in 0..MAX_RETRIES {
            let agent = build_agent();
            let response = agent
                .put(&url)
                .header("Content-Type", "application/octet-stream")
                .send(bytes);

            match response {
                Ok(_) => {
                    debug!(blob = %id, bytes = bytes.len(), "uploaded blob");
                    return Ok(());
                }
                Err(e) => {
                    if attempt + 1 < MAX_RETRIES && is_retryable_error(&e) {
                        warn!(blob = %id, attempt, error = %e, "upload failed, retrying");
                        sleep_backoff(attempt);
                        continue;
                    }
                    return Err(WardrobeError::Deploy(format!(
                        "upload of {} failed: {}",
                        id, e
                    )));
                }
            }
        }

        Err(WardrobeError::Deploy(format!(
            "upload of {} failed after retries",
            id
        )))
    }

    fn deploy(&self, deployment: &PreparedDeployment, identity: &Identity) -> Result<i64> {
        let entity: serde_json::Value = serde_json::from_slice(&deployment.document)?;
        let payload = serde_json::json!({
            "entityId": deployment.entity_id,
            "entity": entity,
        });

        let url = self.entities_url();
        for attempt in 0..MAX_RETRIES {
            let agent = build_agent();
            let response = agent
                .post(&url)
                .header(IDENTITY_HEADER, &identity.eth_address)
                .header("Content-Type", "application/json")
                .send_json(&payload);

            match response {
                Ok(mut ok) => {
                    let body: DeployResponse = ok.body_mut().read_json().map_err(|e| {
                        WardrobeError::Deploy(format!("unreadable deploy response: {}", e))
                    })?;
                    return Ok(body.creation_timestamp);
                }
                Err(e) => {
                    if attempt + 1 < MAX_RETRIES && is_retryable_error(&e) {
                        sleep_backoff(attempt);
                        continue;
                    }
                    return Err(WardrobeError::Deploy(format!(
                        "deploy of {} failed: {}",
                        deployment.entity_id, e
                    )));
                }
            }
        }

        Err(WardrobeError::Deploy(format!(
            "deploy of {} failed after retries",
            deployment.entity_id
        )))
    }
}

fn build_agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .build();
    config.into()
}

fn is_retryable_error(e: &ureq::Error) -> bool {
    match e {
        ureq::Error::Timeout(_)
        | ureq::Error::Io(_)
        | ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound => true,
        ureq::Error::StatusCode(code) => matches!(code, 429 | 500 | 502 | 503 | 504),
        _ => false,
    }
}

fn sleep_backoff(attempt: usize) {
    let delay_ms = RETRY_BASE_DELAY_MS.saturating_mul(1u64 << attempt);
    std::thread::sleep(Duration::from_millis(delay_ms));
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardrobe_core::identify;

    #[test]
    fn test_normalize_target() {
        assert_eq!(normalize_target("http://localhost:6969"), "http://localhost:6969");
        assert_eq!(
            normalize_target("https://peer.example.org/"),
            "https://peer.example.org/content"
        );
    }

    #[test]
    fn test_urls() {
        let store = HttpRemoteStore::new("https://peer.example.org");
        let id = identify(b"x");
        assert_eq!(
            store.content_url(&id),
            format!("https://peer.example.org/content/contents/{}", id)
        );
        assert_eq!(store.entities_url(), "https://peer.example.org/content/entities");
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error(&ureq::Error::StatusCode(503)));
        assert!(is_retryable_error(&ureq::Error::ConnectionFailed));
        assert!(!is_retryable_error(&ureq::Error::StatusCode(404)));
        assert!(!is_retryable_error(&ureq::Error::StatusCode(401)));
    }

    #[test]
    fn test_deploy_response_defaults_to_refused() {
        let body: DeployResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(body.creation_timestamp, 0);
        let body: DeployResponse = serde_json::from_str(r#"{ "creationTimestamp": 5 }"#).unwrap();
        assert_eq!(body.creation_timestamp, 5);
    }
}
