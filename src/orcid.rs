//! HTTP client for the OAuth-protected profile API.
//!
//! Covers the two call shapes the engine needs: an authenticated GET of the
//! full profile (JSON) and an authenticated POST of a claim document (XML).
//! Response interpretation is shared policy: a rejected token is an expected
//! signal, not a defect, and is detected both from HTTP status and from the
//! known error-message substrings the API returns when a token's scope has
//! lapsed mid-session.

use serde::Deserialize;
use std::time::Duration;

use crate::config::OrcidConfig;
use crate::error::EngineError;
use crate::models::OauthSession;

/// Error-message fragments the profile API is known to use when the real
/// problem is the credential, not the claim.
const TOKEN_ERROR_MARKERS: &[&str] = &[
    "access token expired",
    "access token is expired",
    "invalid access token",
    "insufficient scope",
];

/// Which claim sub-path a POST targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimEndpoint {
    ExternalIdentifiers,
    Works,
}

impl ClaimEndpoint {
    fn path_segment(self) -> &'static str {
        match self {
            ClaimEndpoint::ExternalIdentifiers => "orcid-bio/external-identifiers",
            ClaimEndpoint::Works => "orcid-works",
        }
    }
}

/// Result of a profile GET: either the parsed body or the token signal.
pub enum ProfileFetch {
    Profile(serde_json::Value),
    TokenExpired,
}

pub struct OrcidClient {
    http: reqwest::Client,
    base_url: String,
}

impl OrcidClient {
    pub fn new(config: &OrcidConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    fn profile_url(&self, uid: &str) -> String {
        format!("{}/v1.1/{}/orcid-profile", self.base_url, uid)
    }

    fn claim_url(&self, uid: &str, endpoint: ClaimEndpoint) -> String {
        format!("{}/v1.1/{}/{}", self.base_url, uid, endpoint.path_segment())
    }

    /// Fetch the full external profile. A non-success status means the
    /// token was refused and is reported as a signal, never an error.
    pub async fn fetch_profile(&self, session: &OauthSession) -> Result<ProfileFetch, EngineError> {
        let url = self.profile_url(&session.uid);
        tracing::debug!(url = %url, uid = %session.uid, "fetching external profile");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&session.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("profile API unreachable: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::info!(status = %status, "profile API refused the token");
            return Ok(ProfileFetch::TokenExpired);
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| anyhow::anyhow!("profile API returned unreadable JSON: {}", e))?;

        Ok(ProfileFetch::Profile(body))
    }

    /// POST one claim document. 200/201 is success; anything else is
    /// interpreted through the API's XML error envelope.
    pub async fn post_claim(
        &self,
        session: &OauthSession,
        endpoint: ClaimEndpoint,
        xml: String,
    ) -> Result<(), EngineError> {
        let url = self.claim_url(&session.uid, endpoint);
        tracing::info!(url = %url, "posting claim document");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&session.token)
            .header("Content-Type", "application/orcid+xml")
            .body(xml)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("profile API unreachable: {}", e))?;

        let status = response.status();
        if status.as_u16() == 200 || status.as_u16() == 201 {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, "claim refused by profile API");
        Err(interpret_claim_failure(status.as_u16(), &body))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorEnvelope {
    #[serde(rename = "error-desc")]
    error_desc: Option<String>,
}

/// Map a non-success claim response to the engine taxonomy.
///
/// The API reports scope/expiry problems as ordinary claim errors with a
/// recognizable `error_desc`; those are remapped to the token signal so the
/// caller can prompt re-authentication instead of surfacing a raw API
/// message.
pub(crate) fn interpret_claim_failure(status: u16, body: &str) -> EngineError {
    let message = quick_xml::de::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error_desc)
        .filter(|desc| !desc.is_empty())
        .unwrap_or_else(|| format!("profile API returned HTTP {}", status));

    let lowered = message.to_lowercase();
    if TOKEN_ERROR_MARKERS.iter().any(|m| lowered.contains(m)) {
        return EngineError::TokenExpired;
    }

    EngineError::ClaimRejected(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_desc_is_surfaced_verbatim() {
        let body = r#"
<orcid-message>
  <error-desc>Invalid incoming message: work title missing</error-desc>
</orcid-message>
"#;
        match interpret_claim_failure(400, body) {
            EngineError::ClaimRejected(message) => {
                assert_eq!(message, "Invalid incoming message: work title missing");
            }
            other => panic!("expected ClaimRejected, got {:?}", other),
        }
    }

    #[test]
    fn expired_token_message_becomes_token_signal() {
        let body = r#"
<orcid-message>
  <error-desc>Security problem: Access token expired: ab-12</error-desc>
</orcid-message>
"#;
        assert!(matches!(
            interpret_claim_failure(401, body),
            EngineError::TokenExpired
        ));
    }

    #[test]
    fn insufficient_scope_becomes_token_signal() {
        let body = r#"
<orcid-message>
  <error-desc>Insufficient scope for this request</error-desc>
</orcid-message>
"#;
        assert!(matches!(
            interpret_claim_failure(403, body),
            EngineError::TokenExpired
        ));
    }

    #[test]
    fn unparseable_error_body_falls_back_to_status() {
        match interpret_claim_failure(500, "not xml at all <<<") {
            EngineError::ClaimRejected(message) => {
                assert_eq!(message, "profile API returned HTTP 500");
            }
            other => panic!("expected ClaimRejected, got {:?}", other),
        }
    }

    #[test]
    fn claim_paths_are_distinct_per_kind() {
        assert_eq!(
            ClaimEndpoint::ExternalIdentifiers.path_segment(),
            "orcid-bio/external-identifiers"
        );
        assert_eq!(ClaimEndpoint::Works.path_segment(), "orcid-works");
    }
}
