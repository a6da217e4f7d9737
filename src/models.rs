//! Core data models used throughout bioclaim.
//!
//! These types represent the identities, works, and per-user claim state
//! that flow through the search and claim pipeline.

use serde::{Deserialize, Serialize};

/// Normalized identity produced from one registry search record.
///
/// Immutable after normalization; cached in the local `bios` store keyed
/// by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Registry-assigned identifier (e.g. an unformatted ISNI).
    pub id: String,
    pub uri: Option<String>,
    pub family_name: String,
    pub given_names: String,
    /// Rendered `"family, given"` name variants, deduplicated, primary
    /// excluded, first-seen order preserved.
    pub other_names: Vec<String>,
    pub works: Vec<WorkId>,
}

/// A work identifier as it appears in registry records and user profiles.
///
/// The `(id, id_type)` pair as a whole is the equality and dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkId {
    pub id: String,
    #[serde(rename = "type")]
    pub id_type: String,
}

/// A claimable work record, optionally enriched with bibliographic metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkRef {
    pub identifier: String,
    pub identifier_type: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<String>,
    pub publisher: Option<String>,
    pub city: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub claimed: bool,
}

impl WorkRef {
    pub fn from_id(work: &WorkId) -> Self {
        Self {
            identifier: work.id.clone(),
            identifier_type: work.id_type.clone(),
            ..Default::default()
        }
    }
}

/// Per-user claim state persisted in the local `profiles` store, keyed by
/// the OAuth subject id.
///
/// `ids` mirrors what the external profile last showed publicly;
/// `locked_ids` additionally holds identifiers claimed through this system
/// that the external profile may not (yet) report as visible. An identifier
/// is claimed-private exactly when it is in `locked_ids` but not in `ids`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub orcid: String,
    pub ids: Vec<String>,
    pub locked_ids: Vec<String>,
    pub work_ids: Vec<WorkId>,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub other_names: Vec<String>,
    pub updated: bool,
}

impl UserProfile {
    pub fn new(orcid: &str) -> Self {
        Self {
            orcid: orcid.to_string(),
            ..Default::default()
        }
    }
}

/// Claim classification attached to each search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserState {
    /// The identifier appears in the external profile's public list.
    pub in_profile: bool,
    /// The identifier is claimed, publicly visible or not.
    pub claimed: bool,
}

/// One search result: a normalized identity plus the caller's claim state.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub identity: Identity,
    pub state: UserState,
}

/// Assembled page of search results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub terms: Vec<String>,
    pub query: String,
    pub sort: Option<String>,
    pub filter: Option<String>,
    pub page: u32,
    pub page_size: u32,
    /// Total hit count as reported by the registry envelope.
    pub total: u64,
    pub items: Vec<SearchHit>,
}

/// OAuth credential in use: subject id plus a bearer access token.
///
/// The token is only *used* here; acquiring it is the sign-in flow's job.
#[derive(Debug, Clone)]
pub struct OauthSession {
    pub uid: String,
    pub token: String,
}
