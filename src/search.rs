//! Search orchestration.
//!
//! Composes the query builder, registry client, response normalizer, and
//! claim-state resolver into one paged search. Search works without a
//! signed-in user (everything classifies as unclaimed), but a missing
//! query then has no profile to fall back on.

use sqlx::SqlitePool;

use crate::claim_state;
use crate::config::Config;
use crate::error::EngineError;
use crate::models::{SearchHit, SearchPage, UserProfile};
use crate::normalize;
use crate::query;
use crate::registry::RegistryClient;
use crate::store;

#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub q: Option<String>,
    pub page: u32,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
    pub filter: Option<String>,
}

/// Run one paged search for an optionally signed-in caller.
///
/// Each normalized identity is classified against the caller's stored
/// profile and upserted into the `bios` cache so a later claim can find it.
pub async fn run_search(
    pool: &SqlitePool,
    registry: &RegistryClient,
    config: &Config,
    subject: Option<&str>,
    request: &SearchRequest,
) -> Result<SearchPage, EngineError> {
    let profile = match subject {
        Some(uid) => store::find_profile(pool, uid)
            .await
            .map_err(EngineError::Internal)?,
        None => None,
    };

    let terms = resolve_terms(request.q.as_deref(), profile.as_ref())
        .ok_or_else(|| anyhow::anyhow!("no query given and no stored profile to derive one from"))
        .map_err(EngineError::Internal)?;

    let page = request.page.max(1);
    let page_size = request.page_size.unwrap_or(config.registry.page_size);

    let params = query::build_search_params(&config.registry, &terms, page, page_size);
    let query_string = query::names_to_query(&config.registry.query_field, &terms);
    tracing::info!(query = %query_string, page, "searching registry");

    let body = registry.search_retrieve(&params).await?;

    let normalized = normalize::parse_search_response(&body)
        .map_err(|e| EngineError::SearchUnavailable(format!("unparseable response: {}", e)))?;
    let total = normalized.total;

    let mut items = Vec::new();
    for identity in normalized {
        let state = claim_state::resolve_identity(profile.as_ref(), &identity.id);
        store::upsert_bio(pool, &identity)
            .await
            .map_err(EngineError::Internal)?;
        items.push(SearchHit { identity, state });
    }

    Ok(SearchPage {
        terms,
        query: query_string,
        sort: request.sort.clone(),
        filter: request.filter.clone(),
        page,
        page_size,
        total,
        items,
    })
}

/// Resolve the query terms: an explicit query splits on a case-insensitive
/// `" or "`; otherwise the signed-in user's own names stand in.
fn resolve_terms(q: Option<&str>, profile: Option<&UserProfile>) -> Option<Vec<String>> {
    if let Some(q) = q {
        let terms = split_terms(q);
        if !terms.is_empty() {
            return Some(terms);
        }
    }

    profile.map(profile_terms).filter(|terms| !terms.is_empty())
}

/// Split a raw query on `" or "`, ignoring case, keeping the terms trimmed.
fn split_terms(q: &str) -> Vec<String> {
    const SEP: &[u8] = b" or ";

    let bytes = q.as_bytes();
    let mut terms = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i + SEP.len() <= bytes.len() {
        if bytes[i..i + SEP.len()].eq_ignore_ascii_case(SEP) {
            terms.push(&q[start..i]);
            start = i + SEP.len();
            i = start;
        } else {
            i += 1;
        }
    }
    terms.push(&q[start..]);

    terms
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// The signed-in user's own name variants, primary reshaped to
/// `"family, given"` to match how the registry renders names.
fn profile_terms(profile: &UserProfile) -> Vec<String> {
    let mut terms = Vec::new();

    match (&profile.family_name, &profile.given_name) {
        (Some(family), Some(given)) => terms.push(format!("{}, {}", family, given)),
        (Some(family), None) => terms.push(family.clone()),
        (None, Some(given)) => terms.push(given.clone()),
        (None, None) => {
            if let Some(name) = &profile.name {
                terms.push(name.clone());
            }
        }
    }

    for name in &profile.other_names {
        if !terms.contains(name) {
            terms.push(name.clone());
        }
    }

    terms
}
