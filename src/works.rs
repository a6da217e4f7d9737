//! Work-metadata enrichment.
//!
//! Resolves an ISBN against a public lookup service and merges the returned
//! bibliographic fields into the work record. Enrichment failing must never
//! block a claim or a listing; the work simply keeps whatever fields it
//! already had.

use std::time::Duration;

use crate::config::LookupConfig;
use crate::models::WorkRef;

pub struct LookupClient {
    http: reqwest::Client,
    base_url: String,
    display_url_base: String,
}

impl LookupClient {
    pub fn new(config: &LookupConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            display_url_base: config.display_url_base.clone(),
        })
    }

    /// Enrich a work record in place. Only ISBN identifiers are resolvable;
    /// other types pass through untouched. Lookup failures are logged and
    /// swallowed.
    pub async fn enrich(&self, mut work: WorkRef) -> WorkRef {
        if !work.identifier_type.eq_ignore_ascii_case("isbn") {
            return work;
        }

        work.url = Some(format!("{}/{}", self.display_url_base, work.identifier));

        match self.fetch_metadata(&work.identifier).await {
            Ok(Some(meta)) => {
                merge_metadata(&mut work, &meta);
            }
            Ok(None) => {
                tracing::info!(isbn = %work.identifier, "lookup service had no metadata");
            }
            Err(e) => {
                tracing::warn!(isbn = %work.identifier, error = %e, "work metadata lookup failed");
            }
        }

        work
    }

    async fn fetch_metadata(&self, isbn: &str) -> anyhow::Result<Option<serde_json::Value>> {
        let url = format!("{}/{}", self.base_url, isbn);
        let response = self
            .http
            .get(&url)
            .query(&[("method", "getMetadata"), ("format", "json"), ("fl", "*")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("lookup service returned HTTP {}", status);
        }

        let body: serde_json::Value = response.json().await?;
        Ok(body
            .get("list")
            .and_then(|l| l.as_array())
            .and_then(|l| l.first())
            .cloned())
    }
}

fn string_field(meta: &serde_json::Value, field: &str) -> Option<String> {
    meta.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}

fn merge_metadata(work: &mut WorkRef, meta: &serde_json::Value) {
    work.title = string_field(meta, "title").or(work.title.take());
    work.author = string_field(meta, "author")
        .map(|a| strip_author_brackets(&a))
        .or(work.author.take());
    work.year = string_field(meta, "year").or(work.year.take());
    work.publisher = string_field(meta, "publisher").or(work.publisher.take());
    work.city = string_field(meta, "city").or(work.city.take());
}

/// The lookup service wraps some author fields in catalog brackets
/// (`[edited by John Smith].`); strip the leading `[` and a trailing `]`
/// or `].`.
pub(crate) fn strip_author_brackets(author: &str) -> String {
    let stripped = author.strip_prefix('[').unwrap_or(author);
    let stripped = stripped
        .strip_suffix("].")
        .or_else(|| stripped.strip_suffix(']'))
        .unwrap_or(stripped);
    stripped.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn author_brackets_are_stripped() {
        assert_eq!(
            strip_author_brackets("[edited by John Smith]."),
            "edited by John Smith"
        );
        assert_eq!(strip_author_brackets("[John Smith]"), "John Smith");
        assert_eq!(strip_author_brackets("John Smith"), "John Smith");
        // Only the artifact positions are touched.
        assert_eq!(strip_author_brackets("John [ed.] Smith"), "John [ed.] Smith");
    }

    #[test]
    fn metadata_merges_without_clobbering_existing_fields() {
        let mut work = WorkRef {
            identifier: "9780387987798".to_string(),
            identifier_type: "isbn".to_string(),
            title: Some("Preset title".to_string()),
            ..Default::default()
        };
        merge_metadata(
            &mut work,
            &json!({ "author": "[Hermann Thorisson].", "year": "2000", "publisher": "Springer" }),
        );
        // No title in the response: the preset survives.
        assert_eq!(work.title.as_deref(), Some("Preset title"));
        assert_eq!(work.author.as_deref(), Some("Hermann Thorisson"));
        assert_eq!(work.year.as_deref(), Some("2000"));
        assert_eq!(work.publisher.as_deref(), Some("Springer"));
    }

    #[test]
    fn empty_fields_are_ignored() {
        let mut work = WorkRef {
            identifier: "x".to_string(),
            identifier_type: "isbn".to_string(),
            ..Default::default()
        };
        merge_metadata(&mut work, &json!({ "title": "", "year": "1999" }));
        assert!(work.title.is_none());
        assert_eq!(work.year.as_deref(), Some("1999"));
    }
}
