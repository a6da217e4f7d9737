use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub orcid: OrcidConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Settings for the external identity registry (ISNI-style SRU endpoint).
#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    pub base_url: String,
    #[serde(default = "default_search_path")]
    pub search_path: String,
    #[serde(default = "default_record_schema")]
    pub record_schema: String,
    /// Name-search predicate field the registry's query grammar expects.
    #[serde(default = "default_query_field")]
    pub query_field: String,
    /// Common name written into external-identifier claim documents.
    #[serde(default = "default_common_name")]
    pub common_name: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_registry_url(),
            search_path: default_search_path(),
            record_schema: default_record_schema(),
            query_field: default_query_field(),
            common_name: default_common_name(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_registry_url() -> String {
    "https://isni.oclc.org".to_string()
}
fn default_search_path() -> String {
    "/sru/DB=1.2/".to_string()
}
fn default_record_schema() -> String {
    "isni-b".to_string()
}
fn default_query_field() -> String {
    "pica.nw".to_string()
}
fn default_common_name() -> String {
    "ISNI".to_string()
}
fn default_page_size() -> u32 {
    10
}
fn default_timeout_secs() -> u64 {
    30
}

/// Settings for the OAuth-protected profile API.
///
/// Only token *use* is configured here; the handshake that produced the
/// token happens outside this tool. The access token itself is usually
/// supplied via the `ORCID_ACCESS_TOKEN` environment variable rather than
/// written into the config file.
#[derive(Debug, Deserialize, Clone)]
pub struct OrcidConfig {
    #[serde(default = "default_orcid_url")]
    pub base_url: String,
    /// OAuth subject id of the signed-in user (may also come from `--uid`).
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OrcidConfig {
    fn default() -> Self {
        Self {
            base_url: default_orcid_url(),
            uid: None,
            access_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_orcid_url() -> String {
    "https://api.orcid.org".to_string()
}

/// Settings for the public work-metadata lookup service (ISBN resolution).
#[derive(Debug, Deserialize, Clone)]
pub struct LookupConfig {
    #[serde(default = "default_lookup_url")]
    pub base_url: String,
    /// Base used to derive a human-facing URL for an enriched work.
    #[serde(default = "default_display_url_base")]
    pub display_url_base: String,
    #[serde(default = "default_lookup_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: default_lookup_url(),
            display_url_base: default_display_url_base(),
            timeout_secs: default_lookup_timeout_secs(),
        }
    }
}

fn default_lookup_url() -> String {
    "http://xisbn.worldcat.org/webservices/xid/isbn".to_string()
}
fn default_display_url_base() -> String {
    "http://www.worldcat.org/isbn".to_string()
}
fn default_lookup_timeout_secs() -> u64 {
    10
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.registry.page_size == 0 {
        anyhow::bail!("registry.page_size must be > 0");
    }

    if config.registry.base_url.is_empty() {
        anyhow::bail!("registry.base_url must not be empty");
    }

    if config.orcid.base_url.is_empty() {
        anyhow::bail!("orcid.base_url must not be empty");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let file = write_config("[db]\npath = \"/tmp/bioclaim.sqlite\"\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.registry.record_schema, "isni-b");
        assert_eq!(config.registry.query_field, "pica.nw");
        assert_eq!(config.registry.page_size, 10);
        assert_eq!(config.orcid.base_url, "https://api.orcid.org");
        assert!(config.orcid.uid.is_none());
    }

    #[test]
    fn zero_page_size_rejected() {
        let file = write_config("[db]\npath = \"/tmp/x.sqlite\"\n[registry]\npage_size = 0\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn empty_base_url_rejected() {
        let file = write_config("[db]\npath = \"/tmp/x.sqlite\"\n[registry]\nbase_url = \"\"\n");
        assert!(load_config(file.path()).is_err());
    }
}
