//! # bioclaim CLI
//!
//! Command-line interface for the identity search and claim engine. Each
//! command maps to one inbound user action; claim, unclaim, and sync print
//! a JSON status from a small closed vocabulary (`ok`, `ok_visible`,
//! `oauth_timeout`, `no_such_id`, or the API's rejection message) so
//! wrapping UIs can dispatch on it.
//!
//! ## Usage
//!
//! ```bash
//! bioclaim --config ./config/bioclaim.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bioclaim init` | Create the SQLite database and schema |
//! | `bioclaim search "<q>"` | Search the registry, classify claim state |
//! | `bioclaim sync` | Refresh the local profile from the profile API |
//! | `bioclaim claim --id <registry-id>` | Claim an identity |
//! | `bioclaim claim --work <isbn>` | Claim a work |
//! | `bioclaim unclaim --id <registry-id>` | Unclaim an identity (local) |
//! | `bioclaim profile` | Show the stored profile |
//!
//! The OAuth access token is read from `ORCID_ACCESS_TOKEN` (falling back
//! to `orcid.access_token` in the config file).

mod claim;
mod claim_state;
mod config;
mod db;
mod error;
mod migrate;
mod models;
mod normalize;
mod orcid;
mod profile_sync;
mod query;
mod registry;
mod search;
mod store;
mod works;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::error::{ClaimOutcome, EngineError, SyncOutcome};
use crate::models::{OauthSession, WorkId};

/// bioclaim: registry identity search and OAuth profile claim toolkit.
#[derive(Parser)]
#[command(
    name = "bioclaim",
    about = "Search a bibliographic-identity registry and claim identities against an OAuth profile",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/bioclaim.toml")]
    config: PathBuf,

    /// OAuth subject id of the signed-in user (overrides the config file).
    #[arg(long, global = true)]
    uid: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Search the registry for identities matching a name.
    ///
    /// Multiple name variants can be OR-joined in one query string
    /// (`"Smith, John or J. Smith"`). Without a query, the signed-in
    /// user's own stored names are searched.
    Search {
        /// Query string; omit to search for the signed-in user's names.
        q: Option<String>,

        /// 1-based result page.
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Results per page (defaults to registry.page_size from config).
        #[arg(long)]
        page_size: Option<u32>,

        /// Sort term, passed through into the page object.
        #[arg(long)]
        sort: Option<String>,
    },

    /// Fetch the external profile and refresh the local claim state.
    Sync,

    /// Claim an identity or a work for the signed-in user.
    Claim {
        /// Registry identifier of an identity cached by a previous search.
        #[arg(long, conflicts_with = "work")]
        id: Option<String>,

        /// Work identifier (ISBN) to claim instead of an identity.
        #[arg(long)]
        work: Option<String>,

        /// Identifier type for --work.
        #[arg(long, default_value = "isbn")]
        work_type: String,
    },

    /// Drop a previous claim from the local locked list. No external call.
    Unclaim {
        #[arg(long, conflicts_with = "work")]
        id: Option<String>,

        #[arg(long)]
        work: Option<String>,

        #[arg(long, default_value = "isbn")]
        work_type: String,
    },

    /// Print the locally stored profile for the signed-in user.
    Profile,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&config.db).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("initialized {}", config.db.path.display());
        }

        Commands::Search {
            q,
            page,
            page_size,
            sort,
        } => {
            let pool = db::connect(&config.db).await?;
            let registry = registry::RegistryClient::new(&config.registry)?;
            let subject = resolve_uid(&cli.uid, &config);

            let request = search::SearchRequest {
                q,
                page,
                page_size,
                sort,
                filter: None,
            };

            match search::run_search(&pool, &registry, &config, subject.as_deref(), &request).await
            {
                Ok(page) => println!("{}", serde_json::to_string_pretty(&page)?),
                Err(EngineError::SearchUnavailable(reason)) => {
                    pool.close().await;
                    anyhow::bail!("search unavailable: {}", reason);
                }
                Err(e) => {
                    pool.close().await;
                    return Err(e.into());
                }
            }
            pool.close().await;
        }

        Commands::Sync => {
            let pool = db::connect(&config.db).await?;
            let client = orcid::OrcidClient::new(&config.orcid)?;
            let session = resolve_session(&cli.uid, &config)?;

            let status = match profile_sync::run_sync(&pool, &client, &session).await {
                Ok(SyncOutcome::Updated(_)) => "ok".to_string(),
                Ok(SyncOutcome::TokenExpired) => "oauth_timeout".to_string(),
                Err(e) => return Err(e.into()),
            };
            pool.close().await;
            print_status(&status)?;
        }

        Commands::Claim {
            id,
            work,
            work_type,
        } => {
            let pool = db::connect(&config.db).await?;
            let client = orcid::OrcidClient::new(&config.orcid)?;
            let session = resolve_session(&cli.uid, &config)?;

            let result = match (&id, &work) {
                (Some(id), None) => {
                    claim::claim_identity(
                        &pool,
                        &client,
                        &config.registry.common_name,
                        &session,
                        id,
                    )
                    .await
                }
                (None, Some(work)) => {
                    let lookup = works::LookupClient::new(&config.lookup)?;
                    let work_id = WorkId {
                        id: work.clone(),
                        id_type: work_type.clone(),
                    };
                    claim::claim_work(&pool, &client, &lookup, &session, &work_id).await
                }
                _ => {
                    pool.close().await;
                    anyhow::bail!("pass exactly one of --id or --work");
                }
            };

            let status = claim_status(result)?;
            pool.close().await;
            print_status(&status)?;
        }

        Commands::Unclaim {
            id,
            work,
            work_type,
        } => {
            let pool = db::connect(&config.db).await?;
            let session = resolve_session(&cli.uid, &config)?;

            let result = match (&id, &work) {
                (Some(id), None) => claim::unclaim_identity(&pool, &session.uid, id).await,
                (None, Some(work)) => {
                    let work_id = WorkId {
                        id: work.clone(),
                        id_type: work_type.clone(),
                    };
                    claim::unclaim_work(&pool, &session.uid, &work_id).await
                }
                _ => {
                    pool.close().await;
                    anyhow::bail!("pass exactly one of --id or --work");
                }
            };

            result.map_err(anyhow::Error::from)?;
            pool.close().await;
            print_status("ok")?;
        }

        Commands::Profile => {
            let pool = db::connect(&config.db).await?;
            let uid = resolve_uid(&cli.uid, &config)
                .context("no subject id: pass --uid or set orcid.uid in the config")?;

            match store::find_profile(&pool, &uid).await? {
                Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
                None => println!("no stored profile for {}", uid),
            }
            pool.close().await;
        }
    }

    Ok(())
}

fn resolve_uid(flag: &Option<String>, config: &Config) -> Option<String> {
    flag.clone().or_else(|| config.orcid.uid.clone())
}

fn resolve_session(flag: &Option<String>, config: &Config) -> Result<OauthSession> {
    let uid = resolve_uid(flag, config)
        .context("no subject id: pass --uid or set orcid.uid in the config")?;

    let token = std::env::var("ORCID_ACCESS_TOKEN")
        .ok()
        .or_else(|| config.orcid.access_token.clone())
        .context("no access token: set ORCID_ACCESS_TOKEN or orcid.access_token")?;

    Ok(OauthSession { uid, token })
}

/// Map a claim result onto the closed status vocabulary. Internal errors
/// stay fatal; everything else becomes a status string.
fn claim_status(result: Result<ClaimOutcome, EngineError>) -> Result<String> {
    match result {
        Ok(ClaimOutcome::Visible) => Ok("ok_visible".to_string()),
        Ok(ClaimOutcome::PrivatelyClaimed) | Ok(ClaimOutcome::AlreadyClaimed) => {
            Ok("ok".to_string())
        }
        Err(EngineError::TokenExpired) => Ok("oauth_timeout".to_string()),
        Err(EngineError::NoSuchIdentity(_)) => Ok("no_such_id".to_string()),
        Err(EngineError::ClaimRejected(message)) => Ok(message),
        Err(e) => Err(e.into()),
    }
}

fn print_status(status: &str) -> Result<()> {
    println!("{}", serde_json::json!({ "status": status }));
    Ok(())
}
