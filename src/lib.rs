//! # bioclaim
//!
//! Search a bibliographic-identity registry, see which returned identities
//! are already linked to your profile, and claim (or unclaim) identities
//! and works against an OAuth-protected profile service.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌────────────┐   ┌─────────────┐
//! │  Query    │──▶│  Registry  │──▶│  Normalizer  │
//! │  Builder  │   │  (SRU/XML) │   │             │
//! └───────────┘   └────────────┘   └──────┬──────┘
//!                                         ▼
//!                                  ┌─────────────┐   ┌──────────┐
//!                                  │ Claim-State │◀──│  SQLite   │
//!                                  │  Resolver   │   │ bios +    │
//!                                  └──────┬──────┘   │ profiles  │
//!                                         ▼          └────┬─────┘
//!                 ┌────────────┐   ┌─────────────┐        │
//!                 │ Profile API│◀─▶│ Claim/Sync  │◀───────┘
//!                 │ (OAuth+XML)│   │   Agents    │
//!                 └────────────┘   └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Engine error taxonomy and outcome variants |
//! | [`query`] | Registry query construction |
//! | [`normalize`] | Registry XML response normalization |
//! | [`claim_state`] | Unclaimed / claimed / visible classification |
//! | [`search`] | Paged search orchestration |
//! | [`registry`] | Registry HTTP client |
//! | [`orcid`] | OAuth-protected profile API client |
//! | [`profile_sync`] | Profile fetch + local upsert |
//! | [`claim`] | Claim/unclaim workflow and XML documents |
//! | [`works`] | ISBN metadata enrichment |
//! | [`store`] | Local document store |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod claim;
pub mod claim_state;
pub mod config;
pub mod db;
pub mod error;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod orcid;
pub mod profile_sync;
pub mod query;
pub mod registry;
pub mod search;
pub mod store;
pub mod works;
