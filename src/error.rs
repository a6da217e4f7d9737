//! Error taxonomy for the claim engine.
//!
//! External-call failures are converted to one of these variants at the
//! agent boundary, so callers never see raw transport errors. Local-store
//! failures pass through as `Internal` and are treated as fatal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The registry could not be reached or returned an unparseable
    /// response. Distinct from an empty result set.
    #[error("registry search unavailable: {0}")]
    SearchUnavailable(String),

    /// The OAuth access token was rejected. Expected and retryable:
    /// the caller should prompt for re-authentication.
    #[error("access token expired or revoked")]
    TokenExpired,

    /// The profile API explicitly refused the claim for a reason other
    /// than authentication. The message is surfaced verbatim.
    #[error("claim rejected: {0}")]
    ClaimRejected(String),

    /// The requested identity or work is not present in the local bio store.
    #[error("no local record for identity {0}")]
    NoSuchIdentity(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Terminal state of a claim operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The identifier was already locked; no external call was made.
    AlreadyClaimed,
    /// Claim accepted and the freshly synced profile shows it publicly.
    Visible,
    /// Claim accepted but not (yet) publicly visible.
    PrivatelyClaimed,
}

/// Result of a profile sync.
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    Updated(crate::models::UserProfile),
    /// The profile API refused the token. Not an error; surfaced as a
    /// signal so the UI can prompt re-auth.
    TokenExpired,
}
