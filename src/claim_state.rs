//! Claim-state classification.
//!
//! Pure lookups against the locally stored profile. No external calls, no
//! side effects. An absent profile (anonymous caller, or signed in but never
//! synced) classifies everything as unclaimed.

use crate::models::{UserProfile, UserState, WorkId};

/// Classify a registry identity against the caller's profile.
///
/// `claimed` covers both publicly visible identifiers and ones locked
/// through this system that the external profile does not (yet) show.
pub fn resolve_identity(profile: Option<&UserProfile>, id: &str) -> UserState {
    let Some(profile) = profile else {
        return UserState {
            in_profile: false,
            claimed: false,
        };
    };

    let in_profile = profile.ids.iter().any(|i| i == id);
    let claimed = in_profile || profile.locked_ids.iter().any(|i| i == id);

    UserState { in_profile, claimed }
}

/// Classify a work against the caller's profile. Equality is the whole
/// `(id, type)` pair.
pub fn resolve_work(profile: Option<&UserProfile>, work: &WorkId) -> UserState {
    let claimed = profile
        .map(|p| p.work_ids.contains(work))
        .unwrap_or(false);

    UserState {
        in_profile: claimed,
        claimed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            orcid: "0000-0002-1825-0097".to_string(),
            ids: vec!["0000000121032683".to_string()],
            locked_ids: vec![
                "0000000121032683".to_string(),
                "0000000042111111".to_string(),
            ],
            work_ids: vec![WorkId {
                id: "9780387987798".to_string(),
                id_type: "isbn".to_string(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn no_profile_means_unclaimed() {
        let state = resolve_identity(None, "0000000121032683");
        assert!(!state.claimed);
        assert!(!state.in_profile);
    }

    #[test]
    fn visible_id_is_claimed_and_in_profile() {
        let profile = profile();
        let state = resolve_identity(Some(&profile), "0000000121032683");
        assert!(state.claimed);
        assert!(state.in_profile);
    }

    #[test]
    fn locked_only_id_is_claimed_but_private() {
        let profile = profile();
        let state = resolve_identity(Some(&profile), "0000000042111111");
        assert!(state.claimed);
        assert!(!state.in_profile);
    }

    #[test]
    fn unknown_id_is_unclaimed() {
        let profile = profile();
        let state = resolve_identity(Some(&profile), "0000000400000000");
        assert!(!state.claimed);
        assert!(!state.in_profile);
    }

    #[test]
    fn in_profile_implies_claimed() {
        // Classification invariant: in_profile can never be set without
        // claimed also being set.
        let profile = profile();
        for id in ["0000000121032683", "0000000042111111", "nope"] {
            let state = resolve_identity(Some(&profile), id);
            assert!(!state.in_profile || state.claimed);
            assert!(
                !state.claimed
                    || profile.locked_ids.iter().any(|i| i == id)
                    || profile.ids.iter().any(|i| i == id)
            );
        }
    }

    #[test]
    fn work_equality_uses_the_whole_pair() {
        let profile = profile();
        let claimed = WorkId {
            id: "9780387987798".to_string(),
            id_type: "isbn".to_string(),
        };
        let same_id_other_type = WorkId {
            id: "9780387987798".to_string(),
            id_type: "doi".to_string(),
        };
        assert!(resolve_work(Some(&profile), &claimed).claimed);
        assert!(!resolve_work(Some(&profile), &same_id_other_type).claimed);
    }
}
