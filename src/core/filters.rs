use std::collections::HashSet;

use crate::models::{CandidateId, DirectoryProfile, MAX_AGE, MIN_AGE};

/// Compute the search age band around a user's age
///
/// The band is `[age - delta, age + delta]`, clamped to [MIN_AGE, MAX_AGE].
#[inline]
pub fn age_band(age: u8, delta: u8) -> (u8, u8) {
    let from = age.saturating_sub(delta).max(MIN_AGE);
    let to = age.saturating_add(delta).min(MAX_AGE);
    (from, to)
}

/// Check if a profile may be shown to the viewer
///
/// Stage 1: access filter. Closed profiles pass only with viewer access.
#[inline]
pub fn is_visible(profile: &DirectoryProfile) -> bool {
    profile.is_accessible()
}

/// Check if a profile is outside the user's exclusion set
///
/// Stage 2: exclusion filter. `excluded` holds every candidate that was
/// shown, favorited or blacklisted.
#[inline]
pub fn is_unseen(profile: &DirectoryProfile, excluded: &HashSet<CandidateId>) -> bool {
    !excluded.contains(&profile.id)
}

/// Pick the first profile of a page passing every stage, in API order
pub fn first_eligible<'a>(
    page: &'a [DirectoryProfile],
    excluded: &HashSet<CandidateId>,
) -> Option<&'a DirectoryProfile> {
    page.iter()
        .filter(|profile| is_visible(profile))
        .find(|profile| is_unseen(profile, excluded))
}
