use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::core::error::AssistantError;
use crate::core::filters::{age_band, first_eligible, is_visible};
use crate::models::{
    CandidateProfile, CandidateResult, DialogState, DirectoryProfile, Location, SearchQuery,
    SexSelection, TargetSex, UserId,
};
use crate::services::{DirectorySearch, ExclusionStore, PhotoLookup};

/// Bounds of one discovery invocation
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryLimits {
    /// Half-width of the age band around the user's age
    pub age_delta: u8,
    /// Profiles requested per directory call
    pub page_size: u32,
    /// Directory calls allowed per invocation
    pub max_pages: u32,
    /// Photos attached to a shown candidate
    pub photo_limit: usize,
    /// Budget for the directory calls of one invocation; `None` waits
    /// indefinitely. Store writes are never cut short by it.
    pub timeout: Option<Duration>,
}

impl Default for DiscoveryLimits {
    fn default() -> Self {
        Self {
            age_delta: 5,
            page_size: 50,
            max_pages: 10,
            photo_limit: 3,
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Result of one discovery invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// A new candidate, already recorded as shown
    Found(CandidateResult),
    /// `max_pages` pages (or the end of the results) held nothing new
    Exhausted,
    /// Onboarding has not finished
    NotReady,
    /// The directory failed; the failed page was not consumed
    Unavailable,
}

/// Resolve the sex to search for
///
/// Explicit selection uses the user's choice; inferred selection targets the
/// opposite of the user's own sex, or anyone if it is unknown.
pub fn search_sex(state: &DialogState, selection: SexSelection) -> TargetSex {
    match selection {
        SexSelection::Explicit => state.target_sex,
        SexSelection::Inferred => TargetSex::opposite_of(state.own_sex),
    }
}

/// Run `fut` until `deadline`; `None` when the deadline passed first
async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}

/// Candidate discovery engine
///
/// Pages through the directory from the user's stored offset and returns
/// the first accessible profile with no exclusion record, recording it as
/// shown before handing it out.
pub struct DiscoveryEngine {
    search: Arc<dyn DirectorySearch>,
    photos: Arc<dyn PhotoLookup>,
    store: Arc<dyn ExclusionStore>,
    limits: DiscoveryLimits,
    fallback_location: Location,
    sex_selection: SexSelection,
}

impl DiscoveryEngine {
    pub fn new(
        search: Arc<dyn DirectorySearch>,
        photos: Arc<dyn PhotoLookup>,
        store: Arc<dyn ExclusionStore>,
        limits: DiscoveryLimits,
        fallback_location: Location,
        sex_selection: SexSelection,
    ) -> Self {
        Self {
            search,
            photos,
            store,
            limits,
            fallback_location,
            sex_selection,
        }
    }

    pub fn limits(&self) -> DiscoveryLimits {
        self.limits
    }

    /// Find the next unseen candidate for the user owning `state`
    ///
    /// Advances `state.offset` by one page per fully processed directory
    /// page, never rewinding it. A page whose processing fails (directory,
    /// timeout or store) is not consumed. Does not touch `last_candidate_id`;
    /// the caller sets it on `Found`. Persistence failures are returned as
    /// errors and the candidate is then not reported.
    pub async fn find_next(
        &self,
        state: &mut DialogState,
    ) -> Result<DiscoveryOutcome, AssistantError> {
        let Some(age) = state.age.filter(|_| state.is_ready()) else {
            return Ok(DiscoveryOutcome::NotReady);
        };

        let deadline = self.limits.timeout.map(|t| Instant::now() + t);
        let (age_from, age_to) = age_band(age, self.limits.age_delta);
        let sex = search_sex(state, self.sex_selection);
        let location_id = state
            .location
            .as_ref()
            .map(|l| l.id)
            .unwrap_or(self.fallback_location.id);

        for attempt in 0..self.limits.max_pages {
            let query = SearchQuery {
                location_id,
                age_from,
                age_to,
                sex,
                offset: state.offset,
                count: self.limits.page_size,
            };
            let next_offset = query.offset.saturating_add(query.count);

            let page = match within(deadline, self.search.search(&query)).await {
                Some(Ok(page)) => page,
                Some(Err(e)) => {
                    tracing::warn!(
                        "Directory search failed for user {} at offset {}: {}",
                        state.user_id,
                        query.offset,
                        e
                    );
                    return Ok(DiscoveryOutcome::Unavailable);
                }
                None => {
                    tracing::warn!(
                        "Directory search for user {} timed out at offset {}",
                        state.user_id,
                        query.offset
                    );
                    return Ok(DiscoveryOutcome::Unavailable);
                }
            };

            if page.is_empty() {
                state.offset = next_offset;
                tracing::debug!(
                    "Directory exhausted for user {} at offset {}",
                    state.user_id,
                    query.offset
                );
                break;
            }

            let visible_ids: Vec<_> = page.iter().filter(|p| is_visible(p)).map(|p| p.id).collect();
            let excluded = self.store.excluded_among(state.user_id, &visible_ids).await?;

            if let Some(profile) = first_eligible(&page, &excluded) {
                let result = self.accept(state.user_id, profile, deadline).await?;
                state.offset = next_offset;
                tracing::info!(
                    "Showing candidate {} to user {} (page {}, offset {})",
                    result.candidate_id,
                    state.user_id,
                    attempt + 1,
                    query.offset
                );
                return Ok(DiscoveryOutcome::Found(result));
            }

            state.offset = next_offset;
            tracing::debug!(
                "No eligible candidate in page at offset {} for user {} ({} profiles, {} excluded)",
                query.offset,
                state.user_id,
                page.len(),
                excluded.len()
            );
        }

        Ok(DiscoveryOutcome::Exhausted)
    }

    /// Persist the picked profile, mark it shown and attach its photos
    ///
    /// Photos are best effort and bounded by `deadline`; once the candidate
    /// is marked shown it is always returned.
    async fn accept(
        &self,
        user_id: UserId,
        profile: &DirectoryProfile,
        deadline: Option<Instant>,
    ) -> Result<CandidateResult, AssistantError> {
        self.store
            .upsert_candidate(&CandidateProfile::from(profile))
            .await?;
        self.store.mark_shown(user_id, profile.id).await?;

        let photos = self.photos.top_photos(profile.id, self.limits.photo_limit);
        let attachments = match within(deadline, photos).await {
            Some(Ok(attachments)) => attachments,
            Some(Err(e)) => {
                tracing::warn!("Photo lookup failed for candidate {}: {}", profile.id, e);
                Vec::new()
            }
            None => {
                tracing::warn!("Photo lookup for candidate {} timed out", profile.id);
                Vec::new()
            }
        };

        Ok(CandidateResult {
            candidate_id: profile.id,
            display_text: profile.display_text(),
            attachments,
        })
    }
}
