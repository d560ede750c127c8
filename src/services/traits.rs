//! Collaborator interfaces consumed by the dialog core.
//!
//! The VK client implements the lookup/search traits, the Postgres and
//! in-memory stores implement [`ExclusionStore`].

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    CandidateId, CandidateProfile, DirectoryProfile, ExclusionRecord, Location, OwnProfile,
    Reaction, SearchQuery, UserId,
};

/// Errors raised by the external directory API
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Errors raised by the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Looks up the profile of the user talking to the bot
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn own_profile(&self, user_id: UserId) -> Result<Option<OwnProfile>, UpstreamError>;
}

/// Resolves free text to a directory location
#[async_trait]
pub trait LocationLookup: Send + Sync {
    async fn resolve(&self, text: &str, country_id: i64)
        -> Result<Option<Location>, UpstreamError>;
}

/// Pages through the directory
#[async_trait]
pub trait DirectorySearch: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<DirectoryProfile>, UpstreamError>;
}

/// Fetches the most liked profile photos as message attachments
#[async_trait]
pub trait PhotoLookup: Send + Sync {
    async fn top_photos(
        &self,
        candidate_id: CandidateId,
        limit: usize,
    ) -> Result<Vec<String>, UpstreamError>;
}

/// Persisted exclusion relation plus the profiles it refers to
///
/// Implementations must make every write atomic per row: a failed call
/// leaves no partial record behind.
#[async_trait]
pub trait ExclusionStore: Send + Sync {
    /// Insert or refresh the bot user's own record.
    async fn upsert_user(&self, profile: &OwnProfile) -> Result<(), StoreError>;

    /// Insert or refresh a candidate profile.
    async fn upsert_candidate(&self, candidate: &CandidateProfile) -> Result<(), StoreError>;

    /// Record that `candidate_id` was shown now; an existing reaction is kept.
    async fn mark_shown(&self, user_id: UserId, candidate_id: CandidateId)
        -> Result<(), StoreError>;

    /// Set the reaction for a pair, overwriting any previous one. `shown_at`
    /// of an existing record is left untouched.
    async fn upsert_reaction(
        &self,
        user_id: UserId,
        candidate_id: CandidateId,
        reaction: Reaction,
    ) -> Result<(), StoreError>;

    /// Subset of `candidate_ids` that already has a record for `user_id`.
    async fn excluded_among(
        &self,
        user_id: UserId,
        candidate_ids: &[CandidateId],
    ) -> Result<HashSet<CandidateId>, StoreError>;

    async fn exclusion_record(
        &self,
        user_id: UserId,
        candidate_id: CandidateId,
    ) -> Result<Option<ExclusionRecord>, StoreError>;

    /// Candidates carrying `reaction`, most recently shown first.
    async fn list_by_reaction(
        &self,
        user_id: UserId,
        reaction: Reaction,
        limit: usize,
    ) -> Result<Vec<CandidateId>, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;

    async fn is_excluded(
        &self,
        user_id: UserId,
        candidate_id: CandidateId,
    ) -> Result<bool, StoreError> {
        Ok(self
            .excluded_among(user_id, &[candidate_id])
            .await?
            .contains(&candidate_id))
    }

    async fn list_favorites(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<CandidateId>, StoreError> {
        self.list_by_reaction(user_id, Reaction::Liked, limit).await
    }
}
