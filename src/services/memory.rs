use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{
    CandidateId, CandidateProfile, ExclusionRecord, OwnProfile, Reaction, UserId,
};
use crate::services::traits::{ExclusionStore, StoreError};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, OwnProfile>,
    candidates: HashMap<CandidateId, CandidateProfile>,
    exclusions: HashMap<(UserId, CandidateId), ExclusionRecord>,
}

/// Process-local exclusion store
///
/// Used for `storage.backend = "memory"` and in tests. A single lock
/// guards all tables so every operation is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn candidate(&self, candidate_id: CandidateId) -> Option<CandidateProfile> {
        self.tables.read().await.candidates.get(&candidate_id).cloned()
    }

    pub async fn user(&self, user_id: UserId) -> Option<OwnProfile> {
        self.tables.read().await.users.get(&user_id).cloned()
    }

    /// Number of exclusion records held for a user
    pub async fn exclusion_count(&self, user_id: UserId) -> usize {
        self.tables
            .read()
            .await
            .exclusions
            .keys()
            .filter(|(uid, _)| *uid == user_id)
            .count()
    }
}

#[async_trait]
impl ExclusionStore for MemoryStore {
    async fn upsert_user(&self, profile: &OwnProfile) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .users
            .insert(profile.user_id, profile.clone());
        Ok(())
    }

    async fn upsert_candidate(&self, candidate: &CandidateProfile) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .candidates
            .insert(candidate.candidate_id, candidate.clone());
        Ok(())
    }

    async fn mark_shown(
        &self,
        user_id: UserId,
        candidate_id: CandidateId,
    ) -> Result<(), StoreError> {
        let now = chrono::Utc::now();
        let mut tables = self.tables.write().await;
        tables
            .exclusions
            .entry((user_id, candidate_id))
            .and_modify(|record| record.shown_at = now)
            .or_insert_with(|| ExclusionRecord {
                user_id,
                candidate_id,
                shown_at: now,
                reaction: None,
            });
        Ok(())
    }

    async fn upsert_reaction(
        &self,
        user_id: UserId,
        candidate_id: CandidateId,
        reaction: Reaction,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .exclusions
            .entry((user_id, candidate_id))
            .and_modify(|record| record.reaction = Some(reaction))
            .or_insert_with(|| ExclusionRecord {
                user_id,
                candidate_id,
                shown_at: chrono::Utc::now(),
                reaction: Some(reaction),
            });
        Ok(())
    }

    async fn excluded_among(
        &self,
        user_id: UserId,
        candidate_ids: &[CandidateId],
    ) -> Result<HashSet<CandidateId>, StoreError> {
        let tables = self.tables.read().await;
        Ok(candidate_ids
            .iter()
            .copied()
            .filter(|id| tables.exclusions.contains_key(&(user_id, *id)))
            .collect())
    }

    async fn exclusion_record(
        &self,
        user_id: UserId,
        candidate_id: CandidateId,
    ) -> Result<Option<ExclusionRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .exclusions
            .get(&(user_id, candidate_id))
            .cloned())
    }

    async fn list_by_reaction(
        &self,
        user_id: UserId,
        reaction: Reaction,
        limit: usize,
    ) -> Result<Vec<CandidateId>, StoreError> {
        let tables = self.tables.read().await;
        let mut records: Vec<&ExclusionRecord> = tables
            .exclusions
            .values()
            .filter(|r| r.user_id == user_id && r.reaction == Some(reaction))
            .collect();
        records.sort_by(|a, b| {
            b.shown_at
                .cmp(&a.shown_at)
                .then_with(|| b.candidate_id.cmp(&a.candidate_id))
        });
        Ok(records
            .into_iter()
            .take(limit)
            .map(|r| r.candidate_id)
            .collect())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mark_shown_keeps_reaction() {
        let store = MemoryStore::new();
        store.upsert_reaction(1, 10, Reaction::Liked).await.unwrap();
        store.mark_shown(1, 10).await.unwrap();

        let record = store.exclusion_record(1, 10).await.unwrap().unwrap();
        assert_eq!(record.reaction, Some(Reaction::Liked));
    }

    #[tokio::test]
    async fn test_reaction_keeps_shown_at() {
        let store = MemoryStore::new();
        store.mark_shown(1, 10).await.unwrap();
        let shown_at = store.exclusion_record(1, 10).await.unwrap().unwrap().shown_at;

        store.upsert_reaction(1, 10, Reaction::Blocked).await.unwrap();

        let record = store.exclusion_record(1, 10).await.unwrap().unwrap();
        assert_eq!(record.shown_at, shown_at);
        assert_eq!(record.reaction, Some(Reaction::Blocked));
    }

    #[tokio::test]
    async fn test_views_are_exclusive() {
        let store = MemoryStore::new();
        store.mark_shown(1, 10).await.unwrap();
        store.upsert_reaction(1, 10, Reaction::Liked).await.unwrap();
        store.upsert_reaction(1, 10, Reaction::Blocked).await.unwrap();

        assert!(store.list_favorites(1, 50).await.unwrap().is_empty());
        assert_eq!(
            store.list_by_reaction(1, Reaction::Blocked, 50).await.unwrap(),
            vec![10]
        );
        assert_eq!(store.exclusion_count(1).await, 1);
    }

    #[tokio::test]
    async fn test_exclusions_are_per_user() {
        let store = MemoryStore::new();
        store.mark_shown(1, 10).await.unwrap();

        assert!(store.is_excluded(1, 10).await.unwrap());
        assert!(!store.is_excluded(2, 10).await.unwrap());

        let excluded = store.excluded_among(1, &[10, 11, 12]).await.unwrap();
        assert_eq!(excluded, HashSet::from([10]));
    }
}
