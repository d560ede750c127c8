use std::sync::Arc;

use crate::core::error::AssistantError;
use crate::models::{CandidateId, DialogState, Reaction, ReactionKind, UserId};
use crate::services::ExclusionStore;

/// Applies favorite/blacklist reactions to the last shown candidate
pub struct ReactionRecorder {
    store: Arc<dyn ExclusionStore>,
}

impl ReactionRecorder {
    pub fn new(store: Arc<dyn ExclusionStore>) -> Self {
        Self { store }
    }

    /// Record `kind` for the candidate last shown in this session
    ///
    /// Fails with `NoActiveCandidate` without writing anything when nothing
    /// has been shown. Repeating a reaction is a no-op; the opposite one
    /// replaces it. `last_candidate_id` stays set.
    pub async fn record_reaction(
        &self,
        state: &DialogState,
        kind: ReactionKind,
    ) -> Result<CandidateId, AssistantError> {
        let candidate_id = state
            .last_candidate_id
            .ok_or(AssistantError::NoActiveCandidate)?;

        let reaction = Reaction::from(kind);
        self.store
            .upsert_reaction(state.user_id, candidate_id, reaction)
            .await?;

        tracing::info!(
            "User {} marked candidate {} as {}",
            state.user_id,
            candidate_id,
            reaction.as_str()
        );

        Ok(candidate_id)
    }

    /// Favorited candidates, newest first
    pub async fn favorites(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<CandidateId>, AssistantError> {
        Ok(self.store.list_favorites(user_id, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStore;

    #[tokio::test]
    async fn test_reaction_requires_shown_candidate() {
        let store = Arc::new(MemoryStore::new());
        let recorder = ReactionRecorder::new(store.clone());
        let state = DialogState::new(1);

        let result = recorder.record_reaction(&state, ReactionKind::Favorite).await;

        assert!(matches!(result, Err(AssistantError::NoActiveCandidate)));
        assert_eq!(store.exclusion_count(1).await, 0);
    }

    #[tokio::test]
    async fn test_opposite_reaction_overwrites() {
        let store = Arc::new(MemoryStore::new());
        let recorder = ReactionRecorder::new(store.clone());
        let mut state = DialogState::new(1);
        state.last_candidate_id = Some(10);
        store.mark_shown(1, 10).await.unwrap();

        recorder.record_reaction(&state, ReactionKind::Favorite).await.unwrap();
        assert_eq!(recorder.favorites(1, 50).await.unwrap(), vec![10]);

        recorder.record_reaction(&state, ReactionKind::Blacklist).await.unwrap();

        let record = store.exclusion_record(1, 10).await.unwrap().unwrap();
        assert_eq!(record.reaction, Some(Reaction::Blocked));
        assert!(recorder.favorites(1, 50).await.unwrap().is_empty());
        assert_eq!(state.last_candidate_id, Some(10));
    }

    #[tokio::test]
    async fn test_repeated_reaction_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let recorder = ReactionRecorder::new(store.clone());
        let mut state = DialogState::new(1);
        state.last_candidate_id = Some(10);
        store.mark_shown(1, 10).await.unwrap();

        recorder.record_reaction(&state, ReactionKind::Favorite).await.unwrap();
        let first = store.exclusion_record(1, 10).await.unwrap();
        recorder.record_reaction(&state, ReactionKind::Favorite).await.unwrap();

        assert_eq!(store.exclusion_record(1, 10).await.unwrap(), first);
        assert_eq!(store.exclusion_count(1).await, 1);
    }
}
