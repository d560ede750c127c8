use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::models::{
    CandidateId, CandidateProfile, ExclusionRecord, OwnProfile, Reaction, UserId,
};
use crate::services::traits::{ExclusionStore, StoreError};

/// PostgreSQL-backed exclusion store
///
/// `exclusions` holds one row per (user, candidate) pair with a nullable
/// reaction column; favorites and the blacklist are queries over it, so
/// they can never disagree.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

fn sex_code(sex: Option<crate::models::Sex>) -> Option<i16> {
    sex.map(|s| s.code() as i16)
}

#[async_trait]
impl ExclusionStore for PostgresClient {
    async fn upsert_user(&self, profile: &OwnProfile) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO users (user_id, first_name, last_name, sex, city, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                sex = EXCLUDED.sex,
                city = EXCLUDED.city,
                updated_at = EXCLUDED.updated_at
        "#;

        sqlx::query(query)
            .bind(profile.user_id)
            .bind(&profile.first_name)
            .bind(&profile.last_name)
            .bind(sex_code(profile.sex))
            .bind(profile.location.as_ref().map(|l| l.label.as_str()))
            .execute(&self.pool)
            .await?;

        tracing::debug!("Upserted user {}", profile.user_id);
        Ok(())
    }

    async fn upsert_candidate(&self, candidate: &CandidateProfile) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO candidates
                (candidate_id, first_name, last_name, sex, city, bdate, has_photo, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            ON CONFLICT (candidate_id)
            DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                sex = EXCLUDED.sex,
                city = EXCLUDED.city,
                bdate = EXCLUDED.bdate,
                has_photo = EXCLUDED.has_photo,
                updated_at = EXCLUDED.updated_at
        "#;

        sqlx::query(query)
            .bind(candidate.candidate_id)
            .bind(&candidate.first_name)
            .bind(&candidate.last_name)
            .bind(sex_code(candidate.sex))
            .bind(candidate.location.as_deref())
            .bind(candidate.birth_date.as_deref())
            .bind(candidate.has_photo)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn mark_shown(
        &self,
        user_id: UserId,
        candidate_id: CandidateId,
    ) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO exclusions (user_id, candidate_id, shown_at, reaction)
            VALUES ($1, $2, NOW(), NULL)
            ON CONFLICT (user_id, candidate_id)
            DO UPDATE SET shown_at = EXCLUDED.shown_at
        "#;

        sqlx::query(query)
            .bind(user_id)
            .bind(candidate_id)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Marked shown: {} -> {}", user_id, candidate_id);
        Ok(())
    }

    async fn upsert_reaction(
        &self,
        user_id: UserId,
        candidate_id: CandidateId,
        reaction: Reaction,
    ) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO exclusions (user_id, candidate_id, shown_at, reaction)
            VALUES ($1, $2, NOW(), $3)
            ON CONFLICT (user_id, candidate_id)
            DO UPDATE SET reaction = EXCLUDED.reaction
        "#;

        sqlx::query(query)
            .bind(user_id)
            .bind(candidate_id)
            .bind(reaction.as_str())
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            "Recorded reaction: {} -> {} ({})",
            user_id,
            candidate_id,
            reaction.as_str()
        );
        Ok(())
    }

    async fn excluded_among(
        &self,
        user_id: UserId,
        candidate_ids: &[CandidateId],
    ) -> Result<HashSet<CandidateId>, StoreError> {
        if candidate_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let query = r#"
            SELECT candidate_id
            FROM exclusions
            WHERE user_id = $1 AND candidate_id = ANY($2)
        "#;

        let rows = sqlx::query(query)
            .bind(user_id)
            .bind(candidate_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get("candidate_id")).collect())
    }

    async fn exclusion_record(
        &self,
        user_id: UserId,
        candidate_id: CandidateId,
    ) -> Result<Option<ExclusionRecord>, StoreError> {
        let query = r#"
            SELECT user_id, candidate_id, shown_at, reaction
            FROM exclusions
            WHERE user_id = $1 AND candidate_id = $2
        "#;

        let row = sqlx::query(query)
            .bind(user_id)
            .bind(candidate_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> Result<ExclusionRecord, StoreError> {
            let reaction: Option<String> = row.get("reaction");
            let reaction = match reaction {
                Some(value) => Some(Reaction::parse(&value).ok_or_else(|| {
                    StoreError::InvalidInput(format!("Unknown reaction in database: {}", value))
                })?),
                None => None,
            };
            Ok(ExclusionRecord {
                user_id: row.get("user_id"),
                candidate_id: row.get("candidate_id"),
                shown_at: row.get("shown_at"),
                reaction,
            })
        })
        .transpose()
    }

    async fn list_by_reaction(
        &self,
        user_id: UserId,
        reaction: Reaction,
        limit: usize,
    ) -> Result<Vec<CandidateId>, StoreError> {
        let query = r#"
            SELECT candidate_id
            FROM exclusions
            WHERE user_id = $1 AND reaction = $2
            ORDER BY shown_at DESC, candidate_id DESC
            LIMIT $3
        "#;

        let rows = sqlx::query(query)
            .bind(user_id)
            .bind(reaction.as_str())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<CandidateId> = rows.iter().map(|row| row.get("candidate_id")).collect();

        tracing::debug!(
            "User {} has {} candidates marked {}",
            user_id,
            ids.len(),
            reaction.as_str()
        );

        Ok(ids)
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
