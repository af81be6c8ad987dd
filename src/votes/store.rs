/// Vote store accessor
///
/// Narrow persistence interface over the `weather_votes` table: insert,
/// delete-by-(user, day), and filtered scans by day. "Changing" a vote is a
/// delete followed by a fresh insert issued by the state machine; the two
/// calls are not wrapped in a transaction.
use crate::{
    db::votes::{NonVoter, VoteRecord},
    error::{AppError, AppResult},
    weather::WeatherSnapshot,
};
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;

/// A vote row to be inserted
#[derive(Debug, Clone)]
pub struct NewVote {
    pub user_id: String,
    pub user_email: String,
    pub is_top_ten: bool,
    pub weather: WeatherSnapshot,
    pub location: String,
    pub user_agent: Option<String>,
    pub is_manual_entry: bool,
    pub voting_day: NaiveDate,
}

/// Vote store service
pub struct VoteStore {
    db: SqlitePool,
}

impl VoteStore {
    /// Create a new vote store
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a vote row
    ///
    /// The unique index on `(user_id, voting_day)` rejects a second vote for
    /// the same day; that case surfaces as a Conflict.
    pub async fn insert(&self, vote: NewVote) -> AppResult<()> {
        let result = sqlx::query(
            "INSERT INTO weather_votes
                (user_id, user_email, is_top_ten, temperature, conditions, humidity,
                 wind_speed, uv_index, feels_like, pressure, visibility, location,
                 user_agent, is_manual_entry, voting_day, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )
        .bind(&vote.user_id)
        .bind(&vote.user_email)
        .bind(vote.is_top_ten)
        .bind(vote.weather.temperature)
        .bind(&vote.weather.conditions)
        .bind(vote.weather.humidity)
        .bind(vote.weather.wind_speed)
        .bind(vote.weather.uv_index)
        .bind(vote.weather.feels_like)
        .bind(vote.weather.pressure)
        .bind(vote.weather.visibility)
        .bind(&vote.location)
        .bind(&vote.user_agent)
        .bind(vote.is_manual_entry)
        .bind(vote.voting_day)
        .bind(Utc::now())
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(AppError::Conflict(
                "A vote already exists for this day".to_string(),
            )),
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// Delete a user's vote for a day, returning how many rows were removed
    ///
    /// Zero rows is success, not an error.
    pub async fn delete_by(&self, user_id: &str, voting_day: NaiveDate) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM weather_votes WHERE user_id = ?1 AND voting_day = ?2")
            .bind(user_id)
            .bind(voting_day)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }

    /// Fetch all votes for a day, optionally restricted to an exact location match
    pub async fn scan_by_day(
        &self,
        voting_day: NaiveDate,
        location: Option<&str>,
    ) -> AppResult<Vec<VoteRecord>> {
        let rows = match location {
            Some(location) => {
                sqlx::query_as::<_, VoteRecord>(
                    "SELECT * FROM weather_votes WHERE voting_day = ?1 AND location = ?2",
                )
                .bind(voting_day)
                .bind(location)
                .fetch_all(&self.db)
                .await
            }
            None => {
                sqlx::query_as::<_, VoteRecord>("SELECT * FROM weather_votes WHERE voting_day = ?1")
                    .bind(voting_day)
                    .fetch_all(&self.db)
                    .await
            }
        }
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Fetch a user's votes for a day
    ///
    /// The uniqueness invariant means at most one row; all matches are
    /// returned so callers can notice violations.
    pub async fn find_for_user(
        &self,
        user_id: &str,
        voting_day: NaiveDate,
    ) -> AppResult<Vec<VoteRecord>> {
        let rows = sqlx::query_as::<_, VoteRecord>(
            "SELECT * FROM weather_votes WHERE user_id = ?1 AND voting_day = ?2",
        )
        .bind(user_id)
        .bind(voting_day)
        .fetch_all(&self.db)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// List users whose last vote is missing or older than `today`
    ///
    /// Reads the `user_activity_summary` view; used by the reminder job.
    pub async fn non_voters(&self, today: NaiveDate) -> AppResult<Vec<NonVoter>> {
        let rows = sqlx::query_as::<_, NonVoter>(
            "SELECT user_id, user_email, last_vote_date
             FROM user_activity_summary
             WHERE last_vote_date IS NULL OR last_vote_date <> ?1",
        )
        .bind(today)
        .fetch_all(&self.db)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|e| e.is_unique_violation())
}
