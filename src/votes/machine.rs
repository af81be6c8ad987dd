/// Per-user daily vote state
///
/// States per (user, resolved voting day): `Unknown` while no day is resolved,
/// then `NotVoted` or `Voted`. Status is re-derived from the store on every
/// query; its inputs are the user, the resolved voting day, and the vote rows
/// themselves, so callers re-invoke `status` after any mutation.
use crate::{
    db::account::Account,
    error::{AppError, AppResult},
    votes::{split_location, NewVote, VoteStore},
    weather::WeatherSnapshot,
};
use chrono::NaiveDate;
use std::sync::Arc;

/// Vote state for one user and voting day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteStatus {
    /// No voting day has been resolved for the user's location
    Unknown,
    NotVoted,
    Voted { is_top_ten: bool },
}

/// A vote as submitted by a client
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteSubmission {
    pub is_top_ten: bool,
    /// Conditions at submission time; without it the submission is ignored
    pub weather: Option<WeatherSnapshot>,
    /// `"City, Region"` the vote applies to
    pub location: String,
    #[serde(default)]
    pub is_manual_entry: bool,
}

/// Vote state machine service
pub struct VoteMachine {
    store: Arc<VoteStore>,
}

impl VoteMachine {
    /// Create a new vote machine
    pub fn new(store: Arc<VoteStore>) -> Self {
        Self { store }
    }

    /// Derive the user's vote state for the given voting day.
    ///
    /// `None` for the day means the day could not be resolved and the state is
    /// `Unknown`. If duplicate rows exist (a violated invariant), the first is
    /// used and the anomaly is logged.
    pub async fn status(
        &self,
        user_id: &str,
        voting_day: Option<NaiveDate>,
    ) -> AppResult<VoteStatus> {
        let Some(day) = voting_day else {
            return Ok(VoteStatus::Unknown);
        };

        let matches = self.store.find_for_user(user_id, day).await?;
        if matches.len() > 1 {
            tracing::warn!(
                user_id,
                voting_day = %day,
                count = matches.len(),
                "duplicate vote rows for user and day"
            );
        }

        Ok(match matches.first() {
            Some(row) => VoteStatus::Voted {
                is_top_ten: row.is_top_ten,
            },
            None => VoteStatus::NotVoted,
        })
    }

    /// Record a vote for the given voting day.
    ///
    /// A submission without a weather snapshot is ignored rather than
    /// rejected; the current state is returned unchanged. The location must
    /// parse as `"City, Region"`, and a same-day vote already on file is a
    /// Conflict; it has to be changed first.
    pub async fn submit(
        &self,
        user: &Account,
        voting_day: NaiveDate,
        submission: VoteSubmission,
        user_agent: Option<String>,
    ) -> AppResult<VoteStatus> {
        let Some(weather) = submission.weather else {
            tracing::debug!(user_id = %user.id, "vote submitted without weather snapshot, ignoring");
            return self.status(&user.id, Some(voting_day)).await;
        };

        if split_location(&submission.location).is_none() {
            return Err(AppError::Validation(
                "Location must be of the form \"City, Region\"".to_string(),
            ));
        }

        if let VoteStatus::Voted { .. } = self.status(&user.id, Some(voting_day)).await? {
            return Err(AppError::Conflict(
                "A vote already exists for this day".to_string(),
            ));
        }

        self.store
            .insert(NewVote {
                user_id: user.id.clone(),
                user_email: user.email.clone(),
                is_top_ten: submission.is_top_ten,
                weather,
                location: submission.location,
                user_agent,
                is_manual_entry: submission.is_manual_entry,
                voting_day,
            })
            .await?;

        Ok(VoteStatus::Voted {
            is_top_ten: submission.is_top_ten,
        })
    }

    /// Delete the user's vote for the day so a new one can be submitted.
    ///
    /// Returns how many rows were deleted; zero is not an error. This is the
    /// first half of a two-phase change: the replacement vote arrives as a
    /// separate `submit`, and nothing spans the two, so a failure in between
    /// leaves the user with no vote for the day.
    pub async fn change(&self, user_id: &str, voting_day: NaiveDate) -> AppResult<u64> {
        self.store.delete_by(user_id, voting_day).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::SqlitePool;

    async fn test_store() -> Arc<VoteStore> {
        let db = SqlitePool::connect(":memory:").await.unwrap();

        sqlx::query(
            r#"
            CREATE TABLE weather_votes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                user_email TEXT NOT NULL,
                is_top_ten INTEGER NOT NULL,
                temperature INTEGER NOT NULL,
                conditions TEXT NOT NULL,
                humidity INTEGER NOT NULL,
                wind_speed INTEGER NOT NULL,
                uv_index REAL NOT NULL,
                feels_like INTEGER NOT NULL,
                pressure REAL NOT NULL,
                visibility INTEGER NOT NULL,
                location TEXT NOT NULL,
                user_agent TEXT,
                is_manual_entry INTEGER NOT NULL DEFAULT 0,
                voting_day TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(
            "CREATE UNIQUE INDEX idx_weather_votes_user_day
             ON weather_votes(user_id, voting_day)",
        )
        .execute(&db)
        .await
        .unwrap();

        Arc::new(VoteStore::new(db))
    }

    fn test_account() -> Account {
        Account {
            id: "user-1".to_string(),
            email: "voter@example.com".to_string(),
            display_name: "Voter".to_string(),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
        }
    }

    fn snapshot() -> WeatherSnapshot {
        WeatherSnapshot {
            temperature: 72,
            conditions: "Sunny".to_string(),
            humidity: 40,
            wind_speed: 5,
            uv_index: 6.0,
            feels_like: 73,
            pressure: 30.01,
            visibility: 10,
        }
    }

    fn submission(is_top_ten: bool) -> VoteSubmission {
        VoteSubmission {
            is_top_ten,
            weather: Some(snapshot()),
            location: "Austin, TX".to_string(),
            is_manual_entry: false,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[tokio::test]
    async fn test_submit_transitions_to_voted() {
        let machine = VoteMachine::new(test_store().await);
        let user = test_account();

        assert_eq!(
            machine.status(&user.id, Some(day())).await.unwrap(),
            VoteStatus::NotVoted
        );

        let status = machine
            .submit(&user, day(), submission(true), None)
            .await
            .unwrap();
        assert_eq!(status, VoteStatus::Voted { is_top_ten: true });
    }

    #[tokio::test]
    async fn test_unresolved_day_is_unknown() {
        let machine = VoteMachine::new(test_store().await);
        assert_eq!(
            machine.status("user-1", None).await.unwrap(),
            VoteStatus::Unknown
        );
    }

    #[tokio::test]
    async fn test_second_submit_same_day_conflicts() {
        let store = test_store().await;
        let machine = VoteMachine::new(Arc::clone(&store));
        let user = test_account();

        machine
            .submit(&user, day(), submission(true), None)
            .await
            .unwrap();
        let err = machine
            .submit(&user, day(), submission(false), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Still exactly one row
        let rows = store.find_for_user(&user.id, day()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_top_ten);
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_a_no_op() {
        let store = test_store().await;
        let machine = VoteMachine::new(Arc::clone(&store));
        let user = test_account();

        let status = machine
            .submit(
                &user,
                day(),
                VoteSubmission {
                    is_top_ten: true,
                    weather: None,
                    location: "Austin, TX".to_string(),
                    is_manual_entry: false,
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(status, VoteStatus::NotVoted);
        assert!(store.find_for_user(&user.id, day()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_location_rejected_at_submit() {
        let machine = VoteMachine::new(test_store().await);
        let user = test_account();

        let err = machine
            .submit(
                &user,
                day(),
                VoteSubmission {
                    is_top_ten: true,
                    weather: Some(snapshot()),
                    location: "Austin".to_string(),
                    is_manual_entry: false,
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_change_without_vote_deletes_nothing() {
        let machine = VoteMachine::new(test_store().await);
        assert_eq!(machine.change("user-1", day()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_change_then_resubmit_replaces_vote() {
        let store = test_store().await;
        let machine = VoteMachine::new(Arc::clone(&store));
        let user = test_account();

        machine
            .submit(&user, day(), submission(true), None)
            .await
            .unwrap();
        assert_eq!(machine.change(&user.id, day()).await.unwrap(), 1);
        machine
            .submit(&user, day(), submission(false), None)
            .await
            .unwrap();

        let rows = store.find_for_user(&user.id, day()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].is_top_ten);
    }
}
