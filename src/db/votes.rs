/// Vote database models
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One vote row in `weather_votes`.
///
/// At most one row exists per `(user_id, voting_day)` pair; `voting_day` is the
/// calendar date resolved in the voter's local timezone at submission time, not
/// the server's date. The weather fields are captured once and never mutated.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub id: i64,
    pub user_id: String,
    pub user_email: String,
    pub is_top_ten: bool,
    pub temperature: i64,
    pub conditions: String,
    pub humidity: i64,
    pub wind_speed: i64,
    pub uv_index: f64,
    pub feels_like: i64,
    pub pressure: f64,
    pub visibility: i64,
    pub location: String,
    pub user_agent: Option<String>,
    pub is_manual_entry: bool,
    pub voting_day: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Row of the `user_activity_summary` view, consumed by the reminder job.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonVoter {
    pub user_id: String,
    pub user_email: String,
    pub last_vote_date: Option<NaiveDate>,
}
