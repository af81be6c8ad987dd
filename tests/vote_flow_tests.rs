/// End-to-end tests for the daily vote flow
///
/// Runs the real migrations against an in-memory database and drives the
/// store, state machine, and aggregation engine together.
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use topten_weather::{
    db::{self, account::Account},
    error::AppError,
    votes::{
        AggregateMode, AggregateSummary, Aggregator, NewVote, VoteMachine, VoteStatus, VoteStore,
        VoteSubmission,
    },
    weather::WeatherSnapshot,
};

async fn test_pool() -> SqlitePool {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}

fn account(id: &str) -> Account {
    Account {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        display_name: id.to_string(),
        password_hash: "hash".to_string(),
        created_at: Utc::now(),
    }
}

fn snapshot() -> WeatherSnapshot {
    WeatherSnapshot {
        temperature: 75,
        conditions: "Sunny".to_string(),
        humidity: 35,
        wind_speed: 4,
        uv_index: 8.0,
        feels_like: 76,
        pressure: 29.95,
        visibility: 10,
    }
}

fn submission(location: &str, is_top_ten: bool) -> VoteSubmission {
    VoteSubmission {
        is_top_ten,
        weather: Some(snapshot()),
        location: location.to_string(),
        is_manual_entry: false,
    }
}

fn new_vote(user: &str, location: &str, is_top_ten: bool, day: NaiveDate) -> NewVote {
    NewVote {
        user_id: user.to_string(),
        user_email: format!("{}@example.com", user),
        is_top_ten,
        weather: snapshot(),
        location: location.to_string(),
        user_agent: None,
        is_manual_entry: false,
        voting_day: day,
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

#[tokio::test]
async fn at_most_one_vote_per_user_per_day() {
    let store = Arc::new(VoteStore::new(test_pool().await));
    let machine = VoteMachine::new(Arc::clone(&store));
    let user = account("alice");

    machine
        .submit(&user, day(), submission("Austin, TX", true), None)
        .await
        .unwrap();

    // The machine refuses a second same-day vote
    let err = machine
        .submit(&user, day(), submission("Austin, TX", false), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // The unique index refuses it even if the store is driven directly
    let err = store
        .insert(new_vote("alice", "Austin, TX", false, day()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    assert_eq!(store.find_for_user("alice", day()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn change_vote_is_idempotent_when_no_record_exists() {
    let store = Arc::new(VoteStore::new(test_pool().await));
    let machine = VoteMachine::new(store);

    assert_eq!(machine.change("nobody", day()).await.unwrap(), 0);
}

#[tokio::test]
async fn resubmission_replaces_the_vote() {
    let store = Arc::new(VoteStore::new(test_pool().await));
    let machine = VoteMachine::new(Arc::clone(&store));
    let user = account("alice");

    machine
        .submit(&user, day(), submission("Austin, TX", true), None)
        .await
        .unwrap();
    assert_eq!(machine.change(&user.id, day()).await.unwrap(), 1);
    machine
        .submit(&user, day(), submission("Austin, TX", false), None)
        .await
        .unwrap();

    let rows = store.find_for_user(&user.id, day()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].is_top_ten);

    assert_eq!(
        machine.status(&user.id, Some(day())).await.unwrap(),
        VoteStatus::Voted { is_top_ten: false }
    );
}

#[tokio::test]
async fn exact_summary_counts_one_location() {
    let store = Arc::new(VoteStore::new(test_pool().await));
    let aggregator = Aggregator::new(Arc::clone(&store));

    store
        .insert(new_vote("alice", "Austin, TX", true, day()))
        .await
        .unwrap();
    store
        .insert(new_vote("bob", "Austin, TX", false, day()))
        .await
        .unwrap();
    store
        .insert(new_vote("carol", "Dallas, TX", true, day()))
        .await
        .unwrap();

    let summary = aggregator
        .compute_summary(day(), "Austin, TX", AggregateMode::Exact)
        .await
        .unwrap();

    let AggregateSummary::Exact(summary) = summary else {
        panic!("expected exact summary");
    };
    assert_eq!(summary.yes_votes, 1);
    assert_eq!(summary.no_votes, 1);
    assert_eq!(summary.total_votes, 2);
}

#[tokio::test]
async fn split_summary_buckets_city_and_state() {
    let store = Arc::new(VoteStore::new(test_pool().await));
    let aggregator = Aggregator::new(Arc::clone(&store));

    store
        .insert(new_vote("alice", "Austin, TX", true, day()))
        .await
        .unwrap();
    store
        .insert(new_vote("bob", "Austin, TX", false, day()))
        .await
        .unwrap();
    store
        .insert(new_vote("carol", "Dallas, TX", true, day()))
        .await
        .unwrap();

    let summary = aggregator
        .compute_summary(day(), "Austin, TX", AggregateMode::CityState)
        .await
        .unwrap();

    let AggregateSummary::Split(summary) = summary else {
        panic!("expected split summary");
    };
    assert_eq!(summary.yes_votes_city, 1);
    assert_eq!(summary.no_votes_city, 1);
    assert_eq!(summary.total_votes_city, 2);
    assert_eq!(summary.yes_votes_state, 2);
    assert_eq!(summary.no_votes_state, 1);
    assert_eq!(summary.total_votes_state, 3);

    // State scope contains the city scope
    assert!(summary.total_votes_state >= summary.total_votes_city);
}

#[tokio::test]
async fn summaries_are_deterministic() {
    let store = Arc::new(VoteStore::new(test_pool().await));
    let aggregator = Aggregator::new(Arc::clone(&store));

    store
        .insert(new_vote("alice", "Austin, TX", true, day()))
        .await
        .unwrap();
    store
        .insert(new_vote("bob", "Dallas, TX", false, day()))
        .await
        .unwrap();

    let first = aggregator
        .compute_summary(day(), "Austin, TX", AggregateMode::CityState)
        .await
        .unwrap();
    let second = aggregator
        .compute_summary(day(), "Austin, TX", AggregateMode::CityState)
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn votes_scope_to_their_own_day() {
    let store = Arc::new(VoteStore::new(test_pool().await));
    let machine = VoteMachine::new(Arc::clone(&store));
    let user = account("alice");

    let yesterday = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
    store
        .insert(new_vote("alice", "Austin, TX", true, yesterday))
        .await
        .unwrap();

    // Yesterday's vote does not block today's
    let status = machine
        .submit(&user, day(), submission("Austin, TX", false), None)
        .await
        .unwrap();
    assert_eq!(status, VoteStatus::Voted { is_top_ten: false });

    assert_eq!(store.scan_by_day(day(), None).await.unwrap().len(), 1);
    assert_eq!(store.scan_by_day(yesterday, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn reminder_view_tracks_last_vote_date() {
    let pool = test_pool().await;
    let store = Arc::new(VoteStore::new(pool.clone()));

    // Two accounts, only one of which has voted today
    for (id, email) in [("alice", "alice@example.com"), ("bob", "bob@example.com")] {
        sqlx::query(
            "INSERT INTO account (id, email, display_name, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(id)
        .bind(email)
        .bind(id)
        .bind("hash")
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();
    }

    store
        .insert(new_vote("alice", "Austin, TX", true, day()))
        .await
        .unwrap();

    let pending = store.non_voters(day()).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].user_email, "bob@example.com");
    assert_eq!(pending[0].last_vote_date, None);

    // A vote on an earlier day still counts as "not voted today"
    let tomorrow = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    let pending = store.non_voters(tomorrow).await.unwrap();
    assert_eq!(pending.len(), 2);
}
