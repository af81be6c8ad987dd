/// Voting endpoints
///
/// Orchestrates the day resolver, vote state machine, and aggregation engine:
/// mutations re-derive the status and recompute the summary before
/// responding, so clients always see state consistent with the vote they just
/// cast.
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::{AppError, AppResult},
    votes::{AggregateMode, AggregateSummary, VoteStatus, VoteSubmission},
};
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Build voting routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/votes/voting-day", get(voting_day))
        .route("/api/votes/status", get(vote_status))
        .route("/api/votes/summary", get(vote_summary))
        .route("/api/votes", post(submit_vote).delete(change_vote))
}

#[derive(Debug, Deserialize)]
struct LocationQuery {
    location: String,
}

#[derive(Debug, Deserialize)]
struct SummaryQuery {
    location: String,
    mode: AggregateMode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VotingDayResponse {
    voting_day: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoteStatusResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_top_ten: Option<bool>,
    voting_day: Option<NaiveDate>,
}

impl VoteStatusResponse {
    fn new(status: VoteStatus, voting_day: Option<NaiveDate>) -> Self {
        let (status, is_top_ten) = match status {
            VoteStatus::Unknown => ("unknown", None),
            VoteStatus::NotVoted => ("notVoted", None),
            VoteStatus::Voted { is_top_ten } => ("voted", Some(is_top_ten)),
        };
        Self {
            status,
            is_top_ten,
            voting_day,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitVoteResponse {
    status: &'static str,
    is_top_ten: Option<bool>,
    voting_day: NaiveDate,
    /// Community counts recomputed after the mutation
    summary: AggregateSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangeVoteResponse {
    rows_deleted: u64,
}

/// Resolve the voting day for a location
async fn voting_day(
    State(ctx): State<AppContext>,
    Query(query): Query<LocationQuery>,
) -> Json<VotingDayResponse> {
    let voting_day = ctx.day_resolver.resolve_voting_day(&query.location).await;

    Json(VotingDayResponse { voting_day })
}

/// Current vote state for the signed-in user
async fn vote_status(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<VoteStatusResponse>> {
    let voting_day = ctx.day_resolver.resolve_voting_day(&query.location).await;
    let status = ctx.vote_machine.status(&auth.user_id, voting_day).await?;

    Ok(Json(VoteStatusResponse::new(status, voting_day)))
}

/// Submit a vote for the signed-in user
async fn submit_vote(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    headers: HeaderMap,
    Json(submission): Json<VoteSubmission>,
) -> AppResult<Json<SubmitVoteResponse>> {
    let account = ctx.account_manager.get_account(&auth.user_id).await?;

    // The day is stamped from the submitted location, never the server's date
    let Some(voting_day) = ctx
        .day_resolver
        .resolve_voting_day(&submission.location)
        .await
    else {
        return Err(AppError::Validation(
            "Could not resolve a voting day for the location".to_string(),
        ));
    };

    let location = submission.location.clone();
    let user_agent = super::middleware::extract_user_agent(&headers);

    let status = ctx
        .vote_machine
        .submit(&account, voting_day, submission, user_agent)
        .await?;

    let summary = ctx
        .aggregator
        .compute_summary(voting_day, &location, AggregateMode::CityState)
        .await?;

    let is_top_ten = match status {
        VoteStatus::Voted { is_top_ten } => Some(is_top_ten),
        _ => None,
    };

    Ok(Json(SubmitVoteResponse {
        status: match status {
            VoteStatus::Unknown => "unknown",
            VoteStatus::NotVoted => "notVoted",
            VoteStatus::Voted { .. } => "voted",
        },
        is_top_ten,
        voting_day,
        summary,
    }))
}

/// Delete the signed-in user's vote for the day so it can be re-cast
async fn change_vote(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<ChangeVoteResponse>> {
    let Some(voting_day) = ctx.day_resolver.resolve_voting_day(&query.location).await else {
        return Err(AppError::Validation(
            "Could not resolve a voting day for the location".to_string(),
        ));
    };

    let rows_deleted = ctx.vote_machine.change(&auth.user_id, voting_day).await?;

    Ok(Json(ChangeVoteResponse { rows_deleted }))
}

/// Community vote counts for a location and day
async fn vote_summary(
    State(ctx): State<AppContext>,
    Query(query): Query<SummaryQuery>,
) -> AppResult<Json<AggregateSummary>> {
    let Some(voting_day) = ctx.day_resolver.resolve_voting_day(&query.location).await else {
        return Err(AppError::Validation(
            "Could not resolve a voting day for the location".to_string(),
        ));
    };

    let summary = ctx
        .aggregator
        .compute_summary(voting_day, &query.location, query.mode)
        .await?;

    Ok(Json(summary))
}
