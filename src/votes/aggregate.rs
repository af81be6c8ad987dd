/// Vote aggregation engine
///
/// Recomputes community vote counts from the day's stored rows on demand.
/// Two scopes: an exact match on the full location string, or a split into
/// city- and state-level buckets parsed out of `"City, Region"`. Counting is
/// a pure function of the fetched rows, so identical inputs always produce
/// identical summaries.
use crate::{
    db::votes::VoteRecord,
    error::{AppError, AppResult},
    votes::VoteStore,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Aggregation scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateMode {
    /// Count only rows whose location matches the caller's exactly
    Exact,
    /// Bucket the whole day into city and state counts
    #[serde(rename = "split")]
    CityState,
}

/// Counts for one exact (day, location) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactSummary {
    pub yes_votes: u64,
    pub no_votes: u64,
    pub total_votes: u64,
}

/// City- and state-scoped counts for one day
///
/// Every city-scoped vote also counts toward its state, so the state totals
/// are always a superset of the city totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitSummary {
    pub yes_votes_city: u64,
    pub no_votes_city: u64,
    pub total_votes_city: u64,
    pub yes_votes_state: u64,
    pub no_votes_state: u64,
    pub total_votes_state: u64,
}

/// Aggregated counts in either scope
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AggregateSummary {
    Exact(ExactSummary),
    Split(SplitSummary),
}

/// Split `"City, Region"` on the first comma, trimming both parts.
///
/// Returns `None` when either part is missing or empty.
pub fn split_location(location: &str) -> Option<(&str, &str)> {
    let (city, region) = location.split_once(',')?;
    let city = city.trim();
    let region = region.trim();
    if city.is_empty() || region.is_empty() {
        return None;
    }
    Some((city, region))
}

/// Aggregation engine service
pub struct Aggregator {
    store: Arc<VoteStore>,
}

impl Aggregator {
    /// Create a new aggregator
    pub fn new(store: Arc<VoteStore>) -> Self {
        Self { store }
    }

    /// Recompute the summary for a voting day and location.
    ///
    /// Inputs are the voting day, the location, and the stored vote rows;
    /// orchestration re-invokes this whenever any of them changes. The full
    /// scan is O(n) over the day's votes, which stays cheap at daily-vote
    /// volume.
    pub async fn compute_summary(
        &self,
        voting_day: NaiveDate,
        location: &str,
        mode: AggregateMode,
    ) -> AppResult<AggregateSummary> {
        match mode {
            AggregateMode::Exact => {
                let rows = self.store.scan_by_day(voting_day, Some(location)).await?;
                Ok(AggregateSummary::Exact(count_exact(&rows)))
            }
            AggregateMode::CityState => {
                let Some((city, region)) = split_location(location) else {
                    return Err(AppError::Validation(
                        "Location must be of the form \"City, Region\"".to_string(),
                    ));
                };
                let rows = self.store.scan_by_day(voting_day, None).await?;
                Ok(AggregateSummary::Split(count_split(&rows, city, region)))
            }
        }
    }
}

fn count_exact(rows: &[VoteRecord]) -> ExactSummary {
    let mut summary = ExactSummary::default();
    for row in rows {
        summary.total_votes += 1;
        if row.is_top_ten {
            summary.yes_votes += 1;
        } else {
            summary.no_votes += 1;
        }
    }
    summary
}

fn count_split(rows: &[VoteRecord], city: &str, region: &str) -> SplitSummary {
    let mut summary = SplitSummary::default();
    for row in rows {
        let Some((row_city, row_region)) = split_location(&row.location) else {
            tracing::warn!(location = %row.location, "skipping vote with unsplittable location");
            continue;
        };

        if row_region != region {
            continue;
        }
        summary.total_votes_state += 1;
        if row.is_top_ten {
            summary.yes_votes_state += 1;
        } else {
            summary.no_votes_state += 1;
        }

        if row_city == city {
            summary.total_votes_city += 1;
            if row.is_top_ten {
                summary.yes_votes_city += 1;
            } else {
                summary.no_votes_city += 1;
            }
        }
    }
    summary
}
