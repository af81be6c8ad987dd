/// Daily vote tracking and aggregation
///
/// One yes/no vote per user per voting day. The store is the only owner of
/// vote rows; the state machine derives per-user status from it, and the
/// aggregation engine recomputes community counts from it on demand.

mod aggregate;
mod machine;
mod store;

pub use aggregate::{
    split_location, AggregateMode, AggregateSummary, Aggregator, ExactSummary, SplitSummary,
};
pub use machine::{VoteMachine, VoteStatus, VoteSubmission};
pub use store::{NewVote, VoteStore};
