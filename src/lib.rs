//! TopTen Weather - community weather voting service
//!
//! Users authenticate, fetch current conditions for their position, and cast
//! one yes/no vote per day on whether the weather qualifies as a "top ten"
//! day. Votes are scoped to the calendar date in the voter's local timezone,
//! and community counts are aggregated per location or split into city/state
//! buckets. A background job reminds users who have not voted yet.

pub mod account;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod jobs;
pub mod location;
pub mod mailer;
pub mod server;
pub mod votes;
pub mod weather;
