/// API routes and handlers
pub mod account;
pub mod middleware;
pub mod votes;
pub mod weather;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(account::routes())
        .merge(votes::routes())
        .merge(weather::routes())
}
