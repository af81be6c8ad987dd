/// Weather endpoints
use crate::{context::AppContext, error::AppResult, weather::CurrentConditions};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

/// Build weather routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/weather/current", get(current_weather))
}

#[derive(Debug, Deserialize)]
struct CoordinatesQuery {
    lat: f64,
    lon: f64,
}

/// Current conditions at the client's coordinates
///
/// The client sends its geolocated position; the provider API key stays on
/// the server.
async fn current_weather(
    State(ctx): State<AppContext>,
    Query(query): Query<CoordinatesQuery>,
) -> AppResult<Json<CurrentConditions>> {
    let conditions = ctx.weather.current(query.lat, query.lon).await?;

    Ok(Json(conditions))
}
