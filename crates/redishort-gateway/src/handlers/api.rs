use crate::error::Result;
use crate::model::{ShortenRequest, ShortenResponse, StatsResponse};
use crate::state::{AppState, TOP_LINKS};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use redishort_shortener::ShortenOutcome;

pub async fn shorten_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<Json<ShortenResponse>> {
    let Json(request) = payload?;
    let short_url = match state.shortener().shorten(&request.url).await? {
        ShortenOutcome::Created(code) | ShortenOutcome::Existing(code) => code.to_string(),
        ShortenOutcome::AlreadyShort => ShortenResponse::ALREADY_SHORT.to_string(),
    };
    Ok(Json(ShortenResponse { short_url }))
}

pub async fn top_links_handler(State(state): State<AppState>) -> Json<Vec<String>> {
    let codes = state
        .cache()
        .top(TOP_LINKS)
        .into_iter()
        .map(|record| record.code.to_string())
        .collect();
    Json(codes)
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache();
    Json(StatsResponse {
        size: cache.len(),
        capacity: cache.capacity(),
        hit_ratio: cache.hit_ratio(),
    })
}
