use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use redishort_core::ShortCode;
use redishort_redirector::Resolution;
use tracing::trace;

pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Response> {
    // Anything that cannot be a short code is simply unknown.
    let Ok(code) = ShortCode::new(code) else {
        return Err(AppError::NotFound);
    };

    match state.redirector().resolve(&code).await? {
        Resolution::Redirect { target } => {
            Ok((StatusCode::FOUND, [(header::LOCATION, target)]).into_response())
        }
        Resolution::NotFound => {
            trace!(code = %code, "short code not found");
            Err(AppError::NotFound)
        }
    }
}
