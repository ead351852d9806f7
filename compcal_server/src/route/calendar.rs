use axum::{
    extract::{Path, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use compcal_core::{calendar::emit, Error};
use tracing::{error, warn};

use crate::AppState;

static CONTENT_TYPE_CALENDAR: &str = "text/calendar; charset=utf-8";

/// Wrap a rendered calendar into the response.
pub fn calendar_response(ics: String) -> Response {
    (StatusCode::OK, [(CONTENT_TYPE, CONTENT_TYPE_CALENDAR)], ics).into_response()
}

/// Store failures are the upstream's fault, broken records are ours.
fn status_code(err: &Error) -> StatusCode {
    if err.is_store_failure() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

pub async fn handle(state: &AppState, path: Option<&str>) -> Result<Response, (StatusCode, String)> {
    let ical_calendar = compcal_core::get(state.store.as_ref(), &state.config, path)
        .await
        .map_err(|err| {
            let status = status_code(&err);
            if err.is_store_failure() {
                error!(%err, "competition store unavailable");
            } else {
                warn!(%err, "competition calendar could not be rendered");
            }
            (status, err.to_string())
        })?;
    Ok(calendar_response(emit::generate(&ical_calendar)))
}

/// Handle calendar requests without selectors, which cover the default region.
pub async fn handler(State(state): State<AppState>) -> Result<Response, (StatusCode, String)> {
    handle(&state, None).await
}

/// Handle calendar requests for `/calendar/<selectors>`.
pub async fn selectors_handler(
    State(state): State<AppState>,
    Path(selectors): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    handle(&state, Some(&selectors)).await
}
