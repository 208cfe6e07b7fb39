//! HTTP handler driving the filter engine server-side.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};

use super::{ALL_ID, CategoryKey, FilterEngine};
use crate::api::{DashboardResponse, FilterParams};
use crate::error::HandlerError;
use crate::handler::{AppState, CurrentUser, Json, Query};

pub async fn get_dashboard(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(params): Query<FilterParams>,
) -> Response {
    let selection = match parse_selection(params.category_ids.as_deref()) {
        Ok(selection) => selection,
        Err(e) => return e.into_response(),
    };

    let bookmarks = match state.db.list_bookmarks(&user_id).await {
        Ok(bookmarks) => bookmarks,
        Err(e) => return HandlerError::from_store(e, "Failed to fetch URLs").into_response(),
    };

    let mut engine = FilterEngine::new(bookmarks);
    if let Some(term) = params.search_term.as_deref() {
        engine.set_search_term(term);
    }
    if let Some(keys) = selection {
        engine.select(keys);
    }

    let view = engine.view();
    let response = DashboardResponse {
        bookmarks: view.visible.into_iter().cloned().collect(),
        available_category_ids: engine.available().to_vec(),
        selected_category_ids: engine.selected().iter().copied().collect(),
        empty_state: view.empty,
    };

    tracing::debug!(user_id = %user_id, visible = response.bookmarks.len(), "rendered dashboard");
    Json(response).into_response()
}

/// `None` keeps the full selection.
fn parse_selection(raw: Option<&str>) -> Result<Option<Vec<CategoryKey>>, HandlerError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) if raw == ALL_ID => return Ok(None),
        Some(raw) => raw,
    };

    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            CategoryKey::parse(token)
                .ok_or_else(|| HandlerError::Validation(format!("Invalid category id: {}", token)))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}
