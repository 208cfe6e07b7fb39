use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::info;

use super::{ExportRequest, export};
use crate::api::FilterParams;
use crate::error::HandlerError;
use crate::handler::{AppState, CurrentUser, Path, Query};

pub async fn export_urls(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(format): Path<String>,
    Query(params): Query<FilterParams>,
) -> Response {
    // reject bad formats and category ids before touching the store
    let request = match ExportRequest::parse(&format, &params) {
        Ok(request) => request,
        Err(e) => return HandlerError::from(e).into_response(),
    };

    match export(&state.db, &user_id, &request, chrono::Utc::now()).await {
        Ok(document) => {
            info!(
                user_id = %user_id,
                format = request.format.as_str(),
                count = document.count,
                bytes = document.body.len(),
                filename = %document.filename,
                "generated export"
            );
            document.into_response()
        }
        Err(e) => HandlerError::from(e).into_response(),
    }
}
