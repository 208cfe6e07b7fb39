use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

use tracing::info;

use crate::api::HealthResponse;
use crate::db::Database;
use crate::error::HandlerError;
use crate::model::{BookmarkInput, CategoryInput};

/// Header carrying the id of the user authenticated upstream.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

/// The authenticated user owning every record a request touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = HandlerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| CurrentUser(value.to_string()))
            .ok_or(HandlerError::Unauthenticated)
    }
}

/// `axum::Json` whose rejections use the JSON error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(HandlerError))]
pub struct Json<T>(pub T);

impl<T: serde::Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(HandlerError))]
pub struct Path<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(HandlerError))]
pub struct Query<T>(pub T);

pub async fn healthcheck() -> impl IntoResponse {
    info!("got healthcheck request");
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

// ============================================================================
// Bookmarks
// ============================================================================

pub async fn list_urls(State(state): State<AppState>, CurrentUser(user_id): CurrentUser) -> Response {
    match state.db.list_bookmarks(&user_id).await {
        Ok(bookmarks) => (StatusCode::OK, Json(bookmarks)).into_response(),
        Err(e) => HandlerError::from_store(e, "Failed to fetch URLs").into_response(),
    }
}

pub async fn create_url(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<BookmarkInput>,
) -> Response {
    let input = match payload.validate() {
        Ok(input) => input,
        Err(e) => return e.into_response(),
    };

    match state.db.create_bookmark(&user_id, &input).await {
        Ok(bookmark) => {
            info!(user_id = %user_id, bookmark_id = bookmark.id, "created bookmark");
            (StatusCode::CREATED, Json(bookmark)).into_response()
        }
        Err(e) => HandlerError::from_store(e, "Failed to create URL").into_response(),
    }
}

pub async fn update_url(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<BookmarkInput>,
) -> Response {
    let input = match payload.validate() {
        Ok(input) => input,
        Err(e) => return e.into_response(),
    };

    match state.db.update_bookmark(&user_id, id, &input).await {
        Ok(Some(bookmark)) => (StatusCode::OK, Json(bookmark)).into_response(),
        Ok(None) => url_not_found("edit").into_response(),
        Err(e) => HandlerError::from_store(e, "Failed to update URL").into_response(),
    }
}

pub async fn toggle_pin(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i32>,
) -> Response {
    match state.db.toggle_pin(&user_id, id).await {
        Ok(Some(bookmark)) => (StatusCode::OK, Json(bookmark)).into_response(),
        Ok(None) => url_not_found("edit").into_response(),
        Err(e) => HandlerError::from_store(e, "Failed to update pin status").into_response(),
    }
}

pub async fn delete_url(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i32>,
) -> Response {
    match state.db.delete_bookmark(&user_id, id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => url_not_found("delete").into_response(),
        Err(e) => HandlerError::from_store(e, "Failed to delete URL").into_response(),
    }
}

fn url_not_found(action: &str) -> HandlerError {
    HandlerError::NotFound(format!("URL not found or you do not have permission to {} it", action))
}

// ============================================================================
// Categories
// ============================================================================

pub async fn list_categories(State(state): State<AppState>, CurrentUser(user_id): CurrentUser) -> Response {
    match state.db.list_categories(&user_id).await {
        Ok(categories) => (StatusCode::OK, Json(categories)).into_response(),
        Err(e) => HandlerError::from_store(e, "Failed to fetch categories").into_response(),
    }
}

pub async fn create_category(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<CategoryInput>,
) -> Response {
    let name = match payload.validate() {
        Ok(name) => name,
        Err(e) => return e.into_response(),
    };

    match state.db.create_category(&user_id, &name).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => HandlerError::from_store(e, "Failed to create category").into_response(),
    }
}

pub async fn rename_category(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<CategoryInput>,
) -> Response {
    let name = match payload.validate() {
        Ok(name) => name,
        Err(e) => return e.into_response(),
    };

    match state.db.rename_category(&user_id, id, &name).await {
        Ok(Some(category)) => (StatusCode::OK, Json(category)).into_response(),
        Ok(None) => category_not_found("edit").into_response(),
        Err(e) => HandlerError::from_store(e, "Failed to update category").into_response(),
    }
}

pub async fn delete_category(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i32>,
) -> Response {
    match state.db.delete_category(&user_id, id).await {
        Ok(true) => {
            info!(user_id = %user_id, category_id = id, "deleted category");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => category_not_found("delete").into_response(),
        Err(e) => HandlerError::from_store(e, "Failed to delete category").into_response(),
    }
}

fn category_not_found(action: &str) -> HandlerError {
    HandlerError::NotFound(format!(
        "Category not found or you do not have permission to {} it",
        action
    ))
}
