use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::error::Error;

use crate::handler::{
    AppState, create_category, create_url, delete_category, delete_url, healthcheck, list_categories, list_urls,
    rename_category, toggle_pin, update_url,
};

pub mod api;
pub mod collate;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod export;
pub mod handler;
pub mod model;

pub fn unpack_error(err: &(dyn Error)) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}

/// Every route the service exposes, with state attached. Layers such as CORS
/// are added by the binary.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route("/urls", get(list_urls))
        .route("/urls", post(create_url))
        .route("/urls/:id", put(update_url))
        .route("/urls/:id", delete(delete_url))
        .route("/urls/:id/pin", put(toggle_pin))
        .route("/categories", get(list_categories))
        .route("/categories", post(create_category))
        .route("/categories/:id", put(rename_category))
        .route("/categories/:id", delete(delete_category))
        .merge(dashboard::routes())
        .merge(export::routes());

    Router::new()
        .route("/health", get(healthcheck))
        .nest("/api", api)
        .with_state(state)
}
