use serde::{Deserialize, Serialize};

use crate::dashboard::{CategoryKey, EmptyState};
use crate::model::Bookmark;

/// Query string shared by the dashboard view and the export endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    /// Comma separated category ids and/or `__UNCATEGORIZED__`, or `all`.
    pub category_ids: Option<String>,
    pub search_term: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub bookmarks: Vec<Bookmark>,
    pub available_category_ids: Vec<CategoryKey>,
    pub selected_category_ids: Vec<CategoryKey>,
    pub empty_state: Option<EmptyState>,
}
