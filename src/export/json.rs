use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::generator::iso_timestamp;
use crate::error::ExportError;
use crate::model::Bookmark;

pub const FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    pub version: String,
    pub exported_at: String,
    pub total: usize,
    pub bookmarks: Vec<ExportedBookmark>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedBookmark {
    pub description: String,
    pub url: String,
    pub categories: Vec<String>,
    pub pinned: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Bookmark> for ExportedBookmark {
    fn from(bookmark: &Bookmark) -> Self {
        ExportedBookmark {
            description: bookmark.description.clone(),
            url: bookmark.url.clone(),
            categories: bookmark.categories.iter().map(|c| c.name.clone()).collect(),
            pinned: bookmark.pinned,
            created_at: bookmark.created_at.clone(),
            updated_at: bookmark.updated_at.clone(),
        }
    }
}

pub fn render(bookmarks: &[Bookmark], now: DateTime<Utc>) -> Result<Vec<u8>, ExportError> {
    let envelope = ExportEnvelope {
        version: FORMAT_VERSION.to_string(),
        exported_at: iso_timestamp(now),
        total: bookmarks.len(),
        bookmarks: bookmarks.iter().map(ExportedBookmark::from).collect(),
    };

    serde_json::to_vec_pretty(&envelope).map_err(|e| ExportError::Render {
        format: "json",
        message: e.to_string(),
    })
}
