use serde::{Deserialize, Serialize};

use crate::error::HandlerError;

pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const CATEGORY_NAME_MAX_CHARS: usize = 100;
pub const MAX_CATEGORIES_PER_BOOKMARK: usize = 50;

/// A category reference resolved to its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: i32,
    pub user_id: String,
    pub description: String,
    pub url: String,
    pub pinned: bool,
    /// Ordered as the user supplied them; the first entry is the primary category.
    pub categories: Vec<CategoryRef>,
    pub created_at: String,
    pub updated_at: String,
}

impl Bookmark {
    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i32,
    pub user_id: String,
    pub name: String,
    pub normalized_name: String,
    pub is_default: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub fn normalize_category_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookmarkInput {
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub categories: Vec<i32>,
}

/// A bookmark payload that passed field validation. Category ownership is
/// checked by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidBookmark {
    pub description: String,
    pub url: String,
    pub category_ids: Vec<i32>,
}

impl BookmarkInput {
    pub fn validate(self) -> Result<ValidBookmark, HandlerError> {
        let description = self.description.trim();
        let len = description.chars().count();
        if len == 0 || len > DESCRIPTION_MAX_CHARS {
            return Err(HandlerError::Validation(format!(
                "Description is required and must be between 1 and {} characters",
                DESCRIPTION_MAX_CHARS
            )));
        }

        let url = self.url.trim();
        if url::Url::parse(url).is_err() {
            return Err(HandlerError::Validation("A valid URL is required".to_string()));
        }

        if self.categories.len() > MAX_CATEGORIES_PER_BOOKMARK {
            return Err(HandlerError::Validation(format!(
                "A bookmark can have at most {} categories",
                MAX_CATEGORIES_PER_BOOKMARK
            )));
        }

        let mut category_ids: Vec<i32> = Vec::with_capacity(self.categories.len());
        for id in self.categories {
            if !category_ids.contains(&id) {
                category_ids.push(id);
            }
        }

        Ok(ValidBookmark {
            description: description.to_string(),
            url: url.to_string(),
            category_ids,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
}

impl CategoryInput {
    pub fn validate(self) -> Result<String, HandlerError> {
        let name = self.name.trim();
        let len = name.chars().count();
        if len == 0 || len > CATEGORY_NAME_MAX_CHARS {
            return Err(HandlerError::Validation(format!(
                "Category name is required and must be between 1 and {} characters",
                CATEGORY_NAME_MAX_CHARS
            )));
        }
        Ok(name.to_string())
    }
}
