use chrono::{DateTime, TimeZone, Utc};

use crate::model::{Bookmark, CategoryRef};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 15).unwrap() + chrono::Duration::milliseconds(123)
}

/// Category ids are derived from the name so the same name always maps to
/// the same id across bookmarks.
pub fn bookmark(description: &str, url: &str, categories: &[&str], pinned: bool) -> Bookmark {
    Bookmark {
        id: 1,
        user_id: "user-1".into(),
        description: description.into(),
        url: url.into(),
        pinned,
        categories: categories
            .iter()
            .map(|name| CategoryRef {
                id: name.bytes().map(i32::from).sum(),
                name: name.to_string(),
            })
            .collect(),
        created_at: "2024-03-04T12:00:00.000Z".into(),
        updated_at: "2024-03-05T08:15:00.000Z".into(),
    }
}
