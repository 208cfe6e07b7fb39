use chrono::{DateTime, Utc};

use super::generator::{EXPORT_TITLE, NOTHING_TO_EXPORT, display_description, locale_date, locale_date_time};
use crate::model::Bookmark;

pub fn render(bookmarks: &[Bookmark], now: DateTime<Utc>) -> String {
    let mut md = format!("# {}\n\n", EXPORT_TITLE);
    md.push_str(&format!("**Exported:** {}\n\n", locale_date_time(now)));
    md.push_str(&format!("**Total URLs:** {}\n\n", bookmarks.len()));
    md.push_str("---\n\n");

    if bookmarks.is_empty() {
        md.push_str(&format!("*{}*\n", NOTHING_TO_EXPORT));
        return md;
    }

    for (index, bookmark) in bookmarks.iter().enumerate() {
        md.push_str(&format!("## {}. {}\n\n", index + 1, display_description(bookmark)));
        md.push_str(&format!("**URL:** [{0}]({0})\n\n", bookmark.url));

        if !bookmark.categories.is_empty() {
            md.push_str(&format!("**Categories:** {}\n\n", bookmark.category_names().join(", ")));
        }
        if bookmark.pinned {
            md.push_str("**Status:** 📌 Pinned\n\n");
        }

        md.push_str(&format!("**Created:** {}\n\n", locale_date(&bookmark.created_at)));
        md.push_str("---\n\n");
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures::{bookmark, now};

    #[test]
    fn numbers_entries_and_includes_optional_lines() {
        let md = render(
            &[
                bookmark("GitHub", "https://github.com", &[], true),
                bookmark("Docs", "https://go.dev", &["Dev", "Go"], false),
            ],
            now(),
        );

        assert!(md.starts_with("# WebLauncher Export\n\n**Exported:** 5/1/2024, 9:30:15 AM\n\n**Total URLs:** 2\n\n---\n\n"));
        assert!(md.contains("## 1. GitHub\n\n**URL:** [https://github.com](https://github.com)\n\n**Status:** 📌 Pinned\n\n**Created:** 3/4/2024\n\n---\n\n"));
        assert!(md.contains("## 2. Docs\n\n**URL:** [https://go.dev](https://go.dev)\n\n**Categories:** Dev, Go\n\n**Created:** 3/4/2024\n\n---\n\n"));
        assert_eq!(md.matches("**Status:**").count(), 1);
    }

    #[test]
    fn empty_export_has_a_notice() {
        let md = render(&[], now());
        assert!(md.contains("**Total URLs:** 0"));
        assert!(md.ends_with("*No URLs to export.*\n"));
    }
}
