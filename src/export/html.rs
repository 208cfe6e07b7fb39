use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::generator::{EXPORT_TITLE, display_description, parse_timestamp};
use crate::collate::natural_cmp;
use crate::model::Bookmark;

const PIN_ICON_SVG: &str = "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 16 16\"><path fill=\"#e53e3e\" d=\"M9.8 1.2 14.8 6.2 13.4 7.6 12.7 6.9 9.9 9.7 10.1 13 8.7 14.4 5.9 11.6 2.4 15.1 0.9 15.1 0.9 13.6 4.4 10.1 1.6 7.3 3 5.9 6.3 6.1 9.1 3.3 8.4 2.6z\"/></svg>";

/// Renders a Netscape bookmark file. Each bookmark is filed under its first
/// category only.
pub fn render(bookmarks: &[Bookmark], now: DateTime<Utc>) -> String {
    let mut folders: BTreeMap<&str, Vec<&Bookmark>> = BTreeMap::new();
    let mut loose: Vec<&Bookmark> = Vec::new();

    for bookmark in bookmarks {
        match bookmark.categories.first() {
            Some(primary) => folders.entry(primary.name.as_str()).or_default().push(bookmark),
            None => loose.push(bookmark),
        }
    }

    let mut names: Vec<&str> = folders.keys().copied().collect();
    names.sort_by(|a, b| natural_cmp(a, b));

    let mut html = String::new();
    html.push_str("<!DOCTYPE NETSCAPE-Bookmark-file-1>\n");
    html.push_str("<!-- This is an automatically generated file.\n");
    html.push_str("     It will be read and overwritten.\n");
    html.push_str("     DO NOT EDIT! -->\n");
    html.push_str("<META HTTP-EQUIV=\"Content-Type\" CONTENT=\"text/html; charset=UTF-8\">\n");
    html.push_str(&format!("<TITLE>{}</TITLE>\n", EXPORT_TITLE));
    html.push_str(&format!("<H1>{}</H1>\n", EXPORT_TITLE));
    html.push_str("<DL><p>\n");

    let exported = now.timestamp();
    for name in names {
        html.push_str(&format!(
            "    <DT><H3 ADD_DATE=\"{0}\" LAST_MODIFIED=\"{0}\">{1}</H3>\n",
            exported,
            escape_html(name)
        ));
        html.push_str("    <DL><p>\n");
        for bookmark in &folders[name] {
            html.push_str(&entry(bookmark, "        "));
        }
        html.push_str("    </DL><p>\n");
    }

    for bookmark in loose {
        html.push_str(&entry(bookmark, "    "));
    }

    html.push_str("</DL><p>\n");
    html
}

fn entry(bookmark: &Bookmark, indent: &str) -> String {
    let added = epoch_seconds(&bookmark.created_at);
    let modified = epoch_seconds(&bookmark.updated_at);
    let icon = if bookmark.pinned {
        format!(" ICON=\"data:image/svg+xml,{}\"", urlencoding::encode(PIN_ICON_SVG))
    } else {
        String::new()
    };

    format!(
        "{}<DT><A HREF=\"{}\" ADD_DATE=\"{}\" LAST_MODIFIED=\"{}\"{}>{}</A>\n",
        indent,
        escape_html(&bookmark.url),
        added,
        modified,
        icon,
        escape_html(display_description(bookmark))
    )
}

fn epoch_seconds(timestamp: &str) -> i64 {
    parse_timestamp(timestamp).map(|dt| dt.timestamp()).unwrap_or(0)
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
