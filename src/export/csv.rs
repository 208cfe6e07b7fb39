use super::generator::{display_description, locale_date};
use crate::model::Bookmark;

const HEADER: &str = "Description,URL,Categories,Pinned,Created";
/// Lets spreadsheet applications detect UTF-8.
const BYTE_ORDER_MARK: char = '\u{feff}';

pub fn render(bookmarks: &[Bookmark]) -> String {
    let mut rows = Vec::with_capacity(bookmarks.len() + 1);
    rows.push(HEADER.to_string());

    for bookmark in bookmarks {
        let fields = [
            display_description(bookmark).to_string(),
            bookmark.url.clone(),
            bookmark.category_names().join("; "),
            if bookmark.pinned { "Yes" } else { "No" }.to_string(),
            locale_date(&bookmark.created_at),
        ];
        let row: Vec<String> = fields.iter().map(|f| quote(f)).collect();
        rows.push(row.join(","));
    }

    let mut csv = String::new();
    csv.push(BYTE_ORDER_MARK);
    csv.push_str(&rows.join("\n"));
    csv
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures::bookmark;

    #[test]
    fn embedded_quotes_are_doubled() {
        let csv = render(&[bookmark("He said \"hi\"", "https://a.io", &["Work"], false)]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("\"He said \"\"hi\"\"\","), "{row}");
    }

    #[test]
    fn rows_follow_the_header_layout() {
        let csv = render(&[
            bookmark("GitHub", "https://github.com", &[], true),
            bookmark("Docs", "https://go.dev", &["Dev", "Reference"], false),
        ]);

        assert!(csv.starts_with('\u{feff}'));
        let lines: Vec<&str> = csv.trim_start_matches('\u{feff}').lines().collect();
        assert_eq!(
            lines,
            vec![
                "Description,URL,Categories,Pinned,Created",
                "\"GitHub\",\"https://github.com\",\"\",\"Yes\",\"3/4/2024\"",
                "\"Docs\",\"https://go.dev\",\"Dev; Reference\",\"No\",\"3/4/2024\"",
            ]
        );
    }

    #[test]
    fn empty_export_is_just_the_header() {
        assert_eq!(render(&[]), format!("\u{feff}{}", HEADER));
    }
}
