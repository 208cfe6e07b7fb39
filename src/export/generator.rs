use std::str::FromStr;

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};

use super::{csv, html, json, markdown, pdf};
use crate::api::FilterParams;
use crate::dashboard::{ALL_ID, UNCATEGORIZED_ID, matches_search, normalize_search_term};
use crate::db::{CategoryScope, Database};
use crate::error::ExportError;
use crate::model::Bookmark;

pub const SUPPORTED_FORMATS: [&str; 5] = ["pdf", "markdown", "csv", "json", "html"];

pub(crate) const EXPORT_TITLE: &str = "WebLauncher Export";
pub(crate) const UNTITLED: &str = "Untitled";
pub(crate) const NOTHING_TO_EXPORT: &str = "No URLs to export.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Markdown,
    Csv,
    Json,
    Html,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Markdown => "markdown",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Html => "html",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            other => other.as_str(),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Markdown => "text/markdown; charset=utf-8",
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json; charset=utf-8",
            ExportFormat::Html => "text/html; charset=utf-8",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "markdown" => Ok(ExportFormat::Markdown),
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "html" => Ok(ExportFormat::Html),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// A validated export request. Building one touches no storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub scope: CategoryScope,
    /// Normalized; `None` when absent or blank.
    pub search_term: Option<String>,
}

impl ExportRequest {
    pub fn parse(format: &str, params: &FilterParams) -> Result<Self, ExportError> {
        let format = format.parse::<ExportFormat>()?;
        let scope = parse_category_scope(params.category_ids.as_deref())?;
        let search_term = params
            .search_term
            .as_deref()
            .map(normalize_search_term)
            .filter(|term| !term.is_empty());

        Ok(ExportRequest {
            format,
            scope,
            search_term,
        })
    }
}

/// Parses the `categoryIds` query value: absent, blank or `all` means no
/// filtering; otherwise a comma list of ids, optionally with the
/// uncategorized sentinel.
pub fn parse_category_scope(raw: Option<&str>) -> Result<CategoryScope, ExportError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(CategoryScope::All),
        Some(raw) if raw == ALL_ID => return Ok(CategoryScope::All),
        Some(raw) => raw,
    };

    let mut ids: Vec<i32> = Vec::new();
    let mut uncategorized = false;

    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if token == UNCATEGORIZED_ID {
            uncategorized = true;
            continue;
        }
        let id = token
            .parse::<i32>()
            .map_err(|_| ExportError::InvalidCategoryId(token.to_string()))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    if ids.is_empty() && !uncategorized {
        return Ok(CategoryScope::All);
    }
    Ok(CategoryScope::Matching { ids, uncategorized })
}

/// A fully generated export, ready to be sent as an attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDocument {
    pub format: ExportFormat,
    pub filename: String,
    /// Number of bookmarks rendered into `body`.
    pub count: usize,
    pub body: Vec<u8>,
}

impl IntoResponse for ExportDocument {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, self.format.content_type().to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", self.filename),
                ),
            ],
            self.body,
        )
            .into_response()
    }
}

/// `weblauncher-export-2024-05-01T09-30-15.pdf` for an export made at
/// 2024-05-01T09:30:15.123Z.
pub fn export_filename(format: ExportFormat, now: DateTime<Utc>) -> String {
    format!(
        "weblauncher-export-{}.{}",
        now.format("%Y-%m-%dT%H-%M-%S"),
        format.extension()
    )
}

/// Loads the bookmarks selected by `request` and renders them.
pub async fn export(
    db: &Database,
    user_id: &str,
    request: &ExportRequest,
    now: DateTime<Utc>,
) -> Result<ExportDocument, ExportError> {
    let mut bookmarks = db.find_bookmarks(user_id, &request.scope).await?;

    if let Some(term) = &request.search_term {
        bookmarks.retain(|bookmark| matches_search(bookmark, term));
    }

    render(request.format, &bookmarks, now)
}

/// Renders `bookmarks` completely in memory.
pub fn render(format: ExportFormat, bookmarks: &[Bookmark], now: DateTime<Utc>) -> Result<ExportDocument, ExportError> {
    let body = match format {
        ExportFormat::Pdf => pdf::render(bookmarks, now)?,
        ExportFormat::Markdown => markdown::render(bookmarks, now).into_bytes(),
        ExportFormat::Csv => csv::render(bookmarks).into_bytes(),
        ExportFormat::Json => json::render(bookmarks, now)?,
        ExportFormat::Html => html::render(bookmarks, now).into_bytes(),
    };

    Ok(ExportDocument {
        format,
        filename: export_filename(format, now),
        count: bookmarks.len(),
        body,
    })
}

pub(crate) fn display_description(bookmark: &Bookmark) -> &str {
    if bookmark.description.trim().is_empty() {
        UNTITLED
    } else {
        &bookmark.description
    }
}

pub(crate) fn parse_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `5/1/2024`; unparseable input is returned as is.
pub(crate) fn locale_date(timestamp: &str) -> String {
    match parse_timestamp(timestamp) {
        Some(dt) => dt.format("%-m/%-d/%Y").to_string(),
        None => timestamp.to_string(),
    }
}

/// `5/1/2024, 9:30:15 AM`
pub(crate) fn locale_date_time(dt: DateTime<Utc>) -> String {
    dt.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

pub(crate) fn iso_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 15).unwrap() + chrono::Duration::milliseconds(123)
    }

    #[test]
    fn filename_replaces_separators_and_drops_fraction() {
        assert_eq!(
            export_filename(ExportFormat::Pdf, at()),
            "weblauncher-export-2024-05-01T09-30-15.pdf"
        );
        assert_eq!(
            export_filename(ExportFormat::Markdown, at()),
            "weblauncher-export-2024-05-01T09-30-15.md"
        );
    }

    #[test]
    fn formats_parse_and_reject() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("HTML".parse::<ExportFormat>().unwrap(), ExportFormat::Html);
        assert!(matches!(
            "docx".parse::<ExportFormat>(),
            Err(ExportError::UnsupportedFormat(f)) if f == "docx"
        ));
    }

    #[test]
    fn category_scope_parsing() {
        assert_eq!(parse_category_scope(None).unwrap(), CategoryScope::All);
        assert_eq!(parse_category_scope(Some("all")).unwrap(), CategoryScope::All);
        assert_eq!(parse_category_scope(Some(" , ")).unwrap(), CategoryScope::All);
        assert_eq!(
            parse_category_scope(Some("3,5,3")).unwrap(),
            CategoryScope::Matching {
                ids: vec![3, 5],
                uncategorized: false
            }
        );
        assert_eq!(
            parse_category_scope(Some("__UNCATEGORIZED__")).unwrap(),
            CategoryScope::Matching {
                ids: vec![],
                uncategorized: true
            }
        );
        assert!(matches!(
            parse_category_scope(Some("3,x")),
            Err(ExportError::InvalidCategoryId(id)) if id == "x"
        ));
    }

    #[test]
    fn format_is_validated_before_categories() {
        let params = FilterParams {
            category_ids: Some("not-a-number".into()),
            search_term: None,
        };
        assert!(matches!(
            ExportRequest::parse("docx", &params),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn blank_search_terms_are_dropped() {
        let params = FilterParams {
            category_ids: None,
            search_term: Some("   ".into()),
        };
        let request = ExportRequest::parse("json", &params).unwrap();
        assert_eq!(request.search_term, None);

        let params = FilterParams {
            category_ids: None,
            search_term: Some(" GitHub ".into()),
        };
        let request = ExportRequest::parse("json", &params).unwrap();
        assert_eq!(request.search_term.as_deref(), Some("github"));
    }

    #[test]
    fn dates_render_in_us_locale_shape() {
        assert_eq!(locale_date("2024-01-09T17:03:00.000Z"), "1/9/2024");
        assert_eq!(locale_date("garbage"), "garbage");
        assert_eq!(locale_date_time(at()), "5/1/2024, 9:30:15 AM");
        assert_eq!(iso_timestamp(at()), "2024-05-01T09:30:15.123Z");
    }
}
