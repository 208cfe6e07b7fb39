//! Export Module
//!
//! Turns a filtered slice of a user's bookmarks into a downloadable file.
//! Five formats are supported:
//!
//! | format     | extension | notes                                         |
//! |------------|-----------|-----------------------------------------------|
//! | `pdf`      | `.pdf`    | US Letter, clickable URL lines                |
//! | `markdown` | `.md`     | numbered headings separated by rules          |
//! | `csv`      | `.csv`    | BOM prefixed, every field quoted              |
//! | `json`     | `.json`   | versioned envelope                            |
//! | `html`     | `.html`   | Netscape bookmark file, first category wins   |
//!
//! The category filter is applied in the store query and the search term
//! afterwards, so the store's pinned-first, newest-first order is kept.
//! Every document is generated fully in memory before the response is sent.
//!
//! # Endpoint
//!
//! `GET /export/:format?categoryIds=3,__UNCATEGORIZED__&searchTerm=git`

mod csv;
#[cfg(test)]
mod fixtures;
mod generator;
mod handler;
mod html;
mod json;
mod markdown;
mod pdf;
mod routes;

pub use generator::*;
pub use json::{ExportEnvelope, ExportedBookmark, FORMAT_VERSION};
pub use routes::routes;
