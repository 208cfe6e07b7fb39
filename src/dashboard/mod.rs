//! Dashboard Module
//!
//! The dashboard shows a user's bookmarks narrowed by a free-text search and
//! a set of category checkboxes. [`FilterEngine`] owns that state for one
//! session and recomputes the visible subset after every change, handing the
//! result to a render callback.
//!
//! # Usage
//!
//! ```rust,ignore
//! use weblauncher::dashboard::{FilterEngine, FilterId};
//!
//! let mut engine = FilterEngine::new(bookmarks);
//! engine.on_render(|view| redraw(view));
//! engine.set_search_term("git");
//! engine.toggle_category(FilterId::All);
//! ```
//!
//! The same engine backs `GET /dashboard` for clients that would rather have
//! the server apply the filters.

mod filter;
mod handler;
mod routes;

pub use filter::*;
pub use routes::routes;
