use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::collate::natural_cmp;
use crate::model::Bookmark;

/// Pseudo-id of the "select everything" checkbox.
pub const ALL_ID: &str = "all";
/// Filter id standing for "bookmarks with no categories".
pub const UNCATEGORIZED_ID: &str = "__UNCATEGORIZED__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CategoryKey {
    Category(i32),
    Uncategorized,
}

impl CategoryKey {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw == UNCATEGORIZED_ID {
            return Some(CategoryKey::Uncategorized);
        }
        raw.parse::<i32>().ok().map(CategoryKey::Category)
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryKey::Category(id) => write!(f, "{}", id),
            CategoryKey::Uncategorized => f.write_str(UNCATEGORIZED_ID),
        }
    }
}

impl Serialize for CategoryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Anything a category checkbox can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterId {
    All,
    Key(CategoryKey),
}

impl FromStr for FilterId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == ALL_ID {
            return Ok(FilterId::All);
        }
        CategoryKey::parse(s)
            .map(FilterId::Key)
            .ok_or_else(|| format!("Invalid category id: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EmptyState {
    /// The user has not saved anything yet.
    NoBookmarks,
    /// Bookmarks exist but the search and category filters exclude all of them.
    NoMatches,
}

#[derive(Debug, Clone, PartialEq)]
pub struct View<'a> {
    pub visible: Vec<&'a Bookmark>,
    pub empty: Option<EmptyState>,
}

/// Lowercases and trims a raw search box value.
pub fn normalize_search_term(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// `term` must already be normalized. An empty term matches everything.
pub fn matches_search(bookmark: &Bookmark, term: &str) -> bool {
    term.is_empty()
        || bookmark.description.to_lowercase().contains(term)
        || bookmark.url.to_lowercase().contains(term)
}

type RenderFn = Box<dyn FnMut(&View<'_>) + Send>;

/// Dashboard filter state for one session.
///
/// Holds the bookmark list, the search term and the category selection, and
/// recomputes the visible subset after every mutation. "No filter" is a full
/// selection; the selection is never left empty.
pub struct FilterEngine {
    bookmarks: Vec<Bookmark>,
    search_term: String,
    selected: BTreeSet<CategoryKey>,
    available: Vec<CategoryKey>,
    visible: Vec<usize>,
    renderer: Option<RenderFn>,
}

impl FilterEngine {
    pub fn new(bookmarks: Vec<Bookmark>) -> Self {
        let available = available_keys(&bookmarks);
        let mut engine = FilterEngine {
            bookmarks,
            search_term: String::new(),
            selected: available.iter().copied().collect(),
            available,
            visible: Vec::new(),
            renderer: None,
        };
        engine.recompute();
        engine
    }

    /// Installs the render callback and immediately renders the current view.
    pub fn on_render(&mut self, render: impl FnMut(&View<'_>) + Send + 'static) {
        self.renderer = Some(Box::new(render));
        self.recompute();
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn selected(&self) -> &BTreeSet<CategoryKey> {
        &self.selected
    }

    pub fn available(&self) -> &[CategoryKey] {
        &self.available
    }

    pub fn is_all_selected(&self) -> bool {
        self.available.iter().all(|key| self.selected.contains(key))
    }

    /// Replaces the bookmark list after a store refresh. A full selection
    /// stays full; a partial one keeps the keys that still exist.
    pub fn set_bookmarks(&mut self, bookmarks: Vec<Bookmark>) {
        let was_full = self.is_all_selected();
        self.bookmarks = bookmarks;
        self.available = available_keys(&self.bookmarks);

        if was_full {
            self.select_all();
        } else {
            let available = &self.available;
            self.selected.retain(|key| available.contains(key));
            if self.selected.is_empty() {
                self.select_all();
            }
        }
        self.recompute();
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.search_term = normalize_search_term(term);
        self.recompute();
    }

    /// Flips one checkbox and returns whether it ends up checked.
    ///
    /// `All` always forces a full selection and can never be unchecked.
    /// Unchecking the last selected category also falls back to a full
    /// selection. Ids absent from [`available`](Self::available) are ignored.
    pub fn toggle_category(&mut self, id: FilterId) -> bool {
        let checked = match id {
            FilterId::All => {
                self.select_all();
                true
            }
            FilterId::Key(key) if !self.available.contains(&key) => false,
            FilterId::Key(key) => {
                if !self.selected.remove(&key) {
                    self.selected.insert(key);
                }
                if self.selected.is_empty() {
                    self.select_all();
                }
                self.selected.contains(&key)
            }
        };
        self.recompute();
        checked
    }

    /// Replaces the selection with `keys`, keeping only available ones. An
    /// empty result means a full selection.
    pub fn select(&mut self, keys: impl IntoIterator<Item = CategoryKey>) {
        let available = &self.available;
        let selected: BTreeSet<CategoryKey> = keys.into_iter().filter(|key| available.contains(key)).collect();

        if selected.is_empty() {
            self.select_all();
        } else {
            self.selected = selected;
        }
        self.recompute();
    }

    pub fn recompute(&mut self) {
        self.visible = self
            .bookmarks
            .iter()
            .enumerate()
            .filter(|(_, b)| matches_search(b, &self.search_term) && self.matches_category(b))
            .map(|(i, _)| i)
            .collect();

        if let Some(render) = self.renderer.as_mut() {
            render(&build_view(&self.bookmarks, &self.visible));
        }
    }

    pub fn view(&self) -> View<'_> {
        build_view(&self.bookmarks, &self.visible)
    }

    pub fn visible(&self) -> Vec<&Bookmark> {
        self.visible.iter().map(|&i| &self.bookmarks[i]).collect()
    }

    pub fn matches_category(&self, bookmark: &Bookmark) -> bool {
        if self.available.is_empty() || self.selected.is_empty() {
            return true;
        }
        if bookmark.categories.is_empty() {
            return self.selected.contains(&CategoryKey::Uncategorized);
        }
        bookmark
            .categories
            .iter()
            .any(|c| self.selected.contains(&CategoryKey::Category(c.id)))
    }

    fn select_all(&mut self) {
        self.selected = self.available.iter().copied().collect();
    }
}

fn build_view<'a>(bookmarks: &'a [Bookmark], visible: &[usize]) -> View<'a> {
    let empty = if bookmarks.is_empty() {
        Some(EmptyState::NoBookmarks)
    } else if visible.is_empty() {
        Some(EmptyState::NoMatches)
    } else {
        None
    };

    View {
        visible: visible.iter().map(|&i| &bookmarks[i]).collect(),
        empty,
    }
}

/// Categories present on at least one bookmark, in name order, then the
/// uncategorized key when some bookmark has none.
fn available_keys(bookmarks: &[Bookmark]) -> Vec<CategoryKey> {
    let mut names: BTreeMap<i32, &str> = BTreeMap::new();
    let mut has_uncategorized = false;

    for bookmark in bookmarks {
        if bookmark.categories.is_empty() {
            has_uncategorized = true;
        }
        for category in &bookmark.categories {
            names.entry(category.id).or_insert(category.name.as_str());
        }
    }

    let mut entries: Vec<(i32, &str)> = names.into_iter().collect();
    entries.sort_by(|a, b| natural_cmp(a.1, b.1).then(a.0.cmp(&b.0)));

    let mut keys: Vec<CategoryKey> = entries.into_iter().map(|(id, _)| CategoryKey::Category(id)).collect();
    if has_uncategorized {
        keys.push(CategoryKey::Uncategorized);
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CategoryRef;
    use std::sync::{Arc, Mutex};

    const DEV: i32 = 7;
    const WORK: i32 = 3;

    fn bookmark(id: i32, description: &str, url: &str, categories: &[(i32, &str)], pinned: bool) -> Bookmark {
        Bookmark {
            id,
            user_id: "u1".to_string(),
            description: description.to_string(),
            url: url.to_string(),
            pinned,
            categories: categories
                .iter()
                .map(|(id, name)| CategoryRef {
                    id: *id,
                    name: name.to_string(),
                })
                .collect(),
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
            updated_at: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn sample() -> Vec<Bookmark> {
        vec![
            bookmark(1, "GitHub", "https://github.com", &[], true),
            bookmark(2, "Docs", "https://go.dev", &[(DEV, "Dev")], false),
        ]
    }

    fn descriptions(engine: &FilterEngine) -> Vec<&str> {
        engine.visible().iter().map(|b| b.description.as_str()).collect()
    }

    #[test]
    fn search_and_category_scenario() {
        let mut engine = FilterEngine::new(sample());
        assert_eq!(descriptions(&engine), vec!["GitHub", "Docs"]);

        engine.set_search_term("git");
        assert_eq!(descriptions(&engine), vec!["GitHub"]);

        engine.set_search_term("");
        engine.select([CategoryKey::Category(DEV)]);
        assert_eq!(descriptions(&engine), vec!["Docs"]);
    }

    #[test]
    fn search_is_trimmed_and_case_insensitive_over_description_and_url() {
        let mut engine = FilterEngine::new(sample());
        engine.set_search_term("  GO.DEV ");
        assert_eq!(engine.search_term(), "go.dev");
        assert_eq!(descriptions(&engine), vec!["Docs"]);

        engine.set_search_term("HUB");
        assert_eq!(descriptions(&engine), vec!["GitHub"]);
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut engine = FilterEngine::new(sample());
        engine.set_search_term("o");
        engine.toggle_category(FilterId::Key(CategoryKey::Uncategorized));
        let first: Vec<i32> = engine.visible().iter().map(|b| b.id).collect();
        engine.recompute();
        let second: Vec<i32> = engine.visible().iter().map(|b| b.id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn uncategorized_bookmarks_follow_the_sentinel() {
        let bookmarks = sample();
        let github = &bookmarks[0];
        let mut engine = FilterEngine::new(bookmarks.clone());

        assert!(engine.selected().contains(&CategoryKey::Uncategorized));
        assert!(engine.matches_category(github));

        let checked = engine.toggle_category(FilterId::Key(CategoryKey::Uncategorized));
        assert!(!checked);
        assert!(!engine.matches_category(github));

        engine.toggle_category(FilterId::Key(CategoryKey::Uncategorized));
        assert!(engine.matches_category(github));
    }

    #[test]
    fn unchecking_the_last_category_restores_full_selection() {
        let mut engine = FilterEngine::new(sample());
        engine.toggle_category(FilterId::Key(CategoryKey::Uncategorized));
        assert_eq!(engine.selected().len(), 1);

        let checked = engine.toggle_category(FilterId::Key(CategoryKey::Category(DEV)));
        assert!(checked, "falls back to everything, including the toggled key");
        assert!(engine.is_all_selected());
        assert!(!engine.selected().is_empty());
        assert_eq!(descriptions(&engine), vec!["GitHub", "Docs"]);
    }

    #[test]
    fn all_pseudo_id_cannot_be_unchecked() {
        let mut engine = FilterEngine::new(sample());
        assert!(engine.toggle_category(FilterId::All));
        assert!(engine.toggle_category(FilterId::All));
        assert!(engine.is_all_selected());

        engine.select([CategoryKey::Category(DEV)]);
        assert!(!engine.is_all_selected());
        assert!(engine.toggle_category(FilterId::All));
        assert!(engine.is_all_selected());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut engine = FilterEngine::new(sample());
        assert!(!engine.toggle_category(FilterId::Key(CategoryKey::Category(999))));
        assert!(engine.is_all_selected());

        engine.select([CategoryKey::Category(999)]);
        assert!(engine.is_all_selected());
    }

    #[test]
    fn available_keys_are_name_ordered_with_uncategorized_last() {
        let engine = FilterEngine::new(vec![
            bookmark(1, "a", "https://a.io", &[(WORK, "work"), (DEV, "Dev")], false),
            bookmark(2, "b", "https://b.io", &[], false),
            bookmark(3, "c", "https://c.io", &[(DEV, "Dev")], false),
        ]);
        assert_eq!(
            engine.available(),
            &[CategoryKey::Category(DEV), CategoryKey::Category(WORK), CategoryKey::Uncategorized]
        );
    }

    #[test]
    fn multi_category_bookmark_matches_any_selected() {
        let mut engine = FilterEngine::new(vec![
            bookmark(1, "a", "https://a.io", &[(WORK, "Work"), (DEV, "Dev")], false),
            bookmark(2, "b", "https://b.io", &[(DEV, "Dev")], false),
        ]);
        engine.select([CategoryKey::Category(WORK)]);
        assert_eq!(descriptions(&engine), vec!["a"]);
    }

    #[test]
    fn empty_state_distinguishes_nothing_saved_from_no_matches() {
        let engine = FilterEngine::new(vec![]);
        assert_eq!(engine.view().empty, Some(EmptyState::NoBookmarks));
        assert!(engine.available().is_empty());

        let mut engine = FilterEngine::new(sample());
        assert_eq!(engine.view().empty, None);
        engine.set_search_term("nothing matches this");
        assert_eq!(engine.view().empty, Some(EmptyState::NoMatches));
    }

    #[test]
    fn render_callback_sees_every_recompute() {
        let seen: Arc<Mutex<Vec<(usize, Option<EmptyState>)>>> = Arc::default();
        let sink = Arc::clone(&seen);

        let mut engine = FilterEngine::new(sample());
        engine.on_render(move |view| sink.lock().unwrap().push((view.visible.len(), view.empty)));
        engine.set_search_term("git");
        engine.set_search_term("zzz");

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![(2, None), (1, None), (0, Some(EmptyState::NoMatches))]);
    }

    #[test]
    fn refresh_keeps_partial_selection_and_widens_full_selection() {
        let mut engine = FilterEngine::new(sample());
        engine.set_bookmarks(vec![
            bookmark(1, "GitHub", "https://github.com", &[], true),
            bookmark(2, "Docs", "https://go.dev", &[(DEV, "Dev")], false),
            bookmark(3, "Jira", "https://jira.io", &[(WORK, "Work")], false),
        ]);
        assert!(engine.is_all_selected());

        engine.select([CategoryKey::Category(DEV)]);
        engine.set_bookmarks(vec![
            bookmark(2, "Docs", "https://go.dev", &[(DEV, "Dev")], false),
            bookmark(4, "New", "https://new.io", &[(WORK, "Work")], false),
        ]);
        assert_eq!(engine.selected().iter().copied().collect::<Vec<_>>(), vec![CategoryKey::Category(DEV)]);
        assert_eq!(descriptions(&engine), vec!["Docs"]);

        engine.set_bookmarks(vec![bookmark(4, "New", "https://new.io", &[(WORK, "Work")], false)]);
        assert!(engine.is_all_selected());
        assert_eq!(descriptions(&engine), vec!["New"]);
    }

    #[test]
    fn filter_ids_parse() {
        assert_eq!("all".parse::<FilterId>().unwrap(), FilterId::All);
        assert_eq!(
            "__UNCATEGORIZED__".parse::<FilterId>().unwrap(),
            FilterId::Key(CategoryKey::Uncategorized)
        );
        assert_eq!(" 12 ".parse::<FilterId>().unwrap(), FilterId::Key(CategoryKey::Category(12)));
        assert!("abc".parse::<FilterId>().is_err());
        assert_eq!(CategoryKey::Uncategorized.to_string(), UNCATEGORIZED_ID);
    }
}
