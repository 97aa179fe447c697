//! The post catalog filter pipeline.
//!
//! Given a [`Catalog`] and a [`FilterState`], produce a render-ready
//! [`ViewSlice`]: category filter first, then a stable sort, then a
//! cumulative page window. Free-text search is a separate operation with
//! its own display cap. The pipeline holds no mutable state and knows
//! nothing about rendering.

use serde::Deserialize;

use crate::domain::posts::{Catalog, Post};

/// Sentinel category matching every post.
pub const ALL_CATEGORIES: &str = "All";

/// Search results shown inline; the true match count is reported alongside.
pub const SEARCH_DISPLAY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    Popular,
    Title,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::Oldest => "oldest",
            SortKey::Popular => "popular",
            SortKey::Title => "title",
        }
    }

    /// Unknown values fall back to the default ordering; the select control
    /// this value comes from cannot produce anything else.
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "newest" => SortKey::Newest,
            "oldest" => SortKey::Oldest,
            "popular" => SortKey::Popular,
            "title" => SortKey::Title,
            _ => SortKey::Newest,
        }
    }
}

/// Transient listing state, parsed fresh from each request's query string.
///
/// Category and sort changes reset the page window to 1; the two are
/// otherwise independent.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    category: String,
    sort: SortKey,
    page: usize,
    query: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            category: ALL_CATEGORIES.to_string(),
            sort: SortKey::default(),
            page: 1,
            query: String::new(),
        }
    }
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_category(&mut self, category: impl Into<String>) {
        let category = category.into();
        if category != self.category {
            self.category = category;
            self.page = 1;
        }
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        if sort != self.sort {
            self.sort = sort;
            self.page = 1;
        }
    }

    /// Pages are 1-based; zero from a hand-edited URL clamps to 1.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn has_query(&self) -> bool {
        !self.query.trim().is_empty()
    }
}

/// The derived, ordered sequence of posts eligible for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSlice<'a> {
    /// Cumulative page window over the filtered, sorted set.
    pub posts: Vec<&'a Post>,
    /// Size of the filtered set before pagination.
    pub total: usize,
}

impl ViewSlice<'_> {
    pub fn shown(&self) -> usize {
        self.posts.len()
    }

    /// Posts not yet inside the page window.
    pub fn remaining(&self) -> usize {
        self.total - self.posts.len()
    }
}

/// Outcome of a free-text search. An empty or whitespace-only query is its
/// own state, distinct from a query that matched nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome<'a> {
    EmptyQuery,
    Matches {
        /// At most [`SEARCH_DISPLAY_LIMIT`] posts, in catalog order.
        visible: Vec<&'a Post>,
        /// True match count, for "N more" messaging.
        total: usize,
    },
}

/// Case-sensitive exact category match; the [`ALL_CATEGORIES`] sentinel
/// returns the catalog in original order.
pub fn filter_by_category<'a>(posts: &'a [Post], category: &str) -> Vec<&'a Post> {
    if category == ALL_CATEGORIES {
        return posts.iter().collect();
    }
    posts.iter().filter(|post| post.category == category).collect()
}

/// Stable sort; equal keys retain their prior relative order so pagination
/// stays reproducible.
pub fn sort_posts(posts: &mut [&Post], key: SortKey) {
    match key {
        SortKey::Newest => posts.sort_by(|a, b| b.date.cmp(&a.date)),
        SortKey::Oldest => posts.sort_by(|a, b| a.date.cmp(&b.date)),
        SortKey::Popular => posts.sort_by(|a, b| b.views.cmp(&a.views)),
        SortKey::Title => {
            posts.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        }
    }
}

/// Cumulative "load more" window: the prefix of length
/// `min(page * page_size, len)`. A page past the end yields the full list.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let page = page.max(1);
    let end = page.saturating_mul(page_size).min(items.len());
    &items[..end]
}

/// Case-insensitive substring search over title, excerpt, category, and tags.
pub fn search<'a>(catalog: &'a Catalog, query: &str) -> SearchOutcome<'a> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return SearchOutcome::EmptyQuery;
    }

    let needle = trimmed.to_lowercase();
    let matches: Vec<&Post> = catalog
        .posts()
        .iter()
        .filter(|post| matches_query(post, &needle))
        .collect();

    let total = matches.len();
    let visible = matches.into_iter().take(SEARCH_DISPLAY_LIMIT).collect();
    SearchOutcome::Matches { visible, total }
}

fn matches_query(post: &Post, needle: &str) -> bool {
    post.title.to_lowercase().contains(needle)
        || post.excerpt.to_lowercase().contains(needle)
        || post.category.to_lowercase().contains(needle)
        || post.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
}

/// Full pipeline: category filter, optional free-text narrowing, stable
/// sort, cumulative page window. An empty catalog degrades to an empty
/// slice; nothing here can fail.
pub fn view_slice<'a>(catalog: &'a Catalog, state: &FilterState, page_size: usize) -> ViewSlice<'a> {
    let mut filtered = filter_by_category(catalog.posts(), state.category());

    if state.has_query() {
        let needle = state.query().trim().to_lowercase();
        filtered.retain(|post| matches_query(post, &needle));
    }

    sort_posts(&mut filtered, state.sort());

    let total = filtered.len();
    let shown = paginate(&filtered, state.page(), page_size).len();
    filtered.truncate(shown);

    ViewSlice {
        posts: filtered,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::posts::testing::post;

    fn sample_catalog() -> Catalog {
        Catalog::new(vec![
            post("go-basics", "Go Basics", "Tech", 10, 1),
            post("art-tips", "Art Tips", "Art", 50, 2),
            post("rust-notes", "Rust Notes", "Tech", 50, 3),
            post("sketching", "Sketching", "Art", 5, 4),
        ])
        .expect("valid catalog")
    }

    fn titles<'a>(posts: &'a [&'a Post]) -> Vec<&'a str> {
        posts.iter().map(|p| p.title.as_str()).collect()
    }

    #[test]
    fn all_sentinel_returns_catalog_in_original_order() {
        let catalog = sample_catalog();
        let filtered = filter_by_category(catalog.posts(), ALL_CATEGORIES);
        assert_eq!(
            titles(&filtered),
            ["Go Basics", "Art Tips", "Rust Notes", "Sketching"]
        );
    }

    #[test]
    fn category_filter_is_exact_and_case_sensitive() {
        let catalog = sample_catalog();
        let filtered = filter_by_category(catalog.posts(), "Tech");
        assert!(filtered.iter().all(|p| p.category == "Tech"));
        assert_eq!(titles(&filtered), ["Go Basics", "Rust Notes"]);

        assert!(filter_by_category(catalog.posts(), "tech").is_empty());
        assert!(filter_by_category(catalog.posts(), "Travel").is_empty());
    }

    #[test]
    fn popular_sort_matches_worked_example() {
        let catalog = Catalog::new(vec![
            post("go-basics", "Go Basics", "Tech", 10, 1),
            post("art-tips", "Art Tips", "Art", 50, 2),
        ])
        .expect("valid catalog");

        let mut all = filter_by_category(catalog.posts(), ALL_CATEGORIES);
        sort_posts(&mut all, SortKey::Popular);
        assert_eq!(titles(&all), ["Art Tips", "Go Basics"]);

        let tech = filter_by_category(catalog.posts(), "Tech");
        assert_eq!(titles(&tech), ["Go Basics"]);
    }

    #[test]
    fn popular_sort_is_stable_on_tied_views() {
        let catalog = sample_catalog();
        let mut all = filter_by_category(catalog.posts(), ALL_CATEGORIES);
        sort_posts(&mut all, SortKey::Popular);
        // Art Tips and Rust Notes both have 50 views; catalog order holds.
        assert_eq!(
            titles(&all),
            ["Art Tips", "Rust Notes", "Go Basics", "Sketching"]
        );
    }

    #[test]
    fn date_sorts_run_both_directions() {
        let catalog = sample_catalog();
        let mut posts = filter_by_category(catalog.posts(), ALL_CATEGORIES);

        sort_posts(&mut posts, SortKey::Newest);
        assert_eq!(titles(&posts)[0], "Sketching");

        sort_posts(&mut posts, SortKey::Oldest);
        assert_eq!(titles(&posts)[0], "Go Basics");
    }

    #[test]
    fn title_sort_ignores_case() {
        let catalog = Catalog::new(vec![
            post("b", "banana", "Tech", 0, 1),
            post("a", "Apple", "Tech", 0, 2),
        ])
        .expect("valid catalog");
        let mut posts = filter_by_category(catalog.posts(), ALL_CATEGORIES);
        sort_posts(&mut posts, SortKey::Title);
        assert_eq!(titles(&posts), ["Apple", "banana"]);
    }

    #[test]
    fn pagination_is_a_monotonic_prefix() {
        let items: Vec<u32> = (0..7).collect();
        let page1 = paginate(&items, 1, 3);
        let page2 = paginate(&items, 2, 3);
        let page3 = paginate(&items, 3, 3);

        assert_eq!(page1, &[0, 1, 2]);
        assert!(page2.starts_with(page1));
        assert!(page3.starts_with(page2));
        assert_eq!(page3.len(), 7);
    }

    #[test]
    fn pagination_past_the_end_yields_everything() {
        let items: Vec<u32> = (0..4).collect();
        assert_eq!(paginate(&items, 99, 9).len(), 4);
        assert_eq!(paginate(&items, 0, 9).len(), 4);
    }

    #[test]
    fn empty_query_is_not_zero_matches() {
        let catalog = sample_catalog();
        assert_eq!(search(&catalog, ""), SearchOutcome::EmptyQuery);
        assert_eq!(search(&catalog, "   "), SearchOutcome::EmptyQuery);

        match search(&catalog, "zzz") {
            SearchOutcome::Matches { visible, total } => {
                assert!(visible.is_empty());
                assert_eq!(total, 0);
            }
            SearchOutcome::EmptyQuery => panic!("zero matches reported as empty query"),
        }
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let catalog = sample_catalog();
        match search(&catalog, "go") {
            SearchOutcome::Matches { visible, .. } => {
                assert!(visible.iter().any(|p| p.title == "Go Basics"));
            }
            SearchOutcome::EmptyQuery => panic!("query dropped"),
        }

        // Tag and category fields participate too.
        match search(&catalog, "NOTES") {
            SearchOutcome::Matches { total, .. } => assert!(total > 0),
            SearchOutcome::EmptyQuery => panic!("query dropped"),
        }
    }

    #[test]
    fn search_caps_visible_results_and_reports_true_total() {
        let posts = (0..8u8)
            .map(|i| post(&format!("tech-{i}"), &format!("Tech {i}"), "Tech", 0, i + 1))
            .collect();
        let catalog = Catalog::new(posts).expect("valid catalog");

        match search(&catalog, "tech") {
            SearchOutcome::Matches { visible, total } => {
                assert_eq!(visible.len(), SEARCH_DISPLAY_LIMIT);
                assert_eq!(total, 8);
            }
            SearchOutcome::EmptyQuery => panic!("query dropped"),
        }
    }

    #[test]
    fn category_or_sort_change_resets_page() {
        let mut state = FilterState::new();
        state.set_page(3);
        state.set_category("Tech");
        assert_eq!(state.page(), 1);
        assert_eq!(state.sort(), SortKey::Newest);

        state.set_page(2);
        state.set_sort(SortKey::Popular);
        assert_eq!(state.page(), 1);
        assert_eq!(state.category(), "Tech");

        // Re-applying the same value is not a change.
        state.set_page(2);
        state.set_sort(SortKey::Popular);
        assert_eq!(state.page(), 2);
    }

    #[test]
    fn view_slice_composes_filter_sort_and_window() {
        let catalog = sample_catalog();
        let mut state = FilterState::new();
        state.set_category("Tech");
        state.set_sort(SortKey::Popular);

        let slice = view_slice(&catalog, &state, 1);
        assert_eq!(titles(&slice.posts), ["Rust Notes"]);
        assert_eq!(slice.total, 2);
        assert_eq!(slice.remaining(), 1);

        state.set_page(2);
        let slice = view_slice(&catalog, &state, 1);
        assert_eq!(titles(&slice.posts), ["Rust Notes", "Go Basics"]);
        assert_eq!(slice.remaining(), 0);
    }

    #[test]
    fn view_slice_narrows_by_query() {
        let catalog = sample_catalog();
        let mut state = FilterState::new();
        state.set_query("tips");

        let slice = view_slice(&catalog, &state, 9);
        assert_eq!(titles(&slice.posts), ["Art Tips"]);
        assert_eq!(slice.total, 1);
    }

    #[test]
    fn view_slice_over_empty_catalog_degrades_to_no_results() {
        let catalog = Catalog::empty();
        let slice = view_slice(&catalog, &FilterState::new(), 9);
        assert!(slice.posts.is_empty());
        assert_eq!(slice.total, 0);
        assert_eq!(slice.remaining(), 0);
    }
}
