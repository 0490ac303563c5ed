use std::collections::BTreeSet;

use super::pipeline::{PageQuery, SortKey};

/// Filter/sort/page/scroll selections for the product list, held outside
/// the view so they survive navigating to a detail page and back. Created
/// once per session; reset only via `reset()`. Single writer context, so
/// no interior locking here.
#[derive(Debug, Clone, Default)]
pub struct ListState {
    page_index: usize,
    categories: BTreeSet<String>,
    sort: SortKey,
    scroll_offset: u32,
    pending_restore: Option<u32>,
}

impl ListState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn scroll_offset(&self) -> u32 {
        self.scroll_offset
    }

    pub fn set_page_index(&mut self, page: usize) {
        self.page_index = page;
    }

    /// Changing the filter invalidates the current page of the old result
    /// set, so page and scroll go back to the top.
    pub fn set_categories(&mut self, categories: BTreeSet<String>) {
        self.categories = categories;
        self.page_index = 0;
        self.scroll_offset = 0;
        self.pending_restore = None;
    }

    /// Same coupling rule as `set_categories`.
    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
        self.page_index = 0;
        self.scroll_offset = 0;
        self.pending_restore = None;
    }

    /// Called right before navigating away from the list view.
    pub fn capture_scroll(&mut self, offset: u32) {
        self.scroll_offset = offset;
        self.pending_restore = Some(offset);
    }

    /// Hands the captured offset out exactly once, after the list has
    /// re-rendered. Subsequent re-renders get `None` and leave the user's
    /// scrolling alone.
    pub fn take_scroll_restore(&mut self) -> Option<u32> {
        self.pending_restore.take()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Snapshot of the pipeline inputs this state currently selects.
    pub fn query(&self) -> PageQuery {
        PageQuery {
            categories: self.categories.clone(),
            sort: self.sort,
            page: self.page_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cats(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_match_a_fresh_session() {
        let state = ListState::new();
        assert_eq!(state.page_index(), 0);
        assert!(state.categories().is_empty());
        assert_eq!(state.sort(), SortKey::Recent);
        assert_eq!(state.scroll_offset(), 0);
    }

    #[test]
    fn changing_categories_resets_page_and_scroll() {
        let mut state = ListState::new();
        state.set_page_index(3);
        state.capture_scroll(1200);
        state.set_categories(cats(&["roses"]));
        assert_eq!(state.page_index(), 0);
        assert_eq!(state.scroll_offset(), 0);
        assert_eq!(state.take_scroll_restore(), None);
        assert_eq!(state.categories(), &cats(&["roses"]));
    }

    #[test]
    fn changing_sort_resets_page_and_scroll() {
        let mut state = ListState::new();
        state.set_page_index(2);
        state.capture_scroll(640);
        state.set_sort(SortKey::PriceDesc);
        assert_eq!(state.page_index(), 0);
        assert_eq!(state.scroll_offset(), 0);
        assert_eq!(state.sort(), SortKey::PriceDesc);
    }

    #[test]
    fn scroll_restore_fires_exactly_once() {
        let mut state = ListState::new();
        state.capture_scroll(850);
        assert_eq!(state.take_scroll_restore(), Some(850));
        // A second re-render must not scroll again.
        assert_eq!(state.take_scroll_restore(), None);
        // The stored offset itself is still there for the next capture cycle.
        assert_eq!(state.scroll_offset(), 850);
    }

    #[test]
    fn page_changes_keep_filter_and_sort() {
        let mut state = ListState::new();
        state.set_categories(cats(&["orchids"]));
        state.set_sort(SortKey::NameAsc);
        state.set_page_index(4);
        let q = state.query();
        assert_eq!(q.page, 4);
        assert_eq!(q.sort, SortKey::NameAsc);
        assert_eq!(q.categories, cats(&["orchids"]));
    }

    #[test]
    fn reset_restores_all_defaults() {
        let mut state = ListState::new();
        state.set_categories(cats(&["roses"]));
        state.set_sort(SortKey::NameDesc);
        state.set_page_index(7);
        state.capture_scroll(90);
        state.reset();
        assert_eq!(state.page_index(), 0);
        assert!(state.categories().is_empty());
        assert_eq!(state.sort(), SortKey::Recent);
        assert_eq!(state.scroll_offset(), 0);
        assert_eq!(state.take_scroll_restore(), None);
    }
}
