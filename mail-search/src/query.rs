//! User-editable search parameters
//!
//! Every mutator reports whether the *effective* value changed, so the
//! controller can decide on its own whether a new search is warranted.
//! Page and page size are clamped on entry and are never below 1.

use serde::{Deserialize, Serialize};

use crate::models::{Combinator, Comparator, DateFilter, SortOrder};

/// Page that filter changes reset to
pub const FIRST_PAGE: u32 = 1;

/// Pagination defaults used when clamping out-of-range values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PaginationDefaults {
    /// Page used when a page below 1 is requested
    pub default_page: u32,
    /// Page size used when a size below 1 is requested
    pub default_limit: u32,
    /// Largest page size the server accepts
    pub max_limit: u32,
}

impl Default for PaginationDefaults {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_limit: 10,
            max_limit: 200,
        }
    }
}

impl PaginationDefaults {
    /// Raise zero values so clamping can never produce a page or size of 0.
    /// `max_limit` never drops below `default_limit`.
    pub fn normalized(self) -> Self {
        let default_limit = self.default_limit.max(1);
        Self {
            default_page: self.default_page.max(1),
            default_limit,
            max_limit: self.max_limit.max(default_limit),
        }
    }

    /// Clamp a requested page to a valid one
    pub fn clamp_page(&self, page: i64) -> u32 {
        if page < 1 {
            self.default_page.max(1)
        } else {
            u32::try_from(page).unwrap_or(u32::MAX)
        }
    }

    /// Clamp a requested page size to a valid one
    pub fn clamp_limit(&self, limit: i64) -> u32 {
        let max_limit = self.max_limit.max(1);
        if limit < 1 {
            self.default_limit.clamp(1, max_limit)
        } else {
            u32::try_from(limit).unwrap_or(u32::MAX).min(max_limit)
        }
    }
}

/// The authoritative search intent
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    free_text: String,
    combinator: Combinator,
    date_filter: Option<DateFilter>,
    sort_order: SortOrder,
    page: u32,
    page_size: u32,
    defaults: PaginationDefaults,
}

impl QueryState {
    /// Start from the defaults: newest mails first, every term required,
    /// date filter present but without a date.
    pub fn new(defaults: PaginationDefaults) -> Self {
        let defaults = defaults.normalized();
        Self {
            free_text: String::new(),
            combinator: Combinator::And,
            date_filter: Some(DateFilter::new(None, Comparator::LessThanOrEqual)),
            sort_order: SortOrder::Desc,
            page: defaults.default_page,
            page_size: defaults.default_limit,
            defaults,
        }
    }

    pub fn free_text(&self) -> &str {
        &self.free_text
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    pub fn date_filter(&self) -> Option<DateFilter> {
        self.date_filter
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn defaults(&self) -> &PaginationDefaults {
        &self.defaults
    }

    /// Set the (already sanitized) free text. Returns to the first page.
    pub fn set_free_text(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if text == self.free_text {
            return false;
        }
        self.free_text = text;
        self.page = FIRST_PAGE;
        true
    }

    pub fn set_combinator(&mut self, combinator: Combinator) -> bool {
        if combinator == self.combinator {
            return false;
        }
        self.combinator = combinator;
        self.page = FIRST_PAGE;
        true
    }

    /// `None` removes date filtering entirely
    pub fn set_date_filter(&mut self, filter: Option<DateFilter>) -> bool {
        if filter == self.date_filter {
            return false;
        }
        self.date_filter = filter;
        self.page = FIRST_PAGE;
        true
    }

    pub fn set_sort_order(&mut self, order: SortOrder) -> bool {
        if order == self.sort_order {
            return false;
        }
        self.sort_order = order;
        self.page = FIRST_PAGE;
        true
    }

    /// Values below 1 fall back to the default page
    pub fn set_page(&mut self, page: i64) -> bool {
        let page = self.defaults.clamp_page(page);
        if page == self.page {
            return false;
        }
        self.page = page;
        true
    }

    /// Values below 1 fall back to the default size. An effective change
    /// also moves back to the first page.
    pub fn set_page_size(&mut self, size: i64) -> bool {
        let size = self.defaults.clamp_limit(size);
        if size == self.page_size {
            return false;
        }
        self.page_size = size;
        self.page = FIRST_PAGE;
        true
    }

    /// Number of pages needed for `total` records at the current page size
    pub fn max_page(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.page_size))
    }

    /// Step forward, staying within `max_page`
    pub fn next_page(&mut self, total: u64) -> bool {
        if u64::from(self.page) >= self.max_page(total) {
            return false;
        }
        self.set_page(i64::from(self.page) + 1)
    }

    /// Step back, never below the first page
    pub fn previous_page(&mut self) -> bool {
        if self.page <= FIRST_PAGE {
            return false;
        }
        self.set_page(i64::from(self.page) - 1)
    }
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new(PaginationDefaults::default())
    }
}
