//! Search request construction
//!
//! Payloads start from a fixed defaults table and every field the caller
//! set explicitly is laid over it. The merge is shallow: an explicit `None`
//! date filter replaces the default filter instead of being filled back in.

use crate::models::{Combinator, Comparator, DateFilter, SearchPayload, SortOrder};
use crate::query::{PaginationDefaults, QueryState};

/// Search parameters where `None` means "not set, use the default"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams {
    pub query: Option<String>,
    pub combinator: Option<Combinator>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_order: Option<SortOrder>,
    /// `Some(None)` explicitly disables date filtering
    pub date_search: Option<Option<DateFilter>>,
}

impl From<&QueryState> for SearchParams {
    fn from(state: &QueryState) -> Self {
        Self {
            query: Some(state.free_text().to_string()),
            combinator: Some(state.combinator()),
            page: Some(i64::from(state.page())),
            limit: Some(i64::from(state.page_size())),
            sort_order: Some(state.sort_order()),
            date_search: Some(state.date_filter()),
        }
    }
}

/// Builds [`SearchPayload`]s from a defaults table
#[derive(Debug, Clone)]
pub struct SearchRequestBuilder {
    defaults: SearchPayload,
    pagination: PaginationDefaults,
}

impl SearchRequestBuilder {
    pub fn new(pagination: PaginationDefaults) -> Self {
        let pagination = pagination.normalized();
        let defaults = SearchPayload {
            query: String::new(),
            combinator: Combinator::Or,
            page: pagination.default_page,
            limit: pagination.default_limit,
            sort_order: SortOrder::Asc,
            date_search: Some(DateFilter::new(None, Comparator::LessThanOrEqual)),
        };

        Self {
            defaults,
            pagination,
        }
    }

    /// The payload produced when nothing is set
    pub fn defaults(&self) -> &SearchPayload {
        &self.defaults
    }

    pub fn build(&self, params: &SearchParams) -> SearchPayload {
        let mut payload = self.defaults.clone();

        if let Some(query) = &params.query {
            payload.query = query.clone();
        }
        if let Some(combinator) = params.combinator {
            payload.combinator = combinator;
        }
        if let Some(page) = params.page {
            payload.page = self.pagination.clamp_page(page);
        }
        if let Some(limit) = params.limit {
            payload.limit = self.pagination.clamp_limit(limit);
        }
        if let Some(order) = params.sort_order {
            payload.sort_order = order;
        }
        if let Some(date_search) = params.date_search {
            payload.date_search = date_search;
        }

        payload
    }

    /// Payload for the current query state
    pub fn build_from_state(&self, state: &QueryState) -> SearchPayload {
        self.build(&SearchParams::from(state))
    }
}

impl Default for SearchRequestBuilder {
    fn default() -> Self {
        Self::new(PaginationDefaults::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_empty_params_yield_defaults() {
        let builder = SearchRequestBuilder::default();
        let payload = builder.build(&SearchParams::default());

        assert_eq!(&payload, builder.defaults());
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "query": "",
                "type": "OR",
                "page": 1,
                "limit": 10,
                "orderBy": "asc",
                "dateSearch": { "date": null, "operator": "<=" }
            })
        );
    }

    #[test]
    fn test_explicit_empty_values_override_defaults() {
        let builder = SearchRequestBuilder::default();
        let payload = builder.build(&SearchParams {
            query: Some(String::new()),
            combinator: Some(Combinator::And),
            date_search: Some(None),
            ..Default::default()
        });

        assert_eq!(payload.combinator, Combinator::And);
        assert_eq!(payload.date_search, None);
        assert_eq!(serde_json::to_value(&payload).unwrap()["dateSearch"], json!(null));
    }

    #[test]
    fn test_date_filter_replaces_default_wholesale() {
        let builder = SearchRequestBuilder::default();
        let date = Utc.with_ymd_and_hms(2001, 9, 11, 0, 0, 0).unwrap();
        let payload = builder.build(&SearchParams {
            date_search: Some(Some(DateFilter::new(Some(date), Comparator::GreaterThan))),
            ..Default::default()
        });

        assert_eq!(
            serde_json::to_value(&payload).unwrap()["dateSearch"],
            json!({ "date": "2001-09-11T00:00:00Z", "operator": ">" })
        );
    }

    #[test]
    fn test_pagination_is_clamped() {
        let builder = SearchRequestBuilder::default();
        let payload = builder.build(&SearchParams {
            page: Some(0),
            limit: Some(-3),
            ..Default::default()
        });
        assert_eq!((payload.page, payload.limit), (1, 10));

        let payload = builder.build(&SearchParams {
            page: Some(12),
            limit: Some(5_000),
            ..Default::default()
        });
        assert_eq!((payload.page, payload.limit), (12, 200));
    }

    #[test]
    fn test_build_from_state() {
        let builder = SearchRequestBuilder::default();
        let mut state = QueryState::default();
        state.set_free_text("energy trading");
        state.set_page(3);
        state.set_page_size(20);

        let payload = builder.build_from_state(&state);
        assert_eq!(payload.query, "energy trading");
        assert_eq!(payload.combinator, Combinator::And);
        assert_eq!(payload.sort_order, SortOrder::Desc);
        assert_eq!((payload.page, payload.limit), (1, 20));
    }
}
