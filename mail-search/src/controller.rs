//! Search and pagination controller
//!
//! The controller owns the query, the current result page and the error
//! state. Every effective change to the query starts a new request cycle:
//!
//! ```text
//! Idle -> Fetching -> Settled (success | error)
//!                  -> Cancelled (no state change)
//! ```
//!
//! A mutator hands back a [`SearchTicket`] instead of awaiting the network
//! itself, so the query stays editable while a request is outstanding. The
//! caller runs the ticket and feeds the [`CycleOutcome`] back through
//! [`SearchController::settle`]. Only the most recently issued cycle may
//! write shared state; an outcome from any older cycle is discarded no matter
//! when it arrives or what it contains.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::gateway::{GatewayResult, RequestGateway};
use crate::models::{ApiResponse, Combinator, DateFilter, Mail, MailPage, SearchPayload, SortOrder};
use crate::query::{PaginationDefaults, QueryState};
use crate::request::SearchRequestBuilder;
use crate::transport::{RequestTarget, Transport};

/// Message shown when the server fails without saying why
pub const SERVER_FAILURE_MESSAGE: &str = "There was an error loading the emails";

/// Transitions kept for [`SearchController::take_events`]; the oldest are
/// dropped when nobody drains them
pub const EVENT_LOG_CAPACITY: usize = 256;

/// Identifies one request cycle
pub type CycleId = u64;

/// Gateway result for a search request
pub type SearchResult = GatewayResult<ApiResponse<MailPage>>;

/// In-flight cycle. Dropped once the cycle settles.
#[derive(Debug)]
struct RequestCycle {
    id: CycleId,
    cancel: CancellationToken,
}

/// A search ready to be sent
///
/// Executing a ticket does not touch the controller; hand the outcome back
/// to [`SearchController::settle`].
pub struct SearchTicket {
    cycle: CycleId,
    payload: SearchPayload,
    target: RequestTarget,
    cancel: CancellationToken,
    gateway: RequestGateway,
}

impl SearchTicket {
    pub fn cycle(&self) -> CycleId {
        self.cycle
    }

    pub fn payload(&self) -> &SearchPayload {
        &self.payload
    }

    /// Token that fires when a newer cycle supersedes this one
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub async fn execute(self) -> CycleOutcome {
        let result = self
            .gateway
            .execute(&self.target, &self.payload, &self.cancel)
            .await;

        CycleOutcome {
            cycle: self.cycle,
            result,
        }
    }
}

impl std::fmt::Debug for SearchTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchTicket")
            .field("cycle", &self.cycle)
            .field("payload", &self.payload)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Result of running a ticket
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub cycle: CycleId,
    pub result: SearchResult,
}

/// What [`SearchController::settle`] did with an outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// Records and total replaced
    Applied { records: usize, total: u64 },
    /// Error state set
    Failed { message: String },
    /// Stale or cancelled; nothing changed
    Discarded,
}

/// Observable state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    LoadingChanged(bool),
    ResultsReplaced { records: usize, total: u64 },
    ErrorCleared,
    ErrorRaised(String),
}

/// Everything a view needs to render
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSnapshot {
    pub records: Vec<Mail>,
    pub total: u64,
    pub max_page: u64,
    pub page: u32,
    pub page_size: u32,
    pub error: Option<String>,
    pub loading: bool,
}

/// Owns the query, result and error state of one search view
pub struct SearchController {
    query: QueryState,
    builder: SearchRequestBuilder,
    gateway: RequestGateway,
    target: RequestTarget,
    records: Vec<Mail>,
    total: u64,
    error: Option<String>,
    loading: bool,
    current: Option<RequestCycle>,
    last_cycle: CycleId,
    events: VecDeque<SearchEvent>,
}

impl SearchController {
    pub fn new(gateway: RequestGateway, target: RequestTarget, pagination: PaginationDefaults) -> Self {
        Self {
            query: QueryState::new(pagination),
            builder: SearchRequestBuilder::new(pagination),
            gateway,
            target,
            records: Vec::new(),
            total: 0,
            error: None,
            loading: false,
            current: None,
            last_cycle: 0,
            events: VecDeque::with_capacity(EVENT_LOG_CAPACITY),
        }
    }

    /// Controller for the configured search endpoint. Rejects an invalid
    /// configuration.
    pub fn from_config(config: &ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let target = RequestTarget::post(config.search_url()?);
        Ok(Self::new(
            RequestGateway::new(transport),
            target,
            config.pagination,
        ))
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn records(&self) -> &[Mail] {
        &self.records
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// `ceil(total / page_size)`, 0 when there are no results
    pub fn max_page(&self) -> u64 {
        self.query.max_page(self.total)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether a cycle is waiting to settle
    pub fn in_flight(&self) -> Option<CycleId> {
        self.current.as_ref().map(|cycle| cycle.id)
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        SearchSnapshot {
            records: self.records.clone(),
            total: self.total,
            max_page: self.max_page(),
            page: self.query.page(),
            page_size: self.query.page_size(),
            error: self.error.clone(),
            loading: self.loading,
        }
    }

    /// Drain the transitions recorded since the last call, at most the
    /// latest [`EVENT_LOG_CAPACITY`]
    pub fn take_events(&mut self) -> Vec<SearchEvent> {
        self.events.drain(..).collect()
    }

    /// Free text must already be sanitized
    pub fn set_free_text(&mut self, text: impl Into<String>) -> Option<SearchTicket> {
        let changed = self.query.set_free_text(text);
        self.issue_if(changed)
    }

    pub fn set_combinator(&mut self, combinator: Combinator) -> Option<SearchTicket> {
        let changed = self.query.set_combinator(combinator);
        self.issue_if(changed)
    }

    pub fn set_date_filter(&mut self, filter: Option<DateFilter>) -> Option<SearchTicket> {
        let changed = self.query.set_date_filter(filter);
        self.issue_if(changed)
    }

    pub fn set_sort_order(&mut self, order: SortOrder) -> Option<SearchTicket> {
        let changed = self.query.set_sort_order(order);
        self.issue_if(changed)
    }

    pub fn set_page(&mut self, page: i64) -> Option<SearchTicket> {
        let changed = self.query.set_page(page);
        self.issue_if(changed)
    }

    /// Also returns to the first page, in the same cycle
    pub fn set_page_size(&mut self, size: i64) -> Option<SearchTicket> {
        let changed = self.query.set_page_size(size);
        self.issue_if(changed)
    }

    pub fn next_page(&mut self) -> Option<SearchTicket> {
        let changed = self.query.next_page(self.total);
        self.issue_if(changed)
    }

    pub fn previous_page(&mut self) -> Option<SearchTicket> {
        let changed = self.query.previous_page();
        self.issue_if(changed)
    }

    /// Search again with the current parameters
    pub fn refresh(&mut self) -> SearchTicket {
        self.begin_cycle()
    }

    /// Clear the error state on explicit user request
    pub fn dismiss_error(&mut self) {
        if self.error.take().is_some() {
            self.record(SearchEvent::ErrorCleared);
        }
    }

    /// Run a ticket and settle it.
    ///
    /// Holds the controller for the whole request; use
    /// [`SearchSession`](crate::session::SearchSession) when the query must
    /// stay editable meanwhile.
    pub async fn run(&mut self, ticket: SearchTicket) -> Settlement {
        let outcome = ticket.execute().await;
        self.settle(outcome)
    }

    /// Fold a finished cycle into the controller state
    pub fn settle(&mut self, outcome: CycleOutcome) -> Settlement {
        let is_current = self
            .current
            .as_ref()
            .is_some_and(|cycle| cycle.id == outcome.cycle);

        if !is_current {
            debug!(cycle = outcome.cycle, "Discarding superseded search");
            return Settlement::Discarded;
        }

        match outcome.result {
            GatewayResult::Cancelled => {
                debug!(cycle = outcome.cycle, "Search cancelled");
                Settlement::Discarded
            }
            GatewayResult::Failed { message, status } => self.fail(outcome.cycle, message, status),
            GatewayResult::Success { payload, status } if status >= 400 => {
                let message = payload
                    .error_message()
                    .unwrap_or(SERVER_FAILURE_MESSAGE)
                    .to_string();
                self.fail(outcome.cycle, message, status)
            }
            GatewayResult::Success { payload, .. } => {
                let page = payload.data.unwrap_or_default();
                self.records = page.mails.unwrap_or_default();
                self.total = page.total.unwrap_or(0);
                self.finish();

                let records = self.records.len();
                info!(
                    cycle = outcome.cycle,
                    "Search returned {} of {} mails (page {}/{})",
                    records,
                    self.total,
                    self.query.page(),
                    self.max_page()
                );
                self.record(SearchEvent::ResultsReplaced {
                    records,
                    total: self.total,
                });

                Settlement::Applied {
                    records,
                    total: self.total,
                }
            }
        }
    }

    fn issue_if(&mut self, changed: bool) -> Option<SearchTicket> {
        changed.then(|| self.begin_cycle())
    }

    fn begin_cycle(&mut self) -> SearchTicket {
        if let Some(previous) = self.current.take() {
            debug!(cycle = previous.id, "Superseding in-flight search");
            previous.cancel.cancel();
        }

        self.last_cycle += 1;
        let cancel = CancellationToken::new();
        self.current = Some(RequestCycle {
            id: self.last_cycle,
            cancel: cancel.clone(),
        });
        self.set_loading(true);

        let payload = self.builder.build_from_state(&self.query);
        debug!(
            cycle = self.last_cycle,
            "Searching '{}' ({}, {}) page {} limit {}",
            payload.query,
            payload.combinator,
            payload.sort_order,
            payload.page,
            payload.limit
        );

        SearchTicket {
            cycle: self.last_cycle,
            payload,
            target: self.target.clone(),
            cancel,
            gateway: self.gateway.clone(),
        }
    }

    fn fail(&mut self, cycle: CycleId, message: String, status: u16) -> Settlement {
        warn!(cycle, "Search failed (HTTP {}): {}", status, message);

        // Clear first so observers see a transition even for a repeated message
        self.error = None;
        self.record(SearchEvent::ErrorCleared);
        self.error = Some(message.clone());
        self.record(SearchEvent::ErrorRaised(message.clone()));
        self.finish();

        Settlement::Failed { message }
    }

    fn finish(&mut self) {
        self.current = None;
        self.set_loading(false);
    }

    fn record(&mut self, event: SearchEvent) {
        if self.events.len() == EVENT_LOG_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.record(SearchEvent::LoadingChanged(loading));
        }
    }
}
