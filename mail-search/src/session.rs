//! Search session event loop
//!
//! Runs a [`SearchController`] on a single task. Commands arrive over a
//! channel, issued tickets run concurrently, and their outcomes come back to
//! the same task, so the controller is only ever touched from one place.
//! State is published as [`SearchSnapshot`]s over a watch channel, and each
//! transition as a [`SearchEvent`] over a broadcast channel (the watch
//! channel would coalesce the clear-then-set of a repeated error).

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::controller::{CycleOutcome, SearchController, SearchEvent, SearchSnapshot, SearchTicket};
use crate::error::{Result, SearchError};
use crate::models::{Combinator, DateFilter, SortOrder};
use crate::sanitize::Sanitizer;

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 256;

/// Requests a view can make
#[derive(Debug, Clone, PartialEq)]
pub enum SearchCommand {
    /// Raw user text; sanitized before it reaches the controller
    SetFreeText(String),
    SetCombinator(Combinator),
    SetDateFilter(Option<DateFilter>),
    SetSortOrder(SortOrder),
    SetPage(i64),
    SetPageSize(i64),
    NextPage,
    PreviousPage,
    Refresh,
    DismissError,
    Shutdown,
}

/// Client side of a running session
pub struct SessionHandle {
    commands: mpsc::Sender<SearchCommand>,
    snapshots: watch::Receiver<SearchSnapshot>,
    events: broadcast::Sender<SearchEvent>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub async fn send(&self, command: SearchCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SearchError::SessionClosed)
    }

    /// Latest published state
    pub fn snapshot(&self) -> SearchSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn snapshots(&self) -> watch::Receiver<SearchSnapshot> {
        self.snapshots.clone()
    }

    /// Receive every state transition from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SearchEvent> {
        self.events.subscribe()
    }

    /// Stop the session, aborting any outstanding request
    pub async fn shutdown(self) -> Result<()> {
        // The loop may already be gone; joining below is what matters
        let _ = self.commands.send(SearchCommand::Shutdown).await;
        self.task
            .await
            .map_err(|e| SearchError::Io(std::io::Error::other(e)))
    }
}

/// Owns the controller inside the session task
pub struct SearchSession {
    controller: SearchController,
    sanitizer: Arc<dyn Sanitizer>,
    in_flight: JoinSet<CycleOutcome>,
}

impl SearchSession {
    /// Spawn the session loop on the current runtime
    pub fn spawn(controller: SearchController, sanitizer: Arc<dyn Sanitizer>) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

        let session = Self {
            controller,
            sanitizer,
            in_flight: JoinSet::new(),
        };
        let task = tokio::spawn(session.run(command_rx, snapshot_tx, event_tx.clone()));

        SessionHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            events: event_tx,
            task,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<SearchCommand>,
        snapshots: watch::Sender<SearchSnapshot>,
        events: broadcast::Sender<SearchEvent>,
    ) {
        info!("Search session started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    None | Some(SearchCommand::Shutdown) => break,
                    Some(command) => {
                        if let Some(ticket) = self.apply(command) {
                            self.launch(ticket);
                        }
                    }
                },
                Some(joined) = self.in_flight.join_next() => match joined {
                    Ok(outcome) => {
                        self.controller.settle(outcome);
                    }
                    Err(e) => warn!("Search task failed: {}", e),
                },
            }

            for event in self.controller.take_events() {
                // No subscribers is fine
                let _ = events.send(event);
            }
            snapshots.send_replace(self.controller.snapshot());
        }

        self.in_flight.abort_all();
        info!("Search session stopped");
    }

    fn apply(&mut self, command: SearchCommand) -> Option<SearchTicket> {
        debug!("Session command: {:?}", command);
        let controller = &mut self.controller;

        match command {
            SearchCommand::SetFreeText(raw) => {
                let text = self.sanitizer.sanitize(&raw);
                controller.set_free_text(text)
            }
            SearchCommand::SetCombinator(combinator) => controller.set_combinator(combinator),
            SearchCommand::SetDateFilter(filter) => controller.set_date_filter(filter),
            SearchCommand::SetSortOrder(order) => controller.set_sort_order(order),
            SearchCommand::SetPage(page) => controller.set_page(page),
            SearchCommand::SetPageSize(size) => controller.set_page_size(size),
            SearchCommand::NextPage => controller.next_page(),
            SearchCommand::PreviousPage => controller.previous_page(),
            SearchCommand::Refresh => Some(controller.refresh()),
            SearchCommand::DismissError => {
                controller.dismiss_error();
                None
            }
            SearchCommand::Shutdown => None,
        }
    }

    fn launch(&mut self, ticket: SearchTicket) {
        debug!(cycle = ticket.cycle(), "Launching search");
        self.in_flight.spawn(ticket.execute());
    }
}
