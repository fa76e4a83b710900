//! mail-search: Paginated mail search client
//!
//! Keeps a mutable set of search parameters consistent with a single
//! authoritative request to a remote mail search endpoint.
//!
//! # Features
//!
//! - Free-text query with AND/OR combinator, date filter, sort order
//! - Page and page size clamping with effective-change tracking
//! - Single-flight requests: a new search cancels the one in flight, and
//!   late responses from superseded searches are discarded
//! - Uniform request outcomes (success, cancelled, failed)
//! - Session event loop publishing snapshots and state transitions
//!
//! # Example Configuration
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8080"
//! search_path = "/api/mails/search"
//! timeout_seconds = 30
//!
//! [pagination]
//! default_page = 1
//! default_limit = 10
//! max_limit = 200
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```
//!
//! # Example
//!
//! ```no_run
//! use mail_search::{ClientConfig, HttpTransport, SearchController};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::default();
//!     let transport = Arc::new(HttpTransport::new(config.timeout())?);
//!     let mut controller = SearchController::from_config(&config, transport)?;
//!
//!     if let Some(ticket) = controller.set_free_text("pipeline") {
//!         controller.run(ticket).await;
//!     }
//!     println!("{} of {} mails", controller.records().len(), controller.total());
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod gateway;
pub mod mock;
pub mod models;
pub mod query;
pub mod request;
pub mod sanitize;
pub mod session;
pub mod transport;

pub use config::ClientConfig;
pub use controller::{SearchController, SearchEvent, SearchSnapshot, SearchTicket, Settlement};
pub use error::{Result, SearchError};
pub use gateway::{GatewayResult, RequestGateway};
pub use models::{Combinator, Comparator, DateFilter, Mail, SortOrder};
pub use session::{SearchCommand, SearchSession, SessionHandle};
pub use transport::{HttpTransport, RequestTarget, Transport};
