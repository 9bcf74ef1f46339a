//! `riverport-boats` talks to the third-party boats API through an
//! unreliable network and ships a fault-injecting stand-in for that API.
//!
//! - [`BoatsClient::list_boats`], [`BoatsClient::get_boat`] and
//!   [`BoatsClient::update_boat`] retry transient failures with exponential
//!   backoff and a per-attempt timeout.
//! - [`simulator`] serves boat records after random delays and fails a
//!   configurable share of requests.

mod client;
mod error;
mod options;
pub mod retry;
pub mod simulator;
mod types;

pub use client::BoatsClient;
pub use error::{AttemptFailure, BoatsError};
pub use options::ClientOptions;
pub use retry::{AttemptOutcome, OutcomeKind, RetryPolicy};
pub use types::BoatRecord;

pub type Result<T> = std::result::Result<T, BoatsError>;
