//! Fault-injecting stand-in for the third-party boats API.
//!
//! Every request is delayed by a plan from a [`FaultSource`] and then either
//! fails with a server error or runs against a shared [`BoatStore`].
//! [`router`] exposes the same behavior over HTTP.

mod config;
mod faults;
mod server;
mod store;

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::time::sleep;

use crate::BoatRecord;

pub use config::{ConfigError, DelayRange, SimulatorConfig};
pub use faults::{FaultPlan, FaultSource, RandomFaults, ScriptedFaults};
pub use server::router;
pub use store::BoatStore;

/// Outcome of a simulated request that did not produce a record.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamFailure {
    #[error("Unexpected error from Boats API")]
    ServerError,
    #[error("Boat with ID {0} not found")]
    NotFound(String),
    #[error("Boat name must be a string")]
    InvalidName,
}

/// The simulated upstream: a boat store behind injected latency and failures.
#[derive(Clone)]
pub struct FlakyUpstream {
    store: BoatStore,
    faults: Arc<dyn FaultSource>,
}

impl fmt::Debug for FlakyUpstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlakyUpstream")
            .field("boats", &self.store.len())
            .field("faults", &"<fault source>")
            .finish()
    }
}

impl FlakyUpstream {
    pub fn new(store: BoatStore, faults: Arc<dyn FaultSource>) -> Self {
        Self { store, faults }
    }

    /// Seeded fleet with randomly drawn faults.
    pub fn random(config: SimulatorConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(BoatStore::seeded(), Arc::new(RandomFaults::new(config)?)))
    }

    pub fn store(&self) -> &BoatStore {
        &self.store
    }

    pub async fn list(&self) -> Result<Vec<BoatRecord>, UpstreamFailure> {
        self.simulate("list", None).await?;
        Ok(self.store.list())
    }

    pub async fn get(&self, id: &str) -> Result<BoatRecord, UpstreamFailure> {
        self.simulate("get", Some(id)).await?;
        self.store
            .get(id)
            .ok_or_else(|| UpstreamFailure::NotFound(id.to_owned()))
    }

    /// Merges `fields` into an existing boat; never creates one.
    ///
    /// A `name` that is present but not a string rejects the whole update.
    pub async fn update(
        &self,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<BoatRecord, UpstreamFailure> {
        self.simulate("update", Some(id)).await?;
        if fields.get("name").is_some_and(|name| !name.is_string()) {
            return Err(UpstreamFailure::InvalidName);
        }
        self.store
            .update(id, fields)
            .ok_or_else(|| UpstreamFailure::NotFound(id.to_owned()))
    }

    async fn simulate(&self, op: &'static str, id: Option<&str>) -> Result<(), UpstreamFailure> {
        let plan = self.faults.next_plan();
        tracing::debug!(
            op,
            id,
            delay_ms = plan.delay.as_millis() as u64,
            fail = plan.fail,
            "delaying boats request"
        );

        if !plan.delay.is_zero() {
            sleep(plan.delay).await;
        }

        if plan.fail {
            tracing::warn!(op, id, "injecting boats upstream failure");
            return Err(UpstreamFailure::ServerError);
        }
        Ok(())
    }
}
