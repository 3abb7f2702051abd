mod availability;
mod conflict;
mod eligibility;
mod error;

pub use availability::aggregate;
pub use conflict::is_free;
pub use eligibility::{filter_eligible, is_eligible};
pub use error::EngineError;

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::model::*;
use crate::observability;
use crate::store::{ResourceDirectory, SlotLedger};

/// Answers availability queries against a directory and a ledger, either by
/// reconciling slots in process or by handing the whole query to the store.
/// Both strategies return identical rows.
pub struct Engine {
    directory: Arc<dyn ResourceDirectory>,
    ledger: Arc<dyn SlotLedger>,
}

impl Engine {
    pub fn new(directory: Arc<dyn ResourceDirectory>, ledger: Arc<dyn SlotLedger>) -> Self {
        Self { directory, ledger }
    }

    pub async fn compute_availability(
        &self,
        request: &AvailabilityRequest,
        strategy: Strategy,
    ) -> Result<Vec<AvailabilityEntry>, EngineError> {
        let started = Instant::now();
        let entries = match strategy {
            Strategy::InMemory => self.availability_in_memory(request).await?,
            Strategy::Store => self.ledger.find_availability_from_db(request).await?,
        };

        let label = strategy.label();
        metrics::counter!(observability::AVAILABILITY_COMPUTATIONS_TOTAL, "strategy" => label).increment(1);
        metrics::histogram!(observability::AVAILABILITY_ENTRIES, "strategy" => label).record(entries.len() as f64);
        metrics::histogram!(observability::AVAILABILITY_DURATION_SECONDS, "strategy" => label)
            .record(started.elapsed().as_secs_f64());
        debug!(
            date = %request.date,
            strategy = label,
            entries = entries.len(),
            "availability computed"
        );
        Ok(entries)
    }

    /// Looks up candidates, keeps those offering every requested product,
    /// then fetches their slots and aggregates. The ledger is not touched when
    /// nobody is eligible.
    async fn availability_in_memory(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<Vec<AvailabilityEntry>, EngineError> {
        let candidates = self
            .directory
            .find_by_criteria(&request.language, &request.products, &request.rating)
            .await?;
        if candidates.is_empty() {
            debug!(date = %request.date, "no candidate managers");
            return Ok(Vec::new());
        }

        let candidate_count = candidates.len();
        let eligible = filter_eligible(candidates, request);
        debug!(candidates = candidate_count, eligible = eligible.len(), "eligibility filtered");
        if eligible.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = eligible.iter().map(|m| m.id).collect();
        let slots = self.ledger.find_all_slots(request.date, &ids).await?;
        Ok(aggregate(&eligible, &slots))
    }
}
