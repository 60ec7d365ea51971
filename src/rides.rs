//! Ride list loading and optimistic ride cancellation.

use std::{sync::Arc, time::Duration};

use chrono::NaiveDate;
use serde_json::json;
use tracing::warn;

use crate::{
    api::{ApiError, RideApi},
    config::ClientConfig,
    core::store::{OptimisticState, OptimisticStore, OptimisticUpdateOptions, RollbackCause},
    notify::ErrorReporter,
    op::OperationKind,
    recurrence::materialize_for_date,
    ride::Ride,
    runtime::handle::{spawn_collection, CollectionHandle, RuntimeError},
    types::RideId,
};

/// Failure of an optimistic ride operation.
#[derive(Debug, thiserror::Error)]
pub enum RideOpError {
    /// The ride is not in the local collection; nothing was applied.
    #[error("ride {0} not found")]
    NotFound(RideId),
    /// The ride was synthesized from a recurring parent and has no
    /// backend record yet.
    #[error("ride {0} is a virtual recurring instance")]
    VirtualInstance(RideId),
    /// The remote call failed; the optimistic change was rolled back.
    #[error(transparent)]
    Remote(#[from] ApiError),
    /// The collection runtime stopped.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Ride collection as listed by the backend, plus the virtual recurring
/// instances of the most recently loaded date.
#[derive(Clone)]
pub struct OptimisticRides {
    handle: CollectionHandle<Vec<Ride>>,
    api: Arc<dyn RideApi>,
    delete_timeout: Duration,
    reporter: Option<ErrorReporter>,
}

impl OptimisticRides {
    /// Spawns an empty runtime wired to `api`.
    pub fn spawn(api: Arc<dyn RideApi>, config: &ClientConfig) -> Self {
        let store = OptimisticStore::with_policy(Vec::new(), config.refresh_policy);
        Self {
            handle: spawn_collection(store, config.runtime.clone()),
            api,
            delete_timeout: Duration::from_millis(config.delete_timeout_ms),
            reporter: None,
        }
    }

    /// Publishes remote failures to `reporter` after rolling back.
    pub fn with_reporter(mut self, reporter: ErrorReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Underlying collection handle.
    pub fn handle(&self) -> &CollectionHandle<Vec<Ride>> {
        &self.handle
    }

    /// Snapshot of the collection.
    pub async fn state(&self) -> Result<OptimisticState<Vec<Ride>>, RuntimeError> {
        self.handle.state().await
    }

    /// Fetches every ride, adds virtual instances for `date`, and hands the
    /// result to the store as server truth. Listed rides are kept whatever
    /// their date; only the virtual instances are specific to `date`.
    pub async fn load_for_date(&self, date: NaiveDate) -> Result<Vec<Ride>, RideOpError> {
        let rides = self.api.list_rides().await?;
        let rides = materialize_for_date(rides, date);
        self.handle.update_server_data(rides.clone()).await?;
        Ok(rides)
    }

    /// Removes a ride locally and issues `DELETE /api/rides/{id}`.
    pub async fn cancel_ride(
        &self,
        id: &str,
        mut options: OptimisticUpdateOptions<Vec<Ride>>,
    ) -> Result<(), RideOpError> {
        let timeout = options.timeout.take().unwrap_or(self.delete_timeout);
        let target = id.to_string();

        let op_id = self
            .handle
            .apply_with::<RideOpError, _>(
                OperationKind::CancelRide,
                json!({ "id": id }),
                Some(timeout),
                move |rides: &Vec<Ride>| {
                    let ride = rides
                        .iter()
                        .find(|r| r.id == target)
                        .ok_or_else(|| RideOpError::NotFound(target.clone()))?;
                    if ride.is_virtual {
                        return Err(RideOpError::VirtualInstance(target));
                    }
                    Ok(rides.iter().filter(|r| r.id != target).cloned().collect())
                },
            )
            .await?;

        match self.api.delete_ride(id).await {
            Ok(()) => {
                self.handle.confirm(op_id, None, options).await?;
                Ok(())
            }
            Err(err) => {
                warn!(op_id = %op_id, error = %err, "ride cancellation failed, rolling back");
                self.handle
                    .rollback(op_id, Some(RollbackCause::Remote(err.to_string())), options)
                    .await?;
                if let Some(reporter) = &self.reporter {
                    reporter.report("Could not cancel ride", err.to_string());
                }
                Err(err.into())
            }
        }
    }
}
