//! Optimistic rider operations.
//!
//! Each operation makes its effect visible through the collection runtime
//! first, then issues the REST call, then confirms with the server's
//! representation or rolls back. Remote failures are returned to the caller
//! only after the rollback has landed.

use std::{sync::Arc, time::Duration};

use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::{
    api::{ApiError, RiderApi},
    config::ClientConfig,
    core::store::{OptimisticState, OptimisticStore, OptimisticUpdateOptions, RollbackCause},
    notify::ErrorReporter,
    op::{OperationId, OperationKind},
    rider::{Rider, RiderDraft, RiderPatch},
    runtime::handle::{spawn_collection, CollectionHandle, RuntimeError},
    types::RiderId,
};

/// Failure of an optimistic rider operation.
#[derive(Debug, thiserror::Error)]
pub enum RiderOpError {
    /// The rider is not in the local collection; nothing was applied.
    #[error("rider {0} not found")]
    NotFound(RiderId),
    /// The remote call failed; the optimistic change was rolled back.
    #[error(transparent)]
    Remote(#[from] ApiError),
    /// The collection runtime stopped.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Default auto-rollback windows per operation weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiderTimeouts {
    /// Single-field toggles.
    pub toggle: Duration,
    /// Multi-field updates.
    pub update: Duration,
    /// Creates.
    pub create: Duration,
    /// Deletes.
    pub delete: Duration,
}

impl Default for RiderTimeouts {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for RiderTimeouts {
    fn from(config: &ClientConfig) -> Self {
        Self {
            toggle: Duration::from_millis(config.toggle_timeout_ms),
            update: Duration::from_millis(config.update_timeout_ms),
            create: Duration::from_millis(config.create_timeout_ms),
            delete: Duration::from_millis(config.delete_timeout_ms),
        }
    }
}

/// Rider collection with optimistic mutations.
#[derive(Clone)]
pub struct OptimisticRiders {
    handle: CollectionHandle<Vec<Rider>>,
    api: Arc<dyn RiderApi>,
    timeouts: RiderTimeouts,
    reporter: Option<ErrorReporter>,
}

impl OptimisticRiders {
    /// Spawns a runtime holding `initial` and wires it to `api`.
    pub fn spawn(initial: Vec<Rider>, api: Arc<dyn RiderApi>, config: &ClientConfig) -> Self {
        let store = OptimisticStore::with_policy(initial, config.refresh_policy);
        let handle = spawn_collection(store, config.runtime.clone());
        Self::new(handle, api, RiderTimeouts::from(config))
    }

    /// Wraps an existing runtime handle.
    pub fn new(handle: CollectionHandle<Vec<Rider>>, api: Arc<dyn RiderApi>, timeouts: RiderTimeouts) -> Self {
        Self {
            handle,
            api,
            timeouts,
            reporter: None,
        }
    }

    /// Publishes remote failures to `reporter` after rolling back.
    pub fn with_reporter(mut self, reporter: ErrorReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Underlying collection handle.
    pub fn handle(&self) -> &CollectionHandle<Vec<Rider>> {
        &self.handle
    }

    /// Snapshot of the collection.
    pub async fn state(&self) -> Result<OptimisticState<Vec<Rider>>, RuntimeError> {
        self.handle.state().await
    }

    /// Discards every pending rider operation.
    pub async fn rollback_all(&self) -> Result<Vec<OperationId>, RuntimeError> {
        self.handle.rollback_all().await
    }

    /// Clears the last rollback cause.
    pub async fn clear_error(&self) -> Result<(), RuntimeError> {
        self.handle.clear_error().await
    }

    /// Reloads the collection from `GET /api/riders`.
    pub async fn refresh(&self) -> Result<(), RiderOpError> {
        let riders = self.api.list_riders().await?;
        self.handle.update_server_data(riders).await?;
        Ok(())
    }

    /// Sets a rider's active flag.
    pub async fn update_rider_active(
        &self,
        id: &str,
        active: bool,
        options: OptimisticUpdateOptions<Vec<Rider>>,
    ) -> Result<Rider, RiderOpError> {
        let patch = RiderPatch::active(active);
        let data = json!({ "id": id, "active": active });
        self.patch_rider(id, patch, OperationKind::UpdateRiderActive, data, self.timeouts.toggle, options)
            .await
    }

    /// Merges `patch` into a rider.
    pub async fn update_rider_info(
        &self,
        id: &str,
        patch: RiderPatch,
        options: OptimisticUpdateOptions<Vec<Rider>>,
    ) -> Result<Rider, RiderOpError> {
        let data = json!({ "id": id, "patch": &patch });
        self.patch_rider(id, patch, OperationKind::UpdateRiderInfo, data, self.timeouts.update, options)
            .await
    }

    /// Inserts a provisional rider, replaced by the server's on success.
    pub async fn create_rider(
        &self,
        draft: RiderDraft,
        mut options: OptimisticUpdateOptions<Vec<Rider>>,
    ) -> Result<Rider, RiderOpError> {
        let temp_id = format!("temp-{}", Uuid::new_v4().simple());
        let provisional = draft.clone().into_rider(temp_id.clone());
        let timeout = options.timeout.take().unwrap_or(self.timeouts.create);

        let op_id = self
            .handle
            .apply_with::<RiderOpError, _>(
                OperationKind::CreateRider,
                json!({ "tempId": &temp_id }),
                Some(timeout),
                move |riders| {
                    let mut next = riders.clone();
                    next.push(provisional);
                    Ok(next)
                },
            )
            .await?;

        let res = self.api.create_rider(&draft).await;
        self.resolve(op_id, res, options, "Could not add rider", move |created| {
            let created = created.clone();
            move |riders: &Vec<Rider>| {
                let mut next = riders.clone();
                match next.iter_mut().find(|r| r.id == temp_id) {
                    Some(slot) => *slot = created,
                    None => next.push(created),
                }
                next
            }
        })
        .await
    }

    /// Removes a rider.
    pub async fn delete_rider(
        &self,
        id: &str,
        mut options: OptimisticUpdateOptions<Vec<Rider>>,
    ) -> Result<(), RiderOpError> {
        let timeout = options.timeout.take().unwrap_or(self.timeouts.delete);
        let target = id.to_string();

        let op_id = self
            .handle
            .apply_with::<RiderOpError, _>(OperationKind::DeleteRider, json!({ "id": id }), Some(timeout), move |riders: &Vec<Rider>| {
                if !riders.iter().any(|r| r.id == target) {
                    return Err(RiderOpError::NotFound(target));
                }
                Ok(riders.iter().filter(|r| r.id != target).cloned().collect())
            })
            .await?;

        let res = self.api.delete_rider(id).await;
        self.resolve(op_id, res, options, "Could not delete rider", |_| {
            |riders: &Vec<Rider>| riders.clone()
        })
        .await
    }

    async fn patch_rider(
        &self,
        id: &str,
        patch: RiderPatch,
        kind: OperationKind,
        data: serde_json::Value,
        default_timeout: Duration,
        mut options: OptimisticUpdateOptions<Vec<Rider>>,
    ) -> Result<Rider, RiderOpError> {
        let timeout = options.timeout.take().unwrap_or(default_timeout);
        let target = id.to_string();
        let local = patch.clone();

        let op_id = self
            .handle
            .apply_with::<RiderOpError, _>(kind, data, Some(timeout), move |riders: &Vec<Rider>| {
                let mut next = riders.clone();
                let rider = next
                    .iter_mut()
                    .find(|r| r.id == target)
                    .ok_or_else(|| RiderOpError::NotFound(target.clone()))?;
                local.apply_to(rider);
                Ok(next)
            })
            .await?;

        let res = self.api.update_rider(id, &patch).await;
        self.resolve(op_id, res, options, "Could not update rider", |updated: &Rider| {
            let updated = updated.clone();
            move |riders: &Vec<Rider>| splice(riders, updated)
        })
        .await
    }

    /// Confirms with the reconciled collection on success, rolls back and
    /// reports on failure.
    async fn resolve<R, M, F>(
        &self,
        op_id: OperationId,
        res: Result<R, ApiError>,
        options: OptimisticUpdateOptions<Vec<Rider>>,
        failure_title: &str,
        reconcile: M,
    ) -> Result<R, RiderOpError>
    where
        M: FnOnce(&R) -> F,
        F: FnOnce(&Vec<Rider>) -> Vec<Rider> + Send + 'static,
    {
        match res {
            Ok(value) => {
                self.handle
                    .confirm_with(op_id, reconcile(&value), options)
                    .await?;
                Ok(value)
            }
            Err(err) => {
                warn!(op_id = %op_id, error = %err, "rider operation failed, rolling back");
                self.handle
                    .rollback(op_id, Some(RollbackCause::Remote(err.to_string())), options)
                    .await?;
                if let Some(reporter) = &self.reporter {
                    reporter.report(failure_title, err.to_string());
                }
                Err(err.into())
            }
        }
    }
}

fn splice(riders: &[Rider], updated: Rider) -> Vec<Rider> {
    riders
        .iter()
        .map(|r| if r.id == updated.id { updated.clone() } else { r.clone() })
        .collect()
}
