//! Single-ride edit session: begin, diff, commit, discard.
//!
//! The session keeps two copies while editing: the snapshot taken when
//! editing started and the working copy. Saving sends only the fields that
//! differ between them. A failed save keeps the working copy so the user
//! can retry or cancel.

use tracing::{debug, warn};

use crate::{
    api::{ApiError, RideApi},
    ride::{Ride, RideEdit, RideField, RidePatch},
    types::{Role, SchedulingState},
};

/// Edit state for one ride shown to one viewer.
#[derive(Debug, Clone)]
pub struct RideEditSession {
    role: Role,
    ride: Ride,
    edited: Option<Ride>,
    original: Option<Ride>,
}

impl RideEditSession {
    /// Opens a session in viewing mode.
    pub fn new(ride: Ride, role: Role) -> Self {
        Self {
            role,
            ride,
            edited: None,
            original: None,
        }
    }

    /// Viewer role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Changes the viewer role; editability follows immediately.
    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    /// Canonical ride as last received.
    pub fn ride(&self) -> &Ride {
        &self.ride
    }

    /// Replaces the canonical ride. An open edit keeps its working copy.
    pub fn set_ride(&mut self, ride: Ride) {
        self.ride = ride;
    }

    /// Drivers never edit; riders edit only unscheduled rides; admins
    /// always edit.
    pub fn can_edit(&self) -> bool {
        match self.role {
            Role::Driver => false,
            Role::Rider => self.ride.scheduling_state == SchedulingState::Unscheduled,
            Role::Admin => true,
        }
    }

    /// True while an edit is open.
    pub fn is_editing(&self) -> bool {
        self.edited.is_some()
    }

    /// Working copy while editing, otherwise the canonical ride.
    pub fn edited_ride(&self) -> &Ride {
        self.edited.as_ref().unwrap_or(&self.ride)
    }

    /// Snapshot taken when editing started.
    pub fn original_ride(&self) -> Option<&Ride> {
        self.original.as_ref()
    }

    /// Enters editing mode. Returns false when editing is not permitted;
    /// an edit already open is left untouched.
    pub fn start_editing(&mut self) -> bool {
        if !self.can_edit() {
            return false;
        }
        if self.is_editing() {
            return true;
        }
        self.original = Some(self.ride.clone());
        self.edited = Some(self.ride.clone());
        true
    }

    /// Discards edits and returns to viewing mode.
    pub fn stop_editing(&mut self) {
        self.edited = None;
        self.original = None;
    }

    /// Applies one field edit to the working copy. Ignored when not editing.
    pub fn update_ride_field(&mut self, edit: RideEdit) {
        if let Some(ride) = self.edited.as_mut() {
            edit.apply_to(ride);
        }
    }

    /// Fields of the working copy that differ from the snapshot.
    pub fn changed_fields(&self) -> Vec<RideField> {
        match (&self.original, &self.edited) {
            (Some(original), Some(edited)) => RideField::EDITABLE
                .into_iter()
                .filter(|f| f.differs(original, edited))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// True iff at least one editable field changed.
    pub fn has_changes(&self) -> bool {
        !self.changed_fields().is_empty()
    }

    /// Partial update body for the current edits.
    pub fn build_patch(&self) -> RidePatch {
        match (&self.original, &self.edited) {
            (Some(original), Some(edited)) => RidePatch::diff(original, edited),
            _ => RidePatch::default(),
        }
    }

    /// Persists the edits.
    ///
    /// Returns `Ok(false)` without any remote call when nothing changed.
    /// On success `on_update` receives the server's ride, which also
    /// becomes the canonical ride, and the session returns to viewing.
    ///
    /// # Errors
    ///
    /// Returns the remote error; the session stays in editing mode with
    /// its edits intact.
    pub async fn save_changes(
        &mut self,
        api: &dyn RideApi,
        on_update: impl FnOnce(&Ride),
    ) -> Result<bool, ApiError> {
        if !self.has_changes() {
            return Ok(false);
        }

        let patch = self.build_patch();
        let id = self.ride.id.clone();
        debug!(ride_id = %id, fields = ?self.changed_fields(), "saving ride edits");

        match api.update_ride(&id, &patch).await {
            Ok(updated) => {
                on_update(&updated);
                self.ride = updated;
                self.stop_editing();
                Ok(true)
            }
            Err(err) => {
                warn!(ride_id = %id, error = %err, "failed to save ride edits");
                Err(err)
            }
        }
    }
}
