//! Shared primitive IDs and dispatch-related enums.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Rider identifier as assigned by the backend.
pub type RiderId = String;
/// Ride identifier as assigned by the backend.
pub type RideId = String;
/// Driver identifier as assigned by the backend.
pub type DriverId = String;

/// Role of the person viewing or editing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Dispatcher with full edit rights.
    Admin,
    /// Student who booked the ride.
    Rider,
    /// Driver assigned to rides.
    Driver,
}

/// Progress of a ride on the day it happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    /// Nothing has happened yet.
    #[default]
    NotStarted,
    /// Driver is heading to the pickup.
    OnTheWay,
    /// Driver is at the pickup.
    Arrived,
    /// Rider is in the vehicle.
    PickedUp,
    /// Ride finished.
    Completed,
    /// Rider did not show up.
    NoShow,
    /// Ride was cancelled.
    Cancelled,
}

/// Whether dispatch has committed a driver and slot to the ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingState {
    /// Driver and time slot confirmed.
    Scheduled,
    /// Requested but not yet scheduled.
    #[default]
    Unscheduled,
}

/// Time bucket of a ride relative to now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RideType {
    /// Starts in the future.
    #[default]
    Upcoming,
    /// Currently in progress.
    Active,
    /// Already happened.
    Past,
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
