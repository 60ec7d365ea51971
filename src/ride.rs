//! Ride domain record, field edits, and partial update payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    recurrence::Recurrence,
    types::{DriverId, RideId, RideStatus, RideType, RiderId, SchedulingState},
};

/// Marker key the backend reads to unset attributes on update.
pub const REMOVE_MARKER: &str = "$REMOVE";

/// Pickup or drop-off location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    /// Location id, empty for ad hoc addresses.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Abbreviated name for tables.
    pub short_name: Option<String>,
    /// Campus area tag.
    pub tag: Option<String>,
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lng: Option<f64>,
}

/// Driver summary embedded in a ride.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DriverRef {
    /// Driver id.
    pub id: DriverId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact phone number.
    pub phone_number: String,
}

/// Rider summary embedded in a ride.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RiderRef {
    /// Rider id.
    pub id: RiderId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

/// Ride record as returned by `/api/rides`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    /// Stable ride identifier.
    pub id: RideId,
    /// Pickup time.
    pub start_time: DateTime<Utc>,
    /// Drop-off time.
    pub end_time: DateTime<Utc>,
    /// Pickup location.
    pub start_location: Location,
    /// Drop-off location.
    pub end_location: Location,
    /// Day-of progress.
    #[serde(default)]
    pub status: RideStatus,
    /// Dispatch commitment.
    #[serde(default)]
    pub scheduling_state: SchedulingState,
    /// Time bucket.
    #[serde(rename = "type", default)]
    pub ride_type: RideType,
    /// Assigned driver, if any.
    #[serde(default)]
    pub driver: Option<DriverRef>,
    /// Rider being transported.
    #[serde(default)]
    pub rider: Option<RiderRef>,
    /// True for recurring parent templates.
    #[serde(default)]
    pub is_recurring: bool,
    /// Recurrence rule of a parent template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    /// Parent template of a concrete or virtual instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_ride_id: Option<RideId>,
    /// Client-synthesized instance not yet stored on the backend.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_virtual: bool,
}

/// Ride attributes an edit session may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RideField {
    /// Pickup time.
    StartTime,
    /// Drop-off time.
    EndTime,
    /// Pickup location.
    StartLocation,
    /// Drop-off location.
    EndLocation,
    /// Day-of progress.
    Status,
    /// Dispatch commitment.
    SchedulingState,
    /// Time bucket.
    Type,
    /// Assigned driver.
    Driver,
}

impl RideField {
    /// Every field compared by an edit session.
    pub const EDITABLE: [RideField; 8] = [
        RideField::StartTime,
        RideField::EndTime,
        RideField::StartLocation,
        RideField::EndLocation,
        RideField::Status,
        RideField::SchedulingState,
        RideField::Type,
        RideField::Driver,
    ];

    /// Returns true when `a` and `b` differ on this field.
    pub fn differs(self, a: &Ride, b: &Ride) -> bool {
        match self {
            RideField::StartTime => a.start_time != b.start_time,
            RideField::EndTime => a.end_time != b.end_time,
            RideField::StartLocation => a.start_location != b.start_location,
            RideField::EndLocation => a.end_location != b.end_location,
            RideField::Status => a.status != b.status,
            RideField::SchedulingState => a.scheduling_state != b.scheduling_state,
            RideField::Type => a.ride_type != b.ride_type,
            RideField::Driver => a.driver != b.driver,
        }
    }
}

/// A single typed field edit.
#[derive(Debug, Clone, PartialEq)]
pub enum RideEdit {
    /// New pickup time.
    StartTime(DateTime<Utc>),
    /// New drop-off time.
    EndTime(DateTime<Utc>),
    /// New pickup location.
    StartLocation(Location),
    /// New drop-off location.
    EndLocation(Location),
    /// New status.
    Status(RideStatus),
    /// New scheduling state.
    SchedulingState(SchedulingState),
    /// New time bucket.
    Type(RideType),
    /// New driver; `None` clears the assignment.
    Driver(Option<DriverRef>),
}

impl RideEdit {
    /// Field this edit touches.
    pub fn field(&self) -> RideField {
        match self {
            RideEdit::StartTime(_) => RideField::StartTime,
            RideEdit::EndTime(_) => RideField::EndTime,
            RideEdit::StartLocation(_) => RideField::StartLocation,
            RideEdit::EndLocation(_) => RideField::EndLocation,
            RideEdit::Status(_) => RideField::Status,
            RideEdit::SchedulingState(_) => RideField::SchedulingState,
            RideEdit::Type(_) => RideField::Type,
            RideEdit::Driver(_) => RideField::Driver,
        }
    }

    /// Applies this edit in place to `ride`.
    pub fn apply_to(self, ride: &mut Ride) {
        match self {
            RideEdit::StartTime(v) => ride.start_time = v,
            RideEdit::EndTime(v) => ride.end_time = v,
            RideEdit::StartLocation(v) => ride.start_location = v,
            RideEdit::EndLocation(v) => ride.end_location = v,
            RideEdit::Status(v) => ride.status = v,
            RideEdit::SchedulingState(v) => ride.scheduling_state = v,
            RideEdit::Type(v) => ride.ride_type = v,
            RideEdit::Driver(v) => ride.driver = v,
        }
    }
}

/// Partial body for `PUT /api/rides/{id}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RidePatch {
    /// Replacement pickup time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Replacement drop-off time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Replacement pickup location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_location: Option<Location>,
    /// Replacement drop-off location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_location: Option<Location>,
    /// Replacement status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RideStatus>,
    /// Replacement scheduling state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduling_state: Option<SchedulingState>,
    /// Replacement time bucket.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ride_type: Option<RideType>,
    /// Replacement driver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<DriverRef>,
    /// Attributes to unset.
    #[serde(rename = "$REMOVE", skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<String>,
}

impl RidePatch {
    /// Builds a patch holding every whitelisted field where `edited`
    /// differs from `original`.
    pub fn diff(original: &Ride, edited: &Ride) -> Self {
        let mut patch = Self::default();
        for field in RideField::EDITABLE {
            if !field.differs(original, edited) {
                continue;
            }
            match field {
                RideField::StartTime => patch.start_time = Some(edited.start_time),
                RideField::EndTime => patch.end_time = Some(edited.end_time),
                RideField::StartLocation => {
                    patch.start_location = Some(edited.start_location.clone())
                }
                RideField::EndLocation => patch.end_location = Some(edited.end_location.clone()),
                RideField::Status => patch.status = Some(edited.status),
                RideField::SchedulingState => patch.scheduling_state = Some(edited.scheduling_state),
                RideField::Type => patch.ride_type = Some(edited.ride_type),
                RideField::Driver => match &edited.driver {
                    Some(driver) => patch.driver = Some(driver.clone()),
                    None => patch.remove.push("driver".to_string()),
                },
            }
        }
        patch
    }

    /// Returns true when nothing would be sent.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// True when the patch unsets the driver.
    pub fn removes_driver(&self) -> bool {
        self.remove.iter().any(|k| k == "driver")
    }
}
