//! Rider domain record, draft, and patch types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::RiderId;

/// Rider record as returned by `/api/riders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Rider {
    /// Stable rider identifier.
    pub id: RiderId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone number.
    pub phone_number: String,
    /// Accessibility needs such as "wheelchair".
    pub accessibility: Vec<String>,
    /// Free-form notes for drivers.
    pub description: String,
    /// First day the rider may book rides.
    pub join_date: Option<NaiveDate>,
    /// Last day the rider may book rides.
    pub end_date: Option<NaiveDate>,
    /// Home address.
    pub address: String,
    /// Saved location ids.
    pub favorite_locations: Vec<String>,
    /// Whether the rider may currently book rides.
    pub active: bool,
    /// Last day the rider used the service.
    pub last_seen: Option<NaiveDate>,
}

/// Create payload for a new [`Rider`]; the backend assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RiderDraft {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone number.
    pub phone_number: String,
    /// Accessibility needs.
    pub accessibility: Vec<String>,
    /// Free-form notes for drivers.
    pub description: String,
    /// First day the rider may book rides.
    pub join_date: Option<NaiveDate>,
    /// Last day the rider may book rides.
    pub end_date: Option<NaiveDate>,
    /// Home address.
    pub address: String,
    /// Whether the rider starts out active.
    pub active: bool,
}

impl RiderDraft {
    /// Materializes the draft under a provisional id.
    pub fn into_rider(self, id: RiderId) -> Rider {
        Rider {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone_number: self.phone_number,
            accessibility: self.accessibility,
            description: self.description,
            join_date: self.join_date,
            end_date: self.end_date,
            address: self.address,
            favorite_locations: Vec::new(),
            active: self.active,
            last_seen: None,
        }
    }
}

/// Sparse patch where each `Some` field overwrites the rider value.
///
/// Serializes to the partial body sent with `PUT /api/riders/{id}`.
///
/// A `None` field leaves the rider value alone, so `join_date` and
/// `end_date` can be set or moved but not cleared through a patch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderPatch {
    /// Optional replacement for given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Optional replacement for family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Optional replacement for email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Optional replacement for phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Optional replacement for accessibility needs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<Vec<String>>,
    /// Optional replacement for description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional replacement for join date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_date: Option<NaiveDate>,
    /// Optional replacement for end date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Optional replacement for address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Optional replacement for favorite locations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_locations: Option<Vec<String>>,
    /// Optional replacement for the active flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl RiderPatch {
    /// Patch that only flips the active flag.
    pub fn active(active: bool) -> Self {
        Self {
            active: Some(active),
            ..Self::default()
        }
    }

    /// Returns true when no fields are set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Applies this patch in place to `rider`.
    pub fn apply_to(&self, rider: &mut Rider) {
        if let Some(v) = &self.first_name {
            rider.first_name = v.clone();
        }
        if let Some(v) = &self.last_name {
            rider.last_name = v.clone();
        }
        if let Some(v) = &self.email {
            rider.email = v.clone();
        }
        if let Some(v) = &self.phone_number {
            rider.phone_number = v.clone();
        }
        if let Some(v) = &self.accessibility {
            rider.accessibility = v.clone();
        }
        if let Some(v) = &self.description {
            rider.description = v.clone();
        }
        if let Some(v) = self.join_date {
            rider.join_date = Some(v);
        }
        if let Some(v) = self.end_date {
            rider.end_date = Some(v);
        }
        if let Some(v) = &self.address {
            rider.address = v.clone();
        }
        if let Some(v) = &self.favorite_locations {
            rider.favorite_locations = v.clone();
        }
        if let Some(v) = self.active {
            rider.active = v;
        }
    }
}
