//! Optimistic operation records and identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::now_ms;

/// Identifier of one in-flight optimistic operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationId(String);

impl OperationId {
    /// Generates a fresh id of the form `<unix-ms>-<9 hex chars>`.
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", now_ms(), &suffix[..9]))
    }

    /// Borrows the id as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OperationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Domain tag attached to an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    /// Rider active flag toggle.
    UpdateRiderActive,
    /// Multi-field rider update.
    UpdateRiderInfo,
    /// Rider creation.
    CreateRider,
    /// Rider removal.
    DeleteRider,
    /// Ride cancellation.
    CancelRide,
    /// Caller-defined tag.
    Custom(String),
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::UpdateRiderActive => f.write_str("UPDATE_RIDER_ACTIVE"),
            OperationKind::UpdateRiderInfo => f.write_str("UPDATE_RIDER_INFO"),
            OperationKind::CreateRider => f.write_str("CREATE_RIDER"),
            OperationKind::DeleteRider => f.write_str("DELETE_RIDER"),
            OperationKind::CancelRide => f.write_str("CANCEL_RIDE"),
            OperationKind::Custom(tag) => f.write_str(tag),
        }
    }
}

/// Pending optimistic mutation as exposed to consumers.
///
/// Created on apply and dropped on confirm or rollback; never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimisticOperation {
    /// Operation id.
    pub id: OperationId,
    /// Domain tag.
    pub kind: OperationKind,
    /// Informational delta; never replayed.
    pub data: serde_json::Value,
    /// Apply time in milliseconds since epoch.
    pub timestamp_ms: u64,
}

impl OptimisticOperation {
    pub(crate) fn new(kind: OperationKind, data: serde_json::Value) -> Self {
        Self {
            id: OperationId::generate(),
            kind,
            data,
            timestamp_ms: now_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct_and_shaped() {
        let a = OperationId::generate();
        let b = OperationId::generate();
        assert_ne!(a, b);
        let (ms, suffix) = a.as_str().split_once('-').unwrap();
        assert!(ms.parse::<u64>().is_ok());
        assert_eq!(suffix.len(), 9);
    }

    #[test]
    fn kind_tags_render_screaming_snake() {
        assert_eq!(OperationKind::UpdateRiderActive.to_string(), "UPDATE_RIDER_ACTIVE");
        assert_eq!(
            serde_json::to_value(OperationKind::CreateRider).unwrap(),
            serde_json::json!("CREATE_RIDER")
        );
    }
}
