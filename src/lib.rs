//! Optimistic client-side state for student ride dispatch.
//!
//! Collections of riders and rides are held by a single-writer runtime that
//! applies edits immediately and reconciles them with the REST backend,
//! rolling back on failure or timeout.
//!
//! # Examples
//!
//! Store transitions without a runtime, using [`core::store::OptimisticStore`]:
//! ```
//! use ridedesk::{
//!     core::store::{OptimisticStore, OptimisticUpdateOptions},
//!     op::OperationKind,
//! };
//!
//! let mut store = OptimisticStore::new(vec!["a".to_string()]);
//! let id = store.apply(vec![], OperationKind::DeleteRider, serde_json::json!({}), None);
//! assert!(store.is_optimistic());
//! store.rollback(&id, None, OptimisticUpdateOptions::default());
//! assert_eq!(store.data(), &vec!["a".to_string()]);
//! ```
//!
//! Rider operations against the HTTP backend:
//! ```no_run
//! use std::sync::Arc;
//!
//! use ridedesk::{
//!     api::http::HttpApi,
//!     config::ClientConfig,
//!     core::store::OptimisticUpdateOptions,
//!     riders::OptimisticRiders,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = ClientConfig::default();
//! let api = Arc::new(HttpApi::new(&config).expect("client"));
//! let riders = OptimisticRiders::spawn(Vec::new(), api, &config);
//! riders.refresh().await.expect("refresh");
//! let _ = riders
//!     .update_rider_active("r1", false, OptimisticUpdateOptions::default())
//!     .await;
//! # }
//! ```
#![deny(missing_docs)]

/// Remote REST traits and the HTTP implementation.
pub mod api;
/// Client configuration.
pub mod config;
/// Operation ledger and optimistic store.
pub mod core;
/// Error notification bus.
pub mod notify;
/// Optimistic operation records.
pub mod op;
/// Recurring ride expansion.
pub mod recurrence;
/// Ride records, edits, and patches.
pub mod ride;
/// Single-ride edit session.
pub mod ride_edit;
/// Rider records and patches.
pub mod rider;
/// Optimistic rider operations.
pub mod riders;
/// Ride loading and cancellation.
pub mod rides;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Shared primitive types and enums.
pub mod types;
