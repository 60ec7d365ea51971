use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc, Weekday};

use ridedesk::{
    api::{ApiError, ApiResult, RideApi},
    config::ClientConfig,
    core::store::{OptimisticUpdateOptions, RollbackCause},
    notify::ErrorBus,
    recurrence::Recurrence,
    ride::{Location, Ride, RidePatch},
    rides::{OptimisticRides, RideOpError},
    types::{RideStatus, RideType, SchedulingState},
};

/// Ride backend serving a fixed list; deletes fail for ids in `refuse`.
struct FixedRideApi {
    rides: Vec<Ride>,
    refuse: Vec<&'static str>,
    deletes: AtomicUsize,
}

#[async_trait]
impl RideApi for FixedRideApi {
    async fn list_rides(&self) -> ApiResult<Vec<Ride>> {
        Ok(self.rides.clone())
    }

    async fn update_ride(&self, _id: &str, _patch: &RidePatch) -> ApiResult<Ride> {
        Err(ApiError::Message("not used".to_string()))
    }

    async fn delete_ride(&self, id: &str) -> ApiResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.refuse.iter().any(|r| *r == id) {
            Err(ApiError::Status {
                status: 500,
                body: "db down".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

fn ride(id: &str, day: u32) -> Ride {
    Ride {
        id: id.to_string(),
        start_time: Utc.with_ymd_and_hms(2024, 3, day, 8, 0, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2024, 3, day, 8, 20, 0).unwrap(),
        start_location: Location::default(),
        end_location: Location::default(),
        status: RideStatus::NotStarted,
        scheduling_state: SchedulingState::Scheduled,
        ride_type: RideType::Upcoming,
        driver: None,
        rider: None,
        is_recurring: false,
        recurrence: None,
        parent_ride_id: None,
        is_virtual: false,
    }
}

fn recurring_parent() -> Ride {
    Ride {
        is_recurring: true,
        recurrence: Some(Recurrence {
            days: vec![Weekday::Wed],
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1).expect("date"),
            end_date: None,
        }),
        ..ride("weekly", 4)
    }
}

fn setup(refuse: Vec<&'static str>) -> (OptimisticRides, Arc<FixedRideApi>) {
    let api = Arc::new(FixedRideApi {
        rides: vec![ride("a", 6), ride("b", 6), recurring_parent()],
        refuse,
        deletes: AtomicUsize::new(0),
    });
    let rides = OptimisticRides::spawn(api.clone(), &ClientConfig::default());
    (rides, api)
}

fn ids(rides: &[Ride]) -> Vec<&str> {
    rides.iter().map(|r| r.id.as_str()).collect()
}

#[tokio::test]
async fn load_includes_virtual_instances() {
    let (rides, _api) = setup(Vec::new());
    let loaded = rides
        .load_for_date(NaiveDate::from_ymd_opt(2024, 3, 6).expect("date"))
        .await
        .expect("load");
    assert_eq!(ids(&loaded), vec!["a", "b", "weekly", "weekly-2024-03-06"]);

    let state = rides.state().await.expect("state");
    assert_eq!(state.data, loaded);
    assert!(!state.is_optimistic);
}

#[tokio::test]
async fn cancel_removes_ride_on_success() {
    let (rides, api) = setup(Vec::new());
    rides
        .load_for_date(NaiveDate::from_ymd_opt(2024, 3, 6).expect("date"))
        .await
        .expect("load");

    rides
        .cancel_ride("a", OptimisticUpdateOptions::default())
        .await
        .expect("cancel");

    let state = rides.state().await.expect("state");
    assert_eq!(ids(&state.data), vec!["b", "weekly", "weekly-2024-03-06"]);
    assert!(!state.is_optimistic);
    assert_eq!(api.deletes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_cancel_restores_ride_and_reports() {
    let (rides, _api) = setup(vec!["b"]);
    let bus = ErrorBus::default();
    let mut notices = bus.subscribe();
    let rides = rides.with_reporter(bus.reporter());
    rides
        .load_for_date(NaiveDate::from_ymd_opt(2024, 3, 6).expect("date"))
        .await
        .expect("load");

    let err = rides
        .cancel_ride("b", OptimisticUpdateOptions::default())
        .await
        .expect_err("refused");
    assert!(matches!(err, RideOpError::Remote(ApiError::Status { status: 500, .. })));

    let state = rides.state().await.expect("state");
    assert_eq!(ids(&state.data), vec!["a", "b", "weekly", "weekly-2024-03-06"]);
    assert!(matches!(state.error, Some(RollbackCause::Remote(_))));
    assert_eq!(notices.recv().await.expect("notice").title, "Could not cancel ride");
}

#[tokio::test]
async fn virtual_and_unknown_rides_are_refused_locally() {
    let (rides, api) = setup(Vec::new());
    rides
        .load_for_date(NaiveDate::from_ymd_opt(2024, 3, 6).expect("date"))
        .await
        .expect("load");

    let err = rides
        .cancel_ride("weekly-2024-03-06", OptimisticUpdateOptions::default())
        .await
        .expect_err("virtual");
    assert!(matches!(err, RideOpError::VirtualInstance(_)));

    let err = rides
        .cancel_ride("zzz", OptimisticUpdateOptions::default())
        .await
        .expect_err("missing");
    assert!(matches!(err, RideOpError::NotFound(_)));

    assert!(rides.state().await.expect("state").pending_operations.is_empty());
    assert_eq!(api.deletes.load(Ordering::SeqCst), 0);
}
