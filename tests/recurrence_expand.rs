use chrono::{NaiveDate, TimeZone, Utc, Weekday};

use ridedesk::{
    recurrence::{expand, materialize_for_date, Recurrence},
    ride::{DriverRef, Location, Ride},
    types::{RideStatus, RideType, SchedulingState},
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("date")
}

fn parent() -> Ride {
    Ride {
        id: "p1".to_string(),
        // Monday 2024-03-04, ending just after midnight.
        start_time: Utc.with_ymd_and_hms(2024, 3, 4, 23, 40, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2024, 3, 5, 0, 10, 0).unwrap(),
        start_location: Location {
            name: "Gym".to_string(),
            ..Location::default()
        },
        end_location: Location {
            name: "North Dorm".to_string(),
            ..Location::default()
        },
        status: RideStatus::Completed,
        scheduling_state: SchedulingState::Scheduled,
        ride_type: RideType::Past,
        driver: Some(DriverRef {
            id: "d1".to_string(),
            ..DriverRef::default()
        }),
        rider: None,
        is_recurring: true,
        recurrence: Some(Recurrence {
            days: vec![Weekday::Mon, Weekday::Wed],
            start_date: date(2024, 3, 4),
            end_date: Some(date(2024, 3, 31)),
        }),
        parent_ride_id: None,
        is_virtual: false,
    }
}

#[test]
fn rule_respects_weekdays_and_bounds() {
    let rule = parent().recurrence.expect("rule");
    assert!(rule.occurs_on(date(2024, 3, 6)));
    assert!(!rule.occurs_on(date(2024, 3, 7)));
    assert!(!rule.occurs_on(date(2024, 2, 26)));
    assert!(rule.occurs_on(date(2024, 3, 25)));
    assert!(!rule.occurs_on(date(2024, 4, 1)));
}

#[test]
fn instance_moves_date_and_keeps_time_of_day() {
    let instance = expand(&parent(), date(2024, 3, 13));

    assert_eq!(instance.id, "p1-2024-03-13");
    assert_eq!(instance.start_time, Utc.with_ymd_and_hms(2024, 3, 13, 23, 40, 0).unwrap());
    assert_eq!(instance.end_time, Utc.with_ymd_and_hms(2024, 3, 14, 0, 10, 0).unwrap());
    assert_eq!(instance.parent_ride_id.as_deref(), Some("p1"));
    assert!(instance.is_virtual);
    assert!(!instance.is_recurring);
    assert!(instance.recurrence.is_none());
    assert!(instance.driver.is_none());
    assert_eq!(instance.scheduling_state, SchedulingState::Unscheduled);
    assert_eq!(instance.ride_type, RideType::Upcoming);
    assert_eq!(instance.start_location.name, "Gym");
}

#[test]
fn materialize_skips_days_with_concrete_instances() {
    let day = date(2024, 3, 11);
    let mut concrete = expand(&parent(), day);
    concrete.id = "c1".to_string();
    concrete.is_virtual = false;

    let rides = materialize_for_date(vec![parent(), concrete.clone()], day);
    assert_eq!(rides, vec![parent(), concrete]);
}

#[test]
fn materialize_appends_virtual_instances() {
    let rides = materialize_for_date(vec![parent()], date(2024, 3, 6));
    assert_eq!(rides.len(), 2);
    assert_eq!(rides[1].id, "p1-2024-03-06");
    assert!(rides[1].is_virtual);

    // Off-pattern day adds nothing.
    assert_eq!(materialize_for_date(vec![parent()], date(2024, 3, 8)).len(), 1);
}

#[test]
fn virtual_flag_is_omitted_for_stored_rides() {
    let json = serde_json::to_value(parent()).expect("json");
    assert!(json.get("isVirtual").is_none());
    assert_eq!(json["type"], "past");

    let json = serde_json::to_value(expand(&parent(), date(2024, 3, 6))).expect("json");
    assert_eq!(json["isVirtual"], true);
}

#[test]
fn parent_is_the_instance_on_its_own_start_date() {
    let first_day = date(2024, 3, 4);
    assert!(parent().recurrence.expect("rule").occurs_on(first_day));

    let rides = materialize_for_date(vec![parent()], first_day);
    assert_eq!(rides, vec![parent()]);

    // The following week still expands.
    let rides = materialize_for_date(vec![parent()], date(2024, 3, 11));
    assert_eq!(rides.len(), 2);
    assert_eq!(rides[1].id, "p1-2024-03-11");
}
