//! Materialize-on-read expansion of recurring ride templates.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::{
    ride::Ride,
    types::{RideType, SchedulingState},
};

/// Weekly recurrence of a parent ride.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    /// Weekdays on which the ride repeats.
    pub days: Vec<Weekday>,
    /// First date an instance may exist.
    pub start_date: NaiveDate,
    /// Last date an instance may exist, inclusive.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl Recurrence {
    /// Returns true when an instance falls on `date`.
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        if date < self.start_date {
            return false;
        }
        if self.end_date.is_some_and(|end| date > end) {
            return false;
        }
        self.days.contains(&date.weekday())
    }
}

/// Builds the virtual instance of `parent` on `date`.
///
/// Only the date components move: time of day is kept, and the end keeps
/// its day offset from the start.
pub fn expand(parent: &Ride, date: NaiveDate) -> Ride {
    let start_time = with_date(parent.start_time, date);
    let end_offset = parent.end_time.date_naive() - parent.start_time.date_naive();
    let end_time = with_date(parent.end_time, date + end_offset);

    Ride {
        id: format!("{}-{}", parent.id, date.format("%Y-%m-%d")),
        start_time,
        end_time,
        scheduling_state: SchedulingState::Unscheduled,
        ride_type: RideType::Upcoming,
        driver: None,
        is_recurring: false,
        recurrence: None,
        parent_ride_id: Some(parent.id.clone()),
        is_virtual: true,
        ..parent.clone()
    }
}

/// Appends a virtual instance for every recurring parent that occurs on
/// `date` and has no concrete instance starting that day. The parent itself
/// counts as the concrete instance on its own start date.
pub fn materialize_for_date(rides: Vec<Ride>, date: NaiveDate) -> Vec<Ride> {
    let virtuals: Vec<Ride> = rides
        .iter()
        .filter(|r| r.is_recurring)
        .filter(|r| r.recurrence.as_ref().is_some_and(|rule| rule.occurs_on(date)))
        .filter(|parent| parent.start_time.date_naive() != date)
        .filter(|parent| {
            !rides.iter().any(|r| {
                r.parent_ride_id.as_deref() == Some(parent.id.as_str())
                    && r.start_time.date_naive() == date
            })
        })
        .map(|parent| expand(parent, date))
        .collect();

    let mut out = rides;
    out.extend(virtuals);
    out
}

fn with_date(at: DateTime<Utc>, date: NaiveDate) -> DateTime<Utc> {
    let shift: Duration = date - at.date_naive();
    at + shift
}
