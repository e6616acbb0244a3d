use chrono::{NaiveTime, Weekday};
use tracing::*;

use crate::*;
use crate::data::{day_name, Trip, WeekTime};
use crate::toll::TollRecord;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DayClass {
    Weekday,
    Weekend,
}

impl DayClass {
    pub fn of(day: Weekday) -> Self {
        match day {
            Weekday::Sat | Weekday::Sun => DayClass::Weekend,
            _ => DayClass::Weekday,
        }
    }
}

/// A time-of-day band on one class of days with its toll multiplier.  The start bound is always
/// inclusive.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TimeWindow {
    pub day_class: DayClass,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub end_inclusive: bool,
    pub discount: f64,
}

impl TimeWindow {
    pub fn contains(&self, t: NaiveTime) -> bool {
        self.start <= t && if self.end_inclusive { t <= self.end } else { t < self.end }
    }

    /// Both times of day must lie in the window; only the start day is checked against the day class.
    pub fn matches(&self, start: &WeekTime, end: &WeekTime) -> bool {
        DayClass::of(start.day) == self.day_class && self.contains(start.time) && self.contains(end.time)
    }
}

fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, s).expect("schedule bounds are valid times of day")
}

/// Ordered list of non-overlapping windows.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    windows: Vec<TimeWindow>,
}

impl Schedule {
    pub fn new(windows: Vec<TimeWindow>) -> Self {
        Schedule { windows }
    }

    /// Weekdays: 0.8 before 10:00, 1.2 until 18:00, 0.8 until 23:59:59 (exclusive).
    /// Weekends: 0.7 over the whole day, 23:59:59 inclusive.
    pub fn standard() -> Self {
        let weekday = |start, end, discount| TimeWindow {
            day_class: DayClass::Weekday, start, end, end_inclusive: false, discount,
        };
        Schedule::new(vec![
            weekday(hms(0, 0, 0), hms(10, 0, 0), 0.8),
            weekday(hms(10, 0, 0), hms(18, 0, 0), 1.2),
            weekday(hms(18, 0, 0), hms(23, 59, 59), 0.8),
            TimeWindow {
                day_class: DayClass::Weekend,
                start: hms(0, 0, 0),
                end: hms(23, 59, 59),
                end_inclusive: true,
                discount: 0.7,
            },
        ])
    }

    pub fn windows(&self) -> &[TimeWindow] {
        &self.windows
    }

    /// First window containing the whole trip, if any.  A trip that crosses a window boundary
    /// matches nothing.
    pub fn window_for(&self, start: &WeekTime, end: &WeekTime) -> Option<&TimeWindow> {
        self.windows.iter().find(|w| w.matches(start, end))
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::standard()
    }
}

/// A toll record for one concrete trip.  `discount` is set once a schedule window has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedTollRecord<L> {
    pub toll: TollRecord<L>,
    pub start: WeekTime,
    pub end: WeekTime,
    pub discount: Option<f64>,
}

impl<L> TimedTollRecord<L> {
    pub fn new(toll: TollRecord<L>, start: WeekTime, end: WeekTime) -> Self {
        TimedTollRecord { toll, start, end, discount: None }
    }

    pub fn start_day(&self) -> &'static str { day_name(self.start.day) }

    pub fn end_day(&self) -> &'static str { day_name(self.end.day) }

    pub fn start_time(&self) -> NaiveTime { self.start.time }

    pub fn end_time(&self) -> NaiveTime { self.end.time }
}

/// Pair every trip with the toll record of its `(origin, destination)`.  Trips without one are
/// skipped.
#[instrument(level="debug", skip(tolls, trips), fields(tolls=tolls.len(), trips=trips.len()))]
pub fn attach_trips<L: Location>(tolls: &[TollRecord<L>], trips: &[Trip<L>]) -> Vec<TimedTollRecord<L>> {
    let by_pair: Map<(&L, &L), &TollRecord<L>> = tolls.iter()
        .map(|t| ((&t.origin, &t.destination), t))
        .collect();

    let timed: Vec<_> = trips.iter()
        .filter_map(|trip| match by_pair.get(&(&trip.origin, &trip.destination)) {
            Some(&toll) => Some(TimedTollRecord::new(toll.clone(), trip.start, trip.end)),
            None => {
                debug!(origin=%trip.origin, destination=%trip.destination, "no toll record for trip");
                None
            }
        })
        .collect();
    debug!(timed=timed.len(), skipped=trips.len() - timed.len(), "trips attached");
    timed
}

/// Multiply the tolls of every record by the discount of the window it falls in.  Records outside
/// every window are left unmodified.  Returns the number of records adjusted.
#[instrument(level="debug", skip(records, schedule), fields(records=records.len()))]
pub fn apply_time_modulation<L: Location>(records: &mut [TimedTollRecord<L>], schedule: &Schedule) -> usize {
    let mut adjusted = 0;
    for r in records.iter_mut() {
        match schedule.window_for(&r.start, &r.end) {
            Some(w) => {
                r.toll.rates.scale(w.discount);
                r.discount = Some(w.discount);
                adjusted += 1;
            }
            None => trace!(origin=%r.toll.origin, destination=%r.toll.destination, start=%r.start, end=%r.end, "no matching window"),
        }
    }
    debug!(adjusted, unmatched = records.len() - adjusted, "time modulation applied");
    adjusted
}

/// Attach trips to flat tolls and apply `schedule`.
pub fn calculate_time_based_toll_rates<L: Location>(tolls: &[TollRecord<L>], trips: &[Trip<L>], schedule: &Schedule) -> Vec<TimedTollRecord<L>> {
    let mut timed = attach_trips(tolls, trips);
    apply_time_modulation(&mut timed, schedule);
    timed
}
