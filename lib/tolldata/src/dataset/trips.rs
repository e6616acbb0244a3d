use super::*;
use std::fmt::{self, Display};
use std::str::FromStr;
use chrono::{NaiveTime, Weekday};
use crate::parsers::{ParseInstance, TripCsvFmt};
use crate::raw::{CsvRow, CsvTable, FromRaw, parse_field};
use crate::LocId;

/// A point in the week: day-of-week plus time-of-day.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct WeekTime {
  pub day: Weekday,
  pub time: NaiveTime,
}

impl WeekTime {
  pub fn new(day: Weekday, time: NaiveTime) -> Self {
    WeekTime { day, time }
  }

  /// Accepts full or abbreviated English day names and `HH:MM:SS` or `HH:MM` times.
  pub fn parse(day: &str, time: &str) -> Result<Self> {
    let day = Weekday::from_str(day.trim())
      .map_err(|_| anyhow::anyhow!("not a day of the week: {:?}", day))?;
    let time = time.trim();
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S")
      .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
      .with_context(|| format!("not a time of day: {:?}", time))?;
    Ok(WeekTime { day, time })
  }

  pub fn day_name(&self) -> &'static str {
    day_name(self.day)
  }
}

impl fmt::Display for WeekTime {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.day_name(), self.time.format("%H:%M:%S"))
  }
}

pub fn day_name(day: Weekday) -> &'static str {
  match day {
    Weekday::Mon => "Monday",
    Weekday::Tue => "Tuesday",
    Weekday::Wed => "Wednesday",
    Weekday::Thu => "Thursday",
    Weekday::Fri => "Friday",
    Weekday::Sat => "Saturday",
    Weekday::Sun => "Sunday",
  }
}

/// A travel record from dataset B.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip<L> {
  pub origin: L,
  pub destination: L,
  pub start: WeekTime,
  pub end: WeekTime,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TripList<L> {
  pub id: String,
  pub trips: Vec<Trip<L>>,
}

fn parse_week_time(row: &CsvRow, c_day: usize, c_time: usize) -> Result<WeekTime> {
  WeekTime::parse(&row.fields[c_day], &row.fields[c_time])
    .or(Err(Error::InvalidField))
    .with_context(|| format!("line {}: invalid timestamp {:?} {:?}", row.line, &row.fields[c_day], &row.fields[c_time]))
}

impl<L> FromRaw<CsvTable> for TripList<L>
  where
    L: FromStr,
    L::Err: Display,
{
  fn from_raw(raw: CsvTable, id: Cow<str>) -> Result<TripList<L>> {
    let c_id = raw.column("id")?;
    let c_id2 = raw.column("id_2")?;
    let c_start_day = raw.column("startDay")?;
    let c_start_time = raw.column("startTime")?;
    let c_end_day = raw.column("endDay")?;
    let c_end_time = raw.column("endTime")?;
    raw.check_width()?;

    let trips: Result<Vec<_>> = raw.rows.iter()
      .map(|row| Ok(Trip {
        origin: parse_field(row, c_id, "id")?,
        destination: parse_field(row, c_id2, "id_2")?,
        start: parse_week_time(row, c_start_day, c_start_time)?,
        end: parse_week_time(row, c_end_day, c_end_time)?,
      }))
      .collect();

    Ok(TripList { id: id.into_owned(), trips: trips? })
  }
}

pub enum TripCsv {}

impl Dataset for StdLayout<TripCsv> {
  type Instance = TripList<LocId>;

  fn load_instance(&self, idx: usize) -> Result<Self::Instance> {
    let path = self.table_path(idx)?;
    TripList::parse(TripCsvFmt(&path))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parsers::parse_csv;

  #[test]
  fn week_time() -> Result<()> {
    let t = WeekTime::parse("Monday", "11:00:00")?;
    assert_eq!(t.day, Weekday::Mon);
    assert_eq!(t.time, NaiveTime::from_hms_opt(11, 0, 0).unwrap());
    assert_eq!(WeekTime::parse("sat", "09:30")?.to_string(), "Saturday 09:30:00");
    assert!(WeekTime::parse("Someday", "09:30").is_err());
    assert!(WeekTime::parse("Friday", "25:00").is_err());
    Ok(())
  }

  #[test]
  fn trips_from_table() -> Result<()> {
    let table = parse_csv("id,id_2,startDay,startTime,endDay,endTime,able2Hov2\n\
      1014000,-1,Monday,05:00:00,Wednesday,10:00:00,-1\n\
      1030000,-1,Thursday,11:00:00,Thursday,18:30:00,-1\n")?;
    let trips: TripList<LocId> = TripList::from_raw(table, Cow::Borrowed("t"))?;
    assert_eq!(trips.trips.len(), 2);
    assert_eq!(trips.trips[0].destination, LocId::Int(-1));
    assert_eq!(trips.trips[0].end.day, Weekday::Wed);
    assert_eq!(trips.trips[1].start.day_name(), "Thursday");
    Ok(())
  }

  #[test]
  fn invalid_day() {
    let table = parse_csv("id,id_2,startDay,startTime,endDay,endTime\n1,2,Funday,05:00:00,Monday,06:00:00\n").unwrap();
    let err = TripList::<LocId>::from_raw(table, Cow::Borrowed("t")).unwrap_err();
    assert_eq!(err.downcast_ref::<Error>(), Some(&Error::InvalidField));
  }
}
