use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Timelike,
  Weekday
};

pub const DATE_FORMAT: &str =
  "%Y-%m-%d";
pub const CLOCK_FORMAT: &str = "%H:%M";

pub fn parse_date(
  raw: &str
) -> anyhow::Result<NaiveDate> {
  NaiveDate::parse_from_str(
    raw.trim(),
    DATE_FORMAT
  )
  .with_context(|| {
    format!(
      "invalid date (expected \
       YYYY-MM-DD): {raw}"
    )
  })
}

#[must_use]
pub fn format_date(
  date: NaiveDate
) -> String {
  date.format(DATE_FORMAT).to_string()
}

/// Parses a wall-clock `HH:MM` (or
/// `H:MM`) string. Anything else is
/// `None`, which callers treat as "no
/// time".
pub fn parse_clock(
  raw: &str
) -> Option<NaiveTime> {
  let (hour, minute) =
    raw.trim().split_once(':')?;
  if hour.is_empty()
    || hour.len() > 2
    || minute.len() != 2
    || !hour
      .chars()
      .chain(minute.chars())
      .all(|c| c.is_ascii_digit())
  {
    return None;
  }

  let hour = hour.parse::<u32>().ok()?;
  let minute =
    minute.parse::<u32>().ok()?;
  NaiveTime::from_hms_opt(
    hour, minute, 0
  )
}

#[must_use]
pub fn format_clock(
  time: NaiveTime
) -> String {
  time.format(CLOCK_FORMAT).to_string()
}

#[must_use]
pub fn clock_label(
  hour: u32,
  minutes: u32
) -> String {
  format!("{hour:02}:{minutes:02}")
}

#[must_use]
pub fn minute_of_day(
  time: NaiveTime
) -> u32 {
  time.hour() * 60 + time.minute()
}

/// Parses `YYYY-MM-DDTHH:MM` (a space
/// also works as the separator).
pub fn parse_date_clock(
  raw: &str
) -> anyhow::Result<NaiveDateTime> {
  let trimmed = raw.trim();
  let (date_part, time_part) = trimmed
    .split_once('T')
    .or_else(|| {
      trimmed.split_once(' ')
    })
    .ok_or_else(|| {
      anyhow!(
        "expected \
         YYYY-MM-DDTHH:MM, got: \
         {raw}"
      )
    })?;

  let date = parse_date(date_part)?;
  let time = parse_clock(time_part)
    .ok_or_else(|| {
      anyhow!(
        "invalid time (expected \
         HH:MM): {time_part}"
      )
    })?;
  Ok(date.and_time(time))
}

pub fn parse_week_start(
  raw: &str
) -> Weekday {
  if raw
    .trim()
    .eq_ignore_ascii_case("monday")
  {
    Weekday::Mon
  } else {
    Weekday::Sun
  }
}

pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  let mut year = date.year();
  let mut month =
    date.month() as i32 + months;

  while month < 1 {
    month += 12;
    year = year.saturating_sub(1);
  }
  while month > 12 {
    month -= 12;
    year = year.saturating_add(1);
  }

  let month = month as u32;
  let day = date
    .day()
    .min(days_in_month(year, month));
  NaiveDate::from_ymd_opt(
    year, month, day
  )
  .unwrap_or(date)
}

pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  let day_idx = day
    .weekday()
    .num_days_from_monday()
    as i64;
  let start_idx = week_start
    .num_days_from_monday()
    as i64;
  let diff =
    (7 + day_idx - start_idx) % 7;
  add_days(day, -diff)
}

pub fn week_days(
  day: NaiveDate,
  week_start: Weekday
) -> Vec<NaiveDate> {
  let start =
    start_of_week(day, week_start);
  (0..7)
    .map(|offset| {
      add_days(start, offset)
    })
    .collect()
}

/// Inclusive range of whole weeks that
/// covers the month containing `day`.
pub fn month_grid_range(
  day: NaiveDate,
  week_start: Weekday
) -> (NaiveDate, NaiveDate) {
  let first = first_day_of_month(
    day.year(),
    day.month()
  );
  let last = last_day_of_month(
    day.year(),
    day.month()
  );
  let start =
    start_of_week(first, week_start);
  let end = add_days(
    start_of_week(last, week_start),
    6
  );
  (start, end)
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    Weekday
  };

  use super::*;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn parses_clock_strictly() {
    assert_eq!(
      parse_clock("09:00")
        .map(format_clock)
        .as_deref(),
      Some("09:00")
    );
    assert_eq!(
      parse_clock("7:45")
        .map(minute_of_day),
      Some(465)
    );
    assert!(parse_clock("24:00").is_none());
    assert!(parse_clock("09:7").is_none());
    assert!(parse_clock("9am").is_none());
    assert!(parse_clock("").is_none());
    assert!(parse_clock("-1:00").is_none());
  }

  #[test]
  fn month_shift_clamps_day() {
    assert_eq!(
      shift_months(date(2024, 1, 31), 1),
      date(2024, 2, 29)
    );
    assert_eq!(
      shift_months(date(2024, 1, 15), -1),
      date(2023, 12, 15)
    );
  }

  #[test]
  fn week_starts_on_configured_day() {
    // 2024-05-01 is a Wednesday.
    assert_eq!(
      start_of_week(
        date(2024, 5, 1),
        Weekday::Sun
      ),
      date(2024, 4, 28)
    );
    assert_eq!(
      start_of_week(
        date(2024, 5, 1),
        Weekday::Mon
      ),
      date(2024, 4, 29)
    );
  }

  #[test]
  fn month_grid_covers_full_weeks() {
    let (start, end) = month_grid_range(
      date(2024, 5, 15),
      Weekday::Sun
    );
    assert_eq!(start, date(2024, 4, 28));
    assert_eq!(end, date(2024, 6, 1));
    assert_eq!(
      (end - start).num_days() % 7,
      6
    );
  }

  #[test]
  fn parses_date_clock_pairs() {
    let parsed =
      parse_date_clock("2024-05-01T14:30")
        .expect("parse");
    assert_eq!(parsed.date(), date(2024, 5, 1));
    assert_eq!(
      format_clock(parsed.time()),
      "14:30"
    );
    assert!(
      parse_date_clock("2024-05-01").is_err()
    );
  }
}
