use chrono::{SecondsFormat, TimeZone, Utc};

// Timestamps are stored as unix seconds everywhere in the
// database, the API hands them out as RFC 3339 in UTC.
// Out of range values give an empty string rather than a
// panic.
pub fn timestamp_to_date_string(timestamp: i64) -> String {
  Utc.timestamp_opt(timestamp, 0)
    .single()
    .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
    .unwrap_or_default()
}

pub fn current_timestamp() -> i64 {
  Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dates_are_formatted_in_utc() {
    let timestamp: i64 = 1615150740;
    assert_eq!("2021-03-07T20:59:00Z", timestamp_to_date_string(timestamp));
  }

  #[test]
  fn out_of_range_timestamp_gives_empty_string() {
    assert_eq!("", timestamp_to_date_string(i64::MAX));
  }
}
