use chrono::{DateTime, SecondsFormat, Utc};

/// Wall clock used for attempt timestamps and deadlines. Truncated to
/// microseconds so values survive a round trip through Postgres unchanged.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

pub fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}
