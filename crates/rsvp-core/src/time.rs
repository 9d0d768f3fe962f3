use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

/// Current time truncated to the millisecond precision records are stored at.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// `None` when `ts_millis` is outside chrono's representable range.
pub fn from_unix_millis(ts_millis: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ts_millis)
}

/// RFC 3339 UTC string with millisecond precision, e.g.
/// `2023-11-14T22:13:20.000Z`.
pub fn format_timestamp_rfc3339(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::{format_timestamp_rfc3339, from_unix_millis, now_utc};

    #[test]
    fn formats_millis_as_utc() {
        let ts = from_unix_millis(1_700_000_000_123).unwrap();
        assert_eq!(format_timestamp_rfc3339(&ts), "2023-11-14T22:13:20.123Z");
    }

    #[test]
    fn out_of_range_millis_are_rejected() {
        assert!(from_unix_millis(i64::MAX).is_none());
        assert!(from_unix_millis(i64::MIN).is_none());
    }

    #[test]
    fn now_round_trips_through_millis() {
        let now = now_utc();
        assert_eq!(from_unix_millis(now.timestamp_millis()), Some(now));
        assert!(now.timestamp_millis() > 1_577_836_800_000);
    }
}
