use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Date representations we accept from the document store and from older
/// records: a plain epoch-milliseconds number, the wire `{seconds, nanoseconds}`
/// pair (nanoseconds carry no extra precision we need), or a date string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    Millis(i64),
    Timestamp {
        seconds: i64,
        #[serde(default)]
        nanoseconds: u32,
    },
    Text(String),
}

impl DateValue {
    /// Current instant as the RFC 3339 text form the store persists.
    pub fn now() -> Self {
        DateValue::Text(chrono::Utc::now().to_rfc3339())
    }
}

/// Normalize any accepted representation to epoch milliseconds.
/// Returns `None` for unparseable input so recency sorting can place the
/// record last instead of blowing up.
pub fn epoch_millis(value: &DateValue) -> Option<i64> {
    match value {
        DateValue::Millis(ms) => Some(*ms),
        DateValue::Timestamp { seconds, .. } => seconds.checked_mul(1000),
        DateValue::Text(s) => parse_text(s),
    }
}

fn parse_text(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp_millis());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_pass_through() {
        assert_eq!(epoch_millis(&DateValue::Millis(1736899200000)), Some(1736899200000));
    }

    #[test]
    fn wire_pair_uses_seconds_only() {
        let v = DateValue::Timestamp { seconds: 1736899200, nanoseconds: 999_999_999 };
        assert_eq!(epoch_millis(&v), Some(1736899200000));
    }

    #[test]
    fn rfc3339_text() {
        let v = DateValue::Text("2025-01-15T00:00:00+00:00".to_string());
        assert_eq!(epoch_millis(&v), Some(1736899200000));
    }

    #[test]
    fn bare_date_text() {
        let v = DateValue::Text("2025-01-15".to_string());
        assert_eq!(epoch_millis(&v), Some(1736899200000));
    }

    #[test]
    fn garbage_is_unknown_not_a_panic() {
        assert_eq!(epoch_millis(&DateValue::Text("not a date".to_string())), None);
    }

    #[test]
    fn deserializes_all_wire_shapes() {
        let m: DateValue = serde_json::from_str("1736899200000").unwrap();
        assert_eq!(m, DateValue::Millis(1736899200000));

        let p: DateValue = serde_json::from_str(r#"{"seconds": 1736899200, "nanoseconds": 0}"#).unwrap();
        assert_eq!(epoch_millis(&p), Some(1736899200000));

        let t: DateValue = serde_json::from_str(r#""2025-01-15T00:00:00Z""#).unwrap();
        assert_eq!(epoch_millis(&t), Some(1736899200000));
    }
}
