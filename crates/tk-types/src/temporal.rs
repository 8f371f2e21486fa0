//! Timestamp codecs for persisted records and ledger events.
//!
//! Everything is written as RFC 3339 UTC with whole-second precision. Reads
//! of thread records go through an ordered list of parsing strategies so that
//! hand-edited or legacy files stay loadable; ledger events are strict.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};

/// A single way of reading a timestamp. Returns `None` on a miss.
type Strategy = fn(&str) -> Option<DateTime<Utc>>;

/// Strategies tried in priority order; the first hit wins.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("rfc3339", parse_rfc3339),
    ("naive", parse_naive),
    ("date", parse_date_only),
];

/// Current time truncated to whole seconds.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Format as RFC 3339 UTC with second precision (`2024-05-01T12:00:00Z`).
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse with fallback strategies. `None` if no strategy accepts the input.
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    STRATEGIES.iter().find_map(|(_, strategy)| strategy(input))
}

/// Placeholder for a timestamp that was absent or unreadable on disk.
pub fn unset() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

pub fn is_unset(ts: &DateTime<Utc>) -> bool {
    *ts == unset()
}

fn parse_rfc3339(input: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(input)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn parse_naive(input: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|ts| ts.and_utc())
}

fn parse_date_only(input: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

/// Strict RFC 3339 serde codec, used for ledger event timestamps.
pub mod rfc3339 {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_rfc3339(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid RFC 3339 timestamp {raw:?}")))
    }
}

/// Lenient serde codec for record timestamps.
///
/// Unreadable values decode to [`unset`](super::unset) so that record
/// normalization can fill them in.
pub mod lenient {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use tracing::warn;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(match raw.as_deref().map(str::trim) {
            None | Some("") => super::unset(),
            Some(s) => super::parse_timestamp(s).unwrap_or_else(|| {
                warn!(value = s, "unreadable timestamp; treating as unset");
                super::unset()
            }),
        })
    }
}

/// Lenient codec for optional timestamps (due dates).
pub mod lenient_option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => s.serialize_str(&super::format_timestamp(ts)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.as_deref().and_then(super::parse_timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_uses_seconds_and_z() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-05-01T12:30:05Z");
    }

    #[test]
    fn rfc3339_with_offset_is_normalized_to_utc() {
        let ts = parse_timestamp("2024-05-01T14:30:05+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap());
    }

    #[test]
    fn naive_timestamp_falls_back_to_utc() {
        let ts = parse_timestamp("2024-05-01T12:30:05").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap());
    }

    #[test]
    fn date_only_is_midnight() {
        let ts = parse_timestamp("2024-05-01").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn garbage_is_a_miss() {
        assert!(parse_timestamp("yesterday-ish").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn now_has_no_subseconds() {
        assert_eq!(now().timestamp_subsec_nanos(), 0);
    }

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Strict {
        #[serde(with = "rfc3339")]
        ts: DateTime<Utc>,
    }

    #[derive(serde::Deserialize)]
    struct Lenient {
        #[serde(default = "unset", with = "lenient")]
        ts: DateTime<Utc>,
    }

    #[test]
    fn strict_codec_rejects_naive_input() {
        assert!(serde_json::from_str::<Strict>(r#"{"ts":"2024-05-01T12:00:00"}"#).is_err());
        assert!(serde_json::from_str::<Strict>(r#"{"ts":"2024-05-01T12:00:00Z"}"#).is_ok());
    }

    #[test]
    fn lenient_codec_maps_garbage_to_unset() {
        let parsed: Lenient = serde_json::from_str(r#"{"ts":"nope"}"#).unwrap();
        assert!(is_unset(&parsed.ts));
        let parsed: Lenient = serde_json::from_str(r#"{}"#).unwrap();
        assert!(is_unset(&parsed.ts));
        let parsed: Lenient = serde_json::from_str(r#"{"ts":null}"#).unwrap();
        assert!(is_unset(&parsed.ts));
    }
}
