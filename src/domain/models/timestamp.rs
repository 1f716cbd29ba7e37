#[cfg(test)]
#[path = "timestamp_test.rs"]
mod tests;

use anyhow::Result;
use chrono::DateTime;
use chrono::NaiveDateTime;
use chrono::SecondsFormat;
use chrono::TimeZone;
use chrono::Utc;

/// Parses timestamps produced by the AgentD store. The backend writes naive
/// UTC values (`2024-01-01T12:00:00.123456`), while messages submitted by
/// clients carry RFC 3339 offsets.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Ok(datetime.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| return NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))?;

    return Ok(Utc.from_utc_datetime(&naive));
}

/// Like `parse_timestamp`, but falls back to now so one odd row can't block
/// a whole listing.
pub fn parse_timestamp_lenient(raw: &str) -> DateTime<Utc> {
    match parse_timestamp(raw) {
        Ok(datetime) => return datetime,
        Err(err) => {
            tracing::warn!(error = ?err, raw, "Unparseable timestamp from store");
            return Utc::now();
        }
    }
}

pub fn format_timestamp(datetime: &DateTime<Utc>) -> String {
    return datetime.to_rfc3339_opts(SecondsFormat::Millis, true);
}
