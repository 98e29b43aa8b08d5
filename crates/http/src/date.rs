//! Wire date codec.
//!
//! Dates travel as IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`) and carry no
//! sub-second precision, so every comparison made here is at whole-second
//! granularity. Formatting is stateless and safe to call from any thread.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use http::HeaderValue;

/// Last second representable by the wire format (9999-12-31T23:59:59Z).
const MAX_WIRE_SECONDS: u64 = 253_402_300_799;

const EPOCH_VALUE: HeaderValue = HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT");

/// Formats `time` as an IMF-fixdate, truncating sub-second precision.
///
/// Times outside of what the format can carry are clamped to its bounds.
pub fn format(time: SystemTime) -> String {
    httpdate::fmt_http_date(clamp(time))
}

/// Parses any of the three HTTP date forms (IMF-fixdate, RFC 850, asctime).
///
/// Returns `None` for anything else, including an empty value.
pub fn parse(value: &str) -> Option<SystemTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    httpdate::parse_http_date(value).ok()
}

/// Whole seconds since the unix epoch, negative for earlier times.
pub fn epoch_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_secs()).map_or(i64::MIN, |secs| -secs),
    }
}

/// Whether two instants fall on the same wire second.
///
/// Both sides are clamped the way [`format`] clamps them, so a time the wire can't
/// carry matches the value it was advertised as.
pub fn same_second(a: SystemTime, b: SystemTime) -> bool {
    epoch_seconds(clamp(a)) == epoch_seconds(clamp(b))
}

/// `time` formatted and ready to be used as a header value.
pub fn header_value(time: SystemTime) -> HeaderValue {
    HeaderValue::from_str(&format(time)).unwrap_or(EPOCH_VALUE)
}

/// The current time as a `Date` header value.
pub fn now() -> HeaderValue {
    header_value(SystemTime::now())
}

fn clamp(time: SystemTime) -> SystemTime {
    let max = UNIX_EPOCH + Duration::from_secs(MAX_WIRE_SECONDS);
    if time < UNIX_EPOCH {
        UNIX_EPOCH
    } else if time > max {
        max
    } else {
        time
    }
}
