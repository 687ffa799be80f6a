use alloy_primitives::{Address, U256};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::AdminError;

/// Current wall-clock time in epoch milliseconds. The payout state machine
/// never calls this; callers pass the value in explicitly.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Converts a raw token amount to a display value using the token's
/// decimals. Precision loss for very large balances is acceptable here; the
/// result is only used for ordering and display.
pub fn normalized_amount(value: U256, decimals: u8) -> f64 {
    let raw: f64 = value.to_string().parse().unwrap_or(0.0);
    raw / 10f64.powi(decimals as i32)
}

/// Abbreviated address for log lines: `0x1234…cdef`.
pub fn short_addr(address: &Address) -> String {
    let hex = format!("{address:#x}");
    format!("{}…{}", &hex[..6], &hex[hex.len() - 4..])
}

/// Renders a millisecond duration as `2h 05m 09s`.
pub fn format_duration_ms(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

/// Renders an epoch-ms timestamp in the operator's local timezone.
pub fn format_local_ms(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("{ms}ms"),
    }
}

/// Parses an operator-supplied local timestamp into epoch milliseconds.
/// Accepts RFC 3339 as well as the common `YYYY-MM-DD HH:MM[:SS]` forms
/// interpreted in the local timezone.
pub fn parse_local_datetime(input: &str) -> Result<i64, AdminError> {
    let trimmed = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.timestamp_millis());
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            if let Some(local) = Local.from_local_datetime(&naive).single() {
                return Ok(local.timestamp_millis());
            }
        }
    }

    Err(AdminError::InvalidTimestamp(format!(
        "Could not parse '{trimmed}' as a local timestamp"
    )))
}
