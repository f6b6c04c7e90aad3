//! `Time#_dump` packing.
//!
//! Ruby packs a UTC time into two little-endian 32-bit words:
//! `1 | utc | year-1900 (16) | month-1 (4) | day (5) | hour (5)` followed by
//! `minute (6) | second (6) | microsecond (20)`.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
#[cfg(test)]
use chrono::TimeZone;
#[cfg(test)]
use quarry_core::{QuarryError, QuarryResult};

/// Pack a UTC timestamp the way `Time#_dump` does
pub fn dump(time: &DateTime<Utc>) -> Vec<u8> {
    let year = (time.year() - 1900).clamp(0, 0xffff) as u32;
    let head: u32 = 1 << 31
        | 1 << 30
        | year << 14
        | time.month0() << 10
        | time.day() << 5
        | time.hour();
    let micros = (time.nanosecond() / 1000).min(999_999);
    let tail: u32 = time.minute() << 26 | time.second().min(59) << 20 | micros;

    let mut data = head.to_le_bytes().to_vec();
    data.extend_from_slice(&tail.to_le_bytes());
    data
}

/// Unpack `Time#_dump` data
#[cfg(test)]
pub(crate) fn load(data: &[u8]) -> QuarryResult<DateTime<Utc>> {
    let words: [u8; 8] = data
        .get(..8)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| QuarryError::codec("time dump shorter than 8 bytes"))?;
    let head = u32::from_le_bytes([words[0], words[1], words[2], words[3]]);
    let tail = u32::from_le_bytes([words[4], words[5], words[6], words[7]]);

    if head & (1 << 31) == 0 {
        // Pre-1.8 layout: seconds and microseconds since the epoch
        return Utc
            .timestamp_opt(i64::from(head), tail * 1000)
            .single()
            .ok_or_else(|| QuarryError::codec("time dump out of range"));
    }

    let year = ((head >> 14) & 0xffff) as i32 + 1900;
    let month = ((head >> 10) & 0xf) + 1;
    let day = (head >> 5) & 0x1f;
    let hour = head & 0x1f;
    let minute = (tail >> 26) & 0x3f;
    let second = (tail >> 20) & 0x3f;
    let micros = tail & 0xfffff;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_micro_opt(hour, minute, second, micros))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| QuarryError::codec("time dump holds an invalid date"))
}

/// Parse the timestamp forms found in gem metadata YAML
/// (`2024-01-15 00:00:00.000000000 Z`, `2024-01-15`)
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    let trimmed = text.strip_suffix('Z').map(str::trim_end).unwrap_or(text);
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|t| t.with_timezone(&Utc)))
}
