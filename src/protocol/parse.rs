//! Marker extraction from device output lines.
//!
//! The firmware prints free text interleaved with `pwmRead:<n>` and
//! `position:<n>`. Matching is by substring, so prefixes like a log tag or a
//! timestamp in front of the marker are fine.

/// Marker preceding the PWM width the firmware measured.
pub const PWM_MARKER: &str = "pwmRead:";

/// Marker preceding the position derived from that width.
pub const POSITION_MARKER: &str = "position:";

/// Text following the first `marker` in `line`, up to any repeat of it.
///
/// Returns `None` when the marker does not occur.
pub fn field_after<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let (_, rest) = line.split_once(marker)?;
    let value = match rest.find(marker) {
        Some(end) => &rest[..end],
        None => rest,
    };
    Some(value.trim())
}

/// Parse the integer following `marker`.
///
/// `None` if the marker is absent, `Some(Err(reason))` if it is present but
/// not followed by exactly one integer.
pub fn marker_value(line: &str, marker: &str) -> Option<Result<i64, String>> {
    let text = field_after(line, marker)?;
    Some(
        text.parse::<i64>()
            .map_err(|e| format!("{} value {:?} is not an integer ({})", marker, text, e)),
    )
}
