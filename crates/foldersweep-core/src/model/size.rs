/// Size formatting utilities: human-readable byte counts and back.
///
/// All internal sizes are `u64` bytes. Floating point is only used
/// at the display/parse boundary.

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count for display.
///
/// Binary multiples (1 KB = 1024 B) with two decimals once past plain
/// bytes, e.g. `1536 -> "1.50 KB"`. Values beyond TB stay in TB.
pub fn human_readable_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Parse a string produced by [`human_readable_size`] back into bytes.
///
/// Accepts `"<number> <unit>"` with the unit in any case, or a bare
/// number of bytes. Returns `None` for anything else, including
/// negative or non-finite numbers.
pub fn size_to_bytes(text: &str) -> Option<u64> {
    let mut parts = text.split_whitespace();
    let number = parts.next()?;
    let unit = parts.next().unwrap_or("B");
    if parts.next().is_some() {
        return None;
    }

    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    let exponent = UNITS
        .iter()
        .position(|u| u.eq_ignore_ascii_case(unit))?;
    let bytes = value * 1024f64.powi(exponent as i32);
    if bytes > u64::MAX as f64 {
        return None;
    }
    Some(bytes.round() as u64)
}

/// Format a count with thousand separators.
pub fn format_count(count: u64) -> String {
    if count < 1_000 {
        return count.to_string();
    }
    let s = count.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}
