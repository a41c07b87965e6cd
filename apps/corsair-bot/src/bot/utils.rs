use chrono::DateTime;

/// Renders a millisecond UTC timestamp; negative means "never" (the
/// normalized no-expiry sentinel).
pub fn format_timestamp(timestamp_ms: i64) -> String {
    if timestamp_ms < 0 {
        return "never".to_string();
    }
    match DateTime::from_timestamp_millis(timestamp_ms) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => "unknown".to_string(),
    }
}

/// Renders a normalized byte amount in gigabytes; `-1` means unlimited.
pub fn format_gb(bytes: i64) -> String {
    if bytes < 0 {
        return "∞".to_string();
    }
    format!("{:.2} GB", bytes as f64 / 1024.0 / 1024.0 / 1024.0)
}

pub fn format_devices(max_devices: i64) -> String {
    if max_devices < 0 {
        "∞".to_string()
    } else {
        max_devices.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_render_as_unlimited() {
        assert_eq!(format_timestamp(-1), "never");
        assert_eq!(format_gb(-1), "∞");
        assert_eq!(format_devices(-1), "∞");
    }

    #[test]
    fn bytes_render_in_gigabytes() {
        assert_eq!(format_gb(1024 * 1024 * 1024), "1.00 GB");
        assert_eq!(format_gb(0), "0.00 GB");
    }
}
