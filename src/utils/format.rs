//! Byte-size formatting helpers.

/// Format a byte count as a human-readable string.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} TB")
}

/// Space saved by compression, as a percentage of the raw size.
pub fn compression_ratio(raw: u64, compressed: u64) -> f64 {
    if raw == 0 {
        return 0.0;
    }
    raw.saturating_sub(compressed) as f64 / raw as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(0), "0.00 B");
        assert_eq!(format_size(512), "512.00 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_compression_ratio() {
        assert_eq!(compression_ratio(0, 0), 0.0);
        assert_eq!(compression_ratio(1000, 250), 75.0);
        // An archive larger than its raw contents never reports negative savings.
        assert_eq!(compression_ratio(100, 150), 0.0);
    }
}
