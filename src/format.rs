use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

pub fn truncate_unicode(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width.saturating_sub(1) {
            result.push('\u{2026}');
            break;
        }
        result.push(ch);
        width += ch_width;
    }
    result
}

/// Binary (1024-based) size with one decimal, e.g. `1.5 KB`.
pub fn format_bytes(bytes: f64) -> String {
    let mut value = if bytes.is_finite() && bytes > 0.0 {
        bytes
    } else {
        0.0
    };
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{value:.1} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1} PB")
}

pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec))
}
