use chrono::{DateTime, Local};

/// Current wall-clock time as an ISO-8601 string
pub fn now_iso8601() -> String {
    Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false)
}

/// Timestamp used in output file names, e.g. `20250101_093000`
pub fn file_timestamp(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Convert a string to a sanitized filename stem
pub fn sanitize_filename(name: &str) -> String {
    let mut name = name.replace(['/', '\\', ':', '?', '&', '=', '#', '%', '*', '"', ' '], "_");

    // Limit filename length
    if name.len() > 100 {
        let mut cut = 100;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        name.truncate(cut);
    }
    name
}
