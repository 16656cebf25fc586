use chrono::DateTime;

/// Options for normalizing extracted post text
#[derive(Debug, Clone, Copy)]
pub struct TextCleanOptions {
    /// Keep blank-line paragraph breaks (as exactly one empty line)
    pub preserve_paragraphs: bool,
    /// Keep single newlines within paragraphs
    pub preserve_line_breaks: bool,
}

impl Default for TextCleanOptions {
    fn default() -> Self {
        Self {
            preserve_paragraphs: false,
            preserve_line_breaks: false,
        }
    }
}

/// Collapses all whitespace runs into single spaces
pub fn clean_text(text: &str) -> String {
    clean_text_with_options(text, &TextCleanOptions::default())
}

/// Normalizes whitespace but keeps paragraph breaks
pub fn clean_paragraphs(text: &str) -> String {
    clean_text_with_options(
        text,
        &TextCleanOptions {
            preserve_paragraphs: true,
            ..TextCleanOptions::default()
        },
    )
}

pub fn clean_text_with_options(text: &str, options: &TextCleanOptions) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let paragraph_sep = if options.preserve_paragraphs { "\n\n" } else { " " };
    let line_sep = if options.preserve_line_breaks { "\n" } else { " " };

    split_into_paragraphs(text)
        .iter()
        .map(|para| {
            para.iter()
                .map(|line| collapse(line))
                .collect::<Vec<_>>()
                .join(line_sep)
        })
        .collect::<Vec<_>>()
        .join(paragraph_sep)
}

/// Splits text into paragraphs of trimmed, non-empty lines
pub fn split_into_paragraphs(text: &str) -> Vec<Vec<&str>> {
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

fn collapse(segment: &str) -> String {
    segment.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses an engagement counter such as `"1,234 reactions"`
///
/// Every non-digit is stripped first. Empty input or overflow yields 0.
pub fn parse_count(raw: &str) -> u64 {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// Normalizes an RFC 3339 / ISO-8601 timestamp, or `None` if it isn't one
pub fn parse_timestamp(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.to_rfc3339_opts(chrono::SecondsFormat::Secs, true));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|ts| ts.format("%Y-%m-%dT%H:%M:%S").to_string())
}
