use crate::visuals::{ConversationRow, Counts};
use std::f64::consts::PI;
use std::fmt::Write;

pub const POSITIVE_COLOR: &str = "#4ecdc4";
pub const NEGATIVE_COLOR: &str = "#ff6b6b";
const BAR_COLOR: &str = "skyblue";
const VIRIDIS: [&str; 6] = ["#440154", "#414487", "#2a788e", "#22a884", "#7ad151", "#fde725"];

/// Escape text for use in XML content and attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Minimal SVG document builder
///
/// `write!` into a `String` cannot fail, so its results are ignored.
pub struct Canvas {
    width: f64,
    height: f64,
    body: String,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        let mut canvas = Self {
            width,
            height,
            body: String::new(),
        };
        canvas.rect(0.0, 0.0, width, height, "white", None);
        canvas
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str, tooltip: Option<&str>) {
        let _ = write!(
            self.body,
            r#"<rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" fill="{fill}" stroke="white">"#
        );
        self.close_with_tooltip("rect", tooltip);
    }

    pub fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: &str, tooltip: Option<&str>) {
        let _ = write!(
            self.body,
            r#"<circle cx="{cx:.1}" cy="{cy:.1}" r="{r:.1}" fill="{fill}" fill-opacity="0.7">"#
        );
        self.close_with_tooltip("circle", tooltip);
    }

    pub fn path(&mut self, d: &str, fill: &str) {
        let _ = write!(self.body, r#"<path d="{d}" fill="{fill}" stroke="white"/>"#);
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let _ = write!(
            self.body,
            r##"<line x1="{x1:.1}" y1="{y1:.1}" x2="{x2:.1}" y2="{y2:.1}" stroke="#333"/>"##
        );
    }

    /// Text anchored at `(x, y)`; `anchor` is start, middle or end
    pub fn text(&mut self, x: f64, y: f64, size: f64, anchor: &str, content: &str) {
        self.styled_text(x, y, size, anchor, "normal", "#222", None, content);
    }

    pub fn title(&mut self, content: &str) {
        let x = self.width / 2.0;
        self.styled_text(x, 28.0, 18.0, "middle", "bold", "#222", None, content);
    }

    /// Text rotated by `rotate` degrees around its anchor
    pub fn rotated_text(&mut self, x: f64, y: f64, size: f64, rotate: f64, content: &str) {
        self.styled_text(x, y, size, "end", "normal", "#222", Some(rotate), content);
    }

    pub fn styled_text(
        &mut self,
        x: f64,
        y: f64,
        size: f64,
        anchor: &str,
        weight: &str,
        fill: &str,
        rotate: Option<f64>,
        content: &str,
    ) {
        let transform = rotate
            .map(|deg| format!(r#" transform="rotate({deg:.0} {x:.1} {y:.1})""#))
            .unwrap_or_default();
        let _ = write!(
            self.body,
            r#"<text x="{x:.1}" y="{y:.1}" font-size="{size:.0}" text-anchor="{anchor}" font-weight="{weight}" fill="{fill}"{transform}>{}</text>"#,
            escape(content)
        );
    }

    fn close_with_tooltip(&mut self, tag: &str, tooltip: Option<&str>) {
        if let Some(tip) = tooltip {
            let _ = write!(self.body, "<title>{}</title>", escape(tip));
        }
        let _ = write!(self.body, "</{tag}>");
    }

    pub fn finish(self) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}" font-family="Helvetica, Arial, sans-serif">{body}</svg>"#,
            w = self.width,
            h = self.height,
            body = self.body
        )
    }
}

/// Round the axis maximum up to a multiple of `step`
fn axis_max(max: f64, step: f64) -> f64 {
    ((max / step).ceil() * step).max(step)
}

/// Vertical bar chart with value labels, drawn up from `origin`
fn bar_chart(
    canvas: &mut Canvas,
    origin: (f64, f64),
    size: (f64, f64),
    bars: &[(String, f64, &str)],
    rotate_labels: bool,
) {
    let (x0, y0) = origin;
    let (width, height) = size;
    let max = axis_max(bars.iter().map(|b| b.1).fold(0.0, f64::max), 1.0);
    let slot = width / bars.len().max(1) as f64;

    canvas.line(x0, y0, x0 + width, y0);
    canvas.line(x0, y0, x0, y0 - height);
    canvas.text(x0 - 6.0, y0 - height + 4.0, 11.0, "end", &format!("{max}"));
    canvas.text(x0 - 6.0, y0 + 4.0, 11.0, "end", "0");

    for (i, (label, value, color)) in bars.iter().enumerate() {
        let h = value / max * height;
        let x = x0 + i as f64 * slot + slot * 0.15;
        let w = slot * 0.7;
        let tip = format!("{label}: {value}");
        canvas.rect(x, y0 - h, w, h, color, Some(&tip));
        canvas.text(x + w / 2.0, y0 - h - 5.0, 12.0, "middle", &format!("{value}"));
        if rotate_labels {
            canvas.rotated_text(x + w / 2.0, y0 + 14.0, 11.0, -45.0, label);
        } else {
            canvas.text(x + w / 2.0, y0 + 18.0, 12.0, "middle", label);
        }
    }
}

fn sentiment_color(label: &str) -> &'static str {
    if label.eq_ignore_ascii_case("positive") {
        POSITIVE_COLOR
    } else {
        NEGATIVE_COLOR
    }
}

/// Pie chart and bar chart of the sentiment distribution, side by side
pub fn sentiment_chart(distribution: &Counts) -> String {
    let mut canvas = Canvas::new(900.0, 420.0);
    canvas.title("AI Conversation Sentiment Distribution");

    let total: usize = distribution.0.iter().map(|(_, c)| c).sum();
    let (cx, cy, r) = (220.0, 230.0, 150.0);
    // start at 12 o'clock like a 90 degree start angle
    let mut angle = -PI / 2.0;
    for (label, count) in &distribution.0 {
        let share = *count as f64 / total.max(1) as f64;
        let color = sentiment_color(label);
        if share >= 1.0 {
            canvas.circle(cx, cy, r, color, Some(label));
        } else if share > 0.0 {
            let end = angle + share * 2.0 * PI;
            let large = if share > 0.5 { 1 } else { 0 };
            let d = format!(
                "M {cx:.1} {cy:.1} L {:.1} {:.1} A {r:.1} {r:.1} 0 {large} 1 {:.1} {:.1} Z",
                cx + r * angle.cos(),
                cy + r * angle.sin(),
                cx + r * end.cos(),
                cy + r * end.sin(),
            );
            canvas.path(&d, color);
            angle = end;
        }
        let mid = angle - share * PI;
        canvas.text(
            cx + r * 0.6 * mid.cos(),
            cy + r * 0.6 * mid.sin(),
            13.0,
            "middle",
            &format!("{label} {:.1}%", share * 100.0),
        );
    }

    let bars: Vec<(String, f64, &str)> = distribution
        .0
        .iter()
        .map(|(label, count)| (label.clone(), *count as f64, sentiment_color(label)))
        .collect();
    bar_chart(&mut canvas, (520.0, 370.0), (330.0, 280.0), &bars, false);
    canvas.text(685.0, 60.0, 14.0, "middle", "Sentiment Count");

    canvas.finish()
}

/// Engagement score per category, coloured by sentiment
pub fn category_scatter(rows: &[ConversationRow]) -> String {
    let mut canvas = Canvas::new(1000.0, 620.0);
    canvas.title("AI Conversation Categories vs Engagement Levels");

    let mut categories: Vec<&str> = Vec::new();
    for row in rows {
        if !categories.contains(&row.category.as_str()) {
            categories.push(&row.category);
        }
    }

    let (x0, y0, width, height) = (90.0, 440.0, 860.0, 370.0);
    let max = axis_max(
        rows.iter().map(|r| f64::from(r.engagement_score)).fold(0.0, f64::max),
        10.0,
    );
    let slot = width / categories.len().max(1) as f64;

    canvas.line(x0, y0, x0 + width, y0);
    canvas.line(x0, y0, x0, y0 - height);
    canvas.text(x0 - 8.0, y0 - height + 4.0, 11.0, "end", &format!("{max}"));
    canvas.text(x0 - 8.0, y0 + 4.0, 11.0, "end", "0");

    for (i, category) in categories.iter().enumerate() {
        let x = x0 + (i as f64 + 0.5) * slot;
        canvas.rotated_text(x, y0 + 16.0, 11.0, -45.0, category);
    }
    for row in rows {
        let i = categories
            .iter()
            .position(|c| *c == row.category)
            .unwrap_or_default();
        let x = x0 + (i as f64 + 0.5) * slot;
        let y = y0 - f64::from(row.engagement_score) / max * height;
        let color = if row.is_positive() { "green" } else { "red" };
        let tip = format!("{}: {} ({})", row.category, row.engagement_score, row.sentiment);
        canvas.circle(x, y, 9.0, color, Some(&tip));
    }

    canvas.styled_text(30.0, y0 - height / 2.0, 13.0, "middle", "bold", "#222", Some(-90.0), "Engagement Score");
    canvas.styled_text(x0 + width / 2.0, 605.0, 13.0, "middle", "bold", "#222", None, "Conversation Category");

    canvas.circle(880.0, 60.0, 6.0, "red", None);
    canvas.text(892.0, 64.0, 12.0, "start", "Negative");
    canvas.circle(880.0, 80.0, 6.0, "green", None);
    canvas.text(892.0, 84.0, 12.0, "start", "Positive");

    canvas.finish()
}

/// Bar chart of the most frequent terms
pub fn keyword_bars(keywords: &[(String, usize)]) -> String {
    let mut canvas = Canvas::new(1000.0, 520.0);
    canvas.title("Most Frequently Mentioned Terms");

    let bars: Vec<(String, f64, &str)> = keywords
        .iter()
        .map(|(word, count)| (word.clone(), *count as f64, BAR_COLOR))
        .collect();
    bar_chart(&mut canvas, (80.0, 400.0), (880.0, 320.0), &bars, true);
    canvas.styled_text(500.0, 505.0, 13.0, "middle", "normal", "#222", None, "Terms");
    canvas.styled_text(30.0, 240.0, 13.0, "middle", "normal", "#222", Some(-90.0), "Frequency");

    canvas.finish()
}

/// Word cloud laid out in centred rows, font size scaled by frequency
pub fn word_cloud(words: &[(String, usize)]) -> String {
    let (width, height) = (800.0, 400.0);
    let mut canvas = Canvas::new(width, height + 50.0);
    canvas.title("Key Terms in AI Conversations");

    let max = words.iter().map(|(_, c)| *c).max().unwrap_or(1) as f64;
    let sized: Vec<(&str, f64, &str)> = words
        .iter()
        .enumerate()
        .map(|(i, (word, count))| {
            let size = 14.0 + 42.0 * (*count as f64 / max);
            (word.as_str(), size, VIRIDIS[i % VIRIDIS.len()])
        })
        .collect();

    // Greedy row packing with an estimated glyph width of 0.6em
    let mut rows: Vec<Vec<(&str, f64, &str)>> = vec![Vec::new()];
    let mut row_width = 0.0;
    for word in sized {
        let w = word.0.chars().count() as f64 * word.1 * 0.6 + 12.0;
        if row_width + w > width - 40.0 && !rows.last().is_some_and(Vec::is_empty) {
            rows.push(Vec::new());
            row_width = 0.0;
        }
        row_width += w;
        if let Some(row) = rows.last_mut() {
            row.push(word);
        }
    }

    let mut y = 60.0;
    for row in rows {
        let line_height = row.iter().map(|w| w.1).fold(0.0, f64::max) * 1.1;
        if y + line_height > height + 40.0 {
            break;
        }
        let total: f64 = row
            .iter()
            .map(|w| w.0.chars().count() as f64 * w.1 * 0.6 + 12.0)
            .sum();
        let mut x = (width - total) / 2.0;
        y += line_height;
        for (word, size, color) in row {
            canvas.styled_text(x, y, size, "start", "bold", color, None, word);
            x += word.chars().count() as f64 * size * 0.6 + 12.0;
        }
    }

    canvas.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visuals::{default_dataset, keyword_frequencies};

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<AI & "ML">"#), "&lt;AI &amp; &quot;ML&quot;&gt;");
        assert_eq!(escape("world's"), "world&#39;s");
    }

    #[test]
    fn test_sentiment_chart_has_slices_and_bars() {
        let counts = Counts(vec![("positive".to_string(), 6), ("negative".to_string(), 4)]);
        let svg = sentiment_chart(&counts);

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<path").count(), 2);
        assert!(svg.contains("positive 60.0%"));
        assert!(svg.contains("<title>negative: 4</title>"));
    }

    #[test]
    fn test_single_sentiment_draws_full_circle() {
        let counts = Counts(vec![("positive".to_string(), 3)]);
        let svg = sentiment_chart(&counts);
        assert_eq!(svg.matches("<path").count(), 0);
        assert!(svg.contains("positive 100.0%"));
    }

    #[test]
    fn test_scatter_has_one_point_per_row() {
        let rows = default_dataset();
        let svg = category_scatter(&rows);
        // one circle per row plus two legend markers
        assert_eq!(svg.matches("<circle").count(), rows.len() + 2);
        assert!(svg.contains("Technology Adoption: 100 (positive)"));
    }

    #[test]
    fn test_keyword_bars_and_cloud() {
        let words = keyword_frequencies(&default_dataset(), 10).unwrap();
        let bars = keyword_bars(&words);
        assert!(bars.contains("<title>artificial: 6</title>"));

        let cloud = word_cloud(&words);
        assert!(cloud.contains(">artificial</text>"));
        assert!(cloud.contains("Key Terms in AI Conversations"));
    }
}
