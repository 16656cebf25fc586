use crate::visuals::ConversationRow;
use crate::visuals::svg::{Canvas, NEGATIVE_COLOR, POSITIVE_COLOR, escape};

const PAGE_STYLE: &str = "body{font-family:Helvetica,Arial,sans-serif;margin:24px;background:#fafafa}\
rect:hover,circle:hover{opacity:0.75;cursor:pointer}\
.legend span{display:inline-block;width:12px;height:12px;margin:0 6px 0 16px}";

/// Wrap an SVG figure into a standalone HTML page
fn page(title: &str, figure: String, legend: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{PAGE_STYLE}</style>\n</head>\n<body>\n<h2>{title}</h2>\n<div class=\"legend\">{legend}</div>\n{figure}\n</body>\n</html>\n",
        title = escape(title),
    )
}

fn legend_entry(color: &str, label: &str) -> String {
    format!(r#"<span style="background:{color}"></span>{}"#, escape(label))
}

/// Red to yellow to green ramp over `t` in `[0, 1]`
pub fn rdylgn(t: f64) -> String {
    const STOPS: [(f64, (u8, u8, u8)); 3] = [
        (0.0, (215, 48, 39)),
        (0.5, (255, 255, 191)),
        (1.0, (26, 152, 80)),
    ];
    let t = t.clamp(0.0, 1.0);
    let (lo, hi) = if t <= 0.5 { (STOPS[0], STOPS[1]) } else { (STOPS[1], STOPS[2]) };
    let local = (t - lo.0) / (hi.0 - lo.0);
    let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * local).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        mix(lo.1.0, hi.1.0),
        mix(lo.1.1, hi.1.1),
        mix(lo.1.2, hi.1.2)
    )
}

/// Rows grouped by `key`, groups in first-appearance order
fn group_by<'a, I, F>(rows: I, key: F) -> Vec<(&'a str, Vec<&'a ConversationRow>)>
where
    I: IntoIterator<Item = &'a ConversationRow>,
    F: Fn(&'a ConversationRow) -> &'a str,
{
    let mut groups: Vec<(&str, Vec<&ConversationRow>)> = Vec::new();
    for row in rows {
        let k = key(row);
        match groups.iter_mut().find(|(name, _)| *name == k) {
            Some((_, members)) => members.push(row),
            None => groups.push((k, vec![row])),
        }
    }
    groups
}

fn weight(rows: &[&ConversationRow]) -> f64 {
    rows.iter().map(|r| f64::from(r.engagement_score)).sum()
}

/// Treemap of sentiment then category, area by engagement and colour by score
pub fn treemap_page(rows: &[ConversationRow]) -> String {
    let (width, height) = (1000.0, 600.0);
    let mut canvas = Canvas::new(width, height);

    let min = rows.iter().map(|r| r.engagement_score).min().unwrap_or(0);
    let max = rows.iter().map(|r| r.engagement_score).max().unwrap_or(0);
    let span = f64::from(max.saturating_sub(min)).max(1.0);

    let sentiments = group_by(rows, |r| r.sentiment.as_str());
    let total: f64 = sentiments.iter().map(|(_, members)| weight(members)).sum();

    // slice horizontally by sentiment, then dice vertically by category
    let mut x = 0.0;
    for (sentiment, members) in &sentiments {
        let w = if total > 0.0 { weight(members) / total * width } else { 0.0 };
        let header = 24.0;
        canvas.rect(x, 0.0, w, header, "#555", Some(*sentiment));
        canvas.styled_text(x + 6.0, 17.0, 13.0, "start", "bold", "white", None, sentiment);

        let categories = group_by(members.iter().copied(), |r| r.category.as_str());
        let inner = weight(members);
        let mut y = header;
        for (category, cells) in &categories {
            let h = if inner > 0.0 { weight(cells) / inner * (height - header) } else { 0.0 };
            let score = cells.iter().map(|r| r.engagement_score).max().unwrap_or(0);
            let color = rdylgn(f64::from(score.saturating_sub(min)) / span);
            let tip = format!(
                "{sentiment} / {category}\nengagement: {}\n{}",
                weight(cells),
                cells.iter().map(|r| r.text.as_str()).collect::<Vec<_>>().join("\n")
            );
            canvas.rect(x, y, w, h, &color, Some(&tip));
            if h >= 18.0 {
                canvas.text(x + 6.0, y + 16.0, 12.0, "start", category);
            }
            y += h;
        }
        x += w;
    }

    let legend = format!(
        "{}{}",
        legend_entry(&rdylgn(0.0), &format!("engagement {min}")),
        legend_entry(&rdylgn(1.0), &format!("engagement {max}"))
    );
    page("AI Conversation Landscape", canvas.finish(), &legend)
}

/// Engagement score per category as bars coloured by sentiment
pub fn engagement_page(rows: &[ConversationRow]) -> String {
    let (width, height) = (1000.0, 560.0);
    let mut canvas = Canvas::new(width, height);
    let (x0, y0, plot_w, plot_h) = (70.0, 400.0, 900.0, 360.0);

    let max = rows
        .iter()
        .map(|r| f64::from(r.engagement_score))
        .fold(0.0, f64::max)
        .max(1.0);
    let slot = plot_w / rows.len().max(1) as f64;

    canvas.line(x0, y0, x0 + plot_w, y0);
    canvas.line(x0, y0, x0, y0 - plot_h);
    canvas.text(x0 - 6.0, y0 - plot_h + 4.0, 11.0, "end", &format!("{max}"));
    canvas.text(x0 - 6.0, y0 + 4.0, 11.0, "end", "0");

    for (i, row) in rows.iter().enumerate() {
        let h = f64::from(row.engagement_score) / max * plot_h;
        let x = x0 + i as f64 * slot + slot * 0.1;
        let w = slot * 0.8;
        let color = if row.is_positive() { POSITIVE_COLOR } else { NEGATIVE_COLOR };
        let tip = format!(
            "{}\nengagement: {}\nsentiment: {}\n{}",
            row.category, row.engagement_score, row.sentiment, row.text
        );
        canvas.rect(x, y0 - h, w, h, color, Some(&tip));
        canvas.rotated_text(x + w / 2.0, y0 + 14.0, 11.0, -45.0, &row.category);
    }

    let legend = format!(
        "{}{}",
        legend_entry(POSITIVE_COLOR, "positive"),
        legend_entry(NEGATIVE_COLOR, "negative")
    );
    page("Engagement Scores by Category", canvas.finish(), &legend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visuals::default_dataset;

    #[test]
    fn test_rdylgn_endpoints() {
        assert_eq!(rdylgn(0.0), "#d73027");
        assert_eq!(rdylgn(0.5), "#ffffbf");
        assert_eq!(rdylgn(1.0), "#1a9850");
        assert_eq!(rdylgn(7.0), "#1a9850");
    }

    #[test]
    fn test_treemap_has_cell_per_category() {
        let rows = default_dataset();
        let html = treemap_page(&rows);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>positive / Technology Adoption\nengagement: 100"));
        // background, two sentiment headers, ten category cells
        assert_eq!(html.matches("<rect").count(), 1 + 2 + 10);
    }

    #[test]
    fn test_treemap_groups_shared_category() {
        let rows = vec![
            ConversationRow::new("a", "positive", "Education", 10),
            ConversationRow::new("b", "positive", "Education", 30),
            ConversationRow::new("c", "negative", "Workforce", 20),
        ];
        let html = treemap_page(&rows);
        assert!(html.contains("positive / Education\nengagement: 40\na\nb"));
        assert_eq!(html.matches("<rect").count(), 1 + 2 + 2);
    }

    #[test]
    fn test_engagement_page_escapes_text() {
        let rows = vec![ConversationRow::new("AI <b>& ML</b>", "negative", "Data", 5)];
        let html = engagement_page(&rows);
        assert!(html.contains("AI &lt;b&gt;&amp; ML&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
        assert!(html.contains(NEGATIVE_COLOR));
    }
}
