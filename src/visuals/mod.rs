//! Descriptive charts and summary statistics for a conversation table.
//!
//! Static charts are written as SVG, the interactive views as standalone
//! HTML pages, and the headline numbers as `insights.json`.

pub mod interactive;
pub mod svg;

use regex::Regex;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisualError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("dataset is empty")]
    EmptyDataset,
}

/// One labelled post in the conversation table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRow {
    #[serde(alias = "tweet_text")]
    pub text: String,
    /// `positive` or `negative`
    pub sentiment: String,
    pub category: String,
    pub engagement_score: u32,
}

impl ConversationRow {
    fn new(text: &str, sentiment: &str, category: &str, engagement_score: u32) -> Self {
        Self {
            text: text.to_string(),
            sentiment: sentiment.to_string(),
            category: category.to_string(),
            engagement_score,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.sentiment.eq_ignore_ascii_case("positive")
    }
}

/// The reference conversation table
pub fn default_dataset() -> Vec<ConversationRow> {
    vec![
        ConversationRow::new(
            "The artificial intelligence industry is scrambling to reduce its massive energy consumption through better cooling systems",
            "negative",
            "Environmental Impact",
            85,
        ),
        ConversationRow::new(
            "Startups in artificial intelligence and fintech are struggling to process growing volumes of sensitive data",
            "negative",
            "Data Processing",
            72,
        ),
        ConversationRow::new(
            "Recently, tech giant Microsoft announced the largest round of layoffs since 2023",
            "negative",
            "Workforce Impact",
            95,
        ),
        ConversationRow::new(
            "A rising tide of artificial intelligence (AI) bands is ushering in a new era where work will be scarcer for musicians",
            "negative",
            "Creative Industry",
            88,
        ),
        ConversationRow::new(
            "Tanzanian entrepreneur Yvonne Baldwin has made history by winning two prestigious awards at the AI for Good Innovation Factory 2025",
            "positive",
            "Innovation Awards",
            92,
        ),
        ConversationRow::new(
            "Young Scientists Kenya (YSK) has trained 170 secondary school teachers in Artificial Intelligence",
            "positive",
            "Education",
            78,
        ),
        ConversationRow::new(
            "MTN Group has embarked on an exciting journey to leverage responsible Artificial Intelligence",
            "positive",
            "Infrastructure",
            65,
        ),
        ConversationRow::new(
            "Ecobank Group has announced a strategic partnership with Google Cloud to accelerate financial inclusion",
            "positive",
            "Financial Services",
            70,
        ),
        ConversationRow::new(
            "Kenya has emerged as the world's number one user of ChatGPT",
            "positive",
            "Technology Adoption",
            100,
        ),
        ConversationRow::new(
            "Meta Platforms Inc. has acquired PlayAI, a Cairo-founded artificial intelligence startup",
            "positive",
            "Acquisitions",
            90,
        ),
    ]
}

/// Load a conversation table from CSV (`text`/`tweet_text`, `sentiment`, `category`, `engagement_score`)
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<ConversationRow>, VisualError> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<ConversationRow>, _>>()?;
    if rows.is_empty() {
        return Err(VisualError::EmptyDataset);
    }
    Ok(rows)
}

/// Label counts ordered by count (descending), ties by first appearance
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Counts(pub Vec<(String, usize)>);

impl Counts {
    pub fn tally<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut order: Vec<(String, usize)> = Vec::new();
        let mut index: HashMap<&'a str, usize> = HashMap::new();
        for label in labels {
            match index.get(label) {
                Some(&i) => order[i].1 += 1,
                None => {
                    index.insert(label, order.len());
                    order.push((label.to_string(), 1));
                }
            }
        }
        // stable sort keeps first-appearance order among equal counts
        order.sort_by(|a, b| b.1.cmp(&a.1));
        Self(order)
    }

    pub fn get(&self, label: &str) -> usize {
        self.0
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }
}

impl Serialize for Counts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, count) in &self.0 {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

/// Headline statistics written to `insights.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub total_posts: usize,
    /// Share of positive rows, in percent
    pub positive_ratio: f64,
    pub avg_engagement: f64,
    /// Category of the most engaging row (first one on ties)
    pub top_category: String,
    pub highest_engagement: u32,
    pub sentiment_distribution: Counts,
    pub category_counts: Counts,
}

pub fn compute_insights(rows: &[ConversationRow]) -> Result<Insights, VisualError> {
    let top = rows
        .iter()
        .reduce(|best, row| {
            if row.engagement_score > best.engagement_score {
                row
            } else {
                best
            }
        })
        .ok_or(VisualError::EmptyDataset)?;

    let total = rows.len();
    let positive = rows.iter().filter(|r| r.is_positive()).count();
    let engagement: u64 = rows.iter().map(|r| u64::from(r.engagement_score)).sum();

    Ok(Insights {
        total_posts: total,
        positive_ratio: positive as f64 / total as f64 * 100.0,
        avg_engagement: engagement as f64 / total as f64,
        top_category: top.category.clone(),
        highest_engagement: top.engagement_score,
        sentiment_distribution: Counts::tally(rows.iter().map(|r| r.sentiment.as_str())),
        category_counts: Counts::tally(rows.iter().map(|r| r.category.as_str())),
    })
}

const STOP_WORDS: [&str; 21] = [
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "a", "an",
    "is", "are", "was", "were", "has", "have", "had",
];

/// Lower-cased words with punctuation removed, in text order
pub fn tokenize(rows: &[ConversationRow]) -> Result<Vec<String>, VisualError> {
    let punctuation = Regex::new(r"[^\w\s]")?;
    let word = Regex::new(r"\b\w+\b")?;

    let all_text = rows
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let cleaned = punctuation.replace_all(&all_text, "");

    Ok(word
        .find_iter(&cleaned)
        .map(|m| m.as_str().to_string())
        .collect())
}

/// Most frequent terms longer than three characters, excluding stop words
pub fn keyword_frequencies(
    rows: &[ConversationRow],
    top_n: usize,
) -> Result<Vec<(String, usize)>, VisualError> {
    let words = tokenize(rows)?;
    let counts = Counts::tally(
        words
            .iter()
            .map(String::as_str)
            .filter(|w| w.chars().count() > 3 && !STOP_WORDS.contains(w)),
    );
    Ok(counts.0.into_iter().take(top_n).collect())
}

/// Files produced by [`render_all`]
#[derive(Debug, Clone)]
pub struct RenderReport {
    pub files: Vec<PathBuf>,
    pub insights: Insights,
    pub top_keywords: Vec<(String, usize)>,
}

/// Render every chart, both interactive pages and the insights summary into `dir`
pub fn render_all(rows: &[ConversationRow], dir: &Path) -> Result<RenderReport, VisualError> {
    if rows.is_empty() {
        return Err(VisualError::EmptyDataset);
    }
    fs::create_dir_all(dir)?;
    ::log::info!("Rendering visuals for {} posts into {}", rows.len(), dir.display());

    let insights = compute_insights(rows)?;
    let top_keywords = keyword_frequencies(rows, 10)?;
    let cloud_words = keyword_frequencies(rows, 100)?;

    let outputs = [
        ("sentiment_analysis.svg", svg::sentiment_chart(&insights.sentiment_distribution)),
        ("category_engagement.svg", svg::category_scatter(rows)),
        ("top_keywords.svg", svg::keyword_bars(&top_keywords)),
        ("wordcloud.svg", svg::word_cloud(&cloud_words)),
        ("treemap_interactive.html", interactive::treemap_page(rows)),
        ("engagement_trend.html", interactive::engagement_page(rows)),
    ];

    let mut files = Vec::with_capacity(outputs.len() + 1);
    for (name, contents) in outputs {
        let path = dir.join(name);
        fs::write(&path, contents)?;
        ::log::debug!("Wrote {}", path.display());
        files.push(path);
    }

    let insights_path = dir.join("insights.json");
    let mut writer = BufWriter::new(File::create(&insights_path)?);
    serde_json::to_writer_pretty(&mut writer, &insights)?;
    writer.flush()?;
    files.push(insights_path);

    ::log::info!(
        "{:.1}% of conversations are positive, average engagement {:.1}, top category {} ({})",
        insights.positive_ratio,
        insights.avg_engagement,
        insights.top_category,
        insights.highest_engagement
    );

    Ok(RenderReport {
        files,
        insights,
        top_keywords,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insights_for_default_dataset() {
        let insights = compute_insights(&default_dataset()).unwrap();

        assert_eq!(insights.total_posts, 10);
        assert!((insights.positive_ratio - 60.0).abs() < 1e-9);
        assert!((insights.avg_engagement - 83.5).abs() < 1e-9);
        assert_eq!(insights.top_category, "Technology Adoption");
        assert_eq!(insights.highest_engagement, 100);
        assert_eq!(
            insights.sentiment_distribution.0,
            vec![("positive".to_string(), 6), ("negative".to_string(), 4)]
        );
        assert_eq!(insights.category_counts.0.len(), 10);
        assert_eq!(insights.sentiment_distribution.get("negative"), 4);
        assert_eq!(insights.sentiment_distribution.get("neutral"), 0);
    }

    #[test]
    fn test_insights_json_shape() {
        let insights = compute_insights(&default_dataset()).unwrap();
        let json = serde_json::to_value(&insights).unwrap();

        assert_eq!(json["total_posts"], 10);
        assert_eq!(json["sentiment_distribution"]["negative"], 4);
        assert_eq!(json["category_counts"]["Education"], 1);
    }

    #[test]
    fn test_top_category_first_on_ties() {
        let rows = vec![
            ConversationRow::new("a", "positive", "First", 50),
            ConversationRow::new("b", "negative", "Second", 50),
        ];
        assert_eq!(compute_insights(&rows).unwrap().top_category, "First");
    }

    #[test]
    fn test_empty_dataset() {
        assert!(matches!(compute_insights(&[]), Err(VisualError::EmptyDataset)));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(render_all(&[], dir.path()), Err(VisualError::EmptyDataset)));
    }

    #[test]
    fn test_keyword_frequencies() {
        let top = keyword_frequencies(&default_dataset(), 3).unwrap();
        assert_eq!(top[0], ("artificial".to_string(), 6));
        assert_eq!(top[1], ("intelligence".to_string(), 6));
        assert_eq!(top.len(), 3);

        let all = keyword_frequencies(&default_dataset(), usize::MAX).unwrap();
        assert!(all.iter().all(|(w, _)| w.len() > 3));
        assert!(!all.iter().any(|(w, _)| w == "with" || w == "have"));
    }

    #[test]
    fn test_tokenize_strips_punctuation() {
        let rows = vec![ConversationRow::new("World's #1: ChatGPT, (AI)!", "positive", "x", 1)];
        assert_eq!(tokenize(&rows).unwrap(), vec!["worlds", "1", "chatgpt", "ai"]);
    }

    #[test]
    fn test_render_all_writes_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let report = render_all(&default_dataset(), dir.path()).unwrap();

        let names: Vec<_> = report
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "sentiment_analysis.svg",
                "category_engagement.svg",
                "top_keywords.svg",
                "wordcloud.svg",
                "treemap_interactive.html",
                "engagement_trend.html",
                "insights.json",
            ]
        );
        for path in &report.files {
            assert!(fs::metadata(path).unwrap().len() > 0);
        }

        let insights: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("insights.json")).unwrap())
                .unwrap();
        assert_eq!(insights["top_category"], "Technology Adoption");
        assert_eq!(report.top_keywords.len(), 10);
    }

    #[test]
    fn test_load_csv_accepts_tweet_text_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        fs::write(
            &path,
            "tweet_text,sentiment,category,engagement_score\n\"AI, in Kenya\",positive,Education,40\n",
        )
        .unwrap();

        let rows = load_csv(&path).unwrap();
        assert_eq!(rows, vec![ConversationRow::new("AI, in Kenya", "positive", "Education", 40)]);

        let empty = dir.path().join("empty.csv");
        fs::write(&empty, "text,sentiment,category,engagement_score\n").unwrap();
        assert!(matches!(load_csv(&empty), Err(VisualError::EmptyDataset)));
    }
}
