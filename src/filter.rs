/// Default keyword list for AI and technology conversations
pub fn default_keywords() -> Vec<String> {
    [
        "AI",
        "artificial intelligence",
        "machine learning",
        "automation",
        "digital transformation",
        "reskilling",
        "upskilling",
        "innovation",
        "tech",
        "technology",
        "digital skills",
        "future of work",
        "data science",
        "robotics",
        "blockchain",
        "cloud computing",
        "IoT",
        "digital adoption",
        "tech talent",
        "digital economy",
        "fintech",
        "cyber security",
        "big data",
        "analytics",
    ]
    .iter()
    .map(|k| k.to_string())
    .collect()
}

/// Relevance gate that keeps posts mentioning at least one keyword
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    keywords: Vec<String>,
    folded: Vec<String>,
}

impl Default for KeywordFilter {
    fn default() -> Self {
        Self::new(default_keywords())
    }
}

impl KeywordFilter {
    /// Create a new keyword filter; keywords keep their order
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(Into::<String>::into)
            .filter(|k| !k.is_empty())
            .collect();
        let folded = keywords.iter().map(|k| k.to_lowercase()).collect();
        Self { keywords, folded }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// True iff any keyword is a substring of the lower-cased text
    pub fn is_relevant(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        let text = text.to_lowercase();
        self.folded.iter().any(|k| text.contains(k.as_str()))
    }

    /// Keywords that occur in the text, in keyword order
    pub fn matched_keywords(&self, text: &str) -> Vec<&str> {
        let text = text.to_lowercase();
        self.folded
            .iter()
            .zip(&self.keywords)
            .filter(|(folded, _)| text.contains(folded.as_str()))
            .map(|(_, original)| original.as_str())
            .collect()
    }
}

/// Stateless form of [`KeywordFilter::is_relevant`]
pub fn is_relevant<S: AsRef<str>>(text: &str, keywords: &[S]) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    let text = text.to_lowercase();
    keywords
        .iter()
        .map(|k| k.as_ref())
        .filter(|k| !k.is_empty())
        .any(|k| text.contains(&k.to_lowercase()))
}
