use serde::{Deserialize, Serialize};

/// Identifies one unit of collection work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceDescriptor {
    /// A company page on the professional network
    Company {
        handle: String,
        name: String,
        sector: String,
    },
    /// A free-text search query against the microblogging API
    Query(String),
}

impl SourceDescriptor {
    /// Short name used in log lines
    pub fn label(&self) -> &str {
        match self {
            SourceDescriptor::Company { handle, .. } => handle,
            SourceDescriptor::Query(query) => query,
        }
    }
}

/// One collected post with its engagement counts and source metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Post body (always present, possibly empty)
    pub text: String,

    pub author_name: Option<String>,
    pub author_title: Option<String>,

    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub reposts: u64,
    pub quotes: u64,

    pub author_followers: Option<u64>,
    pub author_verified: Option<bool>,

    /// When the post was published (ISO-8601), or the extraction time when unknown
    pub created_at: String,

    /// When the record was extracted (ISO-8601)
    pub collected_at: String,

    pub company: Option<String>,
    pub company_handle: Option<String>,
    pub sector: Option<String>,
    pub query: Option<String>,
}

impl PostRecord {
    /// Create a record holding only text; every other field is defaulted
    pub fn with_text(text: impl Into<String>) -> Self {
        let now = crate::utils::now_iso8601();
        Self {
            text: text.into(),
            created_at: now.clone(),
            collected_at: now,
            ..Self::default()
        }
    }

    /// Copy the source's metadata into the record
    pub fn tag(&mut self, source: &SourceDescriptor) {
        match source {
            SourceDescriptor::Company {
                handle,
                name,
                sector,
            } => {
                self.company = Some(name.clone());
                self.company_handle = Some(handle.clone());
                self.sector = Some(sector.clone());
            }
            SourceDescriptor::Query(query) => {
                self.query = Some(query.clone());
            }
        }
    }
}

/// Append-only table of records accumulated during one run
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    records: Vec<PostRecord>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: PostRecord) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = PostRecord>) {
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PostRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<PostRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_company() {
        let mut record = PostRecord::with_text("AI in Kenya");
        record.tag(&SourceDescriptor::Company {
            handle: "safaricom".to_string(),
            name: "Safaricom PLC".to_string(),
            sector: "Telecommunications".to_string(),
        });

        assert_eq!(record.company.as_deref(), Some("Safaricom PLC"));
        assert_eq!(record.company_handle.as_deref(), Some("safaricom"));
        assert_eq!(record.sector.as_deref(), Some("Telecommunications"));
        assert_eq!(record.query, None);
    }

    #[test]
    fn test_tag_query() {
        let mut record = PostRecord::with_text("machine learning meetup");
        record.tag(&SourceDescriptor::Query("\"machine learning\" Kenya".to_string()));

        assert_eq!(record.query.as_deref(), Some("\"machine learning\" Kenya"));
        assert_eq!(record.company, None);
    }

    #[test]
    fn test_result_table_keeps_arrival_order() {
        let mut table = ResultTable::new();
        assert!(table.is_empty());

        table.push(PostRecord::with_text("first"));
        table.extend(vec![PostRecord::with_text("second"), PostRecord::with_text("third")]);

        let texts: Vec<_> = table.records().iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(table.len(), 3);
    }
}
