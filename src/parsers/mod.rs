pub mod html;
pub mod text;


use crate::results::PostRecord;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building an extractor
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid selector for {field}: {selector} ({reason})")]
    InvalidSelector {
        field: &'static str,
        selector: String,
        reason: String,
    },
}

/// Read access to one post in a page tree
///
/// Implementations return `None` when the element is absent; the extractor
/// turns that into the field default.
pub trait RawPost {
    /// Normalized text of the first element matching `selector`
    fn lookup_text(&self, selector: &Selector) -> Option<String>;

    /// Value of `attr` on the first element matching `selector`
    fn lookup_attr(&self, selector: &Selector, attr: &str) -> Option<String>;
}

/// Named fields a lookup rule can fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostField {
    Text,
    AuthorName,
    AuthorTitle,
    Likes,
    Comments,
    Shares,
    Reposts,
    Timestamp,
}

/// How an extracted string is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Count,
    Timestamp,
}

impl PostField {
    pub fn name(&self) -> &'static str {
        match self {
            PostField::Text => "post_text",
            PostField::AuthorName => "author_name",
            PostField::AuthorTitle => "author_title",
            PostField::Likes => "likes",
            PostField::Comments => "comments",
            PostField::Shares => "shares",
            PostField::Reposts => "reposts",
            PostField::Timestamp => "timestamp",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            PostField::Text | PostField::AuthorName | PostField::AuthorTitle => FieldKind::Text,
            PostField::Likes | PostField::Comments | PostField::Shares | PostField::Reposts => {
                FieldKind::Count
            }
            PostField::Timestamp => FieldKind::Timestamp,
        }
    }
}

/// CSS selectors for the post container and each field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorTable {
    #[serde(default = "default_post_container")]
    pub post_container: String,
    #[serde(default = "default_post_text")]
    pub post_text: String,
    #[serde(default = "default_author_name")]
    pub author_name: String,
    #[serde(default = "default_author_title")]
    pub author_title: String,
    #[serde(default = "default_likes")]
    pub likes: String,
    #[serde(default = "default_comments")]
    pub comments: String,
    #[serde(default = "default_shares")]
    pub shares: String,
    /// Repost counter (not rendered on every layout)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reposts: Option<String>,
    /// Publication time element; the `datetime` attribute is preferred over its text
    #[serde(default = "default_timestamp")]
    pub timestamp: Option<String>,
}

fn default_post_container() -> String {
    "div.feed-shared-update-v2".to_string()
}

fn default_post_text() -> String {
    "div.feed-shared-update-v2__description span.break-words".to_string()
}

fn default_author_name() -> String {
    "span.feed-shared-actor__name".to_string()
}

fn default_author_title() -> String {
    "span.feed-shared-actor__description".to_string()
}

fn default_likes() -> String {
    "button.social-details-social-counts__reactions-count".to_string()
}

fn default_comments() -> String {
    "button.social-details-social-counts__comments".to_string()
}

fn default_shares() -> String {
    "button.social-details-social-counts__shares".to_string()
}

fn default_timestamp() -> Option<String> {
    Some("time".to_string())
}

impl Default for SelectorTable {
    fn default() -> Self {
        Self {
            post_container: default_post_container(),
            post_text: default_post_text(),
            author_name: default_author_name(),
            author_title: default_author_title(),
            likes: default_likes(),
            comments: default_comments(),
            shares: default_shares(),
            reposts: None,
            timestamp: default_timestamp(),
        }
    }
}

/// A compiled lookup rule
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: PostField,
    pub selector: Selector,
}

/// Best-effort extractor built once from a [`SelectorTable`]
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    container: Selector,
    rules: Vec<FieldRule>,
}

fn compile(field: &'static str, selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        field,
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

impl FieldExtractor {
    /// Compile every selector in the table
    pub fn new(table: &SelectorTable) -> Result<Self, ExtractError> {
        let mut specs = vec![
            (PostField::Text, Some(&table.post_text)),
            (PostField::AuthorName, Some(&table.author_name)),
            (PostField::AuthorTitle, Some(&table.author_title)),
            (PostField::Likes, Some(&table.likes)),
            (PostField::Comments, Some(&table.comments)),
            (PostField::Shares, Some(&table.shares)),
        ];
        specs.push((PostField::Reposts, table.reposts.as_ref()));
        specs.push((PostField::Timestamp, table.timestamp.as_ref()));

        let mut rules = Vec::with_capacity(specs.len());
        for (field, selector) in specs {
            if let Some(selector) = selector {
                rules.push(FieldRule {
                    field,
                    selector: compile(field.name(), selector)?,
                });
            }
        }

        Ok(Self {
            container: compile("post_container", &table.post_container)?,
            rules,
        })
    }

    /// Selector matching one post container on a page
    pub fn container(&self) -> &Selector {
        &self.container
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    /// Raw string for one field, or `None` when there is no rule or no element
    pub fn lookup(&self, post: &dyn RawPost, field: PostField) -> Option<String> {
        let rule = self.rules.iter().find(|r| r.field == field)?;
        let value = match field.kind() {
            FieldKind::Timestamp => post
                .lookup_attr(&rule.selector, "datetime")
                .or_else(|| post.lookup_text(&rule.selector)),
            _ => post.lookup_text(&rule.selector),
        };
        if value.is_none() {
            ::log::debug!("Field {} not found, using default", field.name());
        }
        value
    }

    /// Extract a fully populated record; absent fields take their defaults
    pub fn extract(&self, post: &dyn RawPost) -> PostRecord {
        let mut record = PostRecord::with_text(self.text_or_default(post, PostField::Text));

        record.author_name = self.optional_text(post, PostField::AuthorName);
        record.author_title = self.optional_text(post, PostField::AuthorTitle);
        record.likes = self.count_or_default(post, PostField::Likes);
        record.comments = self.count_or_default(post, PostField::Comments);
        record.shares = self.count_or_default(post, PostField::Shares);
        record.reposts = self.count_or_default(post, PostField::Reposts);

        if let Some(published) = self.timestamp(post) {
            record.created_at = published;
        }

        record
    }

    fn text_or_default(&self, post: &dyn RawPost, field: PostField) -> String {
        self.lookup(post, field).unwrap_or_default()
    }

    fn optional_text(&self, post: &dyn RawPost, field: PostField) -> Option<String> {
        self.lookup(post, field).filter(|s| !s.is_empty())
    }

    fn count_or_default(&self, post: &dyn RawPost, field: PostField) -> u64 {
        self.lookup(post, field)
            .map(|raw| text::parse_count(&raw))
            .unwrap_or(0)
    }

    fn timestamp(&self, post: &dyn RawPost) -> Option<String> {
        let raw = self.lookup(post, PostField::Timestamp)?;
        match text::parse_timestamp(&raw) {
            Some(ts) => Some(ts),
            None => {
                ::log::debug!("Unparseable timestamp {:?}, using extraction time", raw);
                None
            }
        }
    }
}
