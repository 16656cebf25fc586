use crate::parsers::RawPost;
use crate::parsers::text;
use scraper::{ElementRef, Html, Selector};

/// Outer HTML of one post container, detached from the page it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFragment {
    html: String,
}

impl PostFragment {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Parse the fragment into a tree the extractor can query
    pub fn document(&self) -> Html {
        Html::parse_fragment(&self.html)
    }
}

/// Collapse an element's text nodes into one normalized string
fn element_text(element: ElementRef<'_>) -> String {
    text::clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

impl RawPost for Html {
    fn lookup_text(&self, selector: &Selector) -> Option<String> {
        self.select(selector).next().map(element_text)
    }

    fn lookup_attr(&self, selector: &Selector, attr: &str) -> Option<String> {
        self.select(selector)
            .next()
            .and_then(|el| el.value().attr(attr))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

/// Splits a rendered page into one fragment per post container
pub fn split_posts(page_html: &str, container: &Selector) -> Vec<PostFragment> {
    let doc = Html::parse_document(page_html);
    let posts = doc
        .select(container)
        .map(|el| PostFragment::new(el.html()))
        .collect::<Vec<_>>();

    ::log::debug!("HTML parser found {} post containers", posts.len());
    posts
}

