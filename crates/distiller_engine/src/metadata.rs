//! Page-level metadata: title, byline, description and site name.

use std::collections::HashMap;
use std::sync::LazyLock;

use ego_tree::NodeId;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::scoring::{collapse_whitespace, is_hidden};

static BYLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)byline|author|dateline|writtenby|p-author").expect("BYLINE should compile")
});
static META: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta").expect("META should parse"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("head > title").expect("TITLE should parse"));
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("H1 should parse"));

const TITLE_SEPARATORS: &[&str] = &[" | ", " - ", " – ", " — ", " \\ ", " / ", " > ", " » ", " :: "];
const MAX_BYLINE_CHARS: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub byline: Option<String>,
    /// Element holding the byline in the body; removed from the article content.
    pub byline_node: Option<NodeId>,
    pub description: Option<String>,
    pub site_name: Option<String>,
}

/// `<meta>` values keyed by lowercased `property`, `name` or `itemprop`.
/// The first occurrence of a key wins.
struct MetaTags(HashMap<String, String>);

impl MetaTags {
    fn collect(doc: &Html) -> Self {
        let mut values = HashMap::new();
        for meta in doc.select(&META) {
            let element = meta.value();
            let Some(content) = element.attr("content").map(collapse_whitespace) else {
                continue;
            };
            if content.is_empty() {
                continue;
            }
            for key_attr in ["property", "name", "itemprop"] {
                if let Some(key) = element.attr(key_attr) {
                    // `property` may hold several space-separated names.
                    for key in key.split_whitespace() {
                        values
                            .entry(key.to_ascii_lowercase())
                            .or_insert_with(|| content.clone());
                    }
                }
            }
        }
        Self(values)
    }

    fn first(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.0.get(*key).cloned())
    }
}

pub fn extract_metadata(doc: &Html) -> PageMetadata {
    let meta = MetaTags::collect(doc);

    let title = meta
        .first(&[
            "og:title",
            "twitter:title",
            "dc:title",
            "dc.title",
            "dcterms:title",
            "dcterms.title",
        ])
        .or_else(|| document_title(doc))
        .or_else(|| first_heading(doc));

    let meta_author = meta
        .first(&[
            "author",
            "article:author",
            "dc:creator",
            "dc.creator",
            "dcterms:creator",
            "dcterms.creator",
        ])
        .filter(|value| !looks_like_url(value));
    let dom_byline = find_byline_element(doc);
    let byline = meta_author.or_else(|| dom_byline.as_ref().map(|(text, _)| text.clone()));

    PageMetadata {
        title,
        byline,
        byline_node: dom_byline.map(|(_, id)| id),
        description: meta.first(&[
            "og:description",
            "description",
            "twitter:description",
            "dc:description",
        ]),
        site_name: meta.first(&["og:site_name", "application-name"]),
    }
}

fn document_title(doc: &Html) -> Option<String> {
    doc.select(&TITLE)
        .next()
        .map(|title| collapse_whitespace(&title.text().collect::<String>()))
        .map(|raw| clean_title(&raw))
        .filter(|title| !title.is_empty())
}

fn first_heading(doc: &Html) -> Option<String> {
    doc.select(&H1)
        .map(|h1| collapse_whitespace(&h1.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

/// Drops a site-name suffix or prefix such as `Story title | Example News`.
pub(crate) fn clean_title(raw: &str) -> String {
    let raw = raw.trim();
    let last = TITLE_SEPARATORS
        .iter()
        .filter_map(|sep| raw.rfind(sep).map(|idx| (idx, *sep)))
        .max_by_key(|(idx, _)| *idx);
    let Some((last_idx, _)) = last else {
        return raw.to_string();
    };

    let head = raw[..last_idx].trim();
    if word_count(head) >= 3 {
        return head.to_string();
    }

    let first = TITLE_SEPARATORS
        .iter()
        .filter_map(|sep| raw.find(sep).map(|idx| (idx, *sep)))
        .min_by_key(|(idx, _)| *idx);
    if let Some((first_idx, sep)) = first {
        let tail = raw[first_idx + sep.len()..].trim();
        if word_count(tail) >= 3 {
            return tail.to_string();
        }
    }
    raw.to_string()
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn looks_like_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn find_byline_element(doc: &Html) -> Option<(String, NodeId)> {
    let body = doc
        .root_element()
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "body")?;

    body.descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| !is_hidden(element))
        .filter(|element| is_byline_candidate(element))
        .find_map(|element| {
            let text = collapse_whitespace(&element.text().collect::<String>());
            let len = text.chars().count();
            (len > 0 && len < MAX_BYLINE_CHARS).then(|| (text, element.id()))
        })
}

fn is_byline_candidate(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    if value.attr("rel") == Some("author") {
        return true;
    }
    if value
        .attr("itemprop")
        .is_some_and(|itemprop| itemprop.contains("author"))
    {
        return true;
    }
    let match_string = format!(
        "{} {}",
        value.attr("class").unwrap_or_default(),
        value.id().unwrap_or_default()
    );
    BYLINE.is_match(&match_string)
}
