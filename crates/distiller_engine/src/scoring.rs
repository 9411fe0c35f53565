//! Readability-style candidate scoring.
//!
//! Scorable blocks (paragraphs and paragraph-like divs) hand points to their
//! ancestors; the best ancestor after link-density damping is the article root.
//! All constants here are calibration values, tuned against the fixture pages
//! in `tests/extract.rs`.

use std::collections::HashMap;
use std::sync::LazyLock;

use ego_tree::NodeId;
use regex::Regex;
use scraper::ElementRef;

static UNLIKELY_CANDIDATES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)-ad-|ai2html|banner|breadcrumbs|combx|comment|community|cover-wrap|disqus|extra|footer|gdpr|header|legends|menu|related|remark|replies|rss|shoutbox|sidebar|skyscraper|social|sponsor|supplemental|ad-break|agegate|pagination|pager|popup|yom-remote",
    )
    .expect("UNLIKELY_CANDIDATES should compile")
});
static MAYBE_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)and|article|body|column|content|main|shadow")
        .expect("MAYBE_CANDIDATE should compile")
});
static POSITIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)article|body|content|entry|hentry|h-entry|main|page|pagination|post|text|blog|story",
    )
    .expect("POSITIVE should compile")
});
static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)-ad-|hidden|^hid$| hid$| hid |^hid |banner|combx|comment|com-|contact|footer|gdpr|masthead|media|meta|outbrain|promo|related|scroll|share|shoutbox|sidebar|skyscraper|sponsor|shopping|tags|widget",
    )
    .expect("NEGATIVE should compile")
});

/// Subtrees that never hold article prose.
pub(crate) const NON_CONTENT_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "svg", "canvas", "object", "embed",
    "nav", "aside", "footer", "button", "input", "select", "textarea", "link", "meta", "head",
];
const UNLIKELY_ROLES: &[&str] = &[
    "menu",
    "menubar",
    "complementary",
    "navigation",
    "alert",
    "alertdialog",
    "dialog",
];
const SCORABLE_TAGS: &[&str] = &["p", "pre", "td", "section", "h2", "h3", "h4", "h5", "h6"];
/// A `div` containing none of these is scored like a paragraph.
const BLOCK_TAGS: &[&str] = &[
    "blockquote", "dl", "div", "img", "ol", "p", "pre", "table", "ul", "section", "article",
    "figure",
];

/// Subtrees nested deeper than this are ignored.
pub(crate) const MAX_WALK_DEPTH: usize = 1024;

/// Tunable thresholds of the heuristic.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractSettings {
    /// Blocks with less text than this do not contribute to scores.
    pub min_paragraph_chars: usize,
    /// Extraction fails when the selected content holds less text than this.
    pub min_content_chars: usize,
    /// How many ancestors receive points from one block.
    pub ancestor_depth: usize,
    /// Siblings scoring at least `ratio * top score` join the article.
    pub sibling_score_ratio: f64,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            min_paragraph_chars: 25,
            min_content_chars: 80,
            ancestor_depth: 5,
            sibling_score_ratio: 0.2,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct CandidateScores {
    scores: HashMap<NodeId, f64>,
    /// Discovery order, used to break ties.
    order: Vec<NodeId>,
}

impl CandidateScores {
    pub(crate) fn score(&self, id: NodeId) -> Option<f64> {
        self.scores.get(&id).copied()
    }

    fn add(&mut self, element: &ElementRef<'_>, points: f64) {
        let id = element.id();
        if !self.scores.contains_key(&id) {
            self.scores.insert(id, initial_score(element));
            self.order.push(id);
        }
        if let Some(score) = self.scores.get_mut(&id) {
            *score += points;
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Scores every candidate below `body` and returns the scores after
/// link-density damping.
pub(crate) fn score_candidates(body: ElementRef<'_>, settings: &ExtractSettings) -> CandidateScores {
    let mut blocks = Vec::new();
    collect_scorable(body, &mut blocks, 0);

    let mut candidates = CandidateScores::default();
    for block in blocks {
        let text = inner_text(&block);
        let len = text.chars().count();
        if len < settings.min_paragraph_chars {
            continue;
        }

        let commas = text.chars().filter(|c| matches!(c, ',' | '，' | '、')).count();
        let points = 1.0 + commas as f64 + (len / 100).min(3) as f64;

        let ancestors = block
            .ancestors()
            .filter_map(ElementRef::wrap)
            .filter(|ancestor| ancestor.value().name() != "html")
            .take(settings.ancestor_depth);
        for (level, ancestor) in ancestors.enumerate() {
            let divider = match level {
                0 => 1.0,
                1 => 2.0,
                _ => level as f64 * 3.0,
            };
            candidates.add(&ancestor, points / divider);
        }
    }

    let damped: Vec<(NodeId, f64)> = candidates
        .order
        .iter()
        .filter_map(|id| {
            let element = body
                .tree()
                .get(*id)
                .and_then(ElementRef::wrap)?;
            let score = candidates.score(*id)?;
            Some((*id, score * (1.0 - link_density(&element))))
        })
        .collect();
    for (id, score) in damped {
        candidates.scores.insert(id, score);
    }
    candidates
}

/// Highest scoring candidate; ties go to the one discovered first.
pub(crate) fn top_candidate(candidates: &CandidateScores) -> Option<(NodeId, f64)> {
    let mut best: Option<(NodeId, f64)> = None;
    for id in &candidates.order {
        let Some(score) = candidates.score(*id) else {
            continue;
        };
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((*id, score));
        }
    }
    best
}

fn collect_scorable<'a>(element: ElementRef<'a>, out: &mut Vec<ElementRef<'a>>, depth: usize) {
    if depth > MAX_WALK_DEPTH {
        return;
    }
    for child in element.children().filter_map(ElementRef::wrap) {
        if !is_content_candidate(&child) {
            continue;
        }
        let tag = child.value().name();
        if SCORABLE_TAGS.contains(&tag) || (tag == "div" && !has_block_descendant(&child)) {
            out.push(child);
        }
        collect_scorable(child, out, depth + 1);
    }
}

/// False for subtrees that are skipped entirely: scripts, navigation, hidden
/// blocks and elements whose class/id marks them as page furniture.
pub(crate) fn is_content_candidate(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    let tag = value.name();
    if NON_CONTENT_TAGS.contains(&tag) || is_hidden(element) {
        return false;
    }
    if value
        .attr("role")
        .is_some_and(|role| UNLIKELY_ROLES.contains(&role.trim().to_ascii_lowercase().as_str()))
    {
        return false;
    }
    if matches!(tag, "body" | "a" | "article" | "main") {
        return true;
    }
    let match_string = class_and_id(element);
    !(UNLIKELY_CANDIDATES.is_match(&match_string) && !MAYBE_CANDIDATE.is_match(&match_string))
}

pub(crate) fn is_hidden(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }
    value.attr("style").is_some_and(|style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    })
}

fn has_block_descendant(element: &ElementRef<'_>) -> bool {
    element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|descendant| BLOCK_TAGS.contains(&descendant.value().name()))
}

fn initial_score(element: &ElementRef<'_>) -> f64 {
    let base = match element.value().name() {
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    };
    base + class_weight(element)
}

/// +/-25 for each of class and id matching the positive or negative keyword lists.
pub(crate) fn class_weight(element: &ElementRef<'_>) -> f64 {
    let value = element.value();
    let mut weight = 0.0;
    for attr in [value.attr("class"), value.id()].into_iter().flatten() {
        if attr.is_empty() {
            continue;
        }
        if NEGATIVE.is_match(attr) {
            weight -= 25.0;
        }
        if POSITIVE.is_match(attr) {
            weight += 25.0;
        }
    }
    weight
}

/// Share of the element's text that sits inside links. In-page `#` links count 30%.
pub(crate) fn link_density(element: &ElementRef<'_>) -> f64 {
    let total = inner_text(element).chars().count();
    if total == 0 {
        return 0.0;
    }
    let linked: f64 = element
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|descendant| descendant.value().name() == "a")
        .map(|anchor| {
            let coefficient = match anchor.value().attr("href") {
                Some(href) if href.trim_start().starts_with('#') => 0.3,
                _ => 1.0,
            };
            inner_text(&anchor).chars().count() as f64 * coefficient
        })
        .sum();
    (linked / total as f64).min(1.0)
}

pub(crate) fn class_and_id(element: &ElementRef<'_>) -> String {
    let value = element.value();
    format!(
        "{} {}",
        value.attr("class").unwrap_or_default(),
        value.id().unwrap_or_default()
    )
}

pub(crate) fn inner_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn select<'a>(doc: &'a Html, css: &str) -> ElementRef<'a> {
        doc.select(&Selector::parse(css).unwrap()).next().unwrap()
    }

    #[test]
    fn class_weight_adds_positive_and_negative_hints() {
        let doc = Html::parse_document(
            r#"<div id="main-content" class="sidebar">x</div><div class="post-body">y</div>"#,
        );
        assert_eq!(class_weight(&select(&doc, "#main-content")), 0.0);
        assert_eq!(class_weight(&select(&doc, ".post-body")), 25.0);
    }

    #[test]
    fn link_density_weights_in_page_links_lower() {
        let doc = Html::parse_document(
            r##"<div id="a"><a href="/x">0123456789</a>0123456789</div>
               <div id="b"><a href="#x">0123456789</a>0123456789</div>"##,
        );
        assert!((link_density(&select(&doc, "#a")) - 0.5).abs() < 1e-9);
        assert!((link_density(&select(&doc, "#b")) - 0.15).abs() < 1e-9);
    }

    #[test]
    fn unlikely_blocks_are_skipped_unless_they_look_like_content() {
        let doc = Html::parse_document(
            r#"<div class="sidebar" id="s">x</div><div class="sidebar main-column" id="m">y</div>"#,
        );
        assert!(!is_content_candidate(&select(&doc, "#s")));
        assert!(is_content_candidate(&select(&doc, "#m")));
    }

    #[test]
    fn hidden_elements_are_detected() {
        let doc = Html::parse_document(
            r#"<p id="a" style="display: none">x</p><p id="b" hidden>y</p><p id="c">z</p>"#,
        );
        assert!(is_hidden(&select(&doc, "#a")));
        assert!(is_hidden(&select(&doc, "#b")));
        assert!(!is_hidden(&select(&doc, "#c")));
    }

    #[test]
    fn ties_go_to_the_first_discovered_candidate() {
        let text = "A sentence long enough to be scored, with a comma.";
        let html = format!(
            r#"<html><body><div id="one"><p>{text}</p></div><div id="two"><p>{text}</p></div></body></html>"#
        );
        let doc = Html::parse_document(&html);
        let body = select(&doc, "body");
        let scores = score_candidates(body, &ExtractSettings::default());
        let one = select(&doc, "#one");
        let two = select(&doc, "#two");
        assert_eq!(scores.score(one.id()), scores.score(two.id()));

        let (top, _) = top_candidate(&scores).unwrap();
        assert_eq!(top, one.id());
    }

    #[test]
    fn short_blocks_do_not_create_candidates() {
        let doc = Html::parse_document("<html><body><p>too short</p></body></html>");
        let scores = score_candidates(select(&doc, "body"), &ExtractSettings::default());
        assert!(scores.is_empty());
    }
}
