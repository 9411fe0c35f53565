use ego_tree::NodeId;
use engine_logging::{engine_debug, engine_trace};
use scraper::node::Node;
use scraper::{ElementRef, Html};
use url::Url;

use crate::convert::MAX_CONVERSION_DEPTH;
use crate::dom::{DocumentTree, DomNode, ElementNode};
use crate::links::{resolve_reference, ResolvedReference};
use crate::metadata::extract_metadata;
use crate::scoring::{
    class_and_id, class_weight, collapse_whitespace, inner_text, is_content_candidate,
    link_density, score_candidates, top_candidate, CandidateScores, ExtractSettings,
    MAX_WALK_DEPTH, NON_CONTENT_TAGS,
};
use crate::ExtractError;

/// Metadata fields of an extracted article. Absent values are `None`, never "".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleMetadata {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub excerpt: Option<String>,
    pub site_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub metadata: ArticleMetadata,
    pub content: DocumentTree,
    /// Characters of whitespace-collapsed text in `content`.
    pub text_length: usize,
}

pub trait Extractor: Send + Sync {
    /// `base_url` is the final page URL, used to absolutize links and images.
    fn extract(&self, html: &str, base_url: &str) -> Result<ExtractedArticle, ExtractError>;
}

/// Readability-style extractor: scores paragraph ancestors by text density,
/// keeps the best one plus related siblings, and strips page furniture.
#[derive(Debug, Default, Clone)]
pub struct ReadabilityExtractor {
    settings: ExtractSettings,
}

const CONDITIONALLY_CLEANED: &[&str] = &["div", "section", "ul", "ol", "table", "form"];
const LAZY_IMAGE_ATTRS: &[&str] = &["data-src", "data-original", "data-lazy-src", "data-url"];

impl ReadabilityExtractor {
    pub fn new(settings: ExtractSettings) -> Self {
        Self { settings }
    }
}

impl Extractor for ReadabilityExtractor {
    fn extract(&self, html: &str, base_url: &str) -> Result<ExtractedArticle, ExtractError> {
        let doc = Html::parse_document(html);
        let page = extract_metadata(&doc);

        let body = doc
            .root_element()
            .children()
            .filter_map(ElementRef::wrap)
            .find(|child| child.value().name() == "body")
            .ok_or(ExtractError::NoReadableContent)?;

        let scores = score_candidates(body, &self.settings);
        if scores.is_empty() {
            engine_debug!("No block with {}+ chars of text", self.settings.min_paragraph_chars);
            return Err(ExtractError::NoReadableContent);
        }
        let (top_id, top_score) = top_candidate(&scores).ok_or(ExtractError::NoReadableContent)?;
        let top = doc
            .tree
            .get(top_id)
            .and_then(ElementRef::wrap)
            .ok_or(ExtractError::NoReadableContent)?;
        let top = climb_wrappers(top);
        engine_debug!(
            "Top candidate <{}> class/id='{}' score={:.1}",
            top.value().name(),
            class_and_id(&top).trim(),
            top_score
        );

        let roots = with_siblings(top, top_score, &scores, &self.settings);
        let builder = ContentBuilder {
            base: Url::parse(base_url).ok(),
            byline: page.byline_node,
            top: top.id(),
        };
        let children = roots
            .into_iter()
            .filter_map(|root| builder.copy_element(root, 0, 1, true))
            .collect();
        let content = DocumentTree::new(children);

        let text_length = collapse_whitespace(&content.text_content()).chars().count();
        if text_length < self.settings.min_content_chars {
            engine_debug!(
                "Rejecting article: {} chars of text, need {}",
                text_length,
                self.settings.min_content_chars
            );
            return Err(ExtractError::NoReadableContent);
        }

        let excerpt = page
            .description
            .or_else(|| first_paragraph_text(&content.root));

        Ok(ExtractedArticle {
            metadata: ArticleMetadata {
                title: page.title,
                byline: page.byline,
                excerpt,
                site_name: page.site_name,
            },
            content,
            text_length,
        })
    }
}

/// Moves up through wrappers whose only element child is the current node.
fn climb_wrappers(mut top: ElementRef<'_>) -> ElementRef<'_> {
    while let Some(parent) = top.parent().and_then(ElementRef::wrap) {
        if matches!(parent.value().name(), "body" | "html") {
            break;
        }
        let only_child = parent.children().all(|child| match child.value() {
            Node::Element(_) => child.id() == top.id(),
            Node::Text(text) => text.trim().is_empty(),
            _ => true,
        });
        if !only_child {
            break;
        }
        top = parent;
    }
    top
}

/// The top candidate plus siblings that look like part of the same article,
/// in document order.
fn with_siblings<'a>(
    top: ElementRef<'a>,
    top_score: f64,
    scores: &CandidateScores,
    settings: &ExtractSettings,
) -> Vec<ElementRef<'a>> {
    let Some(parent) = top.parent().and_then(ElementRef::wrap) else {
        return vec![top];
    };
    let threshold = (top_score * settings.sibling_score_ratio).max(10.0);
    let top_class = top.value().attr("class").unwrap_or_default();

    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|sibling| {
            if sibling.id() == top.id() {
                return true;
            }
            if !is_content_candidate(sibling) {
                return false;
            }
            let bonus = match sibling.value().attr("class") {
                Some(class) if !top_class.is_empty() && class == top_class => {
                    top_score * settings.sibling_score_ratio
                }
                _ => 0.0,
            };
            if scores
                .score(sibling.id())
                .is_some_and(|score| score + bonus >= threshold)
            {
                engine_trace!("Appending sibling <{}>", sibling.value().name());
                return true;
            }
            sibling.value().name() == "p" && is_prose(sibling)
        })
        .collect()
}

fn is_prose(paragraph: &ElementRef<'_>) -> bool {
    let text = inner_text(paragraph);
    let len = text.chars().count();
    let density = link_density(paragraph);
    if len > 80 {
        density < 0.25
    } else {
        len > 0 && density == 0.0 && (text.ends_with('.') || text.contains(". "))
    }
}

struct ContentBuilder {
    base: Option<Url>,
    byline: Option<NodeId>,
    top: NodeId,
}

impl ContentBuilder {
    /// `walk` counts recursion; `depth` is the nesting of the copy below the
    /// tree root. Elements that would sit deeper than the converter accepts
    /// are replaced by their children.
    fn copy_element(
        &self,
        element: ElementRef<'_>,
        walk: usize,
        depth: usize,
        is_root: bool,
    ) -> Option<DomNode> {
        if walk > MAX_WALK_DEPTH {
            return None;
        }
        let tag = element.value().name();
        if NON_CONTENT_TAGS.contains(&tag) {
            return None;
        }
        if self.byline == Some(element.id()) && element.id() != self.top {
            return None;
        }
        if !is_root {
            if !is_content_candidate(&element) {
                return None;
            }
            if CONDITIONALLY_CLEANED.contains(&tag) && is_boilerplate(&element) {
                engine_trace!("Dropping <{}> class/id='{}'", tag, class_and_id(&element).trim());
                return None;
            }
        }

        let mut node = ElementNode::new(tag);
        for (name, value) in element.value().attrs() {
            if name == "style" || name.starts_with("on") {
                continue;
            }
            node.attrs.insert(name.to_string(), value.to_string());
        }
        self.fix_references(&mut node);

        for child in element.children() {
            match child.value() {
                Node::Text(text) => node.children.push(DomNode::Text(String::from(&**text))),
                Node::Comment(comment) => {
                    node.children.push(DomNode::Comment(String::from(&**comment)))
                }
                Node::Element(_) => {
                    let Some(child) = ElementRef::wrap(child) else {
                        continue;
                    };
                    if depth < MAX_CONVERSION_DEPTH {
                        if let Some(copied) = self.copy_element(child, walk + 1, depth + 1, false) {
                            node.children.push(copied);
                        }
                    } else if let Some(DomNode::Element(flattened)) =
                        self.copy_element(child, walk + 1, depth, false)
                    {
                        engine_trace!("Flattening <{}> at depth {}", flattened.tag, depth);
                        node.children.extend(flattened.children);
                    }
                }
                _ => {}
            }
        }
        Some(DomNode::Element(node))
    }

    fn fix_references(&self, node: &mut ElementNode) {
        if node.tag == "img" {
            let needs_lazy_src = node
                .attr("src")
                .map_or(true, |src| src.trim().is_empty() || src.starts_with("data:"));
            if needs_lazy_src {
                if let Some(lazy) = LAZY_IMAGE_ATTRS
                    .iter()
                    .find_map(|attr| node.attr(attr).filter(|v| !v.trim().is_empty()))
                    .map(str::to_string)
                {
                    node.attrs.insert("src".to_string(), lazy);
                }
            }
        }

        let attr = match node.tag.as_str() {
            "a" => "href",
            "img" => "src",
            _ => return,
        };
        let Some(reference) = node.attrs.remove(attr) else {
            return;
        };
        match resolve_reference(&reference, self.base.as_ref()) {
            ResolvedReference::Keep(url) => {
                node.attrs.insert(attr.to_string(), url);
            }
            ResolvedReference::Drop => {}
        }
    }
}

/// Link farms, negatively weighted containers and form-heavy blocks.
fn is_boilerplate(element: &ElementRef<'_>) -> bool {
    let weight = class_weight(element);
    if weight < 0.0 {
        return true;
    }
    let text = inner_text(element);
    if text.matches(',').count() >= 10 {
        return false;
    }

    let mut paragraphs = 0usize;
    let mut images = 0usize;
    let mut inputs = 0usize;
    for descendant in element.descendants().skip(1).filter_map(ElementRef::wrap) {
        match descendant.value().name() {
            "p" => paragraphs += 1,
            "img" => images += 1,
            "input" => inputs += 1,
            _ => {}
        }
    }
    if inputs > paragraphs / 3 {
        return true;
    }
    if images > 1 && (paragraphs as f64) / (images as f64) < 0.5 && !has_figure_ancestor(element) {
        return true;
    }

    let density = link_density(element);
    (weight < 25.0 && density > 0.2) || (weight >= 25.0 && density > 0.5)
}

fn has_figure_ancestor(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().name() == "figure")
}

fn first_paragraph_text(root: &ElementNode) -> Option<String> {
    for child in root.element_children() {
        if child.tag == "p" {
            let text = collapse_whitespace(&child.text_content());
            if !text.is_empty() {
                return Some(text);
            }
        } else if let Some(text) = first_paragraph_text(child) {
            return Some(text);
        }
    }
    None
}
