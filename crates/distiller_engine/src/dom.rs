//! Owned document tree handed from the extractor to the converter.
//!
//! Nodes own their children; there are no parent pointers, so the tree is
//! acyclic by construction.

use std::collections::BTreeMap;

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::Html;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    /// Lowercase tag name.
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: DomNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(DomNode::Text(text.into()))
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn element_children(&self) -> impl Iterator<Item = &ElementNode> {
        self.children.iter().filter_map(|child| match child {
            DomNode::Element(element) => Some(element),
            _ => None,
        })
    }

    /// Raw concatenated text of all descendants; `<br>` counts as a newline.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if self.tag == "br" {
            out.push('\n');
            return;
        }
        for child in &self.children {
            match child {
                DomNode::Text(text) => out.push_str(text),
                DomNode::Element(element) => element.collect_text(out),
                DomNode::Comment(_) => {}
            }
        }
    }

    /// Serializes the element back to markup (attributes sorted by name).
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_html(value, true));
            out.push('"');
        }
        out.push('>');
        if is_void(&self.tag) {
            return;
        }
        for child in &self.children {
            match child {
                DomNode::Element(element) => element.write_html(out),
                DomNode::Text(text) => out.push_str(&escape_html(text, false)),
                DomNode::Comment(text) => {
                    out.push_str("<!--");
                    out.push_str(text);
                    out.push_str("-->");
                }
            }
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

/// Rooted, ordered tree. The root is a synthetic `div` wrapping the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTree {
    pub root: ElementNode,
}

impl DocumentTree {
    pub const ROOT_TAG: &'static str = "div";

    pub fn new(children: Vec<DomNode>) -> Self {
        let mut root = ElementNode::new(Self::ROOT_TAG);
        root.children = children;
        Self { root }
    }

    /// Parses a markup fragment with HTML5 error recovery.
    pub fn parse_fragment(html: &str) -> Self {
        let fragment = Html::parse_fragment(html);
        // parse_fragment wraps everything in a synthetic <html> element.
        let children = fragment
            .root_element()
            .children()
            .filter_map(copy_node)
            .collect();
        Self::new(children)
    }

    pub fn text_content(&self) -> String {
        self.root.text_content()
    }

    pub fn to_html(&self) -> String {
        self.root.to_html()
    }
}

/// Copies a scraper subtree verbatim into owned nodes.
pub(crate) fn copy_node(node: NodeRef<'_, Node>) -> Option<DomNode> {
    match node.value() {
        Node::Text(text) => Some(DomNode::Text(String::from(&**text))),
        Node::Comment(comment) => Some(DomNode::Comment(String::from(&**comment))),
        Node::Element(element) => {
            let mut owned = ElementNode::new(element.name());
            for (name, value) in element.attrs() {
                owned.attrs.insert(name.to_string(), value.to_string());
            }
            owned.children = node.children().filter_map(copy_node).collect();
            Some(DomNode::Element(owned))
        }
        _ => None,
    }
}

pub(crate) fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta"
            | "source" | "track" | "wbr"
    )
}

fn escape_html(text: &str, in_attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !in_attribute => out.push_str("&lt;"),
            '>' if !in_attribute => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_parsing_recovers_from_unclosed_tags() {
        let tree = DocumentTree::parse_fragment("<p>one<p>two <b>bold");
        let paragraphs: Vec<_> = tree.root.element_children().collect();
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[1].text_content(), "two bold");
    }

    #[test]
    fn text_content_treats_br_as_newline() {
        let tree = DocumentTree::parse_fragment("<pre>a<br>b</pre>");
        assert_eq!(tree.text_content(), "a\nb");
    }

    #[test]
    fn comments_are_kept_but_carry_no_text() {
        let tree = DocumentTree::parse_fragment("<p>a<!-- note -->b</p>");
        let p = tree.root.element_children().next().unwrap();
        assert!(p.children.iter().any(|c| matches!(c, DomNode::Comment(_))));
        assert_eq!(p.text_content(), "ab");
    }

    #[test]
    fn serializes_with_escaping() {
        let element = ElementNode::new("a")
            .with_attr("href", "https://x/?a=1&b=\"2\"")
            .with_text("1 < 2");
        assert_eq!(
            element.to_html(),
            "<a href=\"https://x/?a=1&amp;b=&quot;2&quot;\">1 &lt; 2</a>"
        );
    }
}
