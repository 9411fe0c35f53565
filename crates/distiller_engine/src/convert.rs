use engine_logging::engine_trace;

use crate::config::ConversionConfig;
use crate::dom::{DocumentTree, DomNode, ElementNode};
use crate::rules::{escape_markdown, Context, Rules, CODE_BLANK_LINE};
use crate::ConvertError;

/// Nesting depth beyond which conversion gives up.
pub const MAX_CONVERSION_DEPTH: usize = 512;

pub trait Converter: Send + Sync {
    fn to_markdown(&self, tree: &DocumentTree) -> Result<String, ConvertError>;
}

/// Bottom-up tree walk driven by a [`Rules`] table.
pub struct RuleConverter {
    config: ConversionConfig,
    rules: Rules,
}

impl RuleConverter {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            config: config.clone(),
            rules: Rules::for_config(config),
        }
    }

    fn convert_element(
        &self,
        element: &ElementNode,
        parent: Option<&ElementNode>,
        index: usize,
        in_code: bool,
        depth: usize,
    ) -> Result<String, ConvertError> {
        if depth > MAX_CONVERSION_DEPTH {
            return Err(ConvertError::DepthExceeded {
                limit: MAX_CONVERSION_DEPTH,
            });
        }
        if self.rules.is_removed(element) {
            engine_trace!("Removing <{}>", element.tag);
            return Ok(String::new());
        }

        let in_code = in_code || matches!(element.tag.as_str(), "pre" | "code");
        let mut content = String::new();
        let mut element_index = 0;
        for child in &element.children {
            match child {
                DomNode::Text(text) if in_code => content.push_str(text),
                DomNode::Text(text) => {
                    let collapsed = collapse_spaces(text);
                    // Text opening a new line does not keep the indent of its source.
                    let collapsed = if content.ends_with('\n') {
                        collapsed.trim_start()
                    } else {
                        collapsed.as_str()
                    };
                    content.push_str(&escape_markdown(collapsed));
                }
                DomNode::Element(child) => {
                    let rendered =
                        self.convert_element(child, Some(element), element_index, in_code, depth + 1)?;
                    if !in_code && rendered.starts_with('\n') {
                        content.truncate(content.trim_end_matches(' ').len());
                    }
                    content.push_str(&rendered);
                    element_index += 1;
                }
                DomNode::Comment(_) => {}
            }
        }

        Ok(self.rules.apply(&Context {
            element,
            content: &content,
            parent,
            index,
            config: &self.config,
        }))
    }
}

impl Converter for RuleConverter {
    fn to_markdown(&self, tree: &DocumentTree) -> Result<String, ConvertError> {
        let raw = self.convert_element(&tree.root, None, 0, false, 0)?;
        Ok(post_process(&raw))
    }
}

/// Collapses each whitespace run (newlines included) to a single space.
fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Empties whitespace-only lines, keeps at most one blank line in a row and
/// trims the result. Blank lines inside code blocks are kept as they are.
fn post_process(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in raw.lines() {
        if line.contains(CODE_BLANK_LINE) {
            lines.push(line.replace(CODE_BLANK_LINE, "").trim_end().to_string());
            continue;
        }
        let line = if line.trim().is_empty() { "" } else { line };
        if line.is_empty() && lines.last().is_some_and(|last| last.is_empty()) {
            continue;
        }
        lines.push(line.to_string());
    }
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_runs_collapse_and_output_is_trimmed() {
        assert_eq!(post_process("\n\n  \na\n \n\n\nb  \n\n"), "a\n\nb");
    }

    #[test]
    fn code_blank_lines_are_not_collapsed() {
        let raw = format!("```\na\n{CODE_BLANK_LINE}\n{CODE_BLANK_LINE}\nb\n```\n\n\n\nc");
        assert_eq!(post_process(&raw), "```\na\n\n\nb\n```\n\nc");
    }

    #[test]
    fn hard_breaks_survive_post_processing() {
        assert_eq!(post_process("one  \ntwo"), "one  \ntwo");
    }

    #[test]
    fn whitespace_runs_become_single_spaces() {
        assert_eq!(collapse_spaces("a \n\t b"), "a b");
    }
}
