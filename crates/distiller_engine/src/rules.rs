//! Element conversion rules.
//!
//! A [`Rules`] table maps element filters to replacement functions. Overrides
//! installed from the [`ConversionConfig`] are consulted before the default
//! table; within each list the first matching rule wins.

use crate::config::{CodeBlockStyle, ConversionConfig, HeadingStyle, ImageHandling};
use crate::dom::ElementNode;

/// Everything a replacement needs to render one element.
pub struct Context<'a> {
    pub element: &'a ElementNode,
    /// Already-converted Markdown of the element's children.
    pub content: &'a str,
    pub parent: Option<&'a ElementNode>,
    /// Position among the parent's element children.
    pub index: usize,
    pub config: &'a ConversionConfig,
}

impl Context<'_> {
    pub fn tag(&self) -> &str {
        &self.element.tag
    }

    pub fn parent_tag(&self) -> Option<&str> {
        self.parent.map(|parent| parent.tag.as_str())
    }
}

pub type ReplacementFn = Box<dyn Fn(&Context<'_>) -> String + Send + Sync>;
pub type PredicateFn = Box<dyn Fn(&Context<'_>) -> bool + Send + Sync>;

pub enum Filter {
    Tag(&'static str),
    Tags(&'static [&'static str]),
    Predicate(PredicateFn),
}

impl Filter {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Context<'_>) -> bool + Send + Sync + 'static,
    {
        Filter::Predicate(Box::new(f))
    }

    pub fn matches(&self, ctx: &Context<'_>) -> bool {
        match self {
            Filter::Tag(tag) => ctx.tag() == *tag,
            Filter::Tags(tags) => tags.contains(&ctx.tag()),
            Filter::Predicate(f) => f(ctx),
        }
    }
}

pub struct Rule {
    pub filter: Filter,
    pub replacement: ReplacementFn,
}

impl Rule {
    pub fn new<F>(filter: Filter, replacement: F) -> Self
    where
        F: Fn(&Context<'_>) -> String + Send + Sync + 'static,
    {
        Self {
            filter,
            replacement: Box::new(replacement),
        }
    }
}

/// Elements dropped with their whole subtree before any rule runs.
const REMOVED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "svg", "canvas", "object", "embed",
    "button", "input", "select", "textarea", "head", "meta", "link",
];

const BLOCK_CONTAINERS: &[&str] = &[
    "div", "section", "article", "main", "header", "footer", "nav", "aside", "figure",
    "figcaption", "table", "thead", "tbody", "tfoot", "caption", "dl", "dt", "dd",
    "address", "details", "summary", "fieldset", "center", "hgroup", "form",
];

/// Stands in for a blank line inside a code block until post-processing, so
/// blank-line collapsing and blockquote folding leave code untouched.
pub(crate) const CODE_BLANK_LINE: char = '\u{E000}';

pub struct Rules {
    overrides: Vec<Rule>,
    defaults: Vec<Rule>,
}

impl Rules {
    /// The default table plus the overrides selected by `config`.
    pub fn for_config(config: &ConversionConfig) -> Self {
        let mut rules = Self::default();
        if !config.include_links {
            rules.add_override(Rule::new(Filter::Tag("a"), |ctx| ctx.content.to_string()));
        }
        match config.image_handling {
            ImageHandling::Include => {}
            ImageHandling::AltText => rules.add_override(Rule::new(Filter::Tag("img"), alt_text)),
            ImageHandling::Remove => {
                rules.add_override(Rule::new(Filter::Tag("img"), |_| String::new()))
            }
        }
        rules
    }

    pub fn add_override(&mut self, rule: Rule) {
        self.overrides.push(rule);
    }

    pub fn is_removed(&self, element: &ElementNode) -> bool {
        REMOVED_TAGS.contains(&element.tag.as_str())
    }

    /// Renders `ctx` with the first matching rule; unmatched elements
    /// contribute their children's text unchanged.
    pub fn apply(&self, ctx: &Context<'_>) -> String {
        self.overrides
            .iter()
            .chain(&self.defaults)
            .find(|rule| rule.filter.matches(ctx))
            .map(|rule| (rule.replacement)(ctx))
            .unwrap_or_else(|| ctx.content.to_string())
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            overrides: Vec::new(),
            defaults: default_rules(),
        }
    }
}

fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new(Filter::Tag("p"), |ctx| format!("\n\n{}\n\n", ctx.content.trim())),
        Rule::new(Filter::Tag("br"), |_| "  \n".to_string()),
        Rule::new(Filter::Tags(&["h1", "h2", "h3", "h4", "h5", "h6"]), heading),
        Rule::new(Filter::Tag("hr"), |_| "\n\n---\n\n".to_string()),
        Rule::new(Filter::Tag("blockquote"), blockquote),
        Rule::new(Filter::Tags(&["ul", "ol"]), list),
        Rule::new(Filter::Tag("li"), list_item),
        Rule::new(
            Filter::predicate(|ctx| {
                ctx.tag() == "pre" && ctx.config.code_block_style == CodeBlockStyle::Fenced
            }),
            fenced_code_block,
        ),
        Rule::new(
            Filter::predicate(|ctx| {
                ctx.tag() == "pre" && ctx.config.code_block_style == CodeBlockStyle::Indented
            }),
            indented_code_block,
        ),
        Rule::new(
            Filter::predicate(|ctx| ctx.tag() == "code" && ctx.parent_tag() != Some("pre")),
            inline_code,
        ),
        Rule::new(Filter::Tags(&["em", "i"]), |ctx| delimit(ctx.content, "_")),
        Rule::new(Filter::Tags(&["strong", "b"]), |ctx| delimit(ctx.content, "**")),
        Rule::new(Filter::Tag("a"), link),
        Rule::new(Filter::Tag("img"), image),
        Rule::new(Filter::Tags(&["td", "th"]), |ctx| format!("{} ", ctx.content.trim())),
        Rule::new(Filter::Tag("tr"), |ctx| format!("\n\n{}\n\n", ctx.content.trim())),
        Rule::new(Filter::Tags(BLOCK_CONTAINERS), |ctx| {
            format!("\n\n{}\n\n", ctx.content.trim_matches(' '))
        }),
    ]
}

fn heading(ctx: &Context<'_>) -> String {
    let level: usize = ctx.tag()[1..].parse().unwrap_or(1);
    let text = ctx.content.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return String::new();
    }
    match ctx.config.heading_style {
        HeadingStyle::Setext if level <= 2 => {
            let underline = if level == 1 { "=" } else { "-" };
            format!("\n\n{text}\n{}\n\n", underline.repeat(text.chars().count()))
        }
        _ => format!("\n\n{} {text}\n\n", "#".repeat(level)),
    }
}

fn blockquote(ctx: &Context<'_>) -> String {
    let content = ctx.content.trim();
    if content.is_empty() {
        return String::new();
    }
    let mut previous_blank = false;
    let quoted: Vec<String> = content
        .lines()
        .filter(|line| {
            let blank = line.trim().is_empty();
            let keep = !(blank && previous_blank);
            previous_blank = blank;
            keep
        })
        .map(|line| {
            if line.trim().is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect();
    format!("\n\n{}\n\n", quoted.join("\n"))
}

fn list(ctx: &Context<'_>) -> String {
    if ctx.parent_tag() == Some("li") {
        format!("\n{}", ctx.content.trim_end())
    } else {
        format!("\n\n{}\n\n", ctx.content.trim_end())
    }
}

fn list_item(ctx: &Context<'_>) -> String {
    let prefix = match ctx.parent {
        Some(parent) if parent.tag == "ol" => {
            let start = parent
                .attr("start")
                .and_then(|start| start.trim().parse::<i64>().ok())
                .unwrap_or(1);
            ordered_marker(start.saturating_add(ctx.index as i64))
        }
        _ => "-   ".to_string(),
    };
    let content = ctx.content.trim().replace('\n', "\n    ");
    format!("{prefix}{content}\n")
}

/// `N.` padded to the four-column continuation indent.
fn ordered_marker(number: i64) -> String {
    let marker = format!("{number}.");
    if marker.len() < 4 {
        format!("{marker:<4}")
    } else {
        format!("{marker} ")
    }
}

/// The `<code>` child of a `<pre>`, when it is the only element inside.
fn code_child(pre: &ElementNode) -> Option<&ElementNode> {
    let mut children = pre.element_children();
    match (children.next(), children.next()) {
        (Some(code), None) if code.tag == "code" => Some(code),
        _ => None,
    }
}

fn code_block_text(pre: &ElementNode) -> String {
    let text = code_child(pre)
        .unwrap_or(pre)
        .text_content()
        .replace(CODE_BLANK_LINE, "");
    text.trim_start_matches('\n')
        .trim_end()
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                CODE_BLANK_LINE.to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn code_language(pre: &ElementNode) -> Option<&str> {
    code_child(pre)
        .into_iter()
        .chain(std::iter::once(pre))
        .filter_map(|element| element.attr("class"))
        .flat_map(str::split_whitespace)
        .find_map(|class| {
            class
                .strip_prefix("language-")
                .or_else(|| class.strip_prefix("lang-"))
        })
        .filter(|language| !language.is_empty())
}

fn fenced_code_block(ctx: &Context<'_>) -> String {
    let code = code_block_text(ctx.element);
    let fence = "`".repeat((longest_run(&code, '`') + 1).max(3));
    let language = code_language(ctx.element).unwrap_or_default();
    format!("\n\n{fence}{language}\n{code}\n{fence}\n\n")
}

fn indented_code_block(ctx: &Context<'_>) -> String {
    let code = code_block_text(ctx.element);
    if code.is_empty() {
        return String::new();
    }
    let indented: Vec<String> = code.lines().map(|line| format!("    {line}")).collect();
    format!("\n\n{}\n\n", indented.join("\n"))
}

fn inline_code(ctx: &Context<'_>) -> String {
    let code = ctx.element.text_content().replace('\n', " ");
    if code.is_empty() {
        return String::new();
    }
    let run = longest_run(&code, '`');
    let ticks = "`".repeat(run + 1);
    if run > 0 && (code.starts_with('`') || code.ends_with('`')) {
        format!("{ticks} {code} {ticks}")
    } else {
        format!("{ticks}{code}{ticks}")
    }
}

fn longest_run(text: &str, needle: char) -> usize {
    text.chars()
        .fold((0, 0), |(longest, current), c| {
            if c == needle {
                (longest.max(current + 1), current + 1)
            } else {
                (longest, 0)
            }
        })
        .0
}

/// Wraps inline content, keeping surrounding spaces outside the delimiters.
fn delimit(content: &str, delimiter: &str) -> String {
    let inner = content.trim();
    if inner.is_empty() {
        return content.to_string();
    }
    let leading = if content.starts_with(char::is_whitespace) { " " } else { "" };
    let trailing = if content.ends_with(char::is_whitespace) { " " } else { "" };
    format!("{leading}{delimiter}{inner}{delimiter}{trailing}")
}

fn link(ctx: &Context<'_>) -> String {
    let Some(href) = ctx.element.attr("href").map(clean_attribute) else {
        return ctx.content.to_string();
    };
    if href.is_empty() {
        return ctx.content.to_string();
    }
    let href = href.replace('(', "\\(").replace(')', "\\)");
    format!("[{}]({href}{})", ctx.content.trim(), title_part(ctx.element))
}

fn image(ctx: &Context<'_>) -> String {
    let src = ctx.element.attr("src").map(clean_attribute).unwrap_or_default();
    if src.is_empty() {
        return String::new();
    }
    let alt = ctx
        .element
        .attr("alt")
        .map(|alt| escape_label(&clean_attribute(alt)))
        .unwrap_or_default();
    format!("![{alt}]({src}{})", title_part(ctx.element))
}

fn alt_text(ctx: &Context<'_>) -> String {
    match ctx.element.attr("alt").map(clean_attribute) {
        Some(alt) if !alt.is_empty() => format!("[Image: {}]", escape_label(&alt)),
        _ => "[Image]".to_string(),
    }
}

fn title_part(element: &ElementNode) -> String {
    match element.attr("title").map(clean_attribute) {
        Some(title) if !title.is_empty() => format!(" \"{}\"", title.replace('"', "\\\"")),
        _ => String::new(),
    }
}

/// Attribute text placed between brackets.
fn escape_label(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Attribute value on a single line.
fn clean_attribute(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Backslash-escapes Markdown metacharacters in prose text, including a
/// leading block marker (`#`, `>`, `-`, `+`, `1.`, ...) that would otherwise
/// turn the text into a heading, quote or list item.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 1);
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    match block_marker_offset(&out) {
        Some(offset) => {
            out.insert(offset, '\\');
            out
        }
        None => out,
    }
}

/// Byte offset of the character to escape when `text` opens with a block marker.
fn block_marker_offset(text: &str) -> Option<usize> {
    let body = text.trim_start();
    let lead = text.len() - body.len();
    let ends_marker = |rest: &str| rest.is_empty() || rest.starts_with(char::is_whitespace);

    let hashes = body.len() - body.trim_start_matches('#').len();
    if (1..=6).contains(&hashes) && ends_marker(&body[hashes..]) {
        return Some(lead);
    }
    if body.starts_with('>') || body.starts_with("~~~") {
        return Some(lead);
    }
    if (body.starts_with('-') || body.starts_with('+')) && ends_marker(&body[1..]) {
        return Some(lead);
    }
    // A lone `---` or `===` line reads as a rule or a setext underline.
    let trimmed = body.trim_end();
    if !trimmed.is_empty()
        && (trimmed.chars().all(|c| c == '-') || trimmed.chars().all(|c| c == '='))
    {
        return Some(lead);
    }

    let digits = body.len() - body.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if (1..=9).contains(&digits) {
        let rest = &body[digits..];
        if (rest.starts_with('.') || rest.starts_with(')')) && ends_marker(&rest[1..]) {
            return Some(lead + digits);
        }
    }
    None
}
