use distiller_engine::{
    CodeBlockStyle, ConversionConfig, ConvertError, Converter, DocumentTree, DomNode, ElementNode,
    HeadingStyle, ImageHandling, RuleConverter, MAX_CONVERSION_DEPTH,
};
use pretty_assertions::assert_eq;

fn convert_with(config: &ConversionConfig, html: &str) -> String {
    RuleConverter::new(config)
        .to_markdown(&DocumentTree::parse_fragment(html))
        .expect("conversion")
}

fn convert(html: &str) -> String {
    convert_with(&ConversionConfig::default(), html)
}

#[test]
fn heading_and_paragraph_with_link() {
    assert_eq!(
        convert(r#"<h1>Title</h1><p>Hello <a href="https://x">world</a></p>"#),
        "# Title\n\nHello [world](https://x)"
    );
}

#[test]
fn atx_headings_repeat_hashes_per_level() {
    assert_eq!(
        convert("<h2>Two</h2><h4>Four</h4>"),
        "## Two\n\n#### Four"
    );
}

#[test]
fn setext_headings_underline_levels_one_and_two() {
    let config = ConversionConfig {
        heading_style: HeadingStyle::Setext,
        ..ConversionConfig::default()
    };
    assert_eq!(
        convert_with(&config, "<h1>Main</h1><h2>Sub title</h2><h3>Deep</h3>"),
        "Main\n====\n\nSub title\n---------\n\n### Deep"
    );
}

#[test]
fn emphasis_strong_and_inline_code() {
    assert_eq!(
        convert("<p><em>soft</em> and <strong>loud</strong> with <code>a_b()</code></p>"),
        "_soft_ and **loud** with `a_b()`"
    );
}

#[test]
fn inline_code_grows_its_delimiters_around_backticks() {
    assert_eq!(convert("<p><code>x ` y</code></p>"), "``x ` y``");
}

#[test]
fn prose_metacharacters_are_escaped() {
    assert_eq!(
        convert("<p>2 * 3 = snake_case [note]</p>"),
        r"2 \* 3 = snake\_case \[note\]"
    );
}

#[test]
fn fenced_code_keeps_whitespace_and_language() {
    let html = "<pre><code class=\"language-rust\">fn main() {\n    let _x = 1;\n}\n</code></pre>";
    assert_eq!(
        convert(html),
        "```rust\nfn main() {\n    let _x = 1;\n}\n```"
    );
}

#[test]
fn fence_outgrows_backtick_runs_in_code() {
    let html = "<pre><code>```\nnested\n```</code></pre>";
    assert_eq!(convert(html), "````\n```\nnested\n```\n````");
}

#[test]
fn blank_lines_inside_code_blocks_are_preserved() {
    let html = "<pre><code>def a():\n    pass\n\n\ndef b():\n    pass</code></pre>";
    assert_eq!(
        convert(html),
        "```\ndef a():\n    pass\n\n\ndef b():\n    pass\n```"
    );

    let indented = ConversionConfig {
        code_block_style: CodeBlockStyle::Indented,
        ..ConversionConfig::default()
    };
    assert_eq!(
        convert_with(&indented, html),
        "    def a():\n        pass\n\n\n    def b():\n        pass"
    );
}

#[test]
fn quoted_code_keeps_its_blank_lines() {
    assert_eq!(
        convert("<blockquote><pre>a\n\n\nb</pre></blockquote>"),
        "> ```\n> a\n>\n>\n> b\n> ```"
    );
}

#[test]
fn indented_code_prefixes_four_spaces() {
    let config = ConversionConfig {
        code_block_style: CodeBlockStyle::Indented,
        ..ConversionConfig::default()
    };
    assert_eq!(
        convert_with(&config, "<p>Before</p><pre><code>a = 1\nb = 2</code></pre>"),
        "Before\n\n    a = 1\n    b = 2"
    );
}

#[test]
fn lists_nest_and_number_from_start() {
    assert_eq!(
        convert("<ul><li>one</li><li>two<ul><li>inner</li></ul></li></ul>"),
        "-   one\n-   two\n    -   inner"
    );
    assert_eq!(
        convert(r#"<ol start="3"><li>three</li><li>four</li></ol>"#),
        "3.  three\n4.  four"
    );
}

#[test]
fn out_of_range_list_start_saturates() {
    assert_eq!(
        convert(r#"<ol start="9223372036854775807"><li>a</li><li>b</li></ol>"#),
        "9223372036854775807. a\n9223372036854775807. b"
    );
}

#[test]
fn prose_that_looks_like_block_syntax_stays_prose() {
    assert_eq!(
        convert(
            "<p># Not a heading</p><p>1. Not a list</p><p>- not a bullet</p><p>&gt; not a quote</p>"
        ),
        "\\# Not a heading\n\n1\\. Not a list\n\n\\- not a bullet\n\n\\> not a quote"
    );
}

#[test]
fn text_between_blocks_starts_its_own_line() {
    assert_eq!(
        convert("<div><p>a</p> tail <p>b</p></div>"),
        "a\n\ntail\n\nb"
    );
}

#[test]
fn blockquote_prefixes_each_line() {
    assert_eq!(
        convert("<blockquote><p>first</p><p>second</p></blockquote>"),
        "> first\n>\n> second"
    );
}

#[test]
fn line_breaks_and_rules() {
    assert_eq!(convert("<p>a<br>b</p><hr><p>c</p>"), "a  \nb\n\n---\n\nc");
}

#[test]
fn links_can_be_reduced_to_text() {
    let config = ConversionConfig {
        include_links: false,
        ..ConversionConfig::default()
    };
    assert_eq!(
        convert_with(&config, r#"<p>See <a href="https://x" title="X">the site</a>.</p>"#),
        "See the site."
    );
    assert_eq!(
        convert(r#"<p>See <a href="https://x" title="X">the site</a>.</p>"#),
        "See [the site](https://x \"X\")."
    );
}

#[test]
fn links_without_href_render_their_text() {
    assert_eq!(convert("<p><a>bare</a></p>"), "bare");
}

#[test]
fn image_handling_policies() {
    let html = r#"<p><img src="https://x/a.png" alt="A cat"><img src="https://x/b.png"></p>"#;
    assert_eq!(convert(html), "![A cat](https://x/a.png)![](https://x/b.png)");

    let alt_text = ConversionConfig {
        image_handling: ImageHandling::AltText,
        ..ConversionConfig::default()
    };
    assert_eq!(convert_with(&alt_text, html), "[Image: A cat][Image]");

    let remove = ConversionConfig {
        image_handling: ImageHandling::Remove,
        ..ConversionConfig::default()
    };
    assert_eq!(convert_with(&remove, &format!("<p>x</p>{html}")), "x");
}

#[test]
fn brackets_in_alt_text_are_escaped() {
    let html = r#"<p><img src="https://x/a.png" alt="see [1]"></p>"#;
    assert_eq!(convert(html), r"![see \[1\]](https://x/a.png)");

    let config = ConversionConfig {
        image_handling: ImageHandling::AltText,
        ..ConversionConfig::default()
    };
    assert_eq!(convert_with(&config, html), r"[Image: see \[1\]]");
}

#[test]
fn whitespace_only_alt_counts_as_missing() {
    let config = ConversionConfig {
        image_handling: ImageHandling::AltText,
        ..ConversionConfig::default()
    };
    assert_eq!(convert_with(&config, r#"<p><img src="a.png" alt="   "></p>"#), "[Image]");
}

#[test]
fn unknown_elements_fall_back_to_their_text() {
    assert_eq!(convert("<p><span>in</span><custom-tag>line</custom-tag></p>"), "inline");
}

#[test]
fn scripts_and_styles_vanish() {
    assert_eq!(
        convert("<p>kept</p><script>alert(1)</script><style>p{}</style>"),
        "kept"
    );
}

#[test]
fn table_rows_become_blocks() {
    assert_eq!(
        convert("<table><tr><th>A</th><th>B</th></tr><tr><td>1</td><td>2</td></tr></table>"),
        "A B\n\n1 2"
    );
}

#[test]
fn blank_lines_are_collapsed_and_output_trimmed() {
    let markdown = convert("<div>\n\n<p>one</p>\n  \n<div><div><p>two</p></div></div>\n</div>");
    assert_eq!(markdown, "one\n\ntwo");
    assert!(!markdown.contains("\n\n\n"));
}

#[test]
fn conversion_is_deterministic() {
    let html = r#"<h2>T</h2><ul><li><a href="https://x">x</a></li></ul><pre>raw</pre>"#;
    assert_eq!(convert(html), convert(html));
}

#[test]
fn excessive_nesting_fails_fast() {
    let mut node = ElementNode::new("span").with_text("deep");
    for _ in 0..MAX_CONVERSION_DEPTH + 5 {
        node = ElementNode::new("div").with_child(DomNode::Element(node));
    }
    let tree = DocumentTree::new(vec![DomNode::Element(node)]);
    let err = RuleConverter::new(&ConversionConfig::default())
        .to_markdown(&tree)
        .unwrap_err();
    assert_eq!(
        err,
        ConvertError::DepthExceeded {
            limit: MAX_CONVERSION_DEPTH
        }
    );
}
