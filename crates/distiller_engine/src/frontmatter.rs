use chrono::{DateTime, SecondsFormat, Utc};

use crate::extract::ArticleMetadata;

/// YAML frontmatter block for an article. Only present fields are written,
/// in the order title, url, author, site, excerpt, date.
pub fn compose_frontmatter(
    metadata: &ArticleMetadata,
    url: &str,
    generated_at: DateTime<Utc>,
) -> String {
    let excerpt = metadata
        .excerpt
        .as_deref()
        .map(|excerpt| excerpt.split_whitespace().collect::<Vec<_>>().join(" "));
    let date = generated_at.to_rfc3339_opts(SecondsFormat::Secs, true);

    let fields = [
        ("title", metadata.title.as_deref()),
        ("url", Some(url)),
        ("author", metadata.byline.as_deref()),
        ("site", metadata.site_name.as_deref()),
        ("excerpt", excerpt.as_deref()),
        ("date", Some(date.as_str())),
    ];

    let mut out = String::from("---\n");
    for (key, value) in fields {
        if let Some(value) = value {
            out.push_str(&format!("{key}: \"{}\"\n", escape_scalar(value)));
        }
    }
    out.push_str("---");
    out
}

/// Frontmatter, one blank line, then the body.
pub fn build_markdown_document(frontmatter: &str, body: &str) -> String {
    format!("{frontmatter}\n\n{body}")
}

fn escape_scalar(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn absent_fields_are_omitted() {
        let fm = compose_frontmatter(
            &ArticleMetadata {
                title: Some("Title".to_string()),
                ..ArticleMetadata::default()
            },
            "https://example.com/a",
            generated_at(),
        );
        assert_eq!(
            fm,
            "---\ntitle: \"Title\"\nurl: \"https://example.com/a\"\ndate: \"2024-05-01T12:30:00Z\"\n---"
        );
    }

    #[test]
    fn quotes_and_excerpt_newlines_are_made_yaml_safe() {
        let fm = compose_frontmatter(
            &ArticleMetadata {
                title: Some(r#"Say "hi""#.to_string()),
                byline: Some("Jane".to_string()),
                excerpt: Some("line one\nline \"two\"".to_string()),
                site_name: Some("Site".to_string()),
            },
            "https://example.com/",
            generated_at(),
        );
        assert!(fm.contains("title: \"Say \\\"hi\\\"\"\n"));
        assert!(fm.contains("excerpt: \"line one line \\\"two\\\"\"\n"));
        let keys: Vec<&str> = fm
            .lines()
            .filter_map(|line| line.split_once(':').map(|(key, _)| key))
            .collect();
        assert_eq!(keys, ["title", "url", "author", "site", "excerpt", "date"]);
    }

    #[test]
    fn document_separates_frontmatter_with_one_blank_line() {
        assert_eq!(build_markdown_document("---\n---", "# Body"), "---\n---\n\n# Body");
    }
}
