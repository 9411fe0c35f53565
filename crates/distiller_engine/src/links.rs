use url::Url;

/// How an `href`/`src` reference should be written into the article tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedReference {
    /// Absolute URL (or an in-page fragment kept verbatim).
    Keep(String),
    /// Reference must be dropped; links keep only their text.
    Drop,
}

/// Resolves `reference` against the page URL the way a browser would.
///
/// `javascript:` and empty references are dropped, `#fragment` links are kept as-is.
pub fn resolve_reference(reference: &str, base: Option<&Url>) -> ResolvedReference {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return ResolvedReference::Drop;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("javascript:") {
        return ResolvedReference::Drop;
    }
    if trimmed.starts_with('#') {
        return ResolvedReference::Keep(trimmed.to_string());
    }
    if let Ok(url) = Url::parse(trimmed) {
        return ResolvedReference::Keep(url.into());
    }
    match base.and_then(|base| base.join(trimmed).ok()) {
        Some(url) => ResolvedReference::Keep(url.into()),
        None => ResolvedReference::Keep(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://base.example.com/docs/page.html").unwrap()
    }

    #[test]
    fn relative_references_resolve_against_base() {
        assert_eq!(
            resolve_reference("./article", Some(&base())),
            ResolvedReference::Keep("https://base.example.com/docs/article".to_string())
        );
        assert_eq!(
            resolve_reference("/images/pic.jpg", Some(&base())),
            ResolvedReference::Keep("https://base.example.com/images/pic.jpg".to_string())
        );
    }

    #[test]
    fn absolute_and_mailto_references_are_kept() {
        assert_eq!(
            resolve_reference(" https://other.example/x ", Some(&base())),
            ResolvedReference::Keep("https://other.example/x".to_string())
        );
        assert_eq!(
            resolve_reference("mailto:foo@example.com", None),
            ResolvedReference::Keep("mailto:foo@example.com".to_string())
        );
    }

    #[test]
    fn scripts_and_blank_references_are_dropped() {
        assert_eq!(
            resolve_reference("JavaScript:void(0)", Some(&base())),
            ResolvedReference::Drop
        );
        assert_eq!(resolve_reference("   ", Some(&base())), ResolvedReference::Drop);
    }

    #[test]
    fn fragments_stay_in_page() {
        assert_eq!(
            resolve_reference("#top", Some(&base())),
            ResolvedReference::Keep("#top".to_string())
        );
    }

    #[test]
    fn relative_reference_without_base_is_kept_verbatim() {
        assert_eq!(
            resolve_reference("img/a.png", None),
            ResolvedReference::Keep("img/a.png".to_string())
        );
    }
}
