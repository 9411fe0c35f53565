/// Splits a pasted or file-provided URL list into one trimmed entry per line.
/// Blank lines and `#` comment lines are skipped; order and duplicates are kept.
pub fn parse_urls(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToOwned::to_owned)
        .collect()
}
