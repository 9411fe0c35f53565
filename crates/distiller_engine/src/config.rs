use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::PipelineError;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HeadingStyle {
    /// `#`-prefixed headings.
    #[default]
    Atx,
    /// Underlined headings for levels 1 and 2, ATX for deeper levels.
    Setext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CodeBlockStyle {
    #[default]
    Fenced,
    Indented,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageHandling {
    #[default]
    Include,
    AltText,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {option} value {value:?} (expected one of: {expected})")]
pub struct ParseOptionError {
    option: &'static str,
    value: String,
    expected: &'static str,
}

/// Lowercases and drops `-`/`_` so `altText`, `alt-text` and `alt_text` compare equal.
fn normalize_option(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for HeadingStyle {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_option(s).as_str() {
            "atx" => Ok(HeadingStyle::Atx),
            "setext" => Ok(HeadingStyle::Setext),
            _ => Err(ParseOptionError {
                option: "heading style",
                value: s.to_string(),
                expected: "atx, setext",
            }),
        }
    }
}

impl FromStr for CodeBlockStyle {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_option(s).as_str() {
            "fenced" => Ok(CodeBlockStyle::Fenced),
            "indented" => Ok(CodeBlockStyle::Indented),
            _ => Err(ParseOptionError {
                option: "code block style",
                value: s.to_string(),
                expected: "fenced, indented",
            }),
        }
    }
}

impl FromStr for ImageHandling {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_option(s).as_str() {
            "include" => Ok(ImageHandling::Include),
            "alttext" => Ok(ImageHandling::AltText),
            "remove" => Ok(ImageHandling::Remove),
            _ => Err(ParseOptionError {
                option: "image handling",
                value: s.to_string(),
                expected: "include, altText, remove",
            }),
        }
    }
}

impl fmt::Display for ImageHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageHandling::Include => "include",
            ImageHandling::AltText => "altText",
            ImageHandling::Remove => "remove",
        })
    }
}

/// Formatting policy for one conversion. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionConfig {
    pub heading_style: HeadingStyle,
    pub code_block_style: CodeBlockStyle,
    pub include_links: bool,
    pub image_handling: ImageHandling,
    pub include_frontmatter: bool,
    pub timeout_seconds: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            heading_style: HeadingStyle::default(),
            code_block_style: CodeBlockStyle::default(),
            include_links: true,
            image_handling: ImageHandling::default(),
            include_frontmatter: false,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl ConversionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.timeout_seconds == 0 {
            return Err(PipelineError::Validation(
                "timeout must be greater than zero seconds".to_string(),
            ));
        }
        Ok(())
    }
}

/// One URL plus the policy to convert it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub url: String,
    pub config: ConversionConfig,
}

/// User-facing parameter set of one input item, as found in JSON items files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeParameters {
    pub url: String,
    pub timeout: u64,
    pub include_links: bool,
    pub image_handling: ImageHandling,
    pub heading_style: HeadingStyle,
    pub code_block_style: CodeBlockStyle,
    pub include_frontmatter: bool,
}

impl Default for NodeParameters {
    fn default() -> Self {
        let config = ConversionConfig::default();
        Self {
            url: String::new(),
            timeout: config.timeout_seconds,
            include_links: config.include_links,
            image_handling: config.image_handling,
            heading_style: config.heading_style,
            code_block_style: config.code_block_style,
            include_frontmatter: config.include_frontmatter,
        }
    }
}

impl NodeParameters {
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Validates the parameters. The URL must be non-empty after trimming.
    pub fn into_request(self) -> Result<ConversionRequest, PipelineError> {
        let url = self.url.trim().to_string();
        if url.is_empty() {
            return Err(PipelineError::Validation("url is required".to_string()));
        }
        let config = ConversionConfig {
            heading_style: self.heading_style,
            code_block_style: self.code_block_style,
            include_links: self.include_links,
            image_handling: self.image_handling,
            include_frontmatter: self.include_frontmatter,
            timeout_seconds: self.timeout,
        };
        config.validate()?;
        Ok(ConversionRequest { url, config })
    }
}
