use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context as _};
use clap::Parser;
use distiller_core::{parse_urls, BatchMode};
use distiller_engine::{
    CodeBlockStyle, HeadingStyle, ImageHandling, NodeParameters, DEFAULT_TIMEOUT_SECONDS,
};
use engine_logging::LogDestination;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(
    name = "distiller",
    version,
    about = "Extract the readable article from web pages and convert it to Markdown",
    long_about = None
)]
pub struct Cli {
    /// Page URLs to convert
    pub urls: Vec<String>,

    /// File with one URL per line (`#` starts a comment line)
    #[arg(long, value_name = "FILE")]
    pub urls_file: Option<PathBuf>,

    /// JSON array of per-item parameters; replaces URLs and conversion flags
    #[arg(long, value_name = "FILE", conflicts_with_all = ["urls", "urls_file"])]
    pub items: Option<PathBuf>,

    /// Fetch timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECONDS)]
    pub timeout: u64,

    /// Render links as plain text
    #[arg(long)]
    pub no_links: bool,

    /// Image policy: include, altText or remove
    #[arg(long, default_value_t = ImageHandling::Include)]
    pub images: ImageHandling,

    /// Heading style: atx or setext
    #[arg(long, default_value = "atx")]
    pub heading_style: HeadingStyle,

    /// Code block style: fenced or indented
    #[arg(long, default_value = "fenced")]
    pub code_block_style: CodeBlockStyle,

    /// Prepend YAML frontmatter with the article metadata
    #[arg(long)]
    pub frontmatter: bool,

    /// Record failures as `{"error": ...}` items instead of stopping
    #[arg(long)]
    pub continue_on_fail: bool,

    /// Also write each result's Markdown into this directory
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Write logs to this file as well as stderr
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }

    pub fn batch_mode(&self) -> BatchMode {
        BatchMode::from_continue_flag(self.continue_on_fail)
    }

    /// Parameters for a URL given on the command line or in a URL file.
    pub fn parameters_for(&self, url: &str) -> NodeParameters {
        NodeParameters {
            url: url.to_string(),
            timeout: self.timeout,
            include_links: !self.no_links,
            image_handling: self.images,
            heading_style: self.heading_style,
            code_block_style: self.code_block_style,
            include_frontmatter: self.frontmatter,
        }
    }

    pub fn load_items(&self) -> anyhow::Result<Vec<NodeParameters>> {
        if let Some(path) = &self.items {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading items file {}", path.display()))?;
            let items: Vec<NodeParameters> = serde_json::from_str(&raw)
                .with_context(|| format!("parsing items file {}", path.display()))?;
            if items.is_empty() {
                bail!("items file {} is empty", path.display());
            }
            return Ok(items);
        }

        let mut urls = self.urls.clone();
        if let Some(path) = &self.urls_file {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading URL file {}", path.display()))?;
            urls.extend(parse_urls(&raw));
        }
        if urls.is_empty() {
            bail!("no URLs given; pass URLs, --urls-file or --items");
        }
        Ok(urls.iter().map(|url| self.parameters_for(url)).collect())
    }
}
