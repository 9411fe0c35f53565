//! Distiller engine: fetch a page, isolate its article and render it as Markdown.
mod config;
mod convert;
mod decode;
mod dom;
mod extract;
mod fetch;
mod frontmatter;
mod links;
mod metadata;
mod persist;
mod pipeline;
mod rules;
mod scoring;
mod types;

pub use config::{
    CodeBlockStyle, ConversionConfig, ConversionRequest, HeadingStyle, ImageHandling,
    NodeParameters, ParseOptionError, DEFAULT_TIMEOUT_SECONDS,
};
pub use convert::{Converter, RuleConverter, MAX_CONVERSION_DEPTH};
pub use decode::{decode_html, DecodedHtml};
pub use dom::{DocumentTree, DomNode, ElementNode};
pub use extract::{ArticleMetadata, ExtractedArticle, Extractor, ReadabilityExtractor};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher, BROWSER_USER_AGENT};
pub use frontmatter::{build_markdown_document, compose_frontmatter};
pub use links::{resolve_reference, ResolvedReference};
pub use persist::{deterministic_filename, AtomicFileWriter, PersistError};
pub use pipeline::{Clock, Pipeline};
pub use rules::{Context, Filter, Rule, Rules};
pub use scoring::ExtractSettings;
pub use types::{
    ConvertError, ErrorKind, ExtractError, FailureKind, FetchError, FetchMetadata, FetchOutput,
    PipelineError, ResultRecord, Stage,
};
