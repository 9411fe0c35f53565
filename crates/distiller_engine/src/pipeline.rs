use std::sync::Arc;

use chrono::{DateTime, Utc};
use engine_logging::{engine_debug, engine_info, engine_trace, engine_warn, LOG_TARGET};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::convert::{Converter, RuleConverter};
use crate::extract::{Extractor, ReadabilityExtractor};
use crate::fetch::{FetchSettings, Fetcher, ReqwestFetcher};
use crate::frontmatter::{build_markdown_document, compose_frontmatter};
use crate::{ConversionRequest, PipelineError, ResultRecord, Stage};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Fetch → extract → convert → compose for one URL at a time.
///
/// A pipeline holds no per-run state; concurrent `run` calls are independent.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    clock: Clock,
}

impl Pipeline {
    pub fn new(settings: FetchSettings) -> Self {
        Self::with_components(
            Arc::new(ReqwestFetcher::new(settings)),
            Arc::new(ReadabilityExtractor::default()),
            Arc::new(Utc::now),
        )
    }

    pub fn with_components(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        clock: Clock,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            clock,
        }
    }

    pub async fn run(
        &self,
        request: &ConversionRequest,
        cancel: &CancellationToken,
    ) -> Result<ResultRecord, PipelineError> {
        let result = self.run_stages(request, cancel).await;
        if let Err(err) = &result {
            engine_warn!(
                "Conversion of {} failed during {}: {}",
                request.url,
                err.stage(),
                err
            );
        }
        result
    }

    async fn run_stages(
        &self,
        request: &ConversionRequest,
        cancel: &CancellationToken,
    ) -> Result<ResultRecord, PipelineError> {
        engine_debug!("{} {}", Stage::Validating, request.url);
        validate_url(&request.url)?;
        request.config.validate()?;

        engine_debug!("{} {}", Stage::Fetching, request.url);
        let fetched = self
            .fetcher
            .fetch(&request.url, request.config.timeout(), cancel)
            .await?;
        let final_url = fetched.metadata.final_url.clone();

        engine_debug!("{} {}", Stage::Extracting, final_url);
        let article = self.extractor.extract(&fetched.html, &final_url)?;
        if log::log_enabled!(target: LOG_TARGET, log::Level::Trace) {
            engine_trace!("Article markup: {}", article.content.to_html());
        }

        engine_debug!("{} {}", Stage::Converting, final_url);
        let body = RuleConverter::new(&request.config).to_markdown(&article.content)?;

        engine_debug!("{} {}", Stage::Composing, final_url);
        let markdown = if request.config.include_frontmatter {
            let frontmatter = compose_frontmatter(&article.metadata, &final_url, (self.clock)());
            build_markdown_document(&frontmatter, &body)
        } else {
            body
        };

        let content_length = markdown.chars().count();
        engine_info!(
            "Converted {} ({} chars of Markdown from {} chars of article text)",
            final_url,
            content_length,
            article.text_length
        );

        let metadata = article.metadata;
        Ok(ResultRecord {
            url: final_url,
            title: metadata.title,
            byline: metadata.byline,
            excerpt: metadata.excerpt,
            site_name: metadata.site_name,
            markdown,
            content_length,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(FetchSettings::default())
    }
}

fn validate_url(raw: &str) -> Result<(), PipelineError> {
    if raw.trim().is_empty() {
        return Err(PipelineError::Validation("url is required".to_string()));
    }
    let url = Url::parse(raw.trim())
        .map_err(|err| PipelineError::Validation(format!("invalid url '{raw}': {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(PipelineError::Validation(format!(
            "unsupported url scheme '{scheme}'"
        ))),
    }
}
