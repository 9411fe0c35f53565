use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use distiller_engine::{
    ErrorKind, FetchSettings, ImageHandling, NodeParameters, Pipeline, ReadabilityExtractor,
    ReqwestFetcher, Stage,
};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = r#"<!doctype html>
<html><head>
  <title>Ferris Goes Sailing - Crab News</title>
  <meta property="og:title" content="Ferris Goes Sailing">
  <meta property="og:site_name" content="Crab News">
  <meta name="author" content="Ferris the Crab">
  <meta name="description" content="A crab takes to the sea.">
</head><body>
  <header class="masthead"><a href="/">Crab News</a></header>
  <main>
    <h1>Ferris Goes Sailing</h1>
    <p>Ferris set out from the harbour at dawn, checking the rigging twice, because safety
       matters, and the sea was calm.</p>
    <p>By noon the wind picked up, and the little boat, trimmed and steady, carried
       Ferris towards the <a href="/islands">outer islands</a>.</p>
    <img src="/img/boat.jpg" alt="The boat">
  </main>
  <footer>Subscribe for more crab news.</footer>
</body></html>"#;

fn pipeline() -> Pipeline {
    engine_logging::initialize_for_tests();
    let generated_at = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
    Pipeline::with_components(
        Arc::new(ReqwestFetcher::new(FetchSettings::default())),
        Arc::new(ReadabilityExtractor::default()),
        Arc::new(move || generated_at),
    )
}

async fn serve(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/story"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn converts_a_page_into_a_record() {
    let server = serve(PAGE).await;
    let url = format!("{}/story", server.uri());
    let request = NodeParameters::for_url(&url).into_request().unwrap();

    let record = pipeline()
        .run(&request, &CancellationToken::new())
        .await
        .expect("record");

    assert_eq!(record.url, url);
    assert_eq!(record.title.as_deref(), Some("Ferris Goes Sailing"));
    assert_eq!(record.byline.as_deref(), Some("Ferris the Crab"));
    assert_eq!(record.site_name.as_deref(), Some("Crab News"));
    assert_eq!(record.excerpt.as_deref(), Some("A crab takes to the sea."));
    assert!(record.markdown.starts_with("# Ferris Goes Sailing\n\nFerris set out"));
    assert!(record
        .markdown
        .contains(&format!("[outer islands]({}/islands)", server.uri())));
    assert!(record
        .markdown
        .contains(&format!("![The boat]({}/img/boat.jpg)", server.uri())));
    assert!(!record.markdown.contains("Subscribe"));
    assert_eq!(record.content_length, record.markdown.chars().count());
}

#[tokio::test]
async fn frontmatter_precedes_the_body() {
    let server = serve(PAGE).await;
    let url = format!("{}/story", server.uri());
    let request = NodeParameters {
        include_frontmatter: true,
        image_handling: ImageHandling::AltText,
        ..NodeParameters::for_url(&url)
    }
    .into_request()
    .unwrap();

    let record = pipeline()
        .run(&request, &CancellationToken::new())
        .await
        .expect("record");

    let expected_frontmatter = format!(
        "---\ntitle: \"Ferris Goes Sailing\"\nurl: \"{url}\"\nauthor: \"Ferris the Crab\"\n\
         site: \"Crab News\"\nexcerpt: \"A crab takes to the sea.\"\n\
         date: \"2024-06-01T08:00:00Z\"\n---\n\n# Ferris Goes Sailing"
    );
    assert!(
        record.markdown.starts_with(&expected_frontmatter),
        "markdown:\n{}",
        record.markdown
    );
    assert!(record.markdown.contains("[Image: The boat]"));
    assert_eq!(record.content_length, record.markdown.chars().count());
}

#[tokio::test]
async fn deeply_nested_articles_still_convert() {
    let paragraph = "<p>Deeply nested prose keeps going, sentence after sentence, \
                     until it is long enough to count as the body of an article.</p>";
    let page = format!(
        "<html><head><title>Deep</title></head><body>{}{paragraph}{}</body></html>",
        "<div>".repeat(600),
        "</div>".repeat(600)
    );
    let server = serve(&page).await;
    let request = NodeParameters::for_url(format!("{}/story", server.uri()))
        .into_request()
        .unwrap();

    let record = pipeline()
        .run(&request, &CancellationToken::new())
        .await
        .expect("record");
    assert!(
        record.markdown.contains("Deeply nested prose keeps going"),
        "{}",
        record.markdown
    );
}

#[tokio::test]
async fn invalid_requests_fail_validation_without_fetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let mut request = NodeParameters::for_url(server.uri()).into_request().unwrap();
    request.config.timeout_seconds = 0;
    let err = pipeline()
        .run(&request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.stage(), Stage::Validating);

    request.config.timeout_seconds = 5;
    request.url = "definitely not a url".to_string();
    let err = pipeline()
        .run(&request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn empty_pages_fail_extraction() {
    let server = serve("<html><body></body></html>").await;
    let request = NodeParameters::for_url(format!("{}/story", server.uri()))
        .into_request()
        .unwrap();

    let err = pipeline()
        .run(&request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Extraction);
}

#[tokio::test]
async fn http_errors_fail_the_fetch_stage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let request = NodeParameters::for_url(server.uri()).into_request().unwrap();

    let err = pipeline()
        .run(&request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fetch);
    assert!(err.to_string().contains("500"), "{err}");
}

#[tokio::test]
async fn slow_servers_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_raw(PAGE, "text/html"),
        )
        .mount(&server)
        .await;
    let request = NodeParameters {
        timeout: 1,
        ..NodeParameters::for_url(server.uri())
    }
    .into_request()
    .unwrap();

    let err = pipeline()
        .run(&request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(err.to_string().contains("1s"), "{err}");
}
