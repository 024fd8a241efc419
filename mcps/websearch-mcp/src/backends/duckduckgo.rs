//! DuckDuckGo backend
//!
//! Web results are scraped from the JavaScript-free HTML endpoint
//! (`/html/?q=`); instant answers come from the public JSON API.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client, Response, StatusCode};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

use super::SearchBackend;
use crate::config::{DuckDuckGoConfig, HttpConfig};
use crate::error::{BackendResult, SearchError};
use crate::rate_limit::RateLimiter;
use crate::types::{InstantAnswer, RelatedTopic, SearchQuery, SearchResult, TopicLink};

static RESULT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".result:not(.result--ad)").unwrap());
static ANY_RESULT: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".result").unwrap());
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".result__a").unwrap());
static SNIPPET: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".result__snippet").unwrap());
static RESULTS_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#links, .results, .serp__results, .no-results").unwrap());
static ANOMALY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".anomaly-modal, #challenge-form").unwrap());

/// DuckDuckGo backend
pub struct DuckDuckGoBackend {
    client: Client,
    config: DuckDuckGoConfig,
    timeout: Duration,
    limiter: RateLimiter,
}

impl DuckDuckGoBackend {
    pub fn new(config: DuckDuckGoConfig, http: &HttpConfig) -> anyhow::Result<Self> {
        let timeout = http.timeout();
        let client = Client::builder()
            .user_agent(http.user_agent.as_str())
            .timeout(timeout)
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            client,
            config,
            timeout,
            limiter: RateLimiter::new(http.rate_limit()),
        })
    }

    fn endpoint(base: &str, path: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), path)
    }

    /// Send a GET once the rate limiter allows it and check the status
    async fn get(&self, url: &str, params: &[(&str, &str)]) -> BackendResult<Response> {
        self.limiter.acquire().await;

        tracing::debug!(url, "Sending upstream request");
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| SearchError::from_transport(e, self.timeout))?;

        check_status(response)
    }
}

fn check_status(response: Response) -> BackendResult<Response> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        return Err(SearchError::RateLimited { retry_after });
    }
    if !status.is_success() {
        return Err(SearchError::Network(format!("upstream returned HTTP {status}")));
    }
    Ok(response)
}

#[async_trait]
impl SearchBackend for DuckDuckGoBackend {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &SearchQuery) -> BackendResult<Vec<SearchResult>> {
        let url = Self::endpoint(&self.config.html_base_url, "html/");

        let mut params = vec![("q", query.text())];
        if !self.config.region.is_empty() {
            params.push(("kl", self.config.region.as_str()));
        }

        let body = self
            .get(&url, &params)
            .await?
            .text()
            .await
            .map_err(|e| SearchError::from_transport(e, self.timeout))?;

        parse_html_results(&body, query.max_results())
    }

    async fn instant_answer(&self, query: &str) -> BackendResult<InstantAnswer> {
        let url = Self::endpoint(&self.config.api_base_url, "");
        let params = [
            ("q", query),
            ("format", "json"),
            ("no_html", "1"),
            ("skip_disambig", "1"),
        ];

        // The API answers with a javascript content type, so decode by hand
        let body = self
            .get(&url, &params)
            .await?
            .text()
            .await
            .map_err(|e| SearchError::from_transport(e, self.timeout))?;

        parse_instant_answer(&body)
    }
}

/// Extract organic results from a DuckDuckGo HTML page
///
/// Returns at most `max_results` entries in page order. A page without any
/// result blocks is only accepted as empty when it carries the results
/// container or the no-results marker; a captcha page is a rate limit.
pub fn parse_html_results(html: &str, max_results: usize) -> BackendResult<Vec<SearchResult>> {
    let document = Html::parse_document(html);

    if document.select(&ANY_RESULT).next().is_none() {
        if document.select(&ANOMALY).next().is_some() {
            return Err(SearchError::RateLimited { retry_after: None });
        }
        if document.select(&RESULTS_CONTAINER).next().is_none() {
            return Err(SearchError::Parse(
                "page has neither results nor a results container".to_string(),
            ));
        }
        return Ok(Vec::new());
    }

    let results: Vec<SearchResult> = document
        .select(&RESULT)
        .filter_map(parse_result_block)
        .take(max_results)
        .collect();

    Ok(results)
}

fn parse_result_block(block: ElementRef<'_>) -> Option<SearchResult> {
    let link = block.select(&TITLE).next()?;
    let title = element_text(link);
    if title.is_empty() {
        return None;
    }

    let url = resolve_result_url(link.value().attr("href")?)?;
    let snippet = block
        .select(&SNIPPET)
        .next()
        .map(element_text)
        .unwrap_or_default();

    Some(SearchResult {
        title,
        url,
        snippet,
    })
}

/// Collapse the element's text into single-spaced, trimmed form
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turn a result `href` into the absolute URL it points at
///
/// DuckDuckGo wraps outbound links as `//duckduckgo.com/l/?uddg=<target>`;
/// the target is unwrapped. Anything that is not absolute http(s), or that
/// points back into DuckDuckGo itself, yields `None`.
pub fn resolve_result_url(href: &str) -> Option<String> {
    let href = href.trim();
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&absolute).ok()?;
    let target = if is_duckduckgo_host(&parsed) && parsed.path() == "/l/" {
        let (_, target) = parsed.query_pairs().find(|(k, _)| k == "uddg")?;
        Url::parse(&target).ok()?
    } else {
        parsed
    };

    let web_scheme = matches!(target.scheme(), "http" | "https");
    if !web_scheme || target.host_str().is_none() || is_duckduckgo_host(&target) {
        return None;
    }

    Some(target.to_string())
}

fn is_duckduckgo_host(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|h| h == "duckduckgo.com" || h.ends_with(".duckduckgo.com"))
}

// Instant Answer API response types
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ApiResponse {
    heading: String,
    #[serde(rename = "Abstract")]
    abstract_text: String,
    abstract_source: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    // Usually a string, but some answer types return an object
    answer: serde_json::Value,
    definition: String,
    definition_source: String,
    #[serde(rename = "DefinitionURL")]
    definition_url: String,
    related_topics: Vec<ApiRelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiRelatedTopic {
    Topic(ApiTopic),
    Category {
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Topics")]
        topics: Vec<ApiTopic>,
    },
}

#[derive(Debug, Deserialize)]
struct ApiTopic {
    #[serde(rename = "Text")]
    text: String,
    #[serde(rename = "FirstURL")]
    first_url: String,
}

impl From<ApiTopic> for TopicLink {
    fn from(topic: ApiTopic) -> Self {
        Self {
            text: topic.text,
            url: topic.first_url,
        }
    }
}

/// Decode an Instant Answer API body
pub fn parse_instant_answer(body: &str) -> BackendResult<InstantAnswer> {
    let response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| SearchError::Parse(format!("unexpected instant answer payload: {e}")))?;

    let answer = match response.answer {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    };

    let related = response
        .related_topics
        .into_iter()
        .map(|topic| match topic {
            ApiRelatedTopic::Topic(t) => RelatedTopic::Topic(t.into()),
            ApiRelatedTopic::Category { name, topics } => RelatedTopic::Category {
                name,
                topics: topics.into_iter().map(TopicLink::from).collect(),
            },
        })
        .collect();

    Ok(InstantAnswer {
        heading: response.heading,
        abstract_text: response.abstract_text,
        abstract_source: response.abstract_source,
        abstract_url: response.abstract_url,
        answer,
        definition: response.definition,
        definition_source: response.definition_source,
        definition_url: response.definition_url,
        related,
    })
}
