use crate::traits::Summarizer;
use crate::types::{ApiErrorBody, FetchedArticle, SummarizationError, SummarySections};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummarizeRequest<'a> {
    articles_by_perspective: BTreeMap<&'a str, Vec<ArticleTitle<'a>>>,
}

#[derive(Debug, Serialize)]
struct ArticleTitle<'a> {
    title: &'a str,
}

/// Summarizer backed by an HTTP endpoint that takes article titles grouped
/// by perspective and answers with the three summary sections as JSON.
///
/// Calls are never retried: every request costs a generation on the far side.
pub struct HttpSummarizer {
    client: Client,
    endpoint: String,
}

impl HttpSummarizer {
    pub fn new(endpoint: String, timeout_seconds: u64) -> Result<Self, SummarizationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    fn summarizer_name(&self) -> String {
        format!("HTTP summarizer ({})", self.endpoint)
    }

    async fn summarize(
        &self,
        articles_by_perspective: &BTreeMap<String, Vec<FetchedArticle>>,
    ) -> Result<SummarySections, SummarizationError> {
        // Only titles go over the wire
        let request = SummarizeRequest {
            articles_by_perspective: articles_by_perspective
                .iter()
                .map(|(perspective, articles)| {
                    let titles: Vec<ArticleTitle> = articles
                        .iter()
                        .map(|a| ArticleTitle { title: &a.title })
                        .collect();
                    (perspective.as_str(), titles)
                })
                .collect(),
        };

        debug!("Posting {} perspectives to {}", request.articles_by_perspective.len(), self.endpoint);
        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Prefer the service's own error text over the status reason
            let error_body: ApiErrorBody = serde_json::from_str(&body).unwrap_or_default();
            let mut message = error_body
                .error
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
            if let Some(details) = error_body.details {
                message = format!("{} ({})", message, details);
            }
            error!("Summarizer returned {}: {}", status, message);
            return Err(SummarizationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        // All three sections must be present
        let sections: SummarySections = serde_json::from_str(&body)
            .map_err(|e| SummarizationError::Malformed(e.to_string()))?;

        info!(
            "Received summary: {} highlights, {} us, {} venezuelan",
            sections.overall_highlights.len(),
            sections.us_perspective.len(),
            sections.venezuelan_perspective.len()
        );
        Ok(sections)
    }
}

enum MockResponse {
    Canned(SummarySections),
    Failure(String),
    TitleDigest,
}

/// Mock summarizer for development and testing. Remembers the titles it was
/// asked about.
pub struct MockSummarizer {
    name: String,
    response: MockResponse,
    requests: Mutex<Vec<BTreeMap<String, Vec<String>>>>,
}

impl MockSummarizer {
    pub fn new(name: String, sections: SummarySections) -> Self {
        Self {
            name,
            response: MockResponse::Canned(sections),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A summarizer whose every call fails with an API error.
    pub fn failing(name: String, message: String) -> Self {
        Self {
            name,
            response: MockResponse::Failure(message),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers with the submitted titles themselves, for offline runs.
    pub fn title_digest() -> Self {
        Self {
            name: "titles".to_string(),
            response: MockResponse::TitleDigest,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<BTreeMap<String, Vec<String>>> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    fn summarizer_name(&self) -> String {
        format!("Mock summarizer ({})", self.name)
    }

    async fn summarize(
        &self,
        articles_by_perspective: &BTreeMap<String, Vec<FetchedArticle>>,
    ) -> Result<SummarySections, SummarizationError> {
        let titles: BTreeMap<String, Vec<String>> = articles_by_perspective
            .iter()
            .map(|(perspective, articles)| {
                (perspective.clone(), articles.iter().map(|a| a.title.clone()).collect())
            })
            .collect();

        // Record before answering so failing mocks are observable too
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(titles.clone());
        }

        match &self.response {
            MockResponse::Canned(sections) => Ok(sections.clone()),
            MockResponse::Failure(message) => Err(SummarizationError::Api {
                status: 500,
                message: message.clone(),
            }),
            MockResponse::TitleDigest => Ok(digest_titles(&titles)),
        }
    }
}

fn digest_titles(titles: &BTreeMap<String, Vec<String>>) -> SummarySections {
    let section = |perspective: &str| titles.get(perspective).cloned().unwrap_or_default();

    SummarySections {
        overall_highlights: titles.values().flatten().take(3).cloned().collect(),
        us_perspective: section(crate::types::US_PERSPECTIVE),
        venezuelan_perspective: section(crate::types::VENEZUELAN_PERSPECTIVE),
    }
}
