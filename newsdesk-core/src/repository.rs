use async_trait::async_trait;
use tracing::debug;

use crate::article::{Article, HeadlinesResponse};
use crate::category::Category;
use crate::client::HttpClient;
use crate::endpoint::Endpoint;
use crate::error::NewsError;

/// Title the API substitutes for articles that were taken down.
pub const REDACTION_MARKER: &str = "[Removed]";

pub const DEFAULT_COUNTRY: &str = "us";

/// One page of headlines. `total_results` is the upstream count and may
/// exceed what survives redaction filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlinePage {
    pub articles: Vec<Article>,
    pub total_results: u32,
}

#[async_trait]
pub trait HeadlineRepository {
    async fn fetch_top_headlines(
        &self,
        category: Option<Category>,
        query: Option<&str>,
        page: u32,
        page_size: u32,
    ) -> Result<HeadlinePage, NewsError>;
}

/// Headline source backed by the HTTP API.
#[derive(Debug, Clone)]
pub struct NewsRepository {
    client: HttpClient,
    country: String,
}

impl NewsRepository {
    pub fn new(client: HttpClient) -> Self {
        Self::with_country(client, DEFAULT_COUNTRY)
    }

    pub fn with_country(client: HttpClient, country: impl Into<String>) -> Self {
        Self {
            client,
            country: country.into(),
        }
    }
}

#[async_trait]
impl HeadlineRepository for NewsRepository {
    async fn fetch_top_headlines(
        &self,
        category: Option<Category>,
        query: Option<&str>,
        page: u32,
        page_size: u32,
    ) -> Result<HeadlinePage, NewsError> {
        let endpoint = Endpoint::TopHeadlines {
            country: self.country.clone(),
            category,
            query: query
                .filter(|q| !q.trim().is_empty())
                .map(str::to_owned),
            page,
            page_size,
        };

        let response: HeadlinesResponse = self.client.fetch(&endpoint).await?;
        let received = response.articles.len();
        let articles: Vec<Article> = response
            .articles
            .into_iter()
            .filter(|article| !is_redacted(article))
            .collect();
        if articles.len() != received {
            debug!(dropped = received - articles.len(), page, "filtered redacted articles");
        }

        Ok(HeadlinePage {
            articles,
            total_results: response.total_results,
        })
    }
}

/// Substring match on the title, so a legitimate headline quoting the
/// marker is dropped as well.
pub fn is_redacted(article: &Article) -> bool {
    article.title.contains(REDACTION_MARKER)
}
