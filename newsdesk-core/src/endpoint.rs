use url::Url;

use crate::category::Category;
use crate::error::NewsError;

/// Requests the fetch client knows how to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    TopHeadlines {
        country: String,
        category: Option<Category>,
        query: Option<String>,
        page: u32,
        page_size: u32,
    },
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::TopHeadlines { .. } => "/top-headlines",
        }
    }

    /// Query parameters, credential first. An empty `q` is left out.
    pub fn query_pairs(&self, api_key: &str) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("apiKey", api_key.to_owned())];
        match self {
            Endpoint::TopHeadlines {
                country,
                category,
                query,
                page,
                page_size,
            } => {
                pairs.push(("country", country.clone()));
                if let Some(category) = category {
                    pairs.push(("category", category.as_str().to_owned()));
                }
                if let Some(query) = query.as_deref().filter(|q| !q.is_empty()) {
                    pairs.push(("q", query.to_owned()));
                }
                pairs.push(("page", page.to_string()));
                pairs.push(("pageSize", page_size.to_string()));
            }
        }
        pairs
    }

    pub fn url(&self, base_url: &str, api_key: &str) -> Result<Url, NewsError> {
        let joined = format!("{}{}", base_url.trim_end_matches('/'), self.path());
        let mut url = Url::parse(&joined).map_err(|_| NewsError::InvalidUrl)?;
        if url.cannot_be_a_base() {
            return Err(NewsError::InvalidUrl);
        }
        url.query_pairs_mut().extend_pairs(self.query_pairs(api_key));
        Ok(url)
    }
}
