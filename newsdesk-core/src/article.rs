use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub id: Option<String>,
    pub name: String,
}

/// A single headline as returned by the API.
///
/// Two articles are the same article when their URLs match, whatever the
/// other fields say.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub source: Source,
    pub author: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    #[serde(rename = "urlToImage")]
    pub image_url: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: String,
    pub content: Option<String>,
}

impl Article {
    /// Identity key shared with [`FavoriteArticle::id`].
    pub fn id(&self) -> &str {
        &self.url
    }
}

impl PartialEq for Article {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for Article {}

impl Hash for Article {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

/// Envelope of a successful `/top-headlines` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlinesResponse {
    pub status: String,
    #[serde(rename = "totalResults")]
    pub total_results: u32,
    pub articles: Vec<Article>,
}

/// Error envelope the API may send with 4xx/5xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub status: String,
    pub code: String,
    pub message: String,
}

/// Bookmarked copy of an [`Article`], frozen at the moment it was saved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteArticle {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub url_to_image: Option<String>,
    pub published_at: String,
    pub source_name: String,
    pub author: Option<String>,
    pub content: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl FavoriteArticle {
    pub fn from_article(article: &Article) -> Self {
        Self {
            id: article.id().to_owned(),
            title: article.title.clone(),
            description: article.description.clone(),
            url: article.url.clone(),
            url_to_image: article.image_url.clone(),
            published_at: article.published_at.clone(),
            source_name: article.source.name.clone(),
            author: article.author.clone(),
            content: article.content.clone(),
            saved_at: Utc::now(),
        }
    }

    /// Rebuilds an article for display; the source id is not kept on save.
    pub fn to_article(&self) -> Article {
        Article {
            source: Source {
                id: None,
                name: self.source_name.clone(),
            },
            author: self.author.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            url: self.url.clone(),
            image_url: self.url_to_image.clone(),
            published_at: self.published_at.clone(),
            content: self.content.clone(),
        }
    }
}
