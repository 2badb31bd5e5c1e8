pub mod article;
pub mod category;
pub mod client;
pub mod config;
pub mod detail;
pub mod endpoint;
pub mod error;
pub mod favorites;
pub mod feed;
pub mod repository;
pub mod storage;

pub use article::{ApiErrorResponse, Article, FavoriteArticle, HeadlinesResponse, Source};
pub use category::Category;
pub use client::{classify_status, HttpClient};
pub use config::AppConfig;
pub use detail::ArticleDetail;
pub use endpoint::Endpoint;
pub use error::{ConfigError, NewsError, PersistenceError};
pub use favorites::{FavoriteSort, FavoriteUpdate, FavoritesStore};
pub use feed::{FeedController, FeedOptions, FeedState, ViewState};
pub use repository::{HeadlinePage, HeadlineRepository, NewsRepository};
pub use storage::JsonStore;
