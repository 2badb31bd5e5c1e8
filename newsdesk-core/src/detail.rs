use tokio::sync::watch;
use url::Url;

use crate::article::{Article, FavoriteArticle};
use crate::error::PersistenceError;
use crate::favorites::{FavoriteUpdate, FavoritesStore};

/// A single article on screen, with a favorite flag that follows the store.
pub struct ArticleDetail {
    article: Article,
    favorites: FavoritesStore,
    changes: watch::Receiver<Vec<FavoriteArticle>>,
    is_favorite: bool,
}

impl ArticleDetail {
    pub fn new(article: Article, favorites: FavoritesStore) -> Self {
        let changes = favorites.subscribe();
        let is_favorite = favorites.is_favorite(&article);
        Self {
            article,
            favorites,
            changes,
            is_favorite,
        }
    }

    pub fn article(&self) -> &Article {
        &self.article
    }

    pub fn is_favorite(&self) -> bool {
        self.is_favorite
    }

    pub fn url(&self) -> Option<Url> {
        Url::parse(&self.article.url).ok()
    }

    pub fn share_text(&self) -> String {
        format!("{} - {}", self.article.title, self.article.url)
    }

    pub async fn toggle_favorite(&mut self) -> Result<FavoriteUpdate, PersistenceError> {
        let result = if self.is_favorite {
            self.favorites.remove_favorite(&self.article).await
        } else {
            self.favorites.add_favorite(&self.article).await
        };
        self.refresh_flag();
        result
    }

    /// Waits for the next favorites change and returns the updated flag.
    /// `None` once the store is gone.
    pub async fn favorite_changed(&mut self) -> Option<bool> {
        self.changes.changed().await.ok()?;
        self.refresh_flag();
        Some(self.is_favorite)
    }

    fn refresh_flag(&mut self) {
        let id = self.article.id();
        self.is_favorite = self.changes.borrow_and_update().iter().any(|f| f.id == id);
    }
}
