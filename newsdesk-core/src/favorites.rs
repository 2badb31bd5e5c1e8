use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::article::{Article, FavoriteArticle};
use crate::error::PersistenceError;
use crate::storage::{JsonStore, FAVORITES_KEY};

/// Outcome of a favorites mutation that reached disk (or had nothing to do).
///
/// An `Err(PersistenceError)` from a mutation means the in-memory collection
/// already changed but the save failed; retry with
/// [`FavoritesStore::flush`] or roll back with [`FavoritesStore::reload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteUpdate {
    Saved,
    Unchanged,
}

/// Orderings offered by the favorites list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FavoriteSort {
    #[default]
    NewestSaved,
    OldestSaved,
    TitleAscending,
    TitleDescending,
}

impl FavoriteSort {
    pub fn label(self) -> &'static str {
        match self {
            FavoriteSort::NewestSaved => "Newest Saved",
            FavoriteSort::OldestSaved => "Oldest Saved",
            FavoriteSort::TitleAscending => "Title A-Z",
            FavoriteSort::TitleDescending => "Title Z-A",
        }
    }

    pub fn sort(self, favorites: &mut [FavoriteArticle]) {
        match self {
            FavoriteSort::NewestSaved => favorites.sort_by(|a, b| b.saved_at.cmp(&a.saved_at)),
            FavoriteSort::OldestSaved => favorites.sort_by(|a, b| a.saved_at.cmp(&b.saved_at)),
            FavoriteSort::TitleAscending => {
                favorites.sort_by_cached_key(|f| f.title.to_lowercase())
            }
            FavoriteSort::TitleDescending => favorites.sort_by(|a, b| {
                b.title.to_lowercase().cmp(&a.title.to_lowercase())
            }),
        }
    }
}

/// Bookmarked articles, mirrored in memory and persisted as a whole on every
/// change.
///
/// Clones share the same collection. Subscribers receive the full current
/// collection each time it changes.
#[derive(Debug, Clone)]
pub struct FavoritesStore {
    favorites: Arc<watch::Sender<Vec<FavoriteArticle>>>,
    write_lock: Arc<Mutex<()>>,
    storage: Option<JsonStore>,
}

impl FavoritesStore {
    pub fn in_memory() -> Self {
        Self::with_state(Vec::new(), None)
    }

    /// Loads the persisted collection. Missing or unreadable data starts an
    /// empty collection.
    pub async fn load(storage: JsonStore) -> Self {
        let favorites = read_favorites(&storage).await;
        info!(count = favorites.len(), "favorites loaded");
        Self::with_state(favorites, Some(storage))
    }

    fn with_state(favorites: Vec<FavoriteArticle>, storage: Option<JsonStore>) -> Self {
        let (tx, _) = watch::channel(favorites);
        Self {
            favorites: Arc::new(tx),
            write_lock: Arc::new(Mutex::new(())),
            storage,
        }
    }

    /// Snapshot, newest bookmark first.
    pub fn favorites(&self) -> Vec<FavoriteArticle> {
        self.favorites.borrow().clone()
    }

    pub fn sorted(&self, order: FavoriteSort) -> Vec<FavoriteArticle> {
        let mut favorites = self.favorites();
        order.sort(&mut favorites);
        favorites
    }

    pub fn get(&self, url: &str) -> Option<FavoriteArticle> {
        self.favorites.borrow().iter().find(|f| f.id == url).cloned()
    }

    pub fn len(&self) -> usize {
        self.favorites.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.favorites.borrow().is_empty()
    }

    pub fn is_favorite(&self, article: &Article) -> bool {
        self.favorites.borrow().iter().any(|f| f.id == article.id())
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<FavoriteArticle>> {
        self.favorites.subscribe()
    }

    pub async fn add_favorite(&self, article: &Article) -> Result<FavoriteUpdate, PersistenceError> {
        let favorite = FavoriteArticle::from_article(article);
        self.mutate(move |favorites| {
            if favorites.iter().any(|f| f.id == favorite.id) {
                debug!(url = %favorite.url, "already a favorite");
                return false;
            }
            favorites.insert(0, favorite);
            true
        })
        .await
    }

    pub async fn remove_favorite(
        &self,
        article: &Article,
    ) -> Result<FavoriteUpdate, PersistenceError> {
        let id = article.id().to_owned();
        self.mutate(move |favorites| {
            let before = favorites.len();
            favorites.retain(|f| f.id != id);
            if favorites.len() == before {
                debug!(url = %id, "not a favorite");
                return false;
            }
            true
        })
        .await
    }

    /// Adds when absent, removes when present.
    pub async fn toggle(&self, article: &Article) -> Result<FavoriteUpdate, PersistenceError> {
        if self.is_favorite(article) {
            self.remove_favorite(article).await
        } else {
            self.add_favorite(article).await
        }
    }

    /// Writes the current in-memory collection again.
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        self.persist().await
    }

    /// Replaces the in-memory collection with what is on disk.
    pub async fn reload(&self) {
        let Some(storage) = &self.storage else {
            return;
        };
        let _guard = self.write_lock.lock().await;
        let stored = read_favorites(storage).await;
        self.favorites.send_if_modified(|favorites| {
            if *favorites == stored {
                return false;
            }
            *favorites = stored;
            true
        });
    }

    /// Applies `change` and saves the result, serialized with other writes.
    ///
    /// Runs on its own task, so a save that follows an in-memory change
    /// completes even if the returned future is dropped.
    async fn mutate<F>(&self, change: F) -> Result<FavoriteUpdate, PersistenceError>
    where
        F: FnOnce(&mut Vec<FavoriteArticle>) -> bool + Send + 'static,
    {
        let store = self.clone();
        let task = tokio::spawn(async move {
            let _guard = store.write_lock.lock().await;
            if !store.favorites.send_if_modified(change) {
                return Ok(FavoriteUpdate::Unchanged);
            }
            store.persist().await?;
            Ok::<_, PersistenceError>(FavoriteUpdate::Saved)
        });
        task.await
            .map_err(|e| PersistenceError::SaveFailed(e.to_string()))?
    }

    async fn persist(&self) -> Result<(), PersistenceError> {
        let Some(storage) = &self.storage else {
            debug!("favorites are in-memory only; skipping persist");
            return Ok(());
        };
        let snapshot = self.favorites();
        storage
            .save(FAVORITES_KEY, &snapshot)
            .await
            .inspect_err(|e| warn!(error = %e, "failed to persist favorites"))
    }
}

async fn read_favorites(storage: &JsonStore) -> Vec<FavoriteArticle> {
    match storage.load::<Vec<FavoriteArticle>>(FAVORITES_KEY).await {
        Ok(mut favorites) => {
            let mut seen = HashSet::new();
            favorites.retain(|f| seen.insert(f.id.clone()));
            favorites
        }
        Err(e) => {
            debug!(error = %e, "no usable stored favorites, starting empty");
            Vec::new()
        }
    }
}
