//! Paged headline feed.
//!
//! [`FeedController`] owns the filter state (category and search text), the
//! accumulated pages and the load state. Every change is published as a full
//! [`FeedState`] snapshot on a `watch` channel.
//!
//! Fresh loads are numbered. A result is applied only while its number is
//! still the latest one started, so a slow response for an old filter can
//! never overwrite a newer one. Page appends carry the number of the load
//! they extend and are dropped once a newer fresh load has begun.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::article::{Article, FavoriteArticle};
use crate::category::Category;
use crate::config::FeedConfig;
use crate::error::{NewsError, PersistenceError};
use crate::favorites::{FavoriteUpdate, FavoritesStore};
use crate::repository::{HeadlinePage, HeadlineRepository};

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Idle,
    Loading,
    Loaded(Vec<Article>),
    Error(NewsError),
}

impl ViewState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn error(&self) -> Option<&NewsError> {
        match self {
            ViewState::Error(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FeedOptions {
    pub page_size: u32,
    pub search_debounce: Duration,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            page_size: 20,
            search_debounce: Duration::from_millis(500),
        }
    }
}

impl From<&FeedConfig> for FeedOptions {
    fn from(config: &FeedConfig) -> Self {
        Self {
            page_size: config.page_size.max(1),
            search_debounce: config.search_debounce(),
        }
    }
}

/// Everything the presentation layer reads from the feed.
#[derive(Debug, Clone)]
pub struct FeedState {
    view_state: ViewState,
    articles: Vec<Article>,
    selected_category: Option<Category>,
    search_query: String,
    current_page: u32,
    total_results: u32,
    has_more_pages: bool,
    is_loading_more: bool,
    favorites_revision: u64,
    generation: u64,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            view_state: ViewState::Idle,
            articles: Vec::new(),
            selected_category: None,
            search_query: String::new(),
            current_page: 1,
            total_results: 0,
            has_more_pages: true,
            is_loading_more: false,
            favorites_revision: 0,
            generation: 0,
        }
    }
}

impl FeedState {
    pub fn view_state(&self) -> &ViewState {
        &self.view_state
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn selected_category(&self) -> Option<Category> {
        self.selected_category
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_results(&self) -> u32 {
        self.total_results
    }

    pub fn has_more_pages(&self) -> bool {
        self.has_more_pages
    }

    pub fn is_loading_more(&self) -> bool {
        self.is_loading_more
    }

    /// Bumped whenever the favorites collection changes, so per-article
    /// favorite markers can be redrawn.
    pub fn favorites_revision(&self) -> u64 {
        self.favorites_revision
    }

    fn page_request(&self, page: u32) -> PageRequest {
        PageRequest {
            generation: self.generation,
            category: self.selected_category,
            query: Some(self.search_query.clone()).filter(|q| !q.is_empty()),
            page,
        }
    }

    fn begin_fresh_load(&mut self) -> PageRequest {
        self.generation += 1;
        self.view_state = ViewState::Loading;
        self.current_page = 1;
        self.articles.clear();
        self.is_loading_more = false;
        self.page_request(1)
    }

    fn apply_page(&mut self, page_number: u32, page: HeadlinePage, page_size: u32) {
        if page_number == 1 {
            self.articles = page.articles;
        } else {
            self.articles.extend(page.articles);
        }
        self.current_page = page_number;
        self.total_results = page.total_results;
        self.has_more_pages =
            u64::from(page_number) * u64::from(page_size) < u64::from(page.total_results);
        self.view_state = ViewState::Loaded(self.articles.clone());
    }
}

#[derive(Debug, Clone)]
struct PageRequest {
    generation: u64,
    category: Option<Category>,
    query: Option<String>,
    page: u32,
}

#[derive(Debug, Default)]
struct SearchDebounce {
    pending: Option<JoinHandle<()>>,
    last_triggered: Option<String>,
}

struct Inner {
    repository: Arc<dyn HeadlineRepository + Send + Sync>,
    favorites: FavoritesStore,
    options: FeedOptions,
    state: Mutex<FeedState>,
    published: watch::Sender<FeedState>,
    search: Mutex<SearchDebounce>,
    favorites_listener: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let search = self.search.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = search.pending.take() {
            pending.abort();
        }
        let listener = self
            .favorites_listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(listener) = listener.take() {
            listener.abort();
        }
    }
}

/// Handle to the feed. Clones drive the same feed.
#[derive(Clone)]
pub struct FeedController {
    inner: Arc<Inner>,
}

impl FeedController {
    /// Must be called from within a Tokio runtime: the controller spawns a
    /// task that follows the favorites store.
    pub fn new(
        repository: Arc<dyn HeadlineRepository + Send + Sync>,
        favorites: FavoritesStore,
        options: FeedOptions,
    ) -> Self {
        let favorites_rx = favorites.subscribe();
        let initial = FeedState::default();
        let (published, _) = watch::channel(initial.clone());
        let inner = Arc::new(Inner {
            repository,
            favorites,
            options,
            state: Mutex::new(initial),
            published,
            search: Mutex::new(SearchDebounce::default()),
            favorites_listener: Mutex::new(None),
        });

        let listener = tokio::spawn(forward_favorite_changes(
            Arc::downgrade(&inner),
            favorites_rx,
        ));
        *inner
            .favorites_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);

        Self { inner }
    }

    pub fn state(&self) -> FeedState {
        self.inner.published.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.inner.published.subscribe()
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.inner.favorites
    }

    pub fn options(&self) -> FeedOptions {
        self.inner.options
    }

    /// Starts over from page 1 with the current filters.
    pub async fn load_articles(&self) {
        let request = {
            let mut state = self.lock();
            let request = state.begin_fresh_load();
            self.publish(&state);
            request
        };
        self.run_fresh_load(request).await;
    }

    pub async fn refresh(&self) {
        self.load_articles().await;
    }

    /// Appends the next page. Does nothing while another append is running,
    /// when no page is known to follow, or when nothing is loaded yet.
    ///
    /// A failed append leaves the loaded articles and the page counter as
    /// they were.
    pub async fn load_more_articles(&self) {
        let request = {
            let mut state = self.lock();
            if state.is_loading_more
                || !state.has_more_pages
                || !matches!(state.view_state, ViewState::Loaded(_))
            {
                debug!(
                    loading_more = state.is_loading_more,
                    has_more = state.has_more_pages,
                    "skipping load more"
                );
                return;
            }
            state.is_loading_more = true;
            let request = state.page_request(state.current_page + 1);
            self.publish(&state);
            request
        };

        let result = self.fetch(&request).await;

        let mut state = self.lock();
        if state.generation != request.generation {
            debug!(page = request.page, "discarding page of a superseded feed");
            return;
        }
        state.is_loading_more = false;
        match result {
            Ok(page) => {
                debug!(page = request.page, count = page.articles.len(), "page appended");
                state.apply_page(request.page, page, self.inner.options.page_size);
            }
            Err(err) => warn!(error = %err, page = request.page, "failed to load next page"),
        }
        self.publish(&state);
    }

    /// Appends pages until `last_page` is loaded, no page follows, or an
    /// append makes no progress.
    ///
    /// Progress is the page counter, not the article count: a page whose
    /// articles were all redacted still moves paging forward.
    pub async fn load_through_page(&self, last_page: u32) {
        loop {
            let before = self.state().current_page();
            if before >= last_page {
                break;
            }
            self.load_more_articles().await;
            if self.state().current_page() <= before {
                break;
            }
        }
    }

    /// Switches category and reloads. Selecting the current category is a
    /// no-op.
    ///
    /// The reload already uses the typed search text, so a pending debounced
    /// search is folded into it.
    pub async fn select_category(&self, category: Option<Category>) {
        let request = {
            let mut state = self.lock();
            if state.selected_category == category {
                return;
            }
            state.selected_category = category;
            {
                let mut search = self.search_lock();
                if let Some(pending) = search.pending.take() {
                    pending.abort();
                }
                search.last_triggered = Some(state.search_query.clone());
            }
            let request = state.begin_fresh_load();
            self.publish(&state);
            request
        };
        self.run_fresh_load(request).await;
    }

    /// Records typed search text. A reload follows once the text has been
    /// left alone for the debounce period, unless it equals the text that
    /// triggered the previous search load.
    pub fn set_search_query(&self, text: impl Into<String>) {
        let text = text.into();
        {
            let mut state = self.lock();
            if state.search_query != text {
                state.search_query = text.clone();
                self.publish(&state);
            }
        }

        let weak = Arc::downgrade(&self.inner);
        let debounce = self.inner.options.search_debounce;
        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let controller = FeedController { inner };
            if let Some(request) = controller.settle_search(&text) {
                // Detached so that a later keystroke aborting this task
                // cannot cancel a load that already started.
                tokio::spawn(async move { controller.run_fresh_load(request).await });
            }
        });

        if let Some(previous) = self.search_lock().pending.replace(task) {
            previous.abort();
        }
    }

    /// Searches immediately, skipping the debounce.
    pub async fn submit_search(&self, text: impl Into<String>) {
        let category = self.lock().selected_category;
        self.apply_filters(category, text).await;
    }

    /// Sets category and search text together and performs one fresh load.
    pub async fn apply_filters(&self, category: Option<Category>, query: impl Into<String>) {
        let query = query.into();
        {
            let mut search = self.search_lock();
            if let Some(pending) = search.pending.take() {
                pending.abort();
            }
            search.last_triggered = Some(query.clone());
        }
        let request = {
            let mut state = self.lock();
            state.selected_category = category;
            state.search_query = query;
            let request = state.begin_fresh_load();
            self.publish(&state);
            request
        };
        self.run_fresh_load(request).await;
    }

    pub async fn toggle_favorite(
        &self,
        article: &Article,
    ) -> Result<FavoriteUpdate, PersistenceError> {
        self.inner.favorites.toggle(article).await
    }

    pub fn is_favorite(&self, article: &Article) -> bool {
        self.inner.favorites.is_favorite(article)
    }

    fn settle_search(&self, text: &str) -> Option<PageRequest> {
        {
            let mut search = self.search_lock();
            if search.last_triggered.as_deref() == Some(text) {
                debug!(query = text, "search text unchanged, not reloading");
                return None;
            }
            search.last_triggered = Some(text.to_owned());
        }
        let mut state = self.lock();
        let request = state.begin_fresh_load();
        self.publish(&state);
        Some(request)
    }

    async fn run_fresh_load(&self, request: PageRequest) {
        debug!(
            generation = request.generation,
            category = ?request.category,
            query = ?request.query,
            "fresh load"
        );
        let result = self.fetch(&request).await;

        let mut state = self.lock();
        if state.generation != request.generation {
            debug!(generation = request.generation, "discarding superseded load");
            return;
        }
        match result {
            Ok(page) => {
                info!(
                    count = page.articles.len(),
                    total = page.total_results,
                    "headlines loaded"
                );
                state.apply_page(1, page, self.inner.options.page_size);
            }
            Err(err) => {
                warn!(error = %err, "headline load failed");
                state.has_more_pages = false;
                state.view_state = ViewState::Error(err);
            }
        }
        self.publish(&state);
    }

    async fn fetch(&self, request: &PageRequest) -> Result<HeadlinePage, NewsError> {
        self.inner
            .repository
            .fetch_top_headlines(
                request.category,
                request.query.as_deref(),
                request.page,
                self.inner.options.page_size,
            )
            .await
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn search_lock(&self) -> MutexGuard<'_, SearchDebounce> {
        self.inner.search.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &FeedState) {
        self.inner.published.send_replace(state.clone());
    }
}

async fn forward_favorite_changes(
    inner: Weak<Inner>,
    mut favorites: watch::Receiver<Vec<FavoriteArticle>>,
) {
    while favorites.changed().await.is_ok() {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let mut state = inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.favorites_revision += 1;
        inner.published.send_replace(state.clone());
    }
}
