use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use newsdesk_core::{
    Article, Category, FavoritesStore, FeedController, FeedOptions, HeadlinePage,
    HeadlineRepository, NewsError, Source, ViewState,
};

#[derive(Debug, Clone, PartialEq)]
struct Call {
    category: Option<Category>,
    query: Option<String>,
    page: u32,
}

type Reply = (Duration, Result<HeadlinePage, NewsError>);

struct ScriptedRepository {
    calls: Mutex<Vec<Call>>,
    respond: Box<dyn Fn(&Call) -> Reply + Send + Sync>,
}

impl ScriptedRepository {
    fn new(respond: impl Fn(&Call) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HeadlineRepository for ScriptedRepository {
    async fn fetch_top_headlines(
        &self,
        category: Option<Category>,
        query: Option<&str>,
        page: u32,
        _page_size: u32,
    ) -> Result<HeadlinePage, NewsError> {
        let call = Call {
            category,
            query: query.map(str::to_owned),
            page,
        };
        self.calls.lock().unwrap().push(call.clone());
        let (delay, reply) = (self.respond)(&call);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply
    }
}

fn article(url: String) -> Article {
    Article {
        source: Source {
            id: None,
            name: "Wire".into(),
        },
        author: None,
        title: format!("Headline {url}"),
        description: None,
        url,
        image_url: None,
        published_at: "2025-12-29T10:00:00Z".into(),
        content: None,
    }
}

fn page_of(label: &str, page: u32, count: usize, total: u32) -> HeadlinePage {
    HeadlinePage {
        articles: (0..count)
            .map(|i| article(format!("https://e/{label}/{page}/{i}")))
            .collect(),
        total_results: total,
    }
}

/// 45 results in pages of 20, served instantly.
fn forty_five_results(call: &Call) -> Reply {
    let count = match call.page {
        1 | 2 => 20,
        3 => 5,
        _ => 0,
    };
    (Duration::ZERO, Ok(page_of("feed", call.page, count, 45)))
}

fn controller_with(repository: Arc<ScriptedRepository>) -> FeedController {
    FeedController::new(repository, FavoritesStore::in_memory(), FeedOptions::default())
}

#[tokio::test(start_paused = true)]
async fn pages_accumulate_until_total_is_reached() {
    let repository = ScriptedRepository::new(forty_five_results);
    let controller = controller_with(repository.clone());
    assert_eq!(controller.state().view_state(), &ViewState::Idle);

    controller.select_category(Some(Category::Technology)).await;
    let state = controller.state();
    assert_eq!(state.articles().len(), 20);
    assert_eq!(state.current_page(), 1);
    assert_eq!(state.total_results(), 45);
    assert!(state.has_more_pages());
    assert!(matches!(state.view_state(), ViewState::Loaded(a) if a.len() == 20));

    controller.load_more_articles().await;
    let state = controller.state();
    assert_eq!(state.articles().len(), 40);
    assert_eq!(state.current_page(), 2);
    assert!(state.has_more_pages(), "40 < 45");

    controller.load_more_articles().await;
    let state = controller.state();
    assert_eq!(state.articles().len(), 45);
    assert_eq!(state.current_page(), 3);
    assert!(!state.has_more_pages(), "60 >= 45");
    assert!(!state.is_loading_more());

    controller.load_more_articles().await;
    let pages: Vec<u32> = repository.calls().iter().map(|c| c.page).collect();
    assert_eq!(pages, vec![1, 2, 3]);
    assert!(repository
        .calls()
        .iter()
        .all(|c| c.category == Some(Category::Technology)));
}

#[tokio::test(start_paused = true)]
async fn rapid_typing_triggers_one_load_for_the_final_text() {
    let repository = ScriptedRepository::new(forty_five_results);
    let controller = controller_with(repository.clone());

    controller.set_search_query("a");
    tokio::time::sleep(Duration::from_millis(100)).await;
    controller.set_search_query("ab");
    tokio::time::sleep(Duration::from_millis(100)).await;
    controller.set_search_query("abc");
    assert_eq!(controller.state().search_query(), "abc");
    assert!(repository.calls().is_empty());

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(
        repository.calls(),
        vec![Call {
            category: None,
            query: Some("abc".into()),
            page: 1
        }]
    );
    assert!(matches!(controller.state().view_state(), ViewState::Loaded(_)));
}

#[tokio::test(start_paused = true)]
async fn settling_on_the_same_text_does_not_reload() {
    let repository = ScriptedRepository::new(forty_five_results);
    let controller = controller_with(repository.clone());

    controller.set_search_query("rust");
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(repository.calls().len(), 1);

    controller.set_search_query("rust");
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(repository.calls().len(), 1);

    controller.set_search_query("rusty");
    tokio::time::sleep(Duration::from_millis(200)).await;
    controller.set_search_query("rust");
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(repository.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn submitted_search_cancels_the_pending_debounce() {
    let repository = ScriptedRepository::new(forty_five_results);
    let controller = controller_with(repository.clone());

    controller.set_search_query("mars");
    controller.submit_search("mars").await;
    assert_eq!(repository.calls().len(), 1);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(repository.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn category_change_absorbs_pending_search() {
    let repository = ScriptedRepository::new(forty_five_results);
    let controller = controller_with(repository.clone());

    controller.set_search_query("abc");
    controller.select_category(Some(Category::Technology)).await;
    controller.load_more_articles().await;
    assert_eq!(controller.state().articles().len(), 40);

    tokio::time::sleep(Duration::from_millis(600)).await;
    let calls = repository.calls();
    assert_eq!(calls.len(), 2, "{calls:?}");
    assert!(calls
        .iter()
        .all(|c| c.category == Some(Category::Technology) && c.query.as_deref() == Some("abc")));
    let state = controller.state();
    assert_eq!(state.articles().len(), 40);
    assert_eq!(state.current_page(), 2);

    // The text the category load used counts as already searched.
    controller.set_search_query("abc");
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(repository.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn selecting_the_current_category_is_a_no_op() {
    let repository = ScriptedRepository::new(forty_five_results);
    let controller = controller_with(repository.clone());

    controller.select_category(None).await;
    assert!(repository.calls().is_empty());
    assert_eq!(controller.state().view_state(), &ViewState::Idle);

    controller.select_category(Some(Category::Health)).await;
    controller.select_category(Some(Category::Health)).await;
    assert_eq!(repository.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_fresh_load_surfaces_the_error() {
    let fail = Arc::new(AtomicBool::new(true));
    let fail_flag = fail.clone();
    let repository = ScriptedRepository::new(move |call| {
        if fail_flag.load(Ordering::SeqCst) {
            (Duration::ZERO, Err(NewsError::Unauthorized))
        } else {
            forty_five_results(call)
        }
    });
    let controller = controller_with(repository.clone());

    controller.load_articles().await;
    let state = controller.state();
    assert_eq!(state.view_state(), &ViewState::Error(NewsError::Unauthorized));
    assert!(state.articles().is_empty());
    assert!(!state.has_more_pages());

    // Nothing is loaded, so there is nothing to append to.
    controller.load_more_articles().await;
    assert_eq!(repository.calls().len(), 1);

    fail.store(false, Ordering::SeqCst);
    controller.refresh().await;
    assert!(matches!(controller.state().view_state(), ViewState::Loaded(a) if a.len() == 20));
}

#[tokio::test(start_paused = true)]
async fn failed_page_append_keeps_what_is_shown() {
    let fail_next_page = Arc::new(AtomicBool::new(true));
    let flag = fail_next_page.clone();
    let repository = ScriptedRepository::new(move |call| {
        if call.page == 2 && flag.swap(false, Ordering::SeqCst) {
            (Duration::ZERO, Err(NewsError::Network("Request timed out".into())))
        } else {
            forty_five_results(call)
        }
    });
    let controller = controller_with(repository.clone());

    controller.load_articles().await;
    controller.load_more_articles().await;
    let state = controller.state();
    assert!(matches!(state.view_state(), ViewState::Loaded(a) if a.len() == 20));
    assert_eq!(state.current_page(), 1);
    assert!(!state.is_loading_more());
    assert!(state.has_more_pages());

    controller.load_more_articles().await;
    let state = controller.state();
    assert_eq!(state.articles().len(), 40);
    assert_eq!(state.current_page(), 2);
    let pages: Vec<u32> = repository.calls().iter().map(|c| c.page).collect();
    assert_eq!(pages, vec![1, 2, 2]);
}

#[tokio::test(start_paused = true)]
async fn newest_category_wins_over_a_slower_earlier_load() {
    let repository = ScriptedRepository::new(|call| match call.category {
        Some(Category::Business) => (
            Duration::from_secs(1),
            Ok(page_of("business", call.page, 20, 100)),
        ),
        _ => (Duration::ZERO, Ok(page_of("sports", call.page, 20, 100))),
    });
    let controller = controller_with(repository.clone());

    let background = controller.clone();
    let slow = tokio::spawn(async move {
        background.select_category(Some(Category::Business)).await;
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(controller.state().view_state().is_loading());

    controller.select_category(Some(Category::Sports)).await;
    slow.await.unwrap();

    let state = controller.state();
    assert_eq!(state.selected_category(), Some(Category::Sports));
    assert_eq!(state.articles().len(), 20);
    assert!(state.articles().iter().all(|a| a.url.contains("/sports/")));
    assert_eq!(repository.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn settled_search_wins_over_a_slower_category_load() {
    let repository = ScriptedRepository::new(|call| match call.query {
        None => (
            Duration::from_secs(1),
            Ok(page_of("business", call.page, 20, 100)),
        ),
        Some(_) => (Duration::ZERO, Ok(page_of("search", call.page, 20, 100))),
    });
    let controller = controller_with(repository.clone());

    let background = controller.clone();
    let slow = tokio::spawn(async move {
        background.select_category(Some(Category::Business)).await;
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(controller.state().view_state().is_loading());

    controller.set_search_query("rust");
    tokio::time::sleep(Duration::from_millis(600)).await;
    let state = controller.state();
    assert!(matches!(state.view_state(), ViewState::Loaded(a) if a.len() == 20));
    assert!(state.articles().iter().all(|a| a.url.contains("/search/")));

    // The business response lands afterwards and is dropped.
    slow.await.unwrap();
    let state = controller.state();
    assert_eq!(state.search_query(), "rust");
    assert_eq!(state.selected_category(), Some(Category::Business));
    assert!(state.articles().iter().all(|a| a.url.contains("/search/")));
    assert_eq!(
        repository.calls(),
        vec![
            Call {
                category: Some(Category::Business),
                query: None,
                page: 1
            },
            Call {
                category: Some(Category::Business),
                query: Some("rust".into()),
                page: 1
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn paging_continues_past_a_fully_redacted_page() {
    let repository = ScriptedRepository::new(|call| {
        let count = if call.page == 2 { 0 } else { 20 };
        (Duration::ZERO, Ok(page_of("feed", call.page, count, 100)))
    });
    let controller = controller_with(repository.clone());

    controller.load_articles().await;
    controller.load_through_page(3).await;

    let state = controller.state();
    assert_eq!(state.current_page(), 3);
    assert_eq!(state.articles().len(), 40);
    assert!(state.has_more_pages());
    let pages: Vec<u32> = repository.calls().iter().map(|c| c.page).collect();
    assert_eq!(pages, vec![1, 2, 3]);

    // Already there: nothing more is requested.
    controller.load_through_page(2).await;
    assert_eq!(repository.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn page_append_for_a_replaced_feed_is_discarded() {
    let repository = ScriptedRepository::new(|call| {
        let delay = if call.page == 2 {
            Duration::from_secs(1)
        } else {
            Duration::ZERO
        };
        (delay, Ok(page_of("feed", call.page, 20, 100)))
    });
    let controller = controller_with(repository.clone());
    controller.load_articles().await;

    let background = controller.clone();
    let more = tokio::spawn(async move { background.load_more_articles().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(controller.state().is_loading_more());

    controller.refresh().await;
    more.await.unwrap();

    let state = controller.state();
    assert_eq!(state.articles().len(), 20);
    assert_eq!(state.current_page(), 1);
    assert!(!state.is_loading_more());
}

#[tokio::test(start_paused = true)]
async fn favorite_changes_bump_revision_without_touching_view_state() {
    let repository = ScriptedRepository::new(forty_five_results);
    let favorites = FavoritesStore::in_memory();
    let controller = FeedController::new(repository, favorites.clone(), FeedOptions::default());
    controller.load_articles().await;

    let before = controller.state();
    let target = before.articles()[3].clone();
    let mut rx = controller.subscribe();

    controller.toggle_favorite(&target).await.unwrap();
    assert!(controller.is_favorite(&target));
    tokio::time::timeout(
        Duration::from_secs(1),
        rx.wait_for(|state| state.favorites_revision() == 1),
    )
    .await
    .expect("revision bump")
    .unwrap();

    // A change made directly on the store is seen too.
    favorites.remove_favorite(&target).await.unwrap();
    tokio::time::timeout(
        Duration::from_secs(1),
        rx.wait_for(|state| state.favorites_revision() == 2),
    )
    .await
    .expect("second revision bump")
    .unwrap();

    let after = controller.state();
    assert!(!controller.is_favorite(&target));
    assert_eq!(after.view_state(), before.view_state());
    assert_eq!(after.articles().len(), before.articles().len());
}
