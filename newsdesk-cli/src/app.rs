use anyhow::{bail, Context};
use newsdesk_core::{
    Article, ArticleDetail, Category, FavoriteSort, FavoriteUpdate, FavoritesStore,
    FeedController, ViewState,
};
use tracing::warn;

pub struct App {
    feed: FeedController,
}

impl App {
    pub fn new(feed: FeedController) -> Self {
        Self { feed }
    }

    pub async fn headlines(
        &self,
        category: Option<Category>,
        query: String,
        pages: u32,
        star: &[usize],
    ) -> anyhow::Result<()> {
        self.feed.apply_filters(category, query).await;
        self.feed.load_through_page(pages).await;

        let state = self.feed.state();
        let articles = match state.view_state() {
            ViewState::Loaded(articles) => articles.clone(),
            ViewState::Error(err) => bail!("{err}. {}", err.recovery_suggestion()),
            ViewState::Idle | ViewState::Loading => Vec::new(),
        };

        for &index in star {
            let article = articles
                .get(index.wrapping_sub(1))
                .with_context(|| format!("no article number {index}"))?;
            self.toggle(article).await;
        }

        print_articles(&self.feed, &articles);
        println!(
            "-- {} of {} results{}",
            articles.len(),
            state.total_results(),
            if state.has_more_pages() { ", more available" } else { "" }
        );
        Ok(())
    }

    async fn toggle(&self, article: &Article) {
        match self.feed.toggle_favorite(article).await {
            Ok(FavoriteUpdate::Saved) | Ok(FavoriteUpdate::Unchanged) => {}
            Err(err) => {
                warn!(error = %err, url = %article.url, "favorite change was not saved");
                eprintln!("could not save favorites: {err}");
            }
        }
    }
}

fn print_articles(feed: &FeedController, articles: &[Article]) {
    for (i, article) in articles.iter().enumerate() {
        let marker = if feed.is_favorite(article) { '*' } else { ' ' };
        println!("{:>3}{marker} {} ({})", i + 1, article.title, article.source.name);
        println!("      {}", article.url);
    }
}

pub fn list_favorites(favorites: &FavoritesStore, order: FavoriteSort) {
    if favorites.is_empty() {
        println!("No favorites yet.");
        return;
    }
    println!("Favorites ({})", order.label());
    for favorite in favorites.sorted(order) {
        println!(
            "  {} | {} | saved {}",
            favorite.title,
            favorite.source_name,
            favorite.saved_at.format("%Y-%m-%d %H:%M")
        );
        println!("    {}", favorite.url);
    }
}

pub async fn unstar(favorites: &FavoritesStore, url: &str) -> anyhow::Result<()> {
    let Some(favorite) = favorites.get(url) else {
        bail!("{url} is not a favorite");
    };
    favorites
        .remove_favorite(&favorite.to_article())
        .await
        .context("favorite removed in memory but could not be saved")?;
    println!("Removed {}", favorite.title);
    Ok(())
}

pub fn show(favorites: &FavoritesStore, url: &str) -> anyhow::Result<()> {
    let Some(favorite) = favorites.get(url) else {
        bail!("{url} is not a favorite");
    };
    let detail = ArticleDetail::new(favorite.to_article(), favorites.clone());
    let article = detail.article();

    println!("{}", article.title);
    println!("{}", article.source.name);
    if let Some(author) = &article.author {
        println!("by {author}");
    }
    println!("{}", article.published_at);
    if let Some(description) = &article.description {
        println!("\n{description}");
    }
    if let Some(content) = &article.content {
        println!("\n{content}");
    }
    println!("\nShare: {}", detail.share_text());
    Ok(())
}
