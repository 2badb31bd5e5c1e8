mod app;

use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use newsdesk_core::{
    AppConfig, Category, FavoriteSort, FavoritesStore, FeedController, FeedOptions, HttpClient,
    JsonStore, NewsRepository,
};
use tracing_subscriber::EnvFilter;

use crate::app::App;

#[derive(Parser)]
#[command(name = "newsdesk", version, about = "Top headlines with offline favorites")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch top headlines
    Headlines {
        #[arg(short, long)]
        category: Option<Category>,
        #[arg(short, long)]
        query: Option<String>,
        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: u32,
        /// Toggle the favorite state of the listed article numbers
        #[arg(long, num_args = 1..)]
        star: Vec<usize>,
    },
    /// List saved articles
    Favorites {
        #[arg(short, long, value_enum, default_value_t = SortArg::Newest)]
        sort: SortArg,
    },
    /// Remove a saved article
    Unstar { url: String },
    /// Show a saved article
    Show { url: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Newest,
    Oldest,
    TitleAz,
    TitleZa,
}

impl From<SortArg> for FavoriteSort {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Newest => FavoriteSort::NewestSaved,
            SortArg::Oldest => FavoriteSort::OldestSaved,
            SortArg::TitleAz => FavoriteSort::TitleAscending,
            SortArg::TitleZa => FavoriteSort::TitleDescending,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = AppConfig::load();
    let favorites = FavoritesStore::load(favorites_storage(&config)).await;

    match cli.command {
        Command::Headlines {
            category,
            query,
            pages,
            star,
        } => {
            let feed = build_feed(&config, favorites)?;
            App::new(feed)
                .headlines(category, query.unwrap_or_default(), pages, &star)
                .await
        }
        Command::Favorites { sort } => {
            app::list_favorites(&favorites, sort.into());
            Ok(())
        }
        Command::Unstar { url } => app::unstar(&favorites, &url).await,
        Command::Show { url } => app::show(&favorites, &url),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn favorites_storage(config: &AppConfig) -> JsonStore {
    if let Some(dir) = &config.storage.data_dir {
        return JsonStore::new(dir);
    }
    JsonStore::default_location().unwrap_or_else(|| {
        // No platform data dir: keep favorites next to the working directory.
        JsonStore::new(".newsdesk")
    })
}

fn build_feed(config: &AppConfig, favorites: FavoritesStore) -> anyhow::Result<FeedController> {
    if config.api.api_key.is_empty() {
        anyhow::bail!(
            "no API key configured; set {} or api.api_key in {}",
            newsdesk_core::config::API_KEY_ENV,
            AppConfig::config_file_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "config.json".into())
        );
    }
    let client = HttpClient::from_config(&config.api)?;
    let repository = NewsRepository::with_country(client, config.api.country.clone());
    Ok(FeedController::new(
        Arc::new(repository),
        favorites,
        FeedOptions::from(&config.feed),
    ))
}
