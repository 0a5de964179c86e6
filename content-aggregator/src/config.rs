use crate::auth::StaticToken;
use crate::debounce::DEFAULT_QUIET_PERIOD;
use crate::fetcher::Fetcher;
use crate::persistence::{HttpBackend, MemoryBackend, PgBackend};
use crate::session::SessionSettings;
use crate::sources::movies::{DEFAULT_LISTING, TMDB_API_BASE};
use crate::sources::news::{DEFAULT_CATEGORY, NEWS_API_BASE};
use crate::sources::social::DEFAULT_HASHTAG;
use crate::sources::{directory_url, MovieSource, NewsSource, SocialSource, Upstream};
use crate::traits::{CredentialProvider, PersistenceBackend, SourceAdapter};
use crate::types::{FetchConfig, Result};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Runtime configuration. Every field can come from the environment; flags
/// on the command line win.
#[derive(Args, Clone, Default)]
pub struct AppConfig {
    /// NewsAPI key; without one the news source serves mock data
    #[arg(long, env = "NEWS_API_KEY", hide_env_values = true)]
    pub news_api_key: Option<String>,

    /// TMDB key; without one the movie source serves mock data
    #[arg(long, env = "TMDB_API_KEY", hide_env_values = true)]
    pub tmdb_api_key: Option<String>,

    /// Social posts endpoint returning `{posts, hasMore}`
    #[arg(long, env = "SOCIAL_API_URL")]
    pub social_api_url: Option<String>,

    #[arg(long, env = "SOCIAL_API_TOKEN", hide_env_values = true)]
    pub social_api_token: Option<String>,

    /// Application server API root. When set, providers are reached through
    /// its proxy routes and favorites/order are stored there.
    #[arg(long, env = "API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Bearer token for the application server
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Store favorites and order directly in PostgreSQL
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "FEED_USER_ID", default_value = "local")]
    pub user_id: String,

    /// Upper bound on feed pages per session
    #[arg(long, env = "FEED_MAX_PAGES", default_value_t = 5)]
    pub max_pages: u32,

    #[arg(long, env = "SEARCH_DEBOUNCE_MS", default_value_t = 300)]
    pub search_debounce_ms: u64,

    /// Per-source page timeout
    #[arg(long, env = "SOURCE_TIMEOUT_MS", default_value_t = 10_000)]
    pub source_timeout_ms: u64,

    #[arg(long, env = "NEWS_CATEGORY", default_value = DEFAULT_CATEGORY)]
    pub news_category: String,

    #[arg(long, env = "SOCIAL_HASHTAG", default_value = DEFAULT_HASHTAG)]
    pub social_hashtag: String,

    /// TMDB list used when no search is active
    #[arg(long, env = "MOVIE_LISTING", default_value = DEFAULT_LISTING)]
    pub movie_listing: String,
}

impl AppConfig {
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            max_pages: self.max_pages,
            source_timeout: Duration::from_millis(self.source_timeout_ms),
            news_category: Some(self.news_category.clone()),
            social_hashtag: Some(self.social_hashtag.clone()),
        }
    }

    pub fn debounce(&self) -> Duration {
        if self.search_debounce_ms == 0 {
            DEFAULT_QUIET_PERIOD
        } else {
            Duration::from_millis(self.search_debounce_ms)
        }
    }

    pub fn credentials(&self) -> Arc<dyn CredentialProvider> {
        match self.api_token.as_deref() {
            Some(token) => Arc::new(StaticToken::new(token)),
            None => Arc::new(StaticToken::anonymous()),
        }
    }

    pub fn fetcher(&self) -> Result<Arc<Fetcher>> {
        Ok(Arc::new(Fetcher::new(FetchConfig::default())?))
    }

    /// News, movie and social adapters, in that order.
    pub fn adapters(&self, fetcher: Arc<Fetcher>) -> Result<Vec<Arc<dyn SourceAdapter>>> {
        let (news, movies, social) = match self.api_base_url.as_deref() {
            Some(base) => {
                let upstream = Upstream::proxy(base, self.credentials())?;
                (upstream.clone(), upstream.clone(), upstream)
            }
            None => {
                let social = match self.social_api_url.as_deref() {
                    Some(url) => Upstream::Direct {
                        base: directory_url(url)?,
                        api_key: self.social_api_token.clone().unwrap_or_default(),
                    },
                    None => Upstream::Synthetic,
                };
                (
                    Upstream::direct(NEWS_API_BASE, self.news_api_key.clone())?,
                    Upstream::direct(TMDB_API_BASE, self.tmdb_api_key.clone())?,
                    social,
                )
            }
        };

        info!("Sources: news={:?} movies={:?} social={:?}", news, movies, social);
        Ok(vec![
            Arc::new(NewsSource::new(news, fetcher.clone())),
            Arc::new(MovieSource::new(movies, fetcher.clone()).with_listing(self.movie_listing.clone())),
            Arc::new(SocialSource::new(social, fetcher)),
        ])
    }

    /// PostgreSQL when a database URL is set, else the application server
    /// when an API root is set, else in-process memory.
    pub async fn backend(&self, fetcher: Arc<Fetcher>) -> Result<Arc<dyn PersistenceBackend>> {
        if let Some(url) = self.database_url.as_deref() {
            info!("Storing favorites in PostgreSQL as user {}", self.user_id);
            return Ok(Arc::new(PgBackend::new(url, self.user_id.clone()).await?));
        }
        if let Some(base) = self.api_base_url.as_deref() {
            info!("Storing favorites through {}", base);
            return Ok(Arc::new(HttpBackend::new(base, fetcher, self.credentials())?));
        }
        info!("No storage configured, favorites and order last for this run only");
        Ok(Arc::new(MemoryBackend::new()))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set = |v: &Option<String>| if v.is_some() { "***" } else { "<unset>" };
        f.debug_struct("AppConfig")
            .field("news_api_key", &set(&self.news_api_key))
            .field("tmdb_api_key", &set(&self.tmdb_api_key))
            .field("social_api_url", &self.social_api_url)
            .field("social_api_token", &set(&self.social_api_token))
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &set(&self.api_token))
            .field("database_url", &set(&self.database_url))
            .field("user_id", &self.user_id)
            .field("max_pages", &self.max_pages)
            .field("search_debounce_ms", &self.search_debounce_ms)
            .field("source_timeout_ms", &self.source_timeout_ms)
            .field("news_category", &self.news_category)
            .field("social_hashtag", &self.social_hashtag)
            .field("movie_listing", &self.movie_listing)
            .finish()
    }
}
