pub mod aggregator;
pub mod auth;
pub mod config;
pub mod debounce;
pub mod favorites;
pub mod fetcher;
pub mod order;
pub mod persistence;
pub mod session;
pub mod sources;
pub mod traits;
pub mod types;

pub use types::*;
pub use aggregator::{aggregate, AggregateOutput, ContinuationGuard};
pub use auth::StaticToken;
pub use config::AppConfig;
pub use debounce::SearchDebouncer;
pub use favorites::FavoritesStore;
pub use fetcher::Fetcher;
pub use order::{OrderReconciler, OrderStatus};
pub use persistence::{HttpBackend, MemoryBackend, PgBackend};
pub use session::{FeedSession, Generation, PageOutcome, PageReport, SessionSettings};
pub use sources::{MovieSource, NewsSource, SocialSource, Upstream};
pub use traits::{CredentialProvider, PersistenceBackend, SourceAdapter};
pub use interfaces::{ContentItem, ContentKind};
