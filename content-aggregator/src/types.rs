use interfaces::{ContentItem, ContentKind};
use serde::{Deserialize, Serialize};

pub use interfaces::{
    ContentDetails, ContentOrderPayload, FavoriteRecord, NewFavorite, OrderState, PageCursor, PageParams,
    SearchQuery, StoredFavorite,
};

/// One normalized page from a single source adapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourcePage {
    pub items: Vec<ContentItem>,
    pub provider_has_more: bool,
}

impl SourcePage {
    pub fn new(items: Vec<ContentItem>, provider_has_more: bool) -> Self {
        Self { items, provider_has_more }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// The three per-kind inputs of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KindPages {
    pub news: Vec<ContentItem>,
    pub movie: Vec<ContentItem>,
    pub social: Vec<ContentItem>,
}

impl KindPages {
    pub fn slot(&self, kind: ContentKind) -> &Vec<ContentItem> {
        match kind {
            ContentKind::News => &self.news,
            ContentKind::Movie => &self.movie,
            ContentKind::Social => &self.social,
        }
    }

    pub fn slot_mut(&mut self, kind: ContentKind) -> &mut Vec<ContentItem> {
        match kind {
            ContentKind::News => &mut self.news,
            ContentKind::Movie => &mut self.movie,
            ContentKind::Social => &mut self.social,
        }
    }

    pub fn len(&self) -> usize {
        self.news.len() + self.movie.len() + self.social.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.news.clear();
        self.movie.clear();
        self.social.clear();
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_payload_size_mb: usize,
    pub follow_redirects: bool,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Content-Aggregator/1.0".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_seconds: 1,
            max_payload_size_mb: 10,
            follow_redirects: true,
            max_redirects: 5,
        }
    }
}

/// Result of a bulk favorites clear. Failures are counted, never swallowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearOutcome {
    pub removed: usize,
    pub failed: usize,
}

impl ClearOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{kind} source unavailable: {reason}")]
    SourceUnavailable { kind: ContentKind, reason: String },

    #[error("Authorization rejected by {service}")]
    AuthRejected { service: String },

    #[error("Content {content_id} is already in favorites")]
    AlreadyFavorited { content_id: String },

    #[error("Not found: {id}")]
    NotFound { id: String },

    #[error("Failed to persist content order: {0}")]
    OrderPersistFailure(String),

    #[error("Invalid page {page}: pages start at 1")]
    InvalidPage { page: u32 },

    #[error("Cannot move item from {from} to {to} in a list of {len}")]
    InvalidMove { from: usize, to: usize, len: usize },

    #[error("Request rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Payload exceeds limit of {limit_bytes} bytes")]
    PayloadTooLarge { limit_bytes: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("General error: {0}")]
    General(String),
}

impl AggregatorError {
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, AggregatorError::AuthRejected { .. })
    }

    pub fn unavailable(kind: ContentKind, reason: impl ToString) -> Self {
        AggregatorError::SourceUnavailable { kind, reason: reason.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
