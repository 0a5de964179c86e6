use crate::types::{NewFavorite, OrderState, PageParams, Result, SourcePage, StoredFavorite};
use async_trait::async_trait;
use interfaces::ContentKind;

/// Trait for fetching one normalized page from a content provider.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which slot of the merged feed this adapter fills
    fn kind(&self) -> ContentKind;

    /// Human-readable name for this source
    fn source_name(&self) -> String;

    /// Fetch and normalize one page. Page numbers start at 1.
    async fn fetch_page(&self, params: &PageParams) -> Result<SourcePage>;

    /// Whether the adapter is serving the synthetic dataset
    fn is_synthetic(&self) -> bool {
        false
    }
}

/// Storage for the per-user favorites collection and content order.
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// All favorites for the user, most recently added first.
    async fn list_favorites(&self) -> Result<Vec<StoredFavorite>>;

    /// Fails with `AlreadyFavorited` when the content id is already stored.
    async fn add_favorite(&self, favorite: &NewFavorite) -> Result<()>;

    /// Fails with `NotFound` when no record with this id exists for the user.
    async fn remove_favorite(&self, record_id: &str) -> Result<()>;

    async fn load_order(&self) -> Result<OrderState>;

    /// Replace the stored order. Last write wins.
    async fn save_order(&self, order: &OrderState) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

/// Supplies the bearer credential attached to requests. Acquisition and
/// renewal happen elsewhere.
pub trait CredentialProvider: Send + Sync {
    fn bearer(&self) -> Option<String>;
}
