use crate::aggregator::{aggregate, compose, ContinuationGuard, DEFAULT_MAX_PAGES};
use crate::favorites::FavoritesStore;
use crate::order::OrderReconciler;
use crate::traits::{PersistenceBackend, SourceAdapter};
use crate::types::{AggregatorError, KindPages, PageCursor, PageParams, Result, SearchQuery, SourcePage};
use futures::future::join_all;
use interfaces::{ContentItem, ContentKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Shared generation counter. Any result issued under an older generation
/// is discarded when it arrives.
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Invalidate everything in flight and return the new generation.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.current() == ticket
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub max_pages: u32,
    pub source_timeout: Duration,
    pub news_category: Option<String>,
    pub social_hashtag: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            source_timeout: Duration::from_secs(10),
            news_category: None,
            social_hashtag: None,
        }
    }
}

/// What one `load_next_page` call produced.
#[derive(Debug)]
pub struct PageReport {
    pub page: u32,
    pub items: Vec<ContentItem>,
    pub has_more: bool,
    pub loaded: HashMap<ContentKind, usize>,
    pub failures: Vec<(ContentKind, AggregatorError)>,
}

#[derive(Debug)]
pub enum PageOutcome {
    Loaded(PageReport),
    /// The query changed while the page was in flight; its results were dropped.
    Superseded { issued: u64, current: u64 },
    /// The page bound was reached or every source ran dry earlier.
    Exhausted,
}

impl PageOutcome {
    pub fn report(&self) -> Option<&PageReport> {
        match self {
            PageOutcome::Loaded(report) => Some(report),
            _ => None,
        }
    }

    /// Kinds whose provider rejected the credential on this page.
    pub fn auth_rejected(&self) -> Vec<ContentKind> {
        self.report()
            .map(|r| r.failures.iter().filter(|(_, e)| e.is_auth_rejected()).map(|(k, _)| *k).collect())
            .unwrap_or_default()
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, PageOutcome::Superseded { .. })
    }
}

/// Single owner of one user's feed: cursors, accumulated pages, the active
/// query, the manual order and the favorites.
pub struct FeedSession {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    settings: SessionSettings,
    cursors: HashMap<ContentKind, PageCursor>,
    pages: KindPages,
    page: u32,
    generation: Generation,
    query: SearchQuery,
    guard: ContinuationGuard,
    order: OrderReconciler,
    favorites: FavoritesStore,
    rendered: Vec<ContentItem>,
}

impl FeedSession {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        backend: Arc<dyn PersistenceBackend>,
        settings: SessionSettings,
    ) -> Self {
        let cursors = adapters.iter().map(|a| (a.kind(), PageCursor::default())).collect();
        Self {
            guard: ContinuationGuard::new(settings.max_pages),
            adapters,
            settings,
            cursors,
            pages: KindPages::default(),
            page: 0,
            generation: Generation::default(),
            query: SearchQuery::default(),
            order: OrderReconciler::new(backend.clone()),
            favorites: FavoritesStore::new(backend),
            rendered: Vec::new(),
        }
    }

    /// Load the stored order and favorites. Failures leave them empty.
    pub async fn start(&mut self) {
        self.order.load().await;
        if let Err(e) = self.favorites.refresh().await {
            warn!("Could not load favorites: {}", e);
        }
        info!(
            "Session started with {} sources, {} ordered ids, {} favorites",
            self.adapters.len(),
            self.order.order().len(),
            self.favorites.len()
        );
    }

    /// Handle for invalidating in-flight pages from outside the session.
    pub fn generation(&self) -> Generation {
        self.generation.clone()
    }

    pub fn ticket(&self) -> u64 {
        self.generation.current()
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    /// Switch to a new search. Returns false when the query is unchanged.
    /// Otherwise in-flight pages become stale and pagination restarts.
    pub fn set_query(&mut self, query: SearchQuery) -> bool {
        if query == self.query {
            return false;
        }
        let generation = self.generation.bump();
        debug!("Query changed to {:?} (generation {})", query.as_str(), generation);
        self.query = query;
        self.reset_pagination();
        true
    }

    fn reset_pagination(&mut self) {
        for cursor in self.cursors.values_mut() {
            *cursor = PageCursor::default();
        }
        self.pages.clear();
        self.page = 0;
        self.guard.reset();
        self.rendered.clear();
    }

    pub fn has_more(&self) -> bool {
        self.guard.has_more()
    }

    pub fn cursor(&self, kind: ContentKind) -> Option<PageCursor> {
        self.cursors.get(&kind).copied()
    }

    fn params_for(&self, kind: ContentKind, page: u32) -> PageParams {
        let search = Some(self.query.as_str().to_string());
        let filter = match kind {
            ContentKind::News => self.settings.news_category.clone(),
            ContentKind::Movie => search.clone(),
            ContentKind::Social => self.settings.social_hashtag.clone(),
        };
        PageParams::new(page).with_filter(filter).with_search(search)
    }

    /// Fetch the next page from every source that still has one, all at
    /// once, each bounded by the source timeout.
    pub async fn load_next_page(&mut self) -> PageOutcome {
        if !self.guard.has_more() {
            return PageOutcome::Exhausted;
        }

        let issued = self.generation.current();
        let page = self.page + 1;
        let timeout = self.settings.source_timeout;

        let requests: Vec<(Arc<dyn SourceAdapter>, PageParams)> = self
            .adapters
            .iter()
            .filter_map(|adapter| {
                let cursor = self.cursors.get(&adapter.kind()).copied().unwrap_or_default();
                cursor.has_more.then(|| (adapter.clone(), self.params_for(adapter.kind(), cursor.page)))
            })
            .collect();

        debug!("Loading feed page {} from {} sources (generation {})", page, requests.len(), issued);
        let results = join_all(
            requests
                .into_iter()
                .map(|(adapter, params)| async move { (adapter.kind(), fetch_with_timeout(adapter, params, timeout).await) }),
        )
        .await;

        let current = self.generation.current();
        if current != issued {
            debug!("Dropping page {} issued under generation {} (now {})", page, issued, current);
            return PageOutcome::Superseded { issued, current };
        }

        let mut loaded = HashMap::new();
        let mut failures = Vec::new();
        for (kind, result) in results {
            match result {
                Ok(source_page) => {
                    let cursor = self.cursors.entry(kind).or_default();
                    cursor.page += 1;
                    cursor.has_more = source_page.provider_has_more;
                    loaded.insert(kind, source_page.items.len());
                    self.pages.slot_mut(kind).extend(source_page.items);
                }
                Err(e) => {
                    warn!("{} unavailable for page {}: {}", kind, page, e);
                    failures.push((kind, e));
                }
            }
        }

        self.page = page;
        let any_source_continues = self.cursors.values().any(|c| c.has_more);
        let output = aggregate(&self.pages, self.order.order(), &self.query, page, any_source_continues, &mut self.guard);
        self.rendered = output.items.clone();

        info!(
            "Page {}: {} items rendered, {} sources failed, has_more={}",
            page,
            output.items.len(),
            failures.len(),
            output.has_more
        );

        PageOutcome::Loaded(PageReport { page, items: output.items, has_more: output.has_more, loaded, failures })
    }

    /// The current feed: every accumulated item, filtered and ordered.
    pub fn render(&mut self) -> &[ContentItem] {
        self.order.drain_acks();
        self.rendered = compose(&self.pages, self.order.order(), &self.query);
        &self.rendered
    }

    pub fn rendered(&self) -> &[ContentItem] {
        &self.rendered
    }

    pub fn drag_end(&mut self, from: usize, to: usize) -> Result<&[ContentItem]> {
        self.rendered = self.order.drag_end(&self.rendered, from, to)?;
        Ok(&self.rendered)
    }

    pub fn order(&self) -> &OrderReconciler {
        &self.order
    }

    pub fn order_mut(&mut self) -> &mut OrderReconciler {
        &mut self.order
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }

    pub fn favorites_mut(&mut self) -> &mut FavoritesStore {
        &mut self.favorites
    }

    /// Wait for background order writes before the session goes away.
    pub async fn shutdown(&mut self) {
        self.order.flush().await;
        for failure in self.order.take_failures() {
            warn!("Unsaved content order: {}", failure);
        }
    }
}

async fn fetch_with_timeout(
    adapter: Arc<dyn SourceAdapter>,
    params: PageParams,
    timeout: Duration,
) -> Result<SourcePage> {
    match tokio::time::timeout(timeout, adapter.fetch_page(&params)).await {
        Ok(result) => result,
        Err(_) => Err(AggregatorError::unavailable(adapter.kind(), format!("timed out after {:?}", timeout))),
    }
}
