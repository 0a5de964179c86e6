#![allow(dead_code)]

use async_trait::async_trait;
use content_aggregator::{AggregatorError, ContentItem, ContentKind, PageParams, Result, SourceAdapter, SourcePage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn item(id: &str, title: &str) -> ContentItem {
    let kind = ContentKind::from_item_id(id).unwrap_or(ContentKind::News);
    ContentItem::new(id, kind).with_title(title)
}

pub fn ids(items: &[ContentItem]) -> Vec<String> {
    items.iter().map(|i| i.id.clone()).collect()
}

#[derive(Clone)]
pub enum Behavior {
    Pages(Vec<SourcePage>),
    Fail,
    AuthFail,
    Delay(Duration, Vec<SourcePage>),
}

/// Scripted adapter: page `n` returns the `n-1`th scripted page, or an
/// empty final page past the end.
pub struct ScriptedSource {
    kind: ContentKind,
    behavior: Behavior,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<PageParams>>,
}

impl ScriptedSource {
    pub fn new(kind: ContentKind, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self { kind, behavior, calls: AtomicUsize::new(0), seen: Mutex::new(Vec::new()) })
    }

    pub fn single(kind: ContentKind, items: Vec<ContentItem>) -> Arc<Self> {
        Self::new(kind, Behavior::Pages(vec![SourcePage::new(items, true)]))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn page(pages: &[SourcePage], page: u32) -> SourcePage {
        pages.get(page as usize - 1).cloned().unwrap_or_else(SourcePage::empty)
    }
}

#[async_trait]
impl SourceAdapter for ScriptedSource {
    fn kind(&self) -> ContentKind {
        self.kind
    }

    fn source_name(&self) -> String {
        format!("scripted {}", self.kind)
    }

    async fn fetch_page(&self, params: &PageParams) -> Result<SourcePage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(params.clone());
        match &self.behavior {
            Behavior::Pages(pages) => Ok(Self::page(pages, params.page)),
            Behavior::Fail => Err(AggregatorError::unavailable(self.kind, "connection refused")),
            Behavior::AuthFail => Err(AggregatorError::AuthRejected { service: "provider".to_string() }),
            Behavior::Delay(delay, pages) => {
                tokio::time::sleep(*delay).await;
                Ok(Self::page(pages, params.page))
            }
        }
    }
}

pub fn adapters(sources: &[Arc<ScriptedSource>]) -> Vec<Arc<dyn SourceAdapter>> {
    sources.iter().map(|s| s.clone() as Arc<dyn SourceAdapter>).collect()
}
