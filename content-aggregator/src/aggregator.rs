use crate::types::{KindPages, OrderState, SearchQuery};
use interfaces::{ContentItem, ContentKind};
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub const DEFAULT_MAX_PAGES: u32 = 5;

/// The merged, filtered and ordered output of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateOutput {
    pub items: Vec<ContentItem>,
    pub has_more: bool,
}

/// Latches feed continuation off for the rest of a session once the page
/// bound is reached or every source has run dry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationGuard {
    max_pages: u32,
    exhausted: bool,
}

impl ContinuationGuard {
    pub fn new(max_pages: u32) -> Self {
        Self { max_pages: max_pages.max(1), exhausted: false }
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// `page` is the last page loaded; `any_source_continues` is true when at
    /// least one kind still reports more.
    pub fn observe(&mut self, page: u32, any_source_continues: bool) -> bool {
        if !self.exhausted && (page >= self.max_pages || !any_source_continues) {
            debug!("Feed exhausted at page {} (sources continue: {})", page, any_source_continues);
            self.exhausted = true;
        }
        !self.exhausted
    }

    pub fn has_more(&self) -> bool {
        !self.exhausted
    }

    pub fn reset(&mut self) {
        self.exhausted = false;
    }
}

impl Default for ContinuationGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAGES)
    }
}

/// News, then movies, then social.
pub fn concatenate(pages: &KindPages) -> Vec<ContentItem> {
    let mut merged = Vec::with_capacity(pages.len());
    for kind in ContentKind::ALL {
        merged.extend(pages.slot(kind).iter().cloned());
    }
    merged
}

pub fn filter_by_query(items: Vec<ContentItem>, query: &SearchQuery) -> Vec<ContentItem> {
    if query.is_empty() {
        return items;
    }
    items.into_iter().filter(|item| query.matches(item)).collect()
}

/// Drop later repeats of an id; the first occurrence keeps its position.
pub fn dedupe_ids(items: Vec<ContentItem>) -> Vec<ContentItem> {
    let mut seen = HashSet::with_capacity(items.len());
    let before = items.len();
    let kept: Vec<ContentItem> = items.into_iter().filter(|item| seen.insert(item.id.clone())).collect();
    if kept.len() != before {
        debug!("Dropped {} duplicate items", before - kept.len());
    }
    kept
}

/// Project `items` into the sequence given by `order`. Ids in `order` with no
/// matching item are skipped; items missing from `order` follow in their
/// incoming order.
pub fn apply_order(items: Vec<ContentItem>, order: &OrderState) -> Vec<ContentItem> {
    if order.is_empty() {
        return items;
    }

    let mut slots: Vec<Option<ContentItem>> = items.into_iter().map(Some).collect();
    let positions: Vec<usize> = {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(slots.len());
        for (i, slot) in slots.iter().enumerate() {
            if let Some(item) = slot {
                index.entry(item.id.as_str()).or_insert(i);
            }
        }
        order.ids().iter().filter_map(|id| index.get(id.as_str()).copied()).collect()
    };

    let mut ordered = Vec::with_capacity(slots.len());
    for i in positions {
        if let Some(item) = slots[i].take() {
            ordered.push(item);
        }
    }
    ordered.extend(slots.into_iter().flatten());
    ordered
}

/// Concatenate, drop duplicate ids, filter, then reorder.
pub fn compose(pages: &KindPages, order: &OrderState, query: &SearchQuery) -> Vec<ContentItem> {
    let merged = dedupe_ids(concatenate(pages));
    apply_order(filter_by_query(merged, query), order)
}

/// One aggregation pass. `page` is the page just loaded and feeds the
/// continuation guard together with the per-kind provider flags.
pub fn aggregate(
    pages: &KindPages,
    order: &OrderState,
    query: &SearchQuery,
    page: u32,
    any_source_continues: bool,
    guard: &mut ContinuationGuard,
) -> AggregateOutput {
    let items = compose(pages, order, query);
    let has_more = guard.observe(page, any_source_continues);
    AggregateOutput { items, has_more }
}
