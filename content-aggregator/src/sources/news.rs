use super::normalize::{entries, item_id, text};
use super::{ensure_valid_page, source_failure, synthetic, Upstream};
use crate::fetcher::Fetcher;
use crate::traits::SourceAdapter;
use crate::types::{PageParams, Result, SourcePage};
use async_trait::async_trait;
use interfaces::{ContentItem, ContentKind};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

pub const NEWS_API_BASE: &str = "https://newsapi.org/v2/";
pub const PAGE_SIZE: u32 = 20;
pub const DEFAULT_CATEGORY: &str = "general";

/// News articles in the NewsAPI response shape.
pub struct NewsSource {
    upstream: Upstream,
    fetcher: Arc<Fetcher>,
}

impl NewsSource {
    pub fn new(upstream: Upstream, fetcher: Arc<Fetcher>) -> Self {
        Self { upstream, fetcher }
    }

    fn page_url(&self, params: &PageParams) -> Result<Option<Url>> {
        let page = params.page.to_string();
        let page_size = PAGE_SIZE.to_string();
        let category = params.filter.as_deref().unwrap_or(DEFAULT_CATEGORY);

        let url = match &self.upstream {
            Upstream::Synthetic => return Ok(None),
            Upstream::Direct { base, api_key } => match params.search.as_deref() {
                Some(q) => Url::parse_with_params(
                    base.join("everything")?.as_str(),
                    &[
                        ("q", q),
                        ("page", page.as_str()),
                        ("pageSize", page_size.as_str()),
                        ("sortBy", "publishedAt"),
                        ("apiKey", api_key.as_str()),
                    ],
                )?,
                None => Url::parse_with_params(
                    base.join("top-headlines")?.as_str(),
                    &[
                        ("country", "us"),
                        ("category", category),
                        ("page", page.as_str()),
                        ("pageSize", page_size.as_str()),
                        ("apiKey", api_key.as_str()),
                    ],
                )?,
            },
            Upstream::Proxy { base, .. } => {
                let mut url = base.join("news")?;
                url.query_pairs_mut().append_pair("category", category).append_pair("page", &page);
                if let Some(q) = params.search.as_deref() {
                    url.query_pairs_mut().append_pair("q", q);
                }
                url
            }
        };
        Ok(Some(url))
    }
}

#[async_trait]
impl SourceAdapter for NewsSource {
    fn kind(&self) -> ContentKind {
        ContentKind::News
    }

    fn source_name(&self) -> String {
        match &self.upstream {
            Upstream::Synthetic => "News (mock)".to_string(),
            _ => "NewsAPI".to_string(),
        }
    }

    async fn fetch_page(&self, params: &PageParams) -> Result<SourcePage> {
        ensure_valid_page(params)?;

        let Some(url) = self.page_url(params)? else {
            debug!("No news credential configured, serving mock page {}", params.page);
            let category = params.filter.as_deref().unwrap_or(DEFAULT_CATEGORY);
            let body = synthetic::news_body(params.page, category, params.search.as_deref());
            return Ok(parse_news_page(&body, params.page));
        };

        let body = self
            .fetcher
            .get_json(&url, self.upstream.bearer().as_deref())
            .await
            .map_err(|e| source_failure(ContentKind::News, e))?;

        let page = parse_news_page(&body, params.page);
        info!("Fetched {} news items for page {}", page.items.len(), params.page);
        Ok(page)
    }

    fn is_synthetic(&self) -> bool {
        self.upstream.is_synthetic()
    }
}

pub fn normalize_article(article: &Value) -> ContentItem {
    let url = text(article, "url");
    ContentItem {
        id: item_id(ContentKind::News, url.clone()),
        kind: ContentKind::News,
        title: text(article, "title").unwrap_or_default(),
        description: text(article, "description").unwrap_or_default(),
        image: text(article, "urlToImage"),
        url,
        author: text(article, "author"),
        published_at: text(article, "publishedAt"),
        category: Some("news".to_string()),
        raw: article.clone(),
    }
}

/// Continuation comes from `totalResults`; without it a full page is taken
/// to mean there may be more.
pub fn parse_news_page(body: &Value, page: u32) -> SourcePage {
    let items: Vec<ContentItem> = entries(body, "articles").iter().map(normalize_article).collect();
    let provider_has_more = match body.get("totalResults").and_then(Value::as_u64) {
        Some(total) => u64::from(page) * u64::from(PAGE_SIZE) < total,
        None => items.len() as u32 >= PAGE_SIZE,
    };
    SourcePage::new(items, provider_has_more)
}
