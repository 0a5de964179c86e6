use super::normalize::{entries, item_id, native_id, text};
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

pub const DEFAULT_HASHTAG: &str = "technology";

/// Social posts in the `{posts, hasMore}` shape.
pub struct SocialSource {
    upstream: Upstream,
    fetcher: Arc<Fetcher>,
}

impl SocialSource {
    pub fn new(upstream: Upstream, fetcher: Arc<Fetcher>) -> Self {
        Self { upstream, fetcher }
    }

    fn page_url(&self, params: &PageParams) -> Result<Option<Url>> {
        let hashtag = params.filter.as_deref().unwrap_or(DEFAULT_HASHTAG);
        let page = params.page.to_string();
        let mut url = match &self.upstream {
            Upstream::Synthetic => return Ok(None),
            Upstream::Direct { base, .. } => base.clone(),
            Upstream::Proxy { base, .. } => base.join("social")?,
        };
        url.query_pairs_mut().append_pair("hashtag", hashtag).append_pair("page", &page);
        Ok(Some(url))
    }

    fn bearer(&self) -> Option<String> {
        match &self.upstream {
            Upstream::Direct { api_key, .. } => Some(api_key.clone()).filter(|k| !k.is_empty()),
            other => other.bearer(),
        }
    }
}

#[async_trait]
impl SourceAdapter for SocialSource {
    fn kind(&self) -> ContentKind {
        ContentKind::Social
    }

    fn source_name(&self) -> String {
        match &self.upstream {
            Upstream::Synthetic => "Social (mock)".to_string(),
            _ => "Social".to_string(),
        }
    }

    async fn fetch_page(&self, params: &PageParams) -> Result<SourcePage> {
        ensure_valid_page(params)?;

        let Some(url) = self.page_url(params)? else {
            debug!("No social endpoint configured, serving mock page {}", params.page);
            let hashtag = params.filter.as_deref().unwrap_or(DEFAULT_HASHTAG);
            let body = synthetic::social_body(params.page, hashtag);
            return Ok(parse_social_page(&body));
        };

        let body = self
            .fetcher
            .get_json(&url, self.bearer().as_deref())
            .await
            .map_err(|e| source_failure(ContentKind::Social, e))?;

        let page = parse_social_page(&body);
        info!("Fetched {} social items for page {}", page.items.len(), params.page);
        Ok(page)
    }

    fn is_synthetic(&self) -> bool {
        self.upstream.is_synthetic()
    }
}

pub fn normalize_post(post: &Value) -> ContentItem {
    let username = text(post, "username");
    ContentItem {
        id: item_id(ContentKind::Social, native_id(post, "id")),
        kind: ContentKind::Social,
        title: format!("@{}", username.as_deref().unwrap_or_default()),
        description: text(post, "content").unwrap_or_default(),
        image: text(post, "image"),
        url: None,
        author: username,
        published_at: text(post, "timestamp"),
        category: Some("social".to_string()),
        raw: post.clone(),
    }
}

pub fn parse_social_page(body: &Value) -> SourcePage {
    let items = entries(body, "posts").iter().map(normalize_post).collect();
    let provider_has_more = body.get("hasMore").and_then(Value::as_bool).unwrap_or(false);
    SourcePage::new(items, provider_has_more)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn post_title_is_the_handle() {
        let item = normalize_post(&json!({
            "id": "post_1_0",
            "username": "ferris",
            "content": "hello #rust",
            "image": null,
            "timestamp": "2024-01-01T00:00:00Z"
        }));
        assert_eq!(item.id, "social-post_1_0");
        assert_eq!(item.title, "@ferris");
        assert_eq!(item.description, "hello #rust");
        assert_eq!(item.author.as_deref(), Some("ferris"));
        assert!(item.image.is_none());
    }

    #[test]
    fn post_without_body_has_empty_description() {
        let item = normalize_post(&json!({"id": 3, "username": "a"}));
        assert_eq!(item.description, "");
    }

    #[test]
    fn continuation_comes_from_has_more() {
        assert!(parse_social_page(&json!({"posts": [], "hasMore": true})).provider_has_more);
        assert!(!parse_social_page(&json!({"posts": []})).provider_has_more);
    }
}
