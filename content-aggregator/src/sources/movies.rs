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

pub const TMDB_API_BASE: &str = "https://api.themoviedb.org/3/";
pub const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
pub const DEFAULT_LISTING: &str = "popular";

/// Movie and show listings in the TMDB response shape.
pub struct MovieSource {
    upstream: Upstream,
    fetcher: Arc<Fetcher>,
    listing: String,
}

impl MovieSource {
    pub fn new(upstream: Upstream, fetcher: Arc<Fetcher>) -> Self {
        Self { upstream, fetcher, listing: DEFAULT_LISTING.to_string() }
    }

    /// TMDB list to page through when no search is active (`popular`,
    /// `top_rated`, `now_playing`, ...).
    pub fn with_listing(mut self, listing: impl Into<String>) -> Self {
        self.listing = listing.into();
        self
    }

    fn page_url(&self, params: &PageParams) -> Result<Option<Url>> {
        let page = params.page.to_string();
        let url = match &self.upstream {
            Upstream::Synthetic => return Ok(None),
            Upstream::Direct { base, api_key } => match params.filter.as_deref() {
                Some(query) => Url::parse_with_params(
                    base.join("search/movie")?.as_str(),
                    &[("api_key", api_key.as_str()), ("query", query), ("page", page.as_str())],
                )?,
                None => Url::parse_with_params(
                    base.join(&format!("movie/{}", self.listing))?.as_str(),
                    &[("api_key", api_key.as_str()), ("page", page.as_str())],
                )?,
            },
            Upstream::Proxy { base, .. } => {
                let mut url = base.join("movies")?;
                url.query_pairs_mut().append_pair("type", &self.listing).append_pair("page", &page);
                if let Some(query) = params.filter.as_deref() {
                    url.query_pairs_mut().append_pair("query", query);
                }
                url
            }
        };
        Ok(Some(url))
    }
}

#[async_trait]
impl SourceAdapter for MovieSource {
    fn kind(&self) -> ContentKind {
        ContentKind::Movie
    }

    fn source_name(&self) -> String {
        match &self.upstream {
            Upstream::Synthetic => "Movies (mock)".to_string(),
            _ => format!("TMDB {}", self.listing),
        }
    }

    async fn fetch_page(&self, params: &PageParams) -> Result<SourcePage> {
        ensure_valid_page(params)?;

        let Some(url) = self.page_url(params)? else {
            debug!("No movie credential configured, serving mock page {}", params.page);
            let body = synthetic::movies_body(params.page, params.filter.as_deref());
            return Ok(parse_movie_page(&body, params.page));
        };

        let body = self
            .fetcher
            .get_json(&url, self.upstream.bearer().as_deref())
            .await
            .map_err(|e| source_failure(ContentKind::Movie, e))?;

        let page = parse_movie_page(&body, params.page);
        info!("Fetched {} movie items for page {}", page.items.len(), params.page);
        Ok(page)
    }

    fn is_synthetic(&self) -> bool {
        self.upstream.is_synthetic()
    }
}

pub fn normalize_movie(movie: &Value) -> ContentItem {
    ContentItem {
        id: item_id(ContentKind::Movie, native_id(movie, "id")),
        kind: ContentKind::Movie,
        title: text(movie, "title").or_else(|| text(movie, "name")).unwrap_or_default(),
        description: text(movie, "overview").unwrap_or_default(),
        image: text(movie, "poster_path").map(|path| format!("{POSTER_BASE}{path}")),
        url: None,
        author: None,
        published_at: text(movie, "release_date").or_else(|| text(movie, "first_air_date")),
        category: Some("entertainment".to_string()),
        raw: movie.clone(),
    }
}

pub fn parse_movie_page(body: &Value, page: u32) -> SourcePage {
    let items: Vec<ContentItem> = entries(body, "results").iter().map(normalize_movie).collect();
    let provider_has_more = match body.get("total_pages").and_then(Value::as_u64) {
        Some(total_pages) => u64::from(page) < total_pages,
        None => false,
    };
    SourcePage::new(items, provider_has_more)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn poster_path_is_joined_to_cdn_base() {
        let item = normalize_movie(&json!({"id": 603, "title": "The Matrix", "poster_path": "/m.jpg"}));
        assert_eq!(item.id, "movie-603");
        assert_eq!(item.image.as_deref(), Some("https://image.tmdb.org/t/p/w500/m.jpg"));
    }

    #[test]
    fn missing_poster_leaves_image_empty() {
        let item = normalize_movie(&json!({"id": 1, "title": "x", "poster_path": null}));
        assert!(item.image.is_none());
    }

    #[test]
    fn title_falls_back_to_show_name_then_empty() {
        let show = normalize_movie(&json!({"id": 7, "name": "Severance", "first_air_date": "2022-02-18"}));
        assert_eq!(show.title, "Severance");
        assert_eq!(show.published_at.as_deref(), Some("2022-02-18"));

        let bare = normalize_movie(&json!({"id": 8}));
        assert_eq!(bare.title, "");
        assert_eq!(bare.description, "");
    }

    #[test]
    fn continuation_uses_total_pages() {
        let body = json!({"page": 3, "results": [], "total_pages": 3});
        assert!(!parse_movie_page(&body, 3).provider_has_more);
        assert!(parse_movie_page(&body, 2).provider_has_more);
    }
}
