//! Deterministic stand-in datasets for providers without a configured
//! credential. Output depends only on the arguments, so repeated calls for
//! the same page return identical items and ids.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{json, Value};

use super::news::PAGE_SIZE;

const NEWS_TOTAL_RESULTS: u64 = 100;
const MOVIE_TOTAL_PAGES: u32 = 100;
const SOCIAL_LAST_PAGE: u32 = 10;

/// 2024-01-01T00:00:00Z
const BASE_EPOCH: i64 = 1_704_067_200;

/// Cheap stable mixer over (page, index, salt).
fn spread(page: u32, index: u32, salt: u64) -> u64 {
    let mut x = (u64::from(page) << 32) ^ u64::from(index) ^ salt.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    x ^= x >> 33;
    x = x.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    x ^= x >> 33;
    x = x.wrapping_mul(0xC4CE_B9FE_1A85_EC53);
    x ^ (x >> 33)
}

fn timestamp(page: u32, index: u32, salt: u64, window_secs: u64) -> DateTime<Utc> {
    let base = DateTime::from_timestamp(BASE_EPOCH, 0).unwrap_or_default();
    let back = spread(page, index, salt) % window_secs.max(1);
    base - Duration::seconds(back as i64)
}

/// Position of an item across all pages. Wide enough for any page number.
fn serial(page: u32, index: u32) -> u64 {
    u64::from(page) * u64::from(PAGE_SIZE) + u64::from(index)
}

fn prefixed(prefix: Option<&str>, rest: String) -> String {
    match prefix.filter(|p| !p.is_empty()) {
        Some(p) => format!("{p} - {rest}"),
        None => rest,
    }
}

pub fn news_body(page: u32, category: &str, query: Option<&str>) -> Value {
    let articles: Vec<Value> = (0..PAGE_SIZE)
        .map(|i| {
            json!({
                "source": {"id": null, "name": "Mock News"},
                "author": format!("Author {}", i + 1),
                "title": prefixed(query, format!("Breaking News Story {} - {}", i + 1, category)),
                "description": format!(
                    "This is a mock news article about {category}. Lorem ipsum dolor sit amet, consectetur adipiscing elit."
                ),
                "url": format!("https://example.com/news/{}/{}", page, i + 1),
                "urlToImage": format!("https://picsum.photos/400/300?random={}", serial(page, i)),
                "publishedAt": timestamp(page, i, 1, 7 * 86_400).to_rfc3339_opts(SecondsFormat::Millis, true),
                "content": "Mock content for testing purposes.",
                "mock": true
            })
        })
        .collect();

    json!({"status": "ok", "totalResults": NEWS_TOTAL_RESULTS, "articles": articles})
}

pub fn movies_body(page: u32, query: Option<&str>) -> Value {
    let results: Vec<Value> = (0..PAGE_SIZE)
        .map(|i| {
            let vote_average = (60 + spread(page, i, 3) % 41) as f64 / 10.0;
            json!({
                "id": serial(page, i),
                "title": prefixed(query, format!("Movie Title {}", i + 1)),
                "overview": "This is a mock movie description. Lorem ipsum dolor sit amet, consectetur adipiscing elit.",
                "poster_path": format!("/mock-poster-{}.jpg", i + 1),
                "backdrop_path": format!("/mock-backdrop-{}.jpg", i + 1),
                "release_date": timestamp(page, i, 2, 5 * 365 * 86_400).format("%Y-%m-%d").to_string(),
                "vote_average": vote_average,
                "vote_count": spread(page, i, 4) % 10_000,
                "genre_ids": [28, 12, 16],
                "adult": false,
                "original_language": "en",
                "mock": true
            })
        })
        .collect();

    json!({
        "page": page,
        "results": results,
        "total_pages": MOVIE_TOTAL_PAGES,
        "total_results": MOVIE_TOTAL_PAGES * PAGE_SIZE
    })
}

pub fn social_body(page: u32, hashtag: &str) -> Value {
    let posts: Vec<Value> = (0..PAGE_SIZE)
        .map(|i| {
            let image = (spread(page, i, 5) % 2 == 0)
                .then(|| format!("https://picsum.photos/400/300?random={}", serial(page, i)));
            json!({
                "id": format!("post_{page}_{i}"),
                "username": format!("mock_user{}", spread(page, i, 6) % 1000),
                "content": format!(
                    "Amazing post about #{hashtag}! This is post {} on page {page}. Lorem ipsum dolor sit amet, consectetur adipiscing elit. #trending #viral",
                    i + 1
                ),
                "hashtags": [hashtag, "trending", "viral"],
                "likes": spread(page, i, 7) % 1000,
                "comments": spread(page, i, 8) % 100,
                "shares": spread(page, i, 9) % 50,
                "timestamp": timestamp(page, i, 10, 7 * 86_400).to_rfc3339_opts(SecondsFormat::Millis, true),
                "image": image,
                "verified": spread(page, i, 11) % 10 >= 7,
                "mock": true
            })
        })
        .collect();

    json!({"posts": posts, "hasMore": page < SOCIAL_LAST_PAGE})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::movies::parse_movie_page;
    use crate::sources::news::parse_news_page;
    use crate::sources::social::parse_social_page;

    #[test]
    fn same_page_is_reproducible() {
        assert_eq!(news_body(2, "general", None), news_body(2, "general", None));
        assert_eq!(movies_body(3, Some("dune")), movies_body(3, Some("dune")));
        assert_eq!(social_body(1, "rust"), social_body(1, "rust"));
    }

    #[test]
    fn ids_differ_between_pages() {
        let first = parse_news_page(&news_body(1, "general", None), 1);
        let second = parse_news_page(&news_body(2, "general", None), 2);
        assert_eq!(first.items.len(), 20);
        assert!(first.items.iter().all(|a| second.items.iter().all(|b| a.id != b.id)));

        let movies = parse_movie_page(&movies_body(1, None), 1);
        assert_eq!(movies.items[0].id, "movie-20");
    }

    #[test]
    fn continuation_matches_mock_totals() {
        assert!(parse_news_page(&news_body(4, "general", None), 4).provider_has_more);
        assert!(!parse_news_page(&news_body(5, "general", None), 5).provider_has_more);
        assert!(parse_movie_page(&movies_body(99, None), 99).provider_has_more);
        assert!(!parse_movie_page(&movies_body(100, None), 100).provider_has_more);
        assert!(parse_social_page(&social_body(9, "rust")).provider_has_more);
        assert!(!parse_social_page(&social_body(10, "rust")).provider_has_more);
    }

    #[test]
    fn last_representable_page_does_not_overflow() {
        let news = parse_news_page(&news_body(u32::MAX, "general", None), u32::MAX);
        assert_eq!(news.items.len(), 20);
        assert!(!news.provider_has_more);

        let movies = parse_movie_page(&movies_body(u32::MAX, None), u32::MAX);
        let expected = u64::from(u32::MAX) * 20 + 19;
        assert_eq!(movies.items[19].id, format!("movie-{}", expected));

        let social = social_body(u32::MAX, "rust");
        assert_eq!(social["posts"].as_array().map(Vec::len), Some(20));
    }

    #[test]
    fn query_prefixes_titles() {
        let page = parse_news_page(&news_body(1, "science", Some("mars")), 1);
        assert_eq!(page.items[0].title, "mars - Breaking News Story 1 - science");
        let social = parse_social_page(&social_body(1, "rust"));
        assert!(social.items[0].title.starts_with("@mock_user"));
    }
}
