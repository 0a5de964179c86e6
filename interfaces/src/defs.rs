use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Discriminator for the three content sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    News,
    Movie,
    Social,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [ContentKind::News, ContentKind::Movie, ContentKind::Social];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::News => "news",
            ContentKind::Movie => "movie",
            ContentKind::Social => "social",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "news" => Some(ContentKind::News),
            "movie" | "movies" => Some(ContentKind::Movie),
            "social" => Some(ContentKind::Social),
            _ => None,
        }
    }

    /// Recover the kind from a namespaced item id such as `movie-42`.
    pub fn from_item_id(id: &str) -> Option<Self> {
        let (prefix, _) = id.split_once('-')?;
        Self::parse(prefix)
    }

    /// Namespaced id for a source-native identifier.
    pub fn item_id(&self, native_id: &str) -> String {
        format!("{}-{}", self.as_str(), native_id)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical normalized item. Serializes in the snapshot shape stored with
/// favorites: `{id, type, title, description, image, url, author,
/// publishedAt, category, data}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "data", default)]
    pub raw: Value,
}

impl ContentItem {
    pub fn new(id: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            id: id.into(),
            kind,
            title: String::new(),
            description: String::new(),
            image: None,
            url: None,
            author: None,
            published_at: None,
            category: None,
            raw: Value::Null,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Kind-specific view over the raw provider payload.
    pub fn details(&self) -> ContentDetails {
        match self.kind {
            ContentKind::News => ContentDetails::News(NewsDetails {
                source_name: self.raw.get("source").and_then(|s| text(s, "name")),
                content: text(&self.raw, "content"),
            }),
            ContentKind::Movie => ContentDetails::Movie(MovieDetails {
                vote_average: self.raw.get("vote_average").and_then(Value::as_f64),
                vote_count: self.raw.get("vote_count").and_then(Value::as_u64),
                release_date: text(&self.raw, "release_date").or_else(|| text(&self.raw, "first_air_date")),
                original_language: text(&self.raw, "original_language"),
            }),
            ContentKind::Social => ContentDetails::Social(SocialDetails {
                likes: count(&self.raw, "likes"),
                comments: count(&self.raw, "comments"),
                shares: count(&self.raw, "shares"),
                hashtags: self
                    .raw
                    .get("hashtags")
                    .and_then(Value::as_array)
                    .map(|tags| tags.iter().filter_map(|t| t.as_str().map(str::to_owned)).collect())
                    .unwrap_or_default(),
                verified: self.raw.get("verified").and_then(Value::as_bool).unwrap_or(false),
            }),
        }
    }
}

fn text(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn count(value: &Value, key: &str) -> u64 {
    value.get(key).and_then(Value::as_u64).unwrap_or(0)
}

#[derive(Clone, Debug, PartialEq)]
pub enum ContentDetails {
    News(NewsDetails),
    Movie(MovieDetails),
    Social(SocialDetails),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewsDetails {
    pub source_name: Option<String>,
    pub content: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovieDetails {
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    pub release_date: Option<String>,
    pub original_language: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SocialDetails {
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub hashtags: Vec<String>,
    pub verified: bool,
}

/// A pinned item. The snapshot is taken when the item is favorited and is
/// never refreshed from the source.
#[derive(Clone, Debug, PartialEq)]
pub struct FavoriteRecord {
    pub id: String,
    pub content_id: String,
    pub content_type: ContentKind,
    pub content_snapshot: ContentItem,
    pub created_at: Option<String>,
}

impl FavoriteRecord {
    /// Map the persisted read shape back into a renderable record. Returns
    /// `None` when neither the stored type nor the id prefix names a kind.
    pub fn from_stored(stored: StoredFavorite) -> Option<Self> {
        let kind = ContentKind::parse(&stored.content_type)
            .or_else(|| ContentKind::from_item_id(&stored.content_id))?;
        // Servers without a JSON column hand the snapshot back as text.
        let parsed = match &stored.content_data {
            Value::String(text) => serde_json::from_str(text).ok(),
            _ => None,
        };
        let data = parsed.as_ref().unwrap_or(&stored.content_data);
        let field = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_owned);

        let snapshot = ContentItem {
            id: stored.content_id.clone(),
            kind,
            title: field("title").unwrap_or_default(),
            description: field("description").unwrap_or_default(),
            image: field("image"),
            url: field("url"),
            author: field("author"),
            published_at: field("publishedAt"),
            category: field("category"),
            raw: match data.get("data") {
                Some(inner) if !inner.is_null() => inner.clone(),
                _ => data.clone(),
            },
        };

        Some(Self {
            id: stored.id,
            content_id: stored.content_id,
            content_type: kind,
            content_snapshot: snapshot,
            created_at: stored.created_at,
        })
    }
}

/// Favorite write shape: `{contentId, contentType, contentData}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFavorite {
    pub content_id: String,
    pub content_type: String,
    pub content_data: Value,
}

impl NewFavorite {
    pub fn from_item(item: &ContentItem) -> Self {
        Self {
            content_id: item.id.clone(),
            content_type: item.kind.as_str().to_owned(),
            content_data: serde_json::to_value(item).unwrap_or(Value::Null),
        }
    }
}

/// Favorite read shape: `{id, content_id, content_type, content_data, created_at}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredFavorite {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub content_id: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub content_data: Value,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected string or number id, got {other}"))),
    }
}

/// The user's manual arrangement of item ids. Replaced wholesale, never patched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderState(Vec<String>);

impl OrderState {
    pub fn new(ids: Vec<String>) -> Self {
        Self(ids)
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_ids(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for OrderState {
    fn from(ids: Vec<String>) -> Self {
        Self(ids)
    }
}

/// Order wire shape: `{contentOrder: [...]}`. Absent means empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentOrderPayload {
    #[serde(default)]
    pub content_order: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive substring match on title and description. An empty
    /// query matches everything.
    pub fn matches(&self, item: &ContentItem) -> bool {
        if self.0.is_empty() {
            return true;
        }
        let needle = self.0.to_lowercase();
        item.title.to_lowercase().contains(&needle) || item.description.to_lowercase().contains(&needle)
    }
}

impl From<&str> for SearchQuery {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

/// Per-kind pagination position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageCursor {
    pub page: u32,
    pub has_more: bool,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self { page: 1, has_more: true }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageParams {
    pub page: u32,
    /// Category for news, search text for movies, hashtag for social.
    pub filter: Option<String>,
    /// Active search text, for providers that can narrow server-side.
    pub search: Option<String>,
}

impl PageParams {
    pub fn new(page: u32) -> Self {
        Self { page, filter: None, search: None }
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter.filter(|f| !f.is_empty());
        self
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.filter(|s| !s.is_empty());
        self
    }
}
