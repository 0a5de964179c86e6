pub mod movies;
pub mod news;
pub mod normalize;
pub mod social;
pub mod synthetic;

pub use movies::MovieSource;
pub use news::NewsSource;
pub use social::SocialSource;

use crate::traits::CredentialProvider;
use crate::types::{AggregatorError, PageParams, Result};
use interfaces::ContentKind;
use std::sync::Arc;
use url::Url;

/// Where an adapter gets its pages from.
#[derive(Clone)]
pub enum Upstream {
    /// The provider's own API, authenticated with an API key.
    Direct { base: Url, api_key: String },
    /// The application server's proxy route, authenticated with the session bearer.
    Proxy { base: Url, credentials: Arc<dyn CredentialProvider> },
    /// No credential configured: serve the deterministic mock dataset.
    Synthetic,
}

impl Upstream {
    pub fn direct(base: &str, api_key: Option<String>) -> Result<Self> {
        match api_key.filter(|k| !k.trim().is_empty()) {
            Some(api_key) => Ok(Upstream::Direct { base: directory_url(base)?, api_key }),
            None => Ok(Upstream::Synthetic),
        }
    }

    pub fn proxy(base: &str, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        Ok(Upstream::Proxy { base: directory_url(base)?, credentials })
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, Upstream::Synthetic)
    }

    pub(crate) fn bearer(&self) -> Option<String> {
        match self {
            Upstream::Proxy { credentials, .. } => credentials.bearer(),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Upstream::Direct { base, .. } => write!(f, "Direct({base})"),
            Upstream::Proxy { base, .. } => write!(f, "Proxy({base})"),
            Upstream::Synthetic => f.write_str("Synthetic"),
        }
    }
}

/// Parse a base URL so that `join` appends to it instead of replacing the
/// last path segment.
pub fn directory_url(base: &str) -> Result<Url> {
    let trimmed = base.trim();
    if trimmed.ends_with('/') {
        Ok(Url::parse(trimmed)?)
    } else {
        Ok(Url::parse(&format!("{trimmed}/"))?)
    }
}

pub(crate) fn ensure_valid_page(params: &PageParams) -> Result<()> {
    if params.page < 1 {
        return Err(AggregatorError::InvalidPage { page: params.page });
    }
    Ok(())
}

/// Keep authorization failures distinct; everything else is the kind being
/// unavailable for this page.
pub(crate) fn source_failure(kind: ContentKind, err: AggregatorError) -> AggregatorError {
    match err {
        AggregatorError::AuthRejected { .. } | AggregatorError::SourceUnavailable { .. } => err,
        other => AggregatorError::unavailable(kind, other),
    }
}
