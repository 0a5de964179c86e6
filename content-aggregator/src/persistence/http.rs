use crate::fetcher::Fetcher;
use crate::sources::directory_url;
use crate::traits::{CredentialProvider, PersistenceBackend};
use crate::types::{AggregatorError, ContentOrderPayload, NewFavorite, OrderState, Result, StoredFavorite};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// The application server's user routes, authenticated with the session bearer.
pub struct HttpBackend {
    base: Url,
    fetcher: Arc<Fetcher>,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpBackend {
    /// `base` is the API root, e.g. `http://localhost:5000/api`.
    pub fn new(base: &str, fetcher: Arc<Fetcher>, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        Ok(Self { base: directory_url(base)?, fetcher, credentials })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    async fn send(&self, method: Method, url: &Url, body: Option<&Value>) -> Result<Value> {
        let bearer = self.credentials.bearer();
        self.fetcher.send_json(method, url, bearer.as_deref(), body).await
    }
}

#[async_trait]
impl PersistenceBackend for HttpBackend {
    async fn list_favorites(&self) -> Result<Vec<StoredFavorite>> {
        let url = self.endpoint("user/favorites")?;
        let body = self.send(Method::GET, &url, None).await?;
        match body {
            Value::Null => Ok(Vec::new()),
            other => Ok(serde_json::from_value(other)?),
        }
    }

    async fn add_favorite(&self, favorite: &NewFavorite) -> Result<()> {
        let url = self.endpoint("user/favorites")?;
        let body = serde_json::to_value(favorite)?;
        match self.send(Method::POST, &url, Some(&body)).await {
            Ok(_) => Ok(()),
            Err(AggregatorError::Rejected { status: 400, message })
                if message.to_ascii_lowercase().contains("already in favorites") =>
            {
                Err(AggregatorError::AlreadyFavorited { content_id: favorite.content_id.clone() })
            }
            Err(e) => Err(e),
        }
    }

    async fn remove_favorite(&self, record_id: &str) -> Result<()> {
        let mut url = self.endpoint("user/favorites/")?;
        url.path_segments_mut()
            .map_err(|_| AggregatorError::Config(format!("API base {} cannot take path segments", self.base)))?
            .pop_if_empty()
            .push(record_id);

        match self.send(Method::DELETE, &url, None).await {
            Ok(_) => Ok(()),
            Err(AggregatorError::NotFound { .. }) => Err(AggregatorError::NotFound { id: record_id.to_string() }),
            Err(e) => Err(e),
        }
    }

    async fn load_order(&self) -> Result<OrderState> {
        let url = self.endpoint("user/content-order")?;
        let body = self.send(Method::GET, &url, None).await?;
        if body.is_null() {
            return Ok(OrderState::default());
        }
        let payload: ContentOrderPayload = serde_json::from_value(body)?;
        let ids = payload.content_order.unwrap_or_default();
        debug!("Loaded content order with {} ids", ids.len());
        Ok(OrderState::new(ids))
    }

    async fn save_order(&self, order: &OrderState) -> Result<()> {
        let url = self.endpoint("user/content-order")?;
        let body = json!({ "contentOrder": order });
        self.send(Method::PUT, &url, Some(&body)).await.map(|_| ()).map_err(|e| {
            warn!("Content order PUT failed: {}", e);
            match e {
                AggregatorError::AuthRejected { .. } => e,
                other => AggregatorError::OrderPersistFailure(other.to_string()),
            }
        })
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
