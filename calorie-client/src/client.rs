//! Gateway client for the food collection API.

use std::sync::Arc;

use calorie_core::{Envelope, FoodId, FoodItem, Sourced};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::auth::TokenProvider;
use crate::config::ClientConfig;
use crate::error::{ErrorKind, GatewayError};
use crate::retry::{self, RetryObserver, RetryPolicy};

#[derive(Debug, Serialize)]
struct FoodBody<'a> {
    name: &'a str,
    calories: i32,
}

/// Authenticated, retrying client. Build once and clone freely.
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    collection_path: String,
    policy: RetryPolicy,
    tokens: Arc<dyn TokenProvider>,
    observer: Option<Arc<dyn RetryObserver>>,
}

impl GatewayClient {
    pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| {
            GatewayError::unknown(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            collection_path: config.collection_path.trim_end_matches('/').to_string(),
            policy: config.retry_policy(),
            tokens: config.token_provider(),
            observer: None,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// All items. A missing or malformed `data` field yields an empty list.
    pub async fn list_items(&self) -> Result<Sourced<Vec<FoodItem>>, GatewayError> {
        let envelope = self.execute(Method::GET, "", None, None).await?;
        Ok(lenient_list(envelope))
    }

    /// Case-insensitive substring search. The term is sent as-is; the
    /// server decides what an empty term means.
    pub async fn search(&self, term: &str) -> Result<Sourced<Vec<FoodItem>>, GatewayError> {
        let query = [("name", term)];
        let envelope = self
            .execute(Method::GET, "/search", Some(&query), None)
            .await?;
        Ok(lenient_list(envelope))
    }

    pub async fn get_item(&self, id: FoodId) -> Result<Sourced<FoodItem>, GatewayError> {
        let envelope = self
            .execute(Method::GET, &format!("/{}", id), None, None)
            .await?;
        strict_item(envelope)
    }

    pub async fn create(
        &self,
        name: &str,
        calories: i32,
    ) -> Result<Sourced<FoodItem>, GatewayError> {
        let body = to_body(&FoodBody { name, calories })?;
        let envelope = self.execute(Method::POST, "", None, Some(&body)).await?;
        strict_item(envelope)
    }

    pub async fn update(
        &self,
        id: FoodId,
        name: &str,
        calories: i32,
    ) -> Result<Sourced<FoodItem>, GatewayError> {
        let body = to_body(&FoodBody { name, calories })?;
        let envelope = self
            .execute(Method::PUT, &format!("/{}", id), None, Some(&body))
            .await?;
        strict_item(envelope)
    }

    /// Delete an item. The current handler does not route DELETE, so this
    /// surfaces as an `HTTP_ERROR` until it does.
    pub async fn delete(&self, id: FoodId) -> Result<Sourced<()>, GatewayError> {
        let envelope = self
            .execute(Method::DELETE, &format!("/{}", id), None, None)
            .await?;
        let source = envelope.and_then(|e| e.source);
        Ok(Sourced { data: (), source })
    }

    // ========================================================================
    // TRANSPORT
    // ========================================================================

    async fn execute(
        &self,
        method: Method,
        suffix: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<&Value>,
    ) -> Result<Option<Envelope<Value>>, GatewayError> {
        let url = format!("{}{}{}", self.base_url, self.collection_path, suffix);
        retry::run(&self.policy, self.observer.as_deref(), || {
            self.send_once(method.clone(), &url, query, body)
        })
        .await
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<&Value>,
    ) -> Result<Option<Envelope<Value>>, GatewayError> {
        let mut request = self.http.request(method, url);
        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(value) = self.auth_header().await {
            request = request.header(AUTHORIZATION, value);
        }

        let response = request.send().await.map_err(GatewayError::from_transport)?;
        let status = response.status();
        let text = response.text().await.map_err(GatewayError::from_transport)?;
        if !status.is_success() {
            return Err(GatewayError::from_status(status, &text));
        }
        Ok(serde_json::from_str(&text).ok())
    }

    /// Fetch the bearer header. Any failure is logged and the request goes
    /// out without it; rejecting unauthenticated calls is the server's job.
    async fn auth_header(&self) -> Option<HeaderValue> {
        let token = match self.tokens.token().await {
            Ok(token) => token?,
            Err(err) => {
                tracing::warn!(error = %err, "No session token, sending request without Authorization");
                return None;
            }
        };
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Session token is not a valid header value, skipping Authorization");
                None
            }
        }
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.base_url)
            .field("collection_path", &self.collection_path)
            .field("policy", &self.policy)
            .finish()
    }
}

fn to_body<T: Serialize>(body: &T) -> Result<Value, GatewayError> {
    serde_json::to_value(body)
        .map_err(|e| GatewayError::unknown(format!("Failed to encode request: {}", e)))
}

fn decode<T: DeserializeOwned>(value: Value) -> Option<T> {
    serde_json::from_value(value).ok()
}

fn lenient_list(envelope: Option<Envelope<Value>>) -> Sourced<Vec<FoodItem>> {
    match envelope {
        Some(envelope) => Sourced {
            data: envelope.data.and_then(decode).unwrap_or_default(),
            source: envelope.source,
        },
        None => Sourced::untagged(Vec::new()),
    }
}

fn strict_item(envelope: Option<Envelope<Value>>) -> Result<Sourced<FoodItem>, GatewayError> {
    let envelope = envelope.ok_or_else(|| {
        GatewayError::new(ErrorKind::UnknownError, "Response was not a valid envelope")
    })?;
    let item = envelope.data.and_then(decode::<FoodItem>).ok_or_else(|| {
        GatewayError::new(ErrorKind::UnknownError, "Response did not contain a food item")
    })?;
    Ok(Sourced {
        data: item,
        source: envelope.source,
    })
}
