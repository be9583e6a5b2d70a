//! Cached, paginated GraphQL fetches
//!
//! A fetch first looks for a cache entry younger than the request's expiry.
//! On a miss it pages through the upstream entity, passing the number of
//! items accumulated so far as `skip`, until the response carries no
//! `pageInfo` or reports a short page (`count < limit`). Non-empty results
//! replace the cache entry; empty results are never cached.

use crate::cache::{CacheKey, CacheStore};
use crate::graphql::GraphQlTransport;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default age after which cached results are refetched
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(3600);

/// A single cached query
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// Upstream name, used as the cache key prefix
    pub source: String,
    /// Top-level field in the response `data`
    pub entity_name: String,
    pub url: String,
    pub query: String,
    pub variables: Map<String, Value>,
    /// Cache key suffix; defaults to `entity_name`
    pub cache_qualifier: Option<String>,
    /// The entity is a bare list with no `items`/`pageInfo` wrapper
    pub single_page: bool,
    /// Overrides the client's default expiry
    pub expiry: Option<Duration>,
}

impl QueryRequest {
    pub fn new(
        source: impl Into<String>,
        entity_name: impl Into<String>,
        url: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            entity_name: entity_name.into(),
            url: url.into(),
            query: query.into(),
            variables: Map::new(),
            cache_qualifier: None,
            single_page: false,
            expiry: None,
        }
    }

    pub fn variable(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(name.to_string(), value.into());
        self
    }

    pub fn cache_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.cache_qualifier = Some(qualifier.into());
        self
    }

    pub fn single_page(mut self) -> Self {
        self.single_page = true;
        self
    }

    pub fn expiry(mut self, expiry: Duration) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn cache_key(&self) -> CacheKey {
        let name = self
            .cache_qualifier
            .as_deref()
            .unwrap_or(&self.entity_name);
        CacheKey::new(&self.source, name)
    }
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    count: u64,
    limit: u64,
}

struct Page {
    items: Vec<Value>,
    page_info: Option<PageInfo>,
}

/// GraphQL client that serves from, and refreshes, a [`CacheStore`]
#[derive(Clone)]
pub struct CachedQueryClient {
    transport: Arc<dyn GraphQlTransport>,
    cache: Arc<dyn CacheStore>,
    default_expiry: Duration,
}

impl CachedQueryClient {
    pub fn new(transport: Arc<dyn GraphQlTransport>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            transport,
            cache,
            default_expiry: DEFAULT_EXPIRY,
        }
    }

    pub fn with_default_expiry(mut self, expiry: Duration) -> Self {
        self.default_expiry = expiry;
        self
    }

    /// Fetch every item of the requested entity
    pub async fn fetch(&self, request: QueryRequest) -> Result<Vec<Value>> {
        let key = request.cache_key();
        let expiry = request.expiry.unwrap_or(self.default_expiry);

        if let Some(cached) = self.cache.get(&key).await? {
            if cached.age < expiry {
                info!(
                    cache_key = %key,
                    age_secs = cached.age.as_secs(),
                    count = cached.items.len(),
                    "Loading from cache"
                );
                return Ok(cached.items);
            }
            debug!(cache_key = %key, age_secs = cached.age.as_secs(), "Cache entry expired");
        }

        info!(cache_key = %key, url = %redact(&request.url), "Querying upstream");
        let items = self.fetch_all_pages(&request).await?;

        if items.is_empty() {
            debug!(cache_key = %key, "Empty result, not caching");
        } else {
            self.cache.put(&key, &items).await?;
        }

        Ok(items)
    }

    async fn fetch_all_pages(&self, request: &QueryRequest) -> Result<Vec<Value>> {
        let mut items: Vec<Value> = Vec::new();
        let mut variables = request.variables.clone();

        loop {
            if !request.single_page {
                variables.insert("skip".to_string(), Value::from(items.len()));
            }

            let data = self
                .transport
                .query(&request.url, &request.query, &Value::Object(variables.clone()))
                .await?;
            let page = parse_page(&data, &request.entity_name, request.single_page)?;
            let page_len = page.items.len();
            items.extend(page.items);

            debug!(
                entity = %request.entity_name,
                page_len,
                total = items.len(),
                "Fetched page"
            );

            let Some(page_info) = page.page_info else {
                break;
            };
            if page_info.count < page_info.limit || page_len == 0 {
                break;
            }
        }

        Ok(items)
    }
}

fn parse_page(data: &Value, entity_name: &str, single_page: bool) -> Result<Page> {
    let entity = data
        .get(entity_name)
        .ok_or_else(|| Error::GraphQL(format!("Missing '{}' in response", entity_name)))?;

    if single_page {
        let items = entity
            .as_array()
            .cloned()
            .ok_or_else(|| Error::GraphQL(format!("'{}' is not a list", entity_name)))?;
        return Ok(Page {
            items,
            page_info: None,
        });
    }

    let items = entity
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| Error::GraphQL(format!("Missing '{}.items' in response", entity_name)))?;
    let page_info = match entity.get("pageInfo") {
        None | Some(Value::Null) => None,
        Some(info) => Some(serde_json::from_value(info.clone())?),
    };

    Ok(Page { items, page_info })
}

/// Hide path segments that may carry API keys
fn redact(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => format!(
            "{}://{}",
            parsed.scheme(),
            parsed.host_str().unwrap_or_default()
        ),
        Err(_) => "<invalid url>".to_string(),
    }
}
