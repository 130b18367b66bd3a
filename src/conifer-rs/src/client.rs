use crate::transport::{encode, HttpTransport, Payload, Transport};
use crate::{ClientError, Result};
use conifer_core::models::{CreateCollectionRequest, UpsertRequest};
use conifer_core::{
    ClientConfig, CollectionDescriptor, CollectionEntry, CollectionSpec, Point, PollConfig,
    QueryRequest, QueryResponse, UpsertResponse, DEFAULT_TOP_K,
};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Vector-database REST API client.
///
/// Collection lifecycle goes to the control plane. Point upserts and searches
/// go to the collection's own data-plane host, which is looked up on first use
/// and cached per collection name.
pub struct Client {
    api_key: String,
    control_url: String,
    poll: PollConfig,
    hosts: RwLock<HashMap<String, String>>,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Create a client from configuration, using the reqwest transport
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(config.request_timeout(), config.insecure_skip_verify)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client from `CONIFER_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client over a custom transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            control_url: config.control_base(),
            api_key: config.api_key,
            poll: config.poll,
            hosts: RwLock::new(HashMap::new()),
            transport,
        })
    }

    pub fn control_plane_url(&self) -> &str {
        &self.control_url
    }

    pub fn poll_config(&self) -> &PollConfig {
        &self.poll
    }

    /// Data-plane host cached for `name`, if it has been discovered
    pub async fn cached_host(&self, name: &str) -> Option<String> {
        self.hosts.read().await.get(name).cloned()
    }

    /// Pin the data-plane host for `name` without asking the control plane
    pub async fn use_host(&self, name: &str, host: impl Into<String>) {
        let host = format!("{}/", host.into().trim_end_matches('/'));
        tracing::info!(collection = name, host = %host, "Now using data-plane host");
        self.hosts.write().await.insert(name.to_string(), host);
    }

    /// Drop the cached data-plane host for `name`
    pub async fn forget_host(&self, name: &str) -> Option<String> {
        self.hosts.write().await.remove(name)
    }

    /// List all collections visible to the API key
    /// GET {control}/databases
    #[tracing::instrument(skip(self))]
    pub async fn get_collections(&self) -> Result<Vec<CollectionEntry>> {
        let url = format!("{}databases", self.control_url);
        let payload = self.transport.send_query(&url, &self.api_key, None).await?;
        payload.decode_or_default()
    }

    /// Describe one collection
    /// GET {control}/databases/{name}
    #[tracing::instrument(skip(self))]
    pub async fn get_collection(&self, name: &str) -> Result<CollectionDescriptor> {
        let url = format!("{}databases/{}", self.control_url, name);
        let payload = self.transport.send_query(&url, &self.api_key, None).await?;
        payload.decode()
    }

    /// Create a collection unless a lookup shows it already exists.
    /// The lookup and the create are not atomic. A lookup that never reached
    /// the server is returned as is; any answered failure leads to the create.
    /// POST {control}/databases
    #[tracing::instrument(skip(self, spec))]
    pub async fn create_collection(&self, name: &str, spec: &CollectionSpec) -> Result<Payload> {
        match self.get_collection(name).await {
            Ok(_) => {
                tracing::warn!(collection = name, "Collection already exists, skipping create");
                return Err(ClientError::AlreadyExists(name.to_string()));
            }
            Err(err @ ClientError::Transport(_)) => {
                tracing::error!(collection = name, error = %err, "Existence check failed");
                return Err(err);
            }
            Err(_) => {}
        }

        let url = format!("{}databases", self.control_url);
        let body = encode(&CreateCollectionRequest { name, spec })?;

        let payload = self
            .transport
            .send_with_body(&url, &self.api_key, Some(body.as_slice()), Method::POST)
            .await?;
        tracing::info!(
            collection = name,
            dimension = spec.dimension,
            metric = ?spec.metric,
            "Collection created"
        );
        Ok(payload)
    }

    /// Delete a collection
    /// DELETE {control}/databases/{name}
    #[tracing::instrument(skip(self))]
    pub async fn delete_collection(&self, name: &str) -> Result<Payload> {
        let url = format!("{}databases/{}", self.control_url, name);
        let payload = self
            .transport
            .send_with_body(&url, &self.api_key, None, Method::DELETE)
            .await?;

        self.forget_host(name).await;
        tracing::info!(collection = name, "Collection deletion requested");
        Ok(payload)
    }

    /// Look up the collection's data-plane host and cache it under `name`
    #[tracing::instrument(skip(self))]
    pub async fn set_host(&self, name: &str) -> Result<String> {
        let descriptor = match self.get_collection(name).await {
            Ok(descriptor) => descriptor,
            Err(err) => {
                tracing::error!(collection = name, error = %err, "Couldn't access collection");
                return Err(err);
            }
        };

        let host = descriptor
            .data_plane_url()
            .ok_or_else(|| ClientError::HostUnavailable(name.to_string()))?;
        self.use_host(name, host.clone()).await;
        Ok(host)
    }

    /// Poll until the collection reports `ready`.
    /// A failed lookup ends the wait immediately.
    #[tracing::instrument(skip(self))]
    pub async fn wait_until_ready(&self, name: &str) -> Result<CollectionDescriptor> {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let descriptor = match self.get_collection(name).await {
                Ok(descriptor) => descriptor,
                Err(err) => {
                    tracing::error!(collection = name, error = %err, "Couldn't access collection");
                    return Err(err);
                }
            };

            if descriptor.status.ready {
                tracing::info!(collection = name, attempts, "Collection is ready");
                return Ok(descriptor);
            }

            tracing::debug!(collection = name, attempts, "Collection not ready yet");
            self.pause(name, attempts, started).await?;
        }
    }

    /// Poll until the control plane answers "not found" for the collection.
    /// Any other failure is returned rather than taken as deletion.
    #[tracing::instrument(skip(self))]
    pub async fn wait_until_deleted(&self, name: &str) -> Result<()> {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match self.get_collection(name).await {
                Ok(_) => {
                    tracing::debug!(collection = name, attempts, "Collection still exists");
                    self.pause(name, attempts, started).await?;
                }
                Err(err) if err.is_not_found() => {
                    tracing::info!(collection = name, attempts, "Collection is gone");
                    self.forget_host(name).await;
                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!(
                        collection = name,
                        error = %err,
                        "Lookup failed while waiting for deletion"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Upsert points into the collection, using the collection name as namespace
    /// POST {host}/vectors/upsert
    #[tracing::instrument(skip(self, points), fields(count = points.len()))]
    pub async fn upload_points(&self, name: &str, points: &[Point]) -> Result<UpsertResponse> {
        let body = encode(&UpsertRequest {
            namespace: name,
            vectors: points,
        })?;

        let payload = self.post_to_host(name, "vectors/upsert", &body).await?;
        payload.decode_or_default()
    }

    /// Nearest-neighbour search for one vector; `k` of `None` or 0 means 10
    /// POST {host}/query
    #[tracing::instrument(skip(self, vector, filter))]
    pub async fn search_collection(
        &self,
        name: &str,
        vector: &[f32],
        k: Option<usize>,
        filter: Option<Value>,
    ) -> Result<QueryResponse> {
        let k = k.filter(|k| *k > 0).unwrap_or(DEFAULT_TOP_K);
        let mut query = QueryRequest::nearest(name, vector.to_vec(), k);
        if let Some(filter) = filter {
            query = query.with_filter(filter);
        }

        let body = encode(&query)?;
        let payload = self.post_to_host(name, "query", &body).await?;
        payload.decode_or_default()
    }

    /// Send a caller-built query body verbatim
    /// POST {host}/query
    #[tracing::instrument(skip(self, query))]
    pub async fn query_collection<Q>(&self, name: &str, query: &Q) -> Result<Value>
    where
        Q: Serialize + ?Sized,
    {
        let body = encode(query)?;
        let payload = self.post_to_host(name, "query", &body).await?;
        Ok(payload.into_value())
    }

    async fn ensure_host(&self, name: &str) -> Result<String> {
        if let Some(host) = self.cached_host(name).await {
            return Ok(host);
        }
        self.set_host(name).await
    }

    async fn post_to_host(&self, name: &str, route: &str, body: &[u8]) -> Result<Payload> {
        let host = self.ensure_host(name).await?;
        let url = format!("{}{}", host, route);
        self.transport
            .send_with_body(&url, &self.api_key, Some(body), Method::POST)
            .await
    }

    /// Sleep before the next lookup, or give up if the poll budget is spent
    async fn pause(&self, name: &str, attempts: u32, started: Instant) -> Result<()> {
        let deadline_passed = self
            .poll
            .timeout()
            .is_some_and(|timeout| started.elapsed() >= timeout);

        if self.poll.attempts_exhausted(attempts) || deadline_passed {
            tracing::warn!(collection = name, attempts, "Gave up waiting on collection");
            return Err(ClientError::TimedOut {
                name: name.to_string(),
                attempts,
            });
        }

        tokio::time::sleep(self.poll.interval()).await;
        Ok(())
    }
}
