//! The cache agent: install, activate, and fetch interception handlers.
//!
//! Each handler is an explicit async fn; the returned future is the
//! "extend my lifetime until this work finishes" handle the host awaits
//! before tearing the agent down or letting it intercept traffic.

use std::sync::Arc;

use bytes::Bytes;
use url::Url;

use stratus_client::fetch::{FetchResponse, Network, WebRequest, is_web_scheme, resolve};
use stratus_core::cache::hash::compute_snapshot_key;
use stratus_core::{AppConfig, CacheDb, Error, Snapshot};

use crate::clients::ClientControl;
use crate::lifecycle::{Lifecycle, LifecycleError, LifecycleState};

/// Errors surfaced to the host from the install and activate handlers.
///
/// Fetch interception never returns one of these; its failures are
/// converted into substitute responses or logged no-ops.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Core(#[from] Error),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeSource {
    /// Exact-match hit in the current generation.
    Cache,
    /// Fresh network response (cached opportunistically when valid).
    Network,
    /// Cached root document served for a failed document navigation.
    FallbackShell,
    /// Synthesized placeholder for a total network failure.
    Offline,
}

impl std::fmt::Display for ServeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ServeSource::Cache => "cache",
            ServeSource::Network => "network",
            ServeSource::FallbackShell => "fallback-shell",
            ServeSource::Offline => "offline",
        };
        f.write_str(name)
    }
}

/// A response the agent resolved an intercepted request to.
#[derive(Debug, Clone)]
pub struct ServedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub source: ServeSource,
}

impl ServedResponse {
    fn from_snapshot(snapshot: Snapshot, source: ServeSource) -> Self {
        let headers = snapshot
            .headers_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default();
        Self {
            status: snapshot.status,
            content_type: snapshot.content_type,
            headers,
            body: Bytes::from(snapshot.body),
            source,
        }
    }

    fn from_network(response: &FetchResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        Self {
            status: response.status.as_u16(),
            content_type: response.content_type.clone(),
            headers,
            // Bytes clones share the buffer, so serving and storing are
            // independent readers of the same bytes.
            body: response.bytes.clone(),
            source: ServeSource::Network,
        }
    }

    fn offline(message: &str) -> Self {
        Self {
            status: 408,
            content_type: Some("text/plain".to_string()),
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            body: Bytes::copy_from_slice(message.as_bytes()),
            source: ServeSource::Offline,
        }
    }
}

/// Result of fetch interception.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Not intercepted; the host applies default network behavior.
    PassThrough,
    /// Resolved to a response (cache hit, network, fallback, or synthesized).
    Served(ServedResponse),
}

/// The cache agent.
///
/// All configuration is immutable for the lifetime of the instance; the
/// version tag names the current generation, and changing it (in a newer
/// installation) is the sole mechanism for invalidating cached content.
pub struct CacheAgent {
    config: AppConfig,
    scope: Url,
    fallback_key: String,
    db: CacheDb,
    network: Arc<dyn Network>,
    clients: Arc<dyn ClientControl>,
    lifecycle: Lifecycle,
}

impl CacheAgent {
    /// Build an agent over a cache database, a network backend, and a
    /// client-control implementation.
    pub fn new(
        config: AppConfig, db: CacheDb, network: Arc<dyn Network>, clients: Arc<dyn ClientControl>,
    ) -> Result<Self, Error> {
        let scope = Url::parse(&config.scope).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let fallback_url =
            resolve(&scope, &config.fallback_document).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let fallback_key = compute_snapshot_key("GET", fallback_url.as_str());

        Ok(Self { config, scope, fallback_key, db, network, clients, lifecycle: Lifecycle::new() })
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Whether the agent asked the host to skip the waiting period.
    pub fn skip_waiting_requested(&self) -> bool {
        self.lifecycle.skip_waiting_requested()
    }

    /// Install: bulk-precache the asset list into the current generation.
    ///
    /// All assets are fetched before anything is written; the bulk store
    /// then commits in a single transaction together with the generation's
    /// installed marker. A single failed or non-200 asset aborts the whole
    /// operation and the generation never claims completed installation.
    /// On success the agent requests skip-waiting so this generation
    /// becomes eligible for activation immediately.
    pub async fn handle_install(&self) -> Result<(), AgentError> {
        let generation = &self.config.cache_version;
        tracing::info!(%generation, assets = self.config.precache_assets.len(), "installing");

        self.db.open_generation(generation).await.map_err(AgentError::Core)?;

        let mut snapshots = Vec::with_capacity(self.config.precache_assets.len());
        for asset in &self.config.precache_assets {
            let url = resolve(&self.scope, asset)
                .map_err(|e| Error::PrecacheFailed(format!("{asset}: {e}")))?;
            let request = WebRequest::get(url.as_str());
            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::PrecacheFailed(format!("{asset}: {e}")))?;

            // The asset list is trusted, so any origin is acceptable here;
            // only a clean 200 is.
            if response.status.as_u16() != 200 {
                return Err(Error::PrecacheFailed(format!("{asset}: status {}", response.status.as_u16())).into());
            }

            snapshots.push(response.to_snapshot("GET"));
        }

        self.db.store_all(generation, snapshots).await.map_err(AgentError::Core)?;

        self.lifecycle.request_skip_waiting();
        self.lifecycle.transition(LifecycleState::Installed)?;
        tracing::info!(%generation, "install complete; skipping waiting period");
        Ok(())
    }

    /// Activate: evict stale generations and claim open clients.
    ///
    /// Every generation whose name differs from the current version tag is
    /// deleted. Deletions are fire-and-forget per entry: a failure is
    /// logged and does not block the remaining deletions or the
    /// activation transition.
    pub async fn handle_activate(&self) -> Result<(), AgentError> {
        let generation = &self.config.cache_version;
        self.lifecycle.transition(LifecycleState::Activating)?;
        tracing::info!(%generation, "activating");

        let names = match self.db.list_generations().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate generations; skipping cleanup");
                Vec::new()
            }
        };

        for name in names.iter().filter(|name| *name != generation) {
            match self.db.delete_generation(name).await {
                Ok(_) => tracing::info!(stale = %name, "deleted stale generation"),
                Err(e) => tracing::warn!(stale = %name, error = %e, "failed to delete stale generation"),
            }
        }

        let claimed = self.clients.claim().await;
        self.lifecycle.transition(LifecycleState::Activated)?;
        tracing::info!(%generation, claimed, "activation complete");
        Ok(())
    }

    /// Fetch interception: cache-first with network fallback.
    ///
    /// Only GET requests over http(s) are intercepted; everything else
    /// passes through to default network behavior. Every intercepted
    /// request resolves to *some* response: a cache hit, a fresh network
    /// response, the fallback shell, or a synthesized 408.
    pub async fn handle_fetch(&self, request: &WebRequest) -> FetchOutcome {
        if !request.is_get() {
            return FetchOutcome::PassThrough;
        }

        let url = match resolve(&self.scope, &request.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "unresolvable URL; passing through");
                return FetchOutcome::PassThrough;
            }
        };
        if !is_web_scheme(&url) {
            return FetchOutcome::PassThrough;
        }

        let generation = &self.config.cache_version;
        let key = compute_snapshot_key(&request.method, url.as_str());

        match self.db.match_snapshot(generation, &key).await {
            Ok(Some(snapshot)) => {
                tracing::debug!(%url, "serving from cache");
                return FetchOutcome::Served(ServedResponse::from_snapshot(snapshot, ServeSource::Cache));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(%url, error = %e, "cache lookup failed; treating as miss");
            }
        }

        let net_request = WebRequest { method: "GET".to_string(), url: url.to_string(), headers: request.headers.clone() };

        match self.network.fetch(&net_request).await {
            Ok(response) => {
                if response.is_cacheable(&self.scope) {
                    self.store_in_background(response.to_snapshot("GET"));
                } else {
                    tracing::debug!(%url, status = response.status.as_u16(), "response not cacheable");
                }
                FetchOutcome::Served(ServedResponse::from_network(&response))
            }
            Err(e) => {
                tracing::debug!(%url, error = %e, "network request failed");
                self.serve_offline(&url).await
            }
        }
    }

    /// Store a freshly fetched snapshot without blocking the caller.
    fn store_in_background(&self, snapshot: Snapshot) {
        let db = self.db.clone();
        let generation = self.config.cache_version.clone();
        let url = snapshot.url.clone();
        tokio::spawn(async move {
            match db.put_snapshot(&generation, &snapshot).await {
                Ok(()) => tracing::debug!(%url, "stored fetched response"),
                Err(e) => tracing::warn!(%url, error = %e, "failed to store fetched response"),
            }
        });
    }

    /// Total network failure: fallback shell for documents, synthesized
    /// 408 for everything else (including a document whose shell was
    /// never cached).
    async fn serve_offline(&self, url: &Url) -> FetchOutcome {
        if url.as_str().contains(".html")
            && let Ok(Some(shell)) = self.db.match_snapshot(&self.config.cache_version, &self.fallback_key).await
        {
            tracing::debug!(%url, "serving fallback shell");
            return FetchOutcome::Served(ServedResponse::from_snapshot(shell, ServeSource::FallbackShell));
        }
        FetchOutcome::Served(ServedResponse::offline(&self.config.offline_message))
    }
}
