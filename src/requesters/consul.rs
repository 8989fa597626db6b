use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use url::Url;

use super::Requester;
use super::kv::{KvStore, StoreCache, read_or_list};
use crate::context::Context;
use crate::data::Response;
use crate::error::{DatasourceError, Result};

const DEFAULT_ADDR: &str = "localhost:8500";

/// Consul KV datasource: `consul://host:port/path/to/key`, `consul+http://`,
/// `consul+https://`.
///
/// Without a host in the URL the address comes from `CONSUL_HTTP_ADDR`.
/// `CONSUL_HTTP_SSL` selects HTTPS for the bare `consul` scheme,
/// `CONSUL_HTTP_TOKEN` is sent with every request, and `CONSUL_TIMEOUT`
/// (seconds) bounds each request.
pub struct ConsulRequester {
    stores: StoreCache<dyn KvStore>,
}

impl ConsulRequester {
    pub fn new() -> Self {
        Self {
            stores: StoreCache::new(),
        }
    }
}

impl Default for ConsulRequester {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Requester for ConsulRequester {
    fn schemes(&self) -> &'static [&'static str] {
        &["consul", "consul+http", "consul+https"]
    }

    async fn request(&self, _ctx: &Context, url: &Url, _header: &HeaderMap) -> Result<Response> {
        let env = |name: &str| std::env::var(name).ok();
        let base = consul_url(url, env)?;

        let store = self
            .stores
            .get_or_connect(base.as_str(), || async {
                let store = ConsulStore::new(base.clone(), env)?;
                Ok(Arc::new(store) as Arc<dyn KvStore>)
            })
            .await?;

        let key = percent_encoding::percent_decode_str(url.path())
            .decode_utf8_lossy()
            .trim_start_matches('/')
            .to_string();
        read_or_list(store.as_ref(), url, &key).await
    }
}

/// The agent address for a datasource URL: `http(s)://host:port`
pub fn consul_url(url: &Url, env: impl Fn(&str) -> Option<String>) -> Result<Url> {
    let (mut scheme, host) = match url.host_str().filter(|h| !h.is_empty()) {
        Some(host) => {
            let host = match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
            (url.scheme().to_string(), host)
        }
        None => {
            let addr = env("CONSUL_HTTP_ADDR").filter(|a| !a.is_empty());
            match addr.as_deref().and_then(|a| a.split_once("://")) {
                Some((scheme, host)) => (scheme.to_string(), host.trim_end_matches('/').to_string()),
                None => (
                    url.scheme().to_string(),
                    addr.unwrap_or_else(|| DEFAULT_ADDR.to_string()),
                ),
            }
        }
    };

    scheme = match scheme.as_str() {
        "consul+http" | "http" => "http".to_string(),
        "consul+https" | "https" => "https".to_string(),
        "consul" => {
            let ssl = env("CONSUL_HTTP_SSL").is_some_and(|v| parse_bool(&v));
            if ssl { "https" } else { "http" }.to_string()
        }
        other => {
            return Err(DatasourceError::Config(format!(
                "invalid Consul address scheme {other:?}"
            )));
        }
    };

    Url::parse(&format!("{scheme}://{host}"))
        .map_err(|e| DatasourceError::Config(format!("invalid Consul address {host:?}: {e}")))
}

fn parse_bool(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "t" | "true" | "yes" | "on")
}

struct ConsulStore {
    base: Url,
    client: reqwest::Client,
    token: Option<String>,
}

impl ConsulStore {
    fn new(base: Url, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = env("CONSUL_TIMEOUT").filter(|t| !t.is_empty()) {
            let secs: u64 = timeout.parse().map_err(|e| {
                DatasourceError::Config(format!("invalid CONSUL_TIMEOUT {timeout:?}: {e}"))
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            base,
            client: builder.build()?,
            token: env("CONSUL_HTTP_TOKEN").filter(|t| !t.is_empty()),
        })
    }

    async fn get(&self, key: &str, query: &[(&str, &str)]) -> Result<Option<reqwest::Response>> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| DatasourceError::Config(format!("invalid Consul address {}", self.base)))?
            .pop_if_empty()
            .extend(["v1", "kv"])
            .extend(key.split('/'));

        let mut req = self.client.get(url).query(query);
        if let Some(token) = &self.token {
            req = req.header("X-Consul-Token", token);
        }

        let resp = req.send().await?;
        match resp.status() {
            StatusCode::OK => Ok(Some(resp)),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(DatasourceError::HttpStatus {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_else(|e| {
                    warn!(key, error = %e, "failed to read error response body");
                    String::new()
                }),
            }),
        }
    }
}

#[async_trait]
impl KvStore for ConsulStore {
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        match self.get(key, &[("raw", "")]).await? {
            Some(resp) => Ok(resp.bytes().await?.to_vec()),
            None => Err(DatasourceError::backend("read", key, "key not found")),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let keys: Vec<String> = match self.get(prefix, &[("keys", ""), ("separator", "/")]).await? {
            Some(resp) => resp.json().await?,
            None => Vec::new(),
        };

        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(prefix).map(str::to_string))
            .filter(|k| !k.is_empty())
            .collect())
    }
}
