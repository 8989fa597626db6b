//! Shared plumbing for key/value backends

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace};
use url::Url;

use super::json_listing;
use crate::data::Response;
use crate::data::mime::{JSON_ARRAY_MIMETYPE, mime_type};
use crate::error::Result;

/// A connected key/value store
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Names of the immediate children of `prefix`, relative to it
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Connected stores keyed by connection identity.
///
/// The lock is held while connecting so concurrent first use of one
/// identity connects only once.
pub struct StoreCache<S: ?Sized> {
    stores: Mutex<HashMap<String, Arc<S>>>,
}

impl<S: ?Sized> StoreCache<S> {
    pub fn new() -> Self {
        Self {
            stores: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_or_connect<F, Fut>(&self, identity: &str, connect: F) -> Result<Arc<S>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<S>>>,
    {
        let mut stores = self.stores.lock().await;
        if let Some(store) = stores.get(identity) {
            trace!(identity, "reusing store connection");
            return Ok(Arc::clone(store));
        }

        debug!(identity, "connecting to store");
        let store = connect().await?;
        stores.insert(identity.to_string(), Arc::clone(&store));
        Ok(store)
    }

    pub async fn len(&self) -> usize {
        self.stores.lock().await.len()
    }
}

impl<S: ?Sized> Default for StoreCache<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read `key`, or list it when it ends with `/`
pub(crate) async fn read_or_list(store: &dyn KvStore, url: &Url, key: &str) -> Result<Response> {
    if key.ends_with('/') {
        let names = store.list(key).await?;
        let content_type = mime_type(url, JSON_ARRAY_MIMETYPE)?;
        return Ok(Response::from_bytes(json_listing(&names)?, content_type));
    }

    let data = store.read(key).await?;
    let content_type = mime_type(url, "")?;
    Ok(Response::from_bytes(data, content_type))
}

/// Reduce full key names under `prefix` to their immediate child names.
/// Deeper keys become their first path element with a trailing `/`.
pub(crate) fn child_names<I, S>(prefix: &str, keys: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut names: Vec<String> = Vec::new();
    for key in keys {
        let Some(rest) = key.as_ref().strip_prefix(prefix) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        let name = match rest.find('/') {
            Some(i) => &rest[..=i],
            None => rest,
        };
        if names.last().map(String::as_str) != Some(name) {
            names.push(name.to_string());
        }
    }
    names
}
