use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use url::Url;

use super::Requester;
use super::kv::{KvStore, StoreCache, child_names, read_or_list};
use crate::builders::query::Query;
use crate::context::Context;
use crate::data::Response;
use crate::error::{DatasourceError, Result};

/// Embedded key/value datasource: `boltdb:///path/to/file.db?key=k#bucket`.
///
/// The database file is opened once per path and each bucket maps to a
/// tree in it. `BOLTDB_DATABASE` and `BOLTDB_BUCKET` fill in a missing path
/// or bucket.
pub struct BoltDbRequester {
    dbs: StoreCache<sled::Db>,
    trees: StoreCache<dyn KvStore>,
}

impl BoltDbRequester {
    pub fn new() -> Self {
        Self {
            dbs: StoreCache::new(),
            trees: StoreCache::new(),
        }
    }

    async fn store(&self, path: &str, bucket: &str) -> Result<Arc<dyn KvStore>> {
        let identity = format!("{path}#{bucket}");
        self.trees
            .get_or_connect(&identity, || async {
                let db = self
                    .dbs
                    .get_or_connect(path, || open_db(path.to_string()))
                    .await?;
                let tree = db
                    .open_tree(bucket)
                    .map_err(|e| DatasourceError::backend("open bucket", &identity, e))?;
                Ok(Arc::new(SledStore { tree }) as Arc<dyn KvStore>)
            })
            .await
    }
}

impl Default for BoltDbRequester {
    fn default() -> Self {
        Self::new()
    }
}

async fn open_db(path: String) -> Result<Arc<sled::Db>> {
    // sled creates missing databases
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(DatasourceError::backend("open", &path, "no such file"));
    }
    let target = path.clone();
    let db = tokio::task::spawn_blocking(move || sled::open(&path))
        .await
        .map_err(|e| DatasourceError::backend("open", &target, e))?
        .map_err(|e| DatasourceError::backend("open", &target, e))?;
    Ok(Arc::new(db))
}

#[async_trait]
impl Requester for BoltDbRequester {
    fn schemes(&self) -> &'static [&'static str] {
        &["boltdb"]
    }

    async fn request(&self, _ctx: &Context, url: &Url, _header: &HeaderMap) -> Result<Response> {
        let mut path = percent_encoding::percent_decode_str(url.path())
            .decode_utf8_lossy()
            .into_owned();
        if path.is_empty() {
            path = std::env::var("BOLTDB_DATABASE").unwrap_or_default();
        }
        if path.is_empty() {
            return Err(DatasourceError::Config(
                "missing database path for boltdb datasource".to_string(),
            ));
        }

        let bucket = match url.fragment().filter(|f| !f.is_empty()) {
            Some(bucket) => bucket.to_string(),
            None => std::env::var("BOLTDB_BUCKET").unwrap_or_default(),
        };
        if bucket.is_empty() {
            return Err(DatasourceError::Config(
                "missing bucket - must specify boltdb bucket in URL fragment".to_string(),
            ));
        }

        let key = Query::of(url)
            .get("key")
            .map(str::to_string)
            .ok_or(DatasourceError::MissingKey)?;

        let store = self.store(&path, &bucket).await?;
        read_or_list(store.as_ref(), url, &key).await
    }
}

struct SledStore {
    tree: sled::Tree,
}

#[async_trait]
impl KvStore for SledStore {
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        match self.tree.get(key) {
            Ok(Some(value)) => Ok(value.to_vec()),
            Ok(None) => Err(DatasourceError::backend("read", key, "key not found")),
            Err(e) => Err(DatasourceError::backend("read", key, e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for item in self.tree.scan_prefix(prefix) {
            let (key, _) = item.map_err(|e| DatasourceError::backend("list", prefix, e))?;
            keys.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(child_names(prefix, keys))
    }
}
