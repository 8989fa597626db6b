use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path;
use object_store::{Attribute, ObjectStore};
use reqwest::header::HeaderMap;
use std::sync::Arc;
use tokio_util::io::StreamReader;
use url::Url;

use super::kv::StoreCache;
use super::{Requester, json_listing};
use crate::builders::query::Query;
use crate::context::Context;
use crate::data::Response;
use crate::data::mime::{JSON_ARRAY_MIMETYPE, mime_type};
use crate::error::{DatasourceError, Result};

const S3_PARAMS: &[&str] = &["region", "endpoint", "disableSSL", "s3ForcePathStyle"];
const GS_PARAMS: &[&str] = &["access_id", "private_key_path"];

/// Object storage datasource: `s3://bucket/key` and `gs://bucket/key`.
///
/// A key ending in `/` lists the objects and prefixes directly under it.
/// Bucket clients are cached per bucket and connection parameters.
pub struct BlobRequester {
    stores: StoreCache<dyn ObjectStore>,
    fixed: Option<Arc<dyn ObjectStore>>,
}

impl BlobRequester {
    pub fn new() -> Self {
        Self {
            stores: StoreCache::new(),
            fixed: None,
        }
    }

    /// Serve every bucket from `store`
    pub fn with_store(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            stores: StoreCache::new(),
            fixed: Some(store),
        }
    }

    async fn store(&self, url: &Url) -> Result<Arc<dyn ObjectStore>> {
        if let Some(store) = &self.fixed {
            return Ok(Arc::clone(store));
        }

        let sanitized = sanitize_url(url, |name| std::env::var(name).ok());
        let mut identity = sanitized.clone();
        identity.set_path("");
        self.stores
            .get_or_connect(identity.as_str(), || async { open_bucket(&sanitized) })
            .await
    }
}

impl Default for BlobRequester {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Requester for BlobRequester {
    fn schemes(&self) -> &'static [&'static str] {
        &["s3", "gs"]
    }

    async fn request(&self, _ctx: &Context, url: &Url, _header: &HeaderMap) -> Result<Response> {
        let store = self.store(url).await?;
        let decoded = percent_encoding::percent_decode_str(url.path()).decode_utf8_lossy();
        let key = decoded.trim_start_matches('/');

        if key.is_empty() || key.ends_with('/') {
            let names = list_bucket(store.as_ref(), key).await?;
            let content_type = mime_type(url, JSON_ARRAY_MIMETYPE)?;
            return Ok(Response::from_bytes(json_listing(&names)?, content_type));
        }

        let res = store
            .get(&Path::from(key))
            .await
            .map_err(|e| DatasourceError::backend("retrieve", key, e))?;

        let attr_type = res
            .attributes
            .get(&Attribute::ContentType)
            .map(|v| v.to_string())
            .unwrap_or_default();
        let content_type = mime_type(url, &attr_type)?;
        let size = res.meta.size as u64;

        let stream = res.into_stream().map_err(std::io::Error::other);
        Ok(Response::new(
            Box::pin(StreamReader::new(stream)),
            content_type,
            Some(size),
        ))
    }
}

/// Copy `url` keeping only the query parameters the backend understands.
/// For S3, `AWS_S3_ENDPOINT` overrides any `endpoint` parameter.
pub fn sanitize_url(url: &Url, env: impl Fn(&str) -> Option<String>) -> Url {
    let allowed: &[&str] = match url.scheme() {
        "s3" => S3_PARAMS,
        "gs" => GS_PARAMS,
        _ => &[],
    };

    let mut query = Query::default();
    for (k, v) in url.query_pairs() {
        if allowed.contains(&k.as_ref()) {
            query.add(k.into_owned(), v.into_owned());
        }
    }

    if url.scheme() == "s3" {
        if let Some(endpoint) = env("AWS_S3_ENDPOINT").filter(|e| !e.is_empty()) {
            query.set("endpoint", endpoint);
        }
    }

    let mut out = url.clone();
    query.apply(&mut out);
    out
}

fn open_bucket(url: &Url) -> Result<Arc<dyn ObjectStore>> {
    let bucket = url.host_str().unwrap_or_default();
    if bucket.is_empty() {
        return Err(DatasourceError::Config(format!("missing bucket name in {url}")));
    }
    let query = Query::of(url);

    let store: Arc<dyn ObjectStore> = match url.scheme() {
        "s3" => {
            let insecure = query.get("disableSSL").is_some_and(parse_bool);
            let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
            if let Some(region) = query.get("region") {
                builder = builder.with_region(region);
            }
            if let Some(endpoint) = query.get("endpoint") {
                let endpoint = if endpoint.contains("://") {
                    endpoint.to_string()
                } else if insecure {
                    format!("http://{endpoint}")
                } else {
                    format!("https://{endpoint}")
                };
                builder = builder.with_endpoint(endpoint);
            }
            if insecure {
                builder = builder.with_allow_http(true);
            }
            if query.get("s3ForcePathStyle").is_some_and(parse_bool) {
                builder = builder.with_virtual_hosted_style_request(false);
            }
            Arc::new(
                builder
                    .build()
                    .map_err(|e| DatasourceError::backend("open bucket", bucket, e))?,
            )
        }
        "gs" => {
            let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(bucket);
            if let Some(path) = query.get("private_key_path") {
                builder = builder.with_service_account_path(path);
            }
            Arc::new(
                builder
                    .build()
                    .map_err(|e| DatasourceError::backend("open bucket", bucket, e))?,
            )
        }
        other => {
            return Err(DatasourceError::UnregisteredScheme {
                kind: "blob store",
                scheme: other.to_string(),
            });
        }
    };
    Ok(store)
}

fn parse_bool(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "t" | "true")
}

/// Immediate children of `prefix`, relative to it. Sub-prefixes keep a trailing `/`.
async fn list_bucket(store: &dyn ObjectStore, prefix: &str) -> Result<Vec<String>> {
    let path = Path::from(prefix);
    let listing = store
        .list_with_delimiter((!prefix.is_empty()).then_some(&path))
        .await
        .map_err(|e| DatasourceError::backend("list", prefix, e))?;

    let relative = |p: &Path| -> String {
        let full = p.as_ref();
        full.strip_prefix(prefix).unwrap_or(full).to_string()
    };

    let mut names: Vec<String> = listing
        .objects
        .iter()
        .map(|meta| relative(&meta.location))
        .chain(listing.common_prefixes.iter().map(|p| format!("{}/", relative(p))))
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    Ok(names)
}
