//! Top-level orchestration: URL builder, then requester, then response.

use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::context::Context;
use crate::data::Response;
use crate::error::{DatasourceError, Result};

/// A declared, reusable resource reference
#[derive(Debug, Clone, PartialEq)]
pub struct DataSource {
    pub url: Url,
    /// Extra headers sent with requests to this source
    pub header: HeaderMap,
}

impl DataSource {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            header: HeaderMap::new(),
        }
    }

    pub fn with_header(mut self, header: HeaderMap) -> Self {
        self.header = header;
        self
    }
}

/// Fetch the data behind `ds`, addressed by the call-site `args`.
///
/// The caller owns the returned response and its body. Requests race
/// against the context's cancellation token.
#[instrument(level = "debug", skip_all, fields(url = %ds.url))]
pub async fn request(ctx: &Context, ds: &DataSource, args: &[&str]) -> Result<Response> {
    let builder = ctx.registry().builder(ds.url.scheme())?;
    let url = builder.build_url(&ds.url, args)?;

    let requester = ctx.registry().requester(url.scheme())?;
    debug!(url = %url, scheme = url.scheme(), "requesting datasource");

    let result = tokio::select! {
        biased;
        _ = ctx.cancellation().cancelled() => Err(DatasourceError::Cancelled),
        res = requester.request(ctx, &url, &ds.header) => res,
    };

    result.map_err(|e| DatasourceError::Request {
        url: url.to_string(),
        source: Box::new(e),
    })
}

/// Fetch and read the whole body, returning it with its content type
pub async fn read_data_source(
    ctx: &Context,
    ds: &DataSource,
    args: &[&str],
) -> Result<(String, Vec<u8>)> {
    let resp = request(ctx, ds, args).await?;
    let content_type = resp.content_type.clone();
    let data = resp.bytes().await?;
    Ok((content_type, data))
}

/// Fetch and decode according to the negotiated content type
pub async fn parse_data_source(ctx: &Context, ds: &DataSource, args: &[&str]) -> Result<Value> {
    request(ctx, ds, args).await?.parse().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use serde_json::json;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> Context {
        let fs = MemoryFileSystem::new()
            .with_file("/tmp/foo/one.json", r#"{"one": 1}"#)
            .with_file("/tmp/foo/two.yaml", "two: 2\n");
        Context::default().with_fs(Arc::new(fs))
    }

    fn ds(u: &str) -> DataSource {
        DataSource::new(Url::parse(u).unwrap())
    }

    #[tokio::test]
    async fn test_read_file_with_arg() {
        let (ct, data) = read_data_source(&ctx(), &ds("file:///tmp/foo/"), &["one.json"])
            .await
            .unwrap();
        assert_eq!(ct, "application/json");
        assert_eq!(data, br#"{"one": 1}"#);
    }

    #[tokio::test]
    async fn test_parse_directory_listing() {
        let v = parse_data_source(&ctx(), &ds("file:///tmp/foo/"), &[])
            .await
            .unwrap();
        assert_eq!(v, json!(["one.json", "two.yaml"]));
    }

    #[tokio::test]
    async fn test_unregistered_scheme() {
        let err = request(&ctx(), &ds("foo:///bar"), &[]).await.unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(
            err.to_string(),
            "no URL builder found for scheme foo (not registered?)"
        );
    }

    #[tokio::test]
    async fn test_backend_errors_name_the_url() {
        let err = request(&ctx(), &ds("file:///tmp/missing.json"), &[])
            .await
            .unwrap_err();
        assert!(!err.is_config_error());
        assert!(err.to_string().starts_with("failed to request file:///tmp/missing.json"));
    }

    #[tokio::test]
    async fn test_cancelled_context() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = ctx().with_cancellation(token);

        let err = request(&ctx, &ds("file:///tmp/foo/one.json"), &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DatasourceError::Request { ref source, .. } if matches!(**source, DatasourceError::Cancelled)
        ));
    }
}
