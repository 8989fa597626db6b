use async_trait::async_trait;
use reqwest::header::HeaderMap;
use url::Url;

use super::Requester;
use crate::context::Context;
use crate::data::Response;
use crate::data::mime::{TEXT_MIMETYPE, mime_type};
use crate::error::Result;

/// Reads a single environment variable: `env:NAME` or `env:///NAME`.
/// An unset variable reads as an empty string.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvRequester;

#[async_trait]
impl Requester for EnvRequester {
    fn schemes(&self) -> &'static [&'static str] {
        &["env"]
    }

    async fn request(&self, _ctx: &Context, url: &Url, _header: &HeaderMap) -> Result<Response> {
        let name = url.path().trim_start_matches('/');
        let value = std::env::var(name).unwrap_or_default();
        let content_type = mime_type(url, TEXT_MIMETYPE)?;
        Ok(Response::from_bytes(value.into_bytes(), content_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read(u: &str) -> (String, Vec<u8>) {
        let resp = EnvRequester
            .request(&Context::default(), &Url::parse(u).unwrap(), &HeaderMap::new())
            .await
            .unwrap();
        let ct = resp.content_type.clone();
        (ct, resp.bytes().await.unwrap())
    }

    #[tokio::test]
    async fn test_reads_variable() {
        let expected = std::env::var("PATH").unwrap_or_default();
        let (ct, data) = read("env:PATH").await;
        assert_eq!(ct, "text/plain");
        assert_eq!(data, expected.as_bytes());

        let (_, data) = read("env:///PATH").await;
        assert_eq!(data, expected.as_bytes());
    }

    #[tokio::test]
    async fn test_unset_is_empty() {
        let (ct, data) = read("env:DATASRC_TEST_SURELY_UNSET_VARIABLE").await;
        assert_eq!(ct, "text/plain");
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn test_type_override() {
        let (ct, _) = read("env:DATASRC_TEST_SURELY_UNSET_VARIABLE?type=application/json").await;
        assert_eq!(ct, "application/json");
    }
}
