use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use std::io;
use tokio_util::io::StreamReader;
use tracing::{debug, warn};
use url::Url;

use super::Requester;
use crate::context::Context;
use crate::data::Response;
use crate::data::mime::mime_type;
use crate::error::{DatasourceError, Result};

/// Issues GET requests with the context's HTTP client
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpRequester;

#[async_trait]
impl Requester for HttpRequester {
    fn schemes(&self) -> &'static [&'static str] {
        &["http", "https"]
    }

    async fn request(&self, ctx: &Context, url: &Url, header: &HeaderMap) -> Result<Response> {
        let resp = ctx
            .http_client()
            .get(url.as_str())
            .headers(header.clone())
            .send()
            .await?;

        let status = resp.status();
        debug!(url = %url, status = status.as_u16(), "HTTP response");

        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_else(|e| {
                warn!(url = %url, error = %e, "failed to read error response body");
                String::new()
            });
            return Err(DatasourceError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let hint = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let content_type = mime_type(url, &hint)?;
        let content_length = resp.content_length();

        let stream = resp.bytes_stream().map_err(io::Error::other);
        Ok(Response::new(
            Box::pin(StreamReader::new(stream)),
            content_type,
            content_length,
        ))
    }
}
