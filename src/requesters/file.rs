use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::path::PathBuf;
use tracing::debug;
use url::Url;

use super::{Requester, json_listing};
use crate::context::Context;
use crate::data::mime::{JSON_ARRAY_MIMETYPE, mime_type};
use crate::data::Response;
use crate::error::{DatasourceError, Result};

/// Reads files and lists directories through the context's filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FileRequester;

#[async_trait]
impl Requester for FileRequester {
    fn schemes(&self) -> &'static [&'static str] {
        &["file"]
    }

    async fn request(&self, ctx: &Context, url: &Url, _header: &HeaderMap) -> Result<Response> {
        let path = percent_encoding::percent_decode_str(url.path())
            .decode_utf8_lossy()
            .into_owned();
        let fs = ctx.fs();

        let info = fs
            .stat(&PathBuf::from(&path))
            .await
            .map_err(|e| DatasourceError::backend("stat", &path, e))?;

        // paths that explicitly end with "/" must be directories
        if path.ends_with('/') && !info.is_dir {
            return Err(DatasourceError::backend("read", &path, "not a directory"));
        }

        if info.is_dir {
            debug!(path = %path, "listing directory");
            let names = fs
                .read_dir(&PathBuf::from(&path))
                .await
                .map_err(|e| DatasourceError::backend("list directory", &path, e))?;
            let content_type = mime_type(url, JSON_ARRAY_MIMETYPE)?;
            return Ok(Response::from_bytes(json_listing(&names)?, content_type));
        }

        let content_type = mime_type(url, "")?;
        let body = fs
            .open(&PathBuf::from(&path))
            .await
            .map_err(|e| DatasourceError::backend("open", &path, e))?;
        Ok(Response::new(body, content_type, Some(info.len)))
    }
}
