use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use url::Url;

use super::Requester;
use crate::context::Context;
use crate::data::{Body, Response};
use crate::data::mime::mime_type;
use crate::error::Result;

type ReaderFactory = Arc<dyn Fn() -> Body + Send + Sync>;

/// Reads the process's standard input.
///
/// Dropping the returned body never closes the underlying descriptor, so
/// other readers of stdin in the same process are unaffected.
#[derive(Clone)]
pub struct StdinRequester {
    reader: ReaderFactory,
}

impl StdinRequester {
    pub fn new() -> Self {
        Self {
            reader: Arc::new(|| -> Body { Box::pin(tokio::io::stdin()) }),
        }
    }

    /// Use another reader in place of stdin
    pub fn with_reader(reader: impl Fn() -> Body + Send + Sync + 'static) -> Self {
        Self {
            reader: Arc::new(reader),
        }
    }
}

impl Default for StdinRequester {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Requester for StdinRequester {
    fn schemes(&self) -> &'static [&'static str] {
        &["stdin"]
    }

    async fn request(&self, _ctx: &Context, url: &Url, _header: &HeaderMap) -> Result<Response> {
        let content_type = mime_type(url, "")?;
        Ok(Response::new((self.reader)(), content_type, None))
    }
}
