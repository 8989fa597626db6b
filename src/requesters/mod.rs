use async_trait::async_trait;
use reqwest::header::HeaderMap;
use url::Url;

use crate::context::Context;
use crate::data::Response;
use crate::error::Result;

pub mod aws_sm;
pub mod aws_smp;
pub mod blob;
pub mod boltdb;
pub mod consul;
pub mod env;
pub mod file;
pub mod git;
pub mod http;
pub mod kv;
pub mod merge;
pub mod registry;
pub mod stdin;

pub use registry::Registry;

/// Trait for datasource backends
///
/// A requester fetches the data behind a fully-built URL for the schemes it
/// serves. Backend connection state lives on the requester for the lifetime
/// of the registry that owns it.
#[async_trait]
pub trait Requester: Send + Sync {
    /// URL schemes served by this requester (e.g. "http", "https")
    fn schemes(&self) -> &'static [&'static str];

    /// Fetch the data at `url`
    ///
    /// # Arguments
    /// * `ctx` - Ambient collaborators and cancellation
    /// * `url` - The URL produced by the scheme's URL builder
    /// * `header` - Headers declared on the datasource
    async fn request(&self, ctx: &Context, url: &Url, header: &HeaderMap) -> Result<Response>;
}

/// Serialize a listing as a JSON array
pub(crate) fn json_listing(names: &[String]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(names)?)
}
