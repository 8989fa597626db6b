use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, trace};
use url::Url;

use super::Requester;
use crate::config::args::parse_source_url;
use crate::context::Context;
use crate::data::mime::YAML_MIMETYPE;
use crate::data::{Response, merge_maps, parsers};
use crate::datasource::{self, DataSource};
use crate::error::{DatasourceError, Result};

/// Deep-merges other datasources: `merge:<source 1>|<source 2>[|<source n>...]`.
///
/// Each source is an alias or an absolute URL, and the leftmost source
/// wins on conflicts. The result is always YAML. Query strings and
/// fragments on the `merge:` URL apply to the merged data, so sources that
/// need them should be defined as aliases.
pub struct MergeRequester {
    sources: RwLock<HashMap<String, DataSource>>,
}

impl MergeRequester {
    pub fn new() -> Self {
        Self::with_sources(HashMap::new())
    }

    pub fn with_sources(sources: HashMap<String, DataSource>) -> Self {
        Self {
            sources: RwLock::new(sources),
        }
    }

    fn lookup(&self, ctx: &Context, part: &str) -> Result<DataSource> {
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        for (alias, ds) in ctx.aliases() {
            sources.insert(alias.clone(), ds.clone());
        }

        if let Some(ds) = sources.get(part) {
            return Ok(ds.clone());
        }

        if let Ok(url) = Url::parse(part) {
            trace!(source = part, "caching literal merge source");
            let ds = DataSource::new(url);
            sources.insert(part.to_string(), ds.clone());
            return Ok(ds);
        }

        // maybe it's a relative filename
        let url = parse_source_url(part).map_err(|e| {
            DatasourceError::Config(format!("failed to lookup datasource {part}: {e}"))
        })?;
        Ok(DataSource::new(url))
    }
}

impl Default for MergeRequester {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Requester for MergeRequester {
    fn schemes(&self) -> &'static [&'static str] {
        &["merge"]
    }

    async fn request(&self, ctx: &Context, url: &Url, _header: &HeaderMap) -> Result<Response> {
        let parts: Vec<&str> = url.path().split('|').collect();
        if parts.len() < 2 {
            return Err(DatasourceError::Merge(
                "need at least 2 datasources to merge".to_string(),
            ));
        }

        let mut maps = Vec::with_capacity(parts.len());
        for part in parts {
            let source = self.lookup(ctx, part)?;
            debug!(source = part, url = %source.url, "reading merge source");

            let resp = datasource::request(ctx, &source, &[]).await?;
            maps.push(parse_map(resp).await?);
        }

        let merged = merge_maps(maps.into_iter());
        let out = serde_yaml::to_string(&Value::Object(merged))?;
        Ok(Response::from_bytes(out.into_bytes(), YAML_MIMETYPE))
    }
}

async fn parse_map(resp: Response) -> Result<Map<String, Value>> {
    let content_type = resp.content_type.clone();
    match resp.parse().await? {
        Value::Object(map) => Ok(map),
        other => Err(DatasourceError::Merge(format!(
            "unexpected data type '{}' for datasource (type {content_type}); merge: can only merge maps",
            parsers::kind(&other)
        ))),
    }
}
