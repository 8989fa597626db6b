use async_trait::async_trait;
use aws_sdk_ssm::error::DisplayErrorContext;
use aws_sdk_ssm::primitives::DateTimeFormat;
use reqwest::header::HeaderMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

use super::{Requester, json_listing};
use crate::context::Context;
use crate::data::Response;
use crate::data::mime::{JSON_ARRAY_MIMETYPE, JSON_MIMETYPE, mime_type};
use crate::error::{DatasourceError, Result};

/// A parameter as returned by `GetParameter`, serialized with the AWS field names
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    pub value: String,
    pub version: i64,
    #[serde(rename = "ARN", skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_result: Option<String>,
}

/// One page of a `GetParametersByPath` listing
#[derive(Debug, Default)]
pub struct ParameterPage {
    pub names: Vec<String>,
    pub next_token: Option<String>,
}

/// The slice of the SSM API used for Parameter Store reads
#[async_trait]
pub trait ParameterStoreApi: Send + Sync {
    /// Read one parameter, decrypting secure strings
    async fn get_parameter(&self, name: &str) -> Result<Parameter>;

    async fn get_parameters_by_path(&self, path: &str, next_token: Option<String>) -> Result<ParameterPage>;
}

#[async_trait]
impl ParameterStoreApi for aws_sdk_ssm::Client {
    async fn get_parameter(&self, name: &str) -> Result<Parameter> {
        let out = self
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| DatasourceError::backend("read aws+smp parameter", name, DisplayErrorContext(&e)))?;

        let p = out
            .parameter()
            .ok_or_else(|| DatasourceError::backend("read aws+smp parameter", name, "empty response"))?;

        Ok(Parameter {
            name: p.name().unwrap_or_default().to_string(),
            r#type: p.r#type().map(|t| t.as_str().to_string()),
            value: p.value().unwrap_or_default().to_string(),
            version: p.version(),
            arn: p.arn().map(str::to_string),
            data_type: p.data_type().map(str::to_string),
            last_modified_date: p
                .last_modified_date()
                .and_then(|d| d.fmt(DateTimeFormat::DateTime).ok()),
            selector: p.selector().map(str::to_string),
            source_result: p.source_result().map(str::to_string),
        })
    }

    async fn get_parameters_by_path(&self, path: &str, next_token: Option<String>) -> Result<ParameterPage> {
        let out = self
            .get_parameters_by_path()
            .path(path)
            .with_decryption(true)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| DatasourceError::backend("list aws+smp parameters", path, DisplayErrorContext(&e)))?;

        Ok(ParameterPage {
            names: out
                .parameters()
                .iter()
                .filter_map(|p| p.name().map(str::to_string))
                .collect(),
            next_token: out.next_token().map(str::to_string),
        })
    }
}

/// AWS Systems Manager Parameter Store datasource: `aws+smp:///path/to/param`.
///
/// A path ending in `/` lists the parameters under it. Single reads return
/// the parameter record as JSON.
pub struct AwsParameterStoreRequester {
    client: OnceCell<Arc<dyn ParameterStoreApi>>,
}

impl AwsParameterStoreRequester {
    pub fn new() -> Self {
        Self {
            client: OnceCell::new(),
        }
    }

    pub fn with_client(client: Arc<dyn ParameterStoreApi>) -> Self {
        Self {
            client: OnceCell::new_with(Some(client)),
        }
    }

    async fn client(&self) -> &Arc<dyn ParameterStoreApi> {
        self.client
            .get_or_init(|| async {
                debug!("initializing SSM client");
                let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
                Arc::new(aws_sdk_ssm::Client::new(&config)) as Arc<dyn ParameterStoreApi>
            })
            .await
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        let client = self.client().await;
        let mut names = Vec::new();
        let mut token = None;
        loop {
            let page = client.get_parameters_by_path(path, token).await?;
            names.extend(
                page.names
                    .iter()
                    .map(|n| n.strip_prefix(path).unwrap_or(n).to_string()),
            );
            match page.next_token {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => break,
            }
        }
        Ok(names)
    }
}

impl Default for AwsParameterStoreRequester {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Requester for AwsParameterStoreRequester {
    fn schemes(&self) -> &'static [&'static str] {
        &["aws+smp"]
    }

    async fn request(&self, _ctx: &Context, url: &Url, _header: &HeaderMap) -> Result<Response> {
        let path = percent_encoding::percent_decode_str(url.path()).decode_utf8_lossy();

        let (data, hint) = if path.ends_with('/') {
            (json_listing(&self.list(&path).await?)?, JSON_ARRAY_MIMETYPE)
        } else {
            let param = self.client().await.get_parameter(&path).await?;
            (serde_json::to_vec(&param)?, JSON_MIMETYPE)
        };

        let content_type = mime_type(url, hint)?;
        Ok(Response::from_bytes(data, content_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    struct FakeParameters {
        params: BTreeMap<String, String>,
        page_size: usize,
    }

    impl FakeParameters {
        fn new(params: &[(&str, &str)]) -> Self {
            Self {
                params: params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                page_size: 2,
            }
        }
    }

    #[async_trait]
    impl ParameterStoreApi for FakeParameters {
        async fn get_parameter(&self, name: &str) -> Result<Parameter> {
            let value = self.params.get(name).ok_or_else(|| {
                DatasourceError::backend("read aws+smp parameter", name, "ParameterNotFound")
            })?;
            Ok(Parameter {
                name: name.to_string(),
                r#type: Some("String".to_string()),
                value: value.clone(),
                version: 1,
                ..Default::default()
            })
        }

        async fn get_parameters_by_path(&self, path: &str, next_token: Option<String>) -> Result<ParameterPage> {
            let start: usize = next_token.map(|t| t.parse().unwrap()).unwrap_or(0);
            let matching: Vec<String> = self
                .params
                .keys()
                .filter(|k| k.starts_with(path) && !k[path.len()..].contains('/'))
                .cloned()
                .collect();
            let end = (start + self.page_size).min(matching.len());
            Ok(ParameterPage {
                names: matching[start..end].to_vec(),
                next_token: (end < matching.len()).then(|| end.to_string()),
            })
        }
    }

    async fn request(r: &AwsParameterStoreRequester, u: &str) -> Result<Response> {
        r.request(&Context::default(), &Url::parse(u).unwrap(), &HeaderMap::new())
            .await
    }

    fn requester() -> AwsParameterStoreRequester {
        AwsParameterStoreRequester::with_client(Arc::new(FakeParameters::new(&[
            ("/app/a", "1"),
            ("/app/b", "2"),
            ("/app/c", "3"),
            ("/app/deep/d", "4"),
            ("/other", "x"),
        ])))
    }

    #[tokio::test]
    async fn test_read_parameter() {
        let r = requester();
        let resp = request(&r, "aws+smp:///app/a").await.unwrap();
        assert_eq!(resp.content_type, JSON_MIMETYPE);
        assert_eq!(
            resp.parse().await.unwrap(),
            json!({"Name": "/app/a", "Type": "String", "Value": "1", "Version": 1})
        );
    }

    #[tokio::test]
    async fn test_list_parameters_across_pages() {
        let r = requester();
        let resp = request(&r, "aws+smp:///app/").await.unwrap();
        assert_eq!(resp.content_type, JSON_ARRAY_MIMETYPE);
        assert_eq!(resp.parse().await.unwrap(), json!(["a", "b", "c"]));
    }

    #[tokio::test]
    async fn test_missing_parameter() {
        let r = requester();
        let err = request(&r, "aws+smp:///app/nope").await.unwrap_err();
        assert!(err.to_string().contains("ParameterNotFound"));
    }
}
