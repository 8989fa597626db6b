use async_trait::async_trait;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

use super::Requester;
use crate::context::Context;
use crate::data::Response;
use crate::data::mime::mime_type;
use crate::error::{DatasourceError, Result};

/// The slice of the Secrets Manager API used for reading secrets
#[async_trait]
pub trait SecretsManagerApi: Send + Sync {
    /// The secret's string value, or its binary value when it has no string
    async fn get_secret_value(&self, secret_id: &str) -> Result<Vec<u8>>;
}

#[async_trait]
impl SecretsManagerApi for aws_sdk_secretsmanager::Client {
    async fn get_secret_value(&self, secret_id: &str) -> Result<Vec<u8>> {
        let out = self
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| DatasourceError::backend("read aws+sm secret", secret_id, DisplayErrorContext(&e)))?;

        if let Some(s) = out.secret_string() {
            return Ok(s.as_bytes().to_vec());
        }
        Ok(out
            .secret_binary()
            .map(|b| b.as_ref().to_vec())
            .unwrap_or_default())
    }
}

/// AWS Secrets Manager datasource: `aws+sm:///path/to/secret`.
///
/// The SDK client is built from the default credential chain on first use.
pub struct AwsSecretsManagerRequester {
    client: OnceCell<Arc<dyn SecretsManagerApi>>,
}

impl AwsSecretsManagerRequester {
    pub fn new() -> Self {
        Self {
            client: OnceCell::new(),
        }
    }

    /// Use a pre-built client instead of the SDK default
    pub fn with_client(client: Arc<dyn SecretsManagerApi>) -> Self {
        Self {
            client: OnceCell::new_with(Some(client)),
        }
    }

    async fn client(&self) -> &Arc<dyn SecretsManagerApi> {
        self.client
            .get_or_init(|| async {
                debug!("initializing Secrets Manager client");
                let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
                Arc::new(aws_sdk_secretsmanager::Client::new(&config)) as Arc<dyn SecretsManagerApi>
            })
            .await
    }
}

impl Default for AwsSecretsManagerRequester {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Requester for AwsSecretsManagerRequester {
    fn schemes(&self) -> &'static [&'static str] {
        &["aws+sm"]
    }

    async fn request(&self, _ctx: &Context, url: &Url, _header: &HeaderMap) -> Result<Response> {
        let secret_id = percent_encoding::percent_decode_str(url.path()).decode_utf8_lossy();
        let data = self.client().await.get_secret_value(&secret_id).await?;
        let content_type = mime_type(url, "")?;
        Ok(Response::from_bytes(data, content_type))
    }
}
