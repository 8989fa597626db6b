use serde_json::Value;
use std::fmt;
use std::io::Cursor;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::mime::{
    CSV_MIMETYPE, ENV_MIMETYPE, JSON_ARRAY_MIMETYPE, JSON_MIMETYPE, TEXT_MIMETYPE, TOML_MIMETYPE,
    YAML_MIMETYPE, mime_alias,
};
use super::parsers;
use crate::error::{DatasourceError, Result};

/// Upper bound on the buffer reserved up front from a reported length
const MAX_PREALLOC: u64 = 64 * 1024;

/// A single-read byte stream. Dropping it releases the underlying file or connection.
pub type Body = Pin<Box<dyn AsyncRead + Send>>;

/// The result of one fetch
pub struct Response {
    body: Option<Body>,
    /// Negotiated media type, without parameters
    pub content_type: String,
    /// Body length in bytes, `None` when unknown
    pub content_length: Option<u64>,
}

impl Response {
    pub fn new(body: Body, content_type: impl Into<String>, content_length: Option<u64>) -> Self {
        Self {
            body: Some(body),
            content_type: content_type.into(),
            content_length,
        }
    }

    /// Response over an in-memory buffer
    pub fn from_bytes(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        let len = bytes.len() as u64;
        Self::new(Box::pin(Cursor::new(bytes)), content_type, Some(len))
    }

    /// Take ownership of the body. Later calls return `None`.
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    /// Release the body. Closing twice is a no-op.
    pub fn close(&mut self) {
        self.body = None;
    }

    pub fn is_closed(&self) -> bool {
        self.body.is_none()
    }

    /// Read the whole body, releasing it afterwards
    pub async fn bytes(mut self) -> Result<Vec<u8>> {
        let mut body = self
            .take_body()
            .ok_or(DatasourceError::BodyConsumed)?;

        let mut buf = Vec::with_capacity(self.content_length.unwrap_or(0).min(MAX_PREALLOC) as usize);
        body.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Read and decode the body according to its content type.
    ///
    /// JSON and YAML are tried as a map first and as an array second, since
    /// the declared type alone doesn't say which one a document holds.
    pub async fn parse(self) -> Result<Value> {
        let content_type = self.content_type.clone();
        let bytes = self.bytes().await?;
        let s = String::from_utf8_lossy(&bytes);

        match mime_alias(&content_type) {
            JSON_MIMETYPE => match parsers::json(&s) {
                Ok(map) => Ok(Value::Object(map)),
                Err(err) => parsers::json_array(&s).map(Value::Array).map_err(|_| err),
            },
            JSON_ARRAY_MIMETYPE => parsers::json_array(&s).map(Value::Array),
            YAML_MIMETYPE => match parsers::yaml(&s) {
                Ok(map) => Ok(Value::Object(map)),
                Err(err) => parsers::yaml_array(&s).map(Value::Array).map_err(|_| err),
            },
            CSV_MIMETYPE => {
                let rows = parsers::csv(&s)?;
                Ok(Value::Array(
                    rows.into_iter()
                        .map(|row| Value::Array(row.into_iter().map(Value::String).collect()))
                        .collect(),
                ))
            }
            TOML_MIMETYPE => parsers::toml(&s).map(Value::Object),
            ENV_MIMETYPE => parsers::dotenv(&s).map(Value::Object),
            TEXT_MIMETYPE => Ok(Value::String(s.into_owned())),
            _ => Err(DatasourceError::UnsupportedContentType(content_type)),
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn parse(body: &str, content_type: &str) -> Result<Value> {
        Response::from_bytes(body.as_bytes().to_vec(), content_type)
            .parse()
            .await
    }

    #[tokio::test]
    async fn test_parse_json_map_then_array() {
        assert_eq!(
            parse(r#"{"hello": "world"}"#, JSON_MIMETYPE).await.unwrap(),
            json!({"hello": "world"})
        );
        assert_eq!(
            parse(r#"["hello", "world"]"#, JSON_MIMETYPE).await.unwrap(),
            json!(["hello", "world"])
        );
        assert!(parse("{nope", JSON_MIMETYPE).await.is_err());
    }

    #[tokio::test]
    async fn test_parse_forced_array() {
        assert_eq!(
            parse(r#"["a"]"#, JSON_ARRAY_MIMETYPE).await.unwrap(),
            json!(["a"])
        );
        assert!(parse(r#"{"a": 1}"#, JSON_ARRAY_MIMETYPE).await.is_err());
    }

    #[tokio::test]
    async fn test_parse_yaml_via_alias() {
        assert_eq!(
            parse("hello: earth\n", "application/x-yaml").await.unwrap(),
            json!({"hello": "earth"})
        );
        assert_eq!(
            parse("- one\n- two\n", YAML_MIMETYPE).await.unwrap(),
            json!(["one", "two"])
        );
    }

    #[tokio::test]
    async fn test_parse_other_formats() {
        assert_eq!(
            parse("a,b\n1,2\n", CSV_MIMETYPE).await.unwrap(),
            json!([["a", "b"], ["1", "2"]])
        );
        assert_eq!(
            parse("x = 1\n", TOML_MIMETYPE).await.unwrap(),
            json!({"x": 1})
        );
        assert_eq!(
            parse("FOO=bar\n", ENV_MIMETYPE).await.unwrap(),
            json!({"FOO": "bar"})
        );
        assert_eq!(
            parse("plain text...", "application/text").await.unwrap(),
            json!("plain text...")
        );
    }

    #[tokio::test]
    async fn test_parse_unsupported_type() {
        let err = parse("whatever", "foo/bar").await.unwrap_err();
        assert!(matches!(err, DatasourceError::UnsupportedContentType(ref t) if t == "foo/bar"));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut resp = Response::from_bytes(b"hi".to_vec(), TEXT_MIMETYPE);
        assert!(!resp.is_closed());
        resp.close();
        resp.close();
        assert!(resp.is_closed());
        assert!(resp.take_body().is_none());
    }

    #[tokio::test]
    async fn test_bytes_after_take_body_fails() {
        let mut resp = Response::from_bytes(b"hi".to_vec(), TEXT_MIMETYPE);
        let _body = resp.take_body();
        let err = resp.bytes().await.unwrap_err();
        assert!(matches!(err, DatasourceError::BodyConsumed));
        assert!(!err.is_config_error());
    }

    #[tokio::test]
    async fn test_bytes_ignores_oversized_length() {
        let resp = Response::new(
            Box::pin(Cursor::new(b"tiny".to_vec())),
            TEXT_MIMETYPE,
            Some(u64::MAX),
        );
        assert_eq!(resp.bytes().await.unwrap(), b"tiny");
    }
}
