//! Parsing of datasource values given on the command line or in config files

use anyhow::{Result as AnyResult, anyhow, bail};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use url::Url;

use crate::datasource::DataSource;
use crate::error::{DatasourceError, Result};

/// Turn a datasource value into an absolute URL.
///
/// `-` means standard input. Anything that isn't already an absolute URL is
/// taken as a filesystem path relative to the working directory.
pub fn parse_source_url(value: &str) -> Result<Url> {
    if value == "-" {
        return Ok(Url::parse("stdin:")?);
    }

    match Url::parse(value) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => abs_file_url(value),
        Err(e) => Err(DatasourceError::Config(format!(
            "can't parse value {value} as URL: {e}"
        ))),
    }
}

fn abs_file_url(value: &str) -> Result<Url> {
    let wd = std::env::current_dir().map_err(|e| {
        DatasourceError::Config(format!("can't get working directory: {e}"))
    })?;
    let base = Url::from_directory_path(&wd).map_err(|_| {
        DatasourceError::Config(format!(
            "working directory {} is not absolute",
            wd.display()
        ))
    })?;
    Ok(base.join(value)?)
}

/// Parse `alias=value`. Without an alias, a bare file name in the working
/// directory is accepted and named after the part before its first `.`.
pub fn parse_datasource_arg(value: &str) -> AnyResult<(String, DataSource)> {
    let (alias, source, explicit) = match value.split_once('=') {
        Some((alias, source)) if !source.is_empty() => (alias.to_string(), source, true),
        Some((alias, _)) => (file_alias(value), alias, false),
        None => (file_alias(value), value, false),
    };

    if !explicit && (source.is_empty() || source.contains('/')) {
        bail!("invalid argument ({value}): must provide an alias with files not in working directory");
    }
    if alias.is_empty() {
        bail!("invalid argument ({value}): alias must not be empty");
    }

    let url = parse_source_url(source)?;
    Ok((alias, DataSource::new(url)))
}

fn file_alias(value: &str) -> String {
    value.split('.').next().unwrap_or_default().to_string()
}

/// Parse `alias=Name: value` header arguments into per-alias header tables.
/// Repeated names for the same alias accumulate.
pub fn parse_header_args<S: AsRef<str>>(args: &[S]) -> AnyResult<HashMap<String, HeaderMap>> {
    let mut headers: HashMap<String, HeaderMap> = HashMap::new();
    for arg in args {
        let arg = arg.as_ref();
        let (alias, header) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid datasource-header option '{arg}'"))?;
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| anyhow!("invalid HTTP Header format '{header}'"))?;

        let (name, value) = header_pair(name, value)?;
        headers.entry(alias.to_string()).or_default().append(name, value);
    }
    Ok(headers)
}

/// Validate a header name and value, trimming surrounding whitespace from the value
pub(crate) fn header_pair(name: &str, value: &str) -> AnyResult<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|e| anyhow!("invalid header name '{name}': {e}"))?;
    let value = HeaderValue::from_str(value.trim())
        .map_err(|e| anyhow!("invalid value for header '{name}': {e}"))?;
    Ok((name, value))
}
