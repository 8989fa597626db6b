use anyhow::{Context as _, Result};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use super::args::{header_pair, parse_datasource_arg, parse_header_args, parse_source_url};
use crate::datasource::DataSource;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub datasources: BTreeMap<String, DataSourceConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// humantime duration, e.g. "5s" or "1m 30s"
    #[serde(default = "default_timeout")]
    pub timeout: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Result<Duration> {
        humantime::parse_duration(&self.timeout)
            .with_context(|| format!("Invalid http timeout: {}", self.timeout))
    }
}

fn default_timeout() -> String {
    "5s".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DataSourceConfig {
    pub url: String,
    #[serde(default)]
    pub header: BTreeMap<String, Vec<String>>,
}

impl DataSourceConfig {
    pub fn to_data_source(&self) -> Result<DataSource> {
        let url = parse_source_url(&self.url)?;

        let mut header = HeaderMap::new();
        for (name, values) in &self.header {
            for value in values {
                let (name, value) = header_pair(name, value)?;
                header.append(name, value);
            }
        }

        Ok(DataSource::new(url).with_header(header))
    }
}

impl Config {
    /// Apply `alias=value` datasource and `alias=Name: value` header
    /// arguments. A command-line datasource replaces a configured one with
    /// the same alias; headers are appended.
    pub fn merge_args<S: AsRef<str>>(&mut self, datasources: &[S], headers: &[S]) -> Result<()> {
        for arg in datasources {
            let arg = arg.as_ref();
            let (alias, ds) = parse_datasource_arg(arg)
                .with_context(|| format!("Invalid datasource argument: {arg}"))?;
            self.datasources.insert(
                alias,
                DataSourceConfig {
                    url: ds.url.to_string(),
                    header: BTreeMap::new(),
                },
            );
        }

        for (alias, header) in parse_header_args(headers)? {
            let entry = self.datasources.entry(alias).or_default();
            for (name, value) in header.iter() {
                let value = value
                    .to_str()
                    .with_context(|| format!("Header {name} is not valid text"))?;
                entry
                    .header
                    .entry(name.as_str().to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }

        Ok(())
    }

    /// Resolve every configured datasource
    pub fn data_sources(&self) -> Result<HashMap<String, DataSource>> {
        self.datasources
            .iter()
            .map(|(alias, cfg)| {
                cfg.to_data_source()
                    .with_context(|| format!("Invalid datasource: {alias}"))
                    .map(|ds| (alias.clone(), ds))
            })
            .collect()
    }
}
