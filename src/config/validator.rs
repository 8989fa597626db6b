use anyhow::{Context, Result, anyhow};

use super::schema::{Config, DataSourceConfig};
use crate::requesters::Registry;

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &Config, registry: &Registry) -> Result<()> {
        config.http.timeout()?;

        for (alias, ds) in &config.datasources {
            if alias.trim().is_empty() {
                return Err(anyhow!("Datasource alias cannot be empty"));
            }
            Self::validate_data_source(ds, registry)
                .with_context(|| format!("Invalid datasource: {alias}"))?;
        }

        Ok(())
    }

    fn validate_data_source(ds: &DataSourceConfig, registry: &Registry) -> Result<()> {
        if ds.url.trim().is_empty() {
            return Err(anyhow!("Datasource url cannot be empty"));
        }

        // parses the URL and every header
        let resolved = ds.to_data_source()?;
        let scheme = resolved.url.scheme();

        registry.builder(scheme)?;
        registry.requester(scheme).map_err(|e| {
            anyhow!(
                "{e}. Available schemes: {}",
                registry.schemes().join(", ")
            )
        })?;

        Ok(())
    }
}
