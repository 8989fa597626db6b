use std::borrow::Cow;
use url::Url;

use super::query::Query;
use super::{UrlBuilder, parse_arg, single_arg};
use crate::error::{DatasourceError, Result};

/// Resolves the argument as a relative reference against the base URL
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpUrlBuilder;

impl UrlBuilder for HttpUrlBuilder {
    fn build_url<'a>(&self, url: &'a Url, args: &[&str]) -> Result<Cow<'a, Url>> {
        let Some(arg) = single_arg(url, args)? else {
            return Ok(Cow::Borrowed(url));
        };

        let parsed = parse_arg(arg)?;
        let mut out = url
            .join(arg)
            .map_err(|e| DatasourceError::argument(arg, e))?;

        match (parsed.raw_query(), url.query().filter(|q| !q.is_empty())) {
            (None, base) => out.set_query(base),
            (Some(arg_query), Some(_)) => {
                let mut q = Query::of(url);
                q.merge_override(Query::parse(arg_query));
                q.apply(&mut out);
            }
            (Some(_), None) => {}
        }

        if let Some(frag) = url.fragment().filter(|f| !f.is_empty()) {
            out.set_fragment(Some(frag));
        }

        Ok(Cow::Owned(out))
    }
}
