//! URL builders compose the URL to fetch from a datasource's declared URL
//! and the arguments given at the call site.

use std::borrow::Cow;
use url::Url;

use crate::error::{DatasourceError, Result};

pub mod boltdb;
pub mod git;
pub mod http;
pub mod path;
pub mod path_join;
pub mod query;

pub use boltdb::BoltDbUrlBuilder;
pub use git::GitUrlBuilder;
pub use http::HttpUrlBuilder;
pub use path_join::{PathJoinFlavor, PathJoinUrlBuilder};

/// Strategy for building the URL to fetch for one scheme family
pub trait UrlBuilder: Send + Sync {
    /// Build the concrete URL from `url` and the caller's arguments.
    ///
    /// Builders that have nothing to change return the input borrowed, so
    /// callers can tell "untouched" apart from "rebuilt".
    fn build_url<'a>(&self, url: &'a Url, args: &[&str]) -> Result<Cow<'a, Url>>;
}

/// For schemes with no sub-addressing (`env`, `stdin`, `merge`)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopUrlBuilder;

impl UrlBuilder for NoopUrlBuilder {
    fn build_url<'a>(&self, url: &'a Url, _args: &[&str]) -> Result<Cow<'a, Url>> {
        Ok(Cow::Borrowed(url))
    }
}

/// A caller argument split into its raw (still percent-encoded) parts
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArgRef<'a> {
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

impl ArgRef<'_> {
    /// The path with percent-escapes decoded
    pub fn decoded_path(&self) -> String {
        percent_encoding::percent_decode_str(self.path)
            .decode_utf8_lossy()
            .into_owned()
    }

    /// Query string if present and non-empty
    pub fn raw_query(&self) -> Option<&str> {
        self.query.filter(|q| !q.is_empty())
    }
}

/// Split a relative reference into path, query and fragment.
///
/// Control characters and malformed percent-escapes are rejected rather
/// than silently dropped.
pub fn parse_arg(arg: &str) -> Result<ArgRef<'_>> {
    if let Some(c) = arg.chars().find(|c| c.is_ascii_control()) {
        return Err(DatasourceError::argument(
            arg,
            format!("invalid control character {c:?} in URL"),
        ));
    }
    check_escapes(arg)?;

    let (rest, fragment) = match arg.split_once('#') {
        Some((rest, frag)) => (rest, Some(frag)),
        None => (arg, None),
    };
    let (path, query) = match rest.split_once('?') {
        Some((path, q)) => (path, Some(q)),
        None => (rest, None),
    };

    Ok(ArgRef {
        path,
        query,
        fragment,
    })
}

/// At most one positional argument is accepted by every builder
pub(crate) fn single_arg<'a>(url: &Url, args: &[&'a str]) -> Result<Option<&'a str>> {
    match args {
        [] => Ok(None),
        [arg] => Ok(Some(*arg)),
        _ => Err(DatasourceError::TooManyArgs {
            scheme: url.scheme().to_string(),
            count: args.len(),
        }),
    }
}

fn check_escapes(arg: &str) -> Result<()> {
    let bytes = arg.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                let end = (i + 3).min(bytes.len());
                return Err(DatasourceError::argument(
                    arg,
                    format!("invalid URL escape {:?}", String::from_utf8_lossy(&bytes[i..end])),
                ));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}
