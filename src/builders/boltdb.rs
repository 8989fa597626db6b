use std::borrow::Cow;
use url::Url;

use super::query::Query;
use super::{UrlBuilder, parse_arg};
use crate::error::{DatasourceError, Result};

/// Encodes the key argument into the `key` query parameter. The bucket in
/// the fragment is left alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoltDbUrlBuilder;

impl UrlBuilder for BoltDbUrlBuilder {
    fn build_url<'a>(&self, url: &'a Url, args: &[&str]) -> Result<Cow<'a, Url>> {
        let arg = match args {
            [] => return Err(DatasourceError::MissingKey),
            [arg] => parse_arg(arg)?,
            _ => {
                return Err(DatasourceError::TooManyArgs {
                    scheme: url.scheme().to_string(),
                    count: args.len(),
                });
            }
        };

        let mut q = Query::of(url);
        q.set("key", arg.decoded_path());
        if let Some(arg_query) = arg.raw_query() {
            q.merge_override(Query::parse(arg_query));
        }

        let mut out = url.clone();
        q.apply(&mut out);
        Ok(Cow::Owned(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(base: &str, args: &[&str]) -> Result<Url> {
        let u = Url::parse(base).unwrap();
        BoltDbUrlBuilder.build_url(&u, args).map(Cow::into_owned)
    }

    #[test]
    fn test_arg_count() {
        assert!(matches!(
            build("boltdb:///tmp/foo.db#Bucket1", &[]),
            Err(DatasourceError::MissingKey)
        ));
        assert!(matches!(
            build("boltdb:///tmp/foo.db#Bucket1", &["extra", "too many!"]),
            Err(DatasourceError::TooManyArgs { count: 2, .. })
        ));
    }

    #[test]
    fn test_key_encoding() {
        let cases = [
            (
                "boltdb:///tmp/foo.db#Bucket1",
                "key1",
                "boltdb:///tmp/foo.db?key=key1#Bucket1",
            ),
            (
                "boltdb:///tmp/foo.db?type=application/json#Bucket1",
                "key1",
                "boltdb:///tmp/foo.db?key=key1&type=application%2Fjson#Bucket1",
            ),
            (
                "boltdb:///tmp/foo.db?type=text/csv#Bucket1",
                "key1?type=application/json",
                "boltdb:///tmp/foo.db?key=key1&type=application%2Fjson#Bucket1",
            ),
        ];
        for (base, arg, expected) in cases {
            assert_eq!(build(base, &[arg]).unwrap().as_str(), expected);
        }
    }

    #[test]
    fn test_key_round_trip() {
        let out = build(
            "boltdb:///tmp/foo.db?type=text/csv#B1",
            &["key1?type=application/json"],
        )
        .unwrap();
        let q = Query::of(&out);
        assert_eq!(q.get("key"), Some("key1"));
        assert_eq!(q.get("type"), Some("application/json"));
        assert_eq!(out.fragment(), Some("B1"));
    }

    #[test]
    fn test_opaque_base() {
        let out = build("boltdb:foo.db#B", &["dir/sub"]).unwrap();
        assert_eq!(out.as_str(), "boltdb:foo.db?key=dir%2Fsub#B");
    }
}
