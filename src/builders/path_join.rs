use std::borrow::Cow;
use url::Url;

use super::query::Query;
use super::{UrlBuilder, path, parse_arg, single_arg};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathJoinFlavor {
    /// `file` and `consul*`: everything but the path and query is carried through
    Full,
    /// Secrets manager and object storage: the fragment is dropped
    Stripped,
}

/// Appends the argument's path to the base path, keeping "directory"
/// trailing slashes from the argument
#[derive(Debug, Clone, Copy)]
pub struct PathJoinUrlBuilder {
    flavor: PathJoinFlavor,
}

impl PathJoinUrlBuilder {
    pub fn new(flavor: PathJoinFlavor) -> Self {
        Self { flavor }
    }
}

impl UrlBuilder for PathJoinUrlBuilder {
    fn build_url<'a>(&self, url: &'a Url, args: &[&str]) -> Result<Cow<'a, Url>> {
        let arg = single_arg(url, args)?;
        if arg.is_none() && self.flavor == PathJoinFlavor::Full {
            return Ok(Cow::Borrowed(url));
        }

        let mut out = url.clone();
        if self.flavor == PathJoinFlavor::Stripped {
            out.set_fragment(None);
        }

        let Some(arg) = arg else {
            return Ok(Cow::Owned(out));
        };
        let arg = parse_arg(arg)?;

        if !arg.path.is_empty() {
            let mut joined = path::join(&[url.path(), arg.path]);
            if arg.path.ends_with('/') && !joined.ends_with('/') {
                joined.push('/');
            }
            out.set_path(&joined);
        }

        if let Some(arg_query) = arg.raw_query() {
            let mut q = Query::of(url);
            q.merge_override(Query::parse(arg_query));
            q.apply(&mut out);
        }

        Ok(Cow::Owned(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatasourceError;

    fn build(flavor: PathJoinFlavor, base: &str, args: &[&str]) -> String {
        let u = Url::parse(base).unwrap();
        PathJoinUrlBuilder::new(flavor)
            .build_url(&u, args)
            .unwrap()
            .as_str()
            .to_string()
    }

    #[test]
    fn test_too_many_args() {
        let u = Url::parse("aws+sm:base").unwrap();
        let err = PathJoinUrlBuilder::new(PathJoinFlavor::Stripped)
            .build_url(&u, &["extra", "too many!"])
            .unwrap_err();
        assert!(matches!(err, DatasourceError::TooManyArgs { count: 2, .. }));
    }

    #[test]
    fn test_secrets_paths() {
        use PathJoinFlavor::Stripped;
        let cases = [
            ("aws+sm:///foo", vec!["bar"], "aws+sm:///foo/bar"),
            ("aws+sm:foo", vec![], "aws+sm:foo"),
            ("aws+sm:foo/bar", vec![], "aws+sm:foo/bar"),
            ("aws+sm:/foo/bar", vec![], "aws+sm:/foo/bar"),
            ("aws+sm:foo", vec!["baz"], "aws+sm:foo/baz"),
            ("aws+sm:foo/bar", vec!["baz"], "aws+sm:foo/bar/baz"),
            ("aws+sm:/foo/bar", vec!["baz"], "aws+sm:/foo/bar/baz"),
            ("aws+sm:///foo", vec!["dir/"], "aws+sm:///foo/dir/"),
            ("aws+sm:///foo/", vec![], "aws+sm:///foo/"),
            ("aws+sm:///foo/", vec!["baz"], "aws+sm:///foo/baz"),
            ("aws+sm:///foo/", vec!["/extra"], "aws+sm:///foo/extra"),
            ("aws+sm:foo?type=text/plain", vec!["baz"], "aws+sm:foo/baz?type=text/plain"),
            (
                "aws+sm:/foo/bar?type=text/plain",
                vec!["baz/qux?type=application/json&param=quux"],
                "aws+sm:/foo/bar/baz/qux?param=quux&type=application%2Fjson",
            ),
            ("aws+smp:///foo#frag", vec![], "aws+smp:///foo"),
        ];
        for (base, args, expected) in cases {
            assert_eq!(build(Stripped, base, &args), expected, "{base} {args:?}");
        }
    }

    #[test]
    fn test_blob_paths() {
        use PathJoinFlavor::Stripped;
        let cases = [
            ("s3://mybucket/foo", vec!["bar"], "s3://mybucket/foo/bar"),
            ("s3://mybucket/foo/bar", vec![], "s3://mybucket/foo/bar"),
            ("s3://mybucket/foo/bar", vec!["baz"], "s3://mybucket/foo/bar/baz"),
            ("s3://mybucket/foo", vec!["dir/"], "s3://mybucket/foo/dir/"),
            ("s3://mybucket/foo/", vec![], "s3://mybucket/foo/"),
            ("s3://mybucket/foo/", vec!["baz"], "s3://mybucket/foo/baz"),
            ("s3://mybucket", vec!["baz"], "s3://mybucket/baz"),
            (
                "s3://mybucket/foo?type=text/plain",
                vec!["baz"],
                "s3://mybucket/foo/baz?type=text/plain",
            ),
            (
                "s3://mybucket/dir1/?region=us-east-1&disableSSL=true&s3ForcePathStyle=true",
                vec!["?endpoint=example.com"],
                "s3://mybucket/dir1/?disableSSL=true&endpoint=example.com&region=us-east-1&s3ForcePathStyle=true",
            ),
            (
                "s3://mybucket/foo/bar?type=text/plain",
                vec!["baz/qux?type=application/json&param=quux"],
                "s3://mybucket/foo/bar/baz/qux?param=quux&type=application%2Fjson",
            ),
        ];
        for (base, args, expected) in cases {
            assert_eq!(build(Stripped, base, &args), expected, "{base} {args:?}");
        }
    }

    #[test]
    fn test_file_and_consul_keep_everything() {
        use PathJoinFlavor::Full;
        let cases = [
            ("file:///foo", vec![], "file:///foo"),
            ("file:///tmp/partial/", vec![], "file:///tmp/partial/"),
            (
                "file:///tmp/partial/?type=application/json",
                vec!["foo.txt"],
                "file:///tmp/partial/foo.txt?type=application/json",
            ),
            ("file:///tmp/foo.txt", vec!["bar.txt"], "file:///tmp/foo.txt/bar.txt"),
            ("consul://server:8500/app", vec!["db/"], "consul://server:8500/app/db/"),
            ("consul:///app#frag", vec!["key"], "consul:///app/key#frag"),
        ];
        for (base, args, expected) in cases {
            assert_eq!(build(Full, base, &args), expected, "{base} {args:?}");
        }
    }

    #[test]
    fn test_full_without_args_is_identity() {
        let u = Url::parse("file:///tmp/foo.txt").unwrap();
        let out = PathJoinUrlBuilder::new(PathJoinFlavor::Full)
            .build_url(&u, &[])
            .unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
    }
}
