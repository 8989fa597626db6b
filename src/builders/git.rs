use std::borrow::Cow;
use url::Url;

use super::query::Query;
use super::{UrlBuilder, parse_arg, path, single_arg};
use crate::error::Result;

/// Builds git URLs, where `//` in the path separates the repository from
/// the path inside it: `git+https://host/org/repo//dir/file.json`
#[derive(Debug, Default, Clone, Copy)]
pub struct GitUrlBuilder;

impl UrlBuilder for GitUrlBuilder {
    fn build_url<'a>(&self, url: &'a Url, args: &[&str]) -> Result<Cow<'a, Url>> {
        let Some(arg) = single_arg(url, args)? else {
            return Ok(Cow::Borrowed(url));
        };
        let arg = parse_arg(arg)?;

        let orig = url.path();
        let (repo_path, sub_path) = match orig.split_once("//") {
            Some((repo, sub)) => (repo.to_string(), format!("/{sub}")),
            None => (orig.to_string(), "/".to_string()),
        };

        let (arg_repo, arg_sub) = parse_arg_path(orig, arg.path);
        let mut new_path = path::join(&[&repo_path, arg_repo]);
        let sub_path = path::join(&[&sub_path, arg_sub]);
        if sub_path != "/" {
            new_path = format!("{new_path}/{sub_path}");
        }

        let mut out = url.clone();
        out.set_path(&new_path);

        // query parameters accumulate here rather than override
        let mut q = Query::of(url);
        if let Some(arg_query) = arg.raw_query() {
            q.merge_add(Query::parse(arg_query));
        }
        q.apply(&mut out);

        if let Some(frag) = arg.fragment.filter(|f| !f.is_empty()) {
            out.set_fragment(Some(frag));
        }

        Ok(Cow::Owned(out))
    }
}

/// Split an argument path into (repo extension, subpath).
///
/// Once the base already names a subpath, or the argument starts with `//`,
/// the whole argument is subpath.
pub fn parse_arg_path<'a>(orig: &str, arg: &'a str) -> (&'a str, &'a str) {
    if orig.contains("//") || arg.starts_with("//") {
        return ("", arg);
    }

    match arg.split_once("//") {
        Some((repo, _)) => (repo, &arg[repo.len() + 1..]),
        None => (arg, ""),
    }
}
