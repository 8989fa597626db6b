//! Lexical handling of slash-separated URL paths

/// Shortest equivalent path: collapses repeated slashes, drops `.` and
/// resolves `..` against preceding elements. An empty path cleans to `.`.
pub fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut out: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if out.last().is_some_and(|s| *s != "..") {
                    out.pop();
                } else if !rooted {
                    out.push("..");
                }
            }
            s => out.push(s),
        }
    }

    let joined = out.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Join non-empty elements with `/` and clean the result. All-empty input joins to "".
pub fn join(elems: &[&str]) -> String {
    let parts: Vec<&str> = elems.iter().copied().filter(|e| !e.is_empty()).collect();
    if parts.is_empty() {
        return String::new();
    }
    clean(&parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean() {
        assert_eq!(clean(""), ".");
        assert_eq!(clean("/"), "/");
        assert_eq!(clean("a//b/./c/"), "a/b/c");
        assert_eq!(clean("/a/b/../c"), "/a/c");
        assert_eq!(clean("/../a"), "/a");
        assert_eq!(clean("../a"), "../a");
    }

    #[test]
    fn test_join() {
        assert_eq!(join(&["", ""]), "");
        assert_eq!(join(&["/", ""]), "/");
        assert_eq!(join(&["/foo/", "/extra"]), "/foo/extra");
        assert_eq!(join(&["base", "extra"]), "base/extra");
        assert_eq!(join(&["/", "//bar"]), "/bar");
        assert_eq!(join(&["/bar", "/baz//qux"]), "/bar/baz/qux");
    }
}
