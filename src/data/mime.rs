use url::Url;

use crate::error::{DatasourceError, Result};

pub const TEXT_MIMETYPE: &str = "text/plain";
pub const CSV_MIMETYPE: &str = "text/csv";
pub const JSON_MIMETYPE: &str = "application/json";
pub const JSON_ARRAY_MIMETYPE: &str = "application/array+json";
pub const TOML_MIMETYPE: &str = "application/toml";
pub const YAML_MIMETYPE: &str = "application/yaml";
pub const ENV_MIMETYPE: &str = "application/x-env";

/// Extensions we always want to recognise, checked before the platform table
const EXTENSIONS: &[(&str, &str)] = &[
    ("json", JSON_MIMETYPE),
    ("yml", YAML_MIMETYPE),
    ("yaml", YAML_MIMETYPE),
    ("csv", CSV_MIMETYPE),
    ("toml", TOML_MIMETYPE),
    ("env", ENV_MIMETYPE),
];

/// Non-canonical types that are sometimes seen in the wild
const ALIASES: &[(&str, &str)] = &[
    ("application/x-yaml", YAML_MIMETYPE),
    ("application/text", TEXT_MIMETYPE),
];

/// Resolve the MIME type to use when parsing a response for `url`.
///
/// First match wins:
/// 1. the `type` query parameter
/// 2. the `hint` supplied by the requester
/// 3. the type registered for the path's file extension
/// 4. `text/plain`
///
/// The chosen value is parsed as a media type and returned without
/// parameters. A malformed media type is an error, not a fallback.
pub fn mime_type(url: &Url, hint: &str) -> Result<String> {
    let mut media_type = url
        .query_pairs()
        .find(|(k, _)| k == "type")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default();

    if media_type.is_empty() {
        media_type = hint.to_string();
    }

    // make it so + doesn't need to be escaped
    let mut media_type = media_type.replace(' ', "+");

    if media_type.is_empty() {
        media_type = type_by_extension(url.path()).unwrap_or_default();
    }

    if media_type.is_empty() {
        return Ok(TEXT_MIMETYPE.to_string());
    }

    let parsed: mime::Mime = media_type
        .parse()
        .map_err(|e: mime::FromStrError| DatasourceError::MediaType {
            media_type: media_type.clone(),
            reason: e.to_string(),
        })?;

    Ok(parsed.essence_str().to_string())
}

/// Normalise a content type through the alias table
pub fn mime_alias(media_type: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == media_type)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(media_type)
}

fn type_by_extension(path: &str) -> Option<String> {
    let ext = extension(path)?.to_ascii_lowercase();

    if let Some((_, t)) = EXTENSIONS.iter().find(|(e, _)| *e == ext) {
        return Some((*t).to_string());
    }

    mime_guess::from_ext(&ext).first_raw().map(String::from)
}

/// The extension of the last path element, without the dot
fn extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let idx = name.rfind('.')?;
    let ext = &name[idx + 1..];
    if ext.is_empty() { None } else { Some(ext) }
}
