use std::collections::BTreeMap;
use url::Url;
use url::form_urlencoded;

/// Multi-valued query parameters. Keys encode in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(BTreeMap<String, Vec<String>>);

impl Query {
    pub fn parse(raw: &str) -> Self {
        let mut q = Self::default();
        for (k, v) in form_urlencoded::parse(raw.as_bytes()) {
            q.add(k.into_owned(), v.into_owned());
        }
        q
    }

    pub fn of(url: &Url) -> Self {
        url.query().map(Self::parse).unwrap_or_default()
    }

    /// Replace all values of `key`
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), vec![value.into()]);
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|vs| vs.first()).map(String::as_str)
    }

    /// Overwrite keys present in `other`; when `other` repeats a key its last value wins
    pub fn merge_override(&mut self, other: Query) {
        for (k, vs) in other.0 {
            if let Some(last) = vs.into_iter().last() {
                self.set(k, last);
            }
        }
    }

    /// Append every value from `other`, keeping duplicates
    pub fn merge_add(&mut self, other: Query) {
        for (k, vs) in other.0 {
            self.0.entry(k).or_default().extend(vs);
        }
    }

    pub fn encode(&self) -> String {
        let mut ser = form_urlencoded::Serializer::new(String::new());
        for (k, vs) in &self.0 {
            for v in vs {
                ser.append_pair(k, v);
            }
        }
        ser.finish()
    }

    /// Write into `url`, removing the `?` entirely when empty
    pub fn apply(&self, url: &mut Url) {
        let encoded = self.encode();
        url.set_query(if encoded.is_empty() { None } else { Some(&encoded) });
    }
}
