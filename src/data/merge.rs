use serde_json::{Map, Value};

/// Deep-merge maps with the earliest map taking precedence.
///
/// When a key collides and both values are maps they are merged recursively
/// (the earlier map still wins nested collisions). Any other collision keeps
/// the earlier value as-is, even if the later one is a map.
pub fn merge_maps(mut maps: impl Iterator<Item = Map<String, Value>>) -> Map<String, Value> {
    let Some(first) = maps.next() else {
        return Map::new();
    };
    maps.fold(first, merge_into)
}

fn merge_into(mut dst: Map<String, Value>, src: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in src {
        match dst.get_mut(&key) {
            None => {
                dst.insert(key, value);
            }
            Some(Value::Object(existing)) => {
                if let Value::Object(incoming) = value {
                    let merged = merge_into(std::mem::take(existing), incoming);
                    *existing = merged;
                }
            }
            Some(_) => {}
        }
    }
    dst
}
