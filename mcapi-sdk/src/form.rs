//! Decoding of `application/x-www-form-urlencoded` bodies with bracket
//! nesting.
//!
//! Webhook bodies encode nested data as `data[merges][FNAME]=Ada`, so a flat
//! key/value decode is not enough. Keys are split into a base name and a list
//! of bracketed segments and inserted into a tree of [`Payload`] maps:
//!
//! * `a[b][c]=v` nests three levels deep.
//! * `a[]=v` appends under the next free integer index of `a`.
//! * An unmatched `[` leaves the key flat, with that `[` turned into `_`.
//! * `.` and space in the base name become `_`; an empty base name drops the
//!   pair.
//! * A later scalar or nested assignment replaces an earlier one.
//! * Keys nested deeper than [`MAX_NESTING`] levels are dropped, and only the
//!   first [`MAX_PAIRS`] pairs are read.
//!
//! [`encode_nested`] goes the other way for query strings.

use std::collections::HashMap;

use serde_json::Value;

use crate::objects::Payload;

/// Deepest bracket nesting accepted in a key.
pub const MAX_NESTING: usize = 64;

/// Pairs read from one body; the rest is ignored.
pub const MAX_PAIRS: usize = 1000;

/// Decode a form body into a nested mapping. Never fails; undecodable
/// pairs are skipped.
pub fn parse_nested(input: &str) -> Payload {
    let mut root = Payload::new();
    let mut indices = AppendIndices::default();
    for (key, value) in url::form_urlencoded::parse(input.as_bytes()).take(MAX_PAIRS) {
        let Some(path) = split_key(&key) else {
            continue;
        };
        insert(&mut root, &mut indices, &path, value.into_owned());
    }
    root
}

fn split_key(raw: &str) -> Option<Vec<String>> {
    let raw = raw.trim_start_matches(' ');
    let Some(open) = raw.find('[') else {
        return normalize_base(raw).map(|base| vec![base]);
    };
    let base = normalize_base(&raw[..open])?;
    if !raw[open..].contains(']') {
        return Some(vec![format!("{base}_{}", &raw[open + 1..])]);
    }

    let mut path = vec![base];
    let mut rest = &raw[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            break;
        };
        if path.len() > MAX_NESTING {
            return None;
        }
        path.push(inner[..close].to_owned());
        rest = &inner[close + 1..];
    }
    Some(path)
}

fn normalize_base(base: &str) -> Option<String> {
    if base.is_empty() {
        return None;
    }
    Some(base.replace(['.', ' '], "_"))
}

/// Next free `[]` index of every map in the tree, keyed by the map's path.
#[derive(Default)]
struct AppendIndices {
    next: HashMap<Vec<String>, u64>,
}

impl AppendIndices {
    fn take_next(&mut self, at: &[String]) -> u64 {
        let slot = self.next.entry(at.to_vec()).or_insert(0);
        let index = *slot;
        *slot = index.saturating_add(1);
        index
    }

    fn observe(&mut self, at: &[String], key: &str) {
        let Some(index) = as_index(key) else {
            return;
        };
        let slot = self.next.entry(at.to_vec()).or_insert(0);
        *slot = (*slot).max(index.saturating_add(1));
    }

    /// The map at `at` was replaced, so it and everything below start over.
    fn forget(&mut self, at: &[String]) {
        self.next.retain(|path, _| !path.starts_with(at));
    }
}

/// Canonical non-negative integer keys only: `"05"` is a plain string key.
fn as_index(key: &str) -> Option<u64> {
    let index = key.parse::<u64>().ok()?;
    (index.to_string() == key).then_some(index)
}

fn insert(root: &mut Payload, indices: &mut AppendIndices, path: &[String], value: String) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut map = root;
    let mut at: Vec<String> = Vec::with_capacity(path.len());
    for segment in parents {
        let key = resolve_key(indices, &at, segment);
        let replaced = map.get(&key).is_some_and(|existing| !existing.is_object());
        at.push(key.clone());
        if replaced {
            indices.forget(&at);
        }

        let slot = map.entry(key).or_insert(Value::Null);
        if !slot.is_object() {
            *slot = Value::Object(Payload::new());
        }
        let Value::Object(child) = slot else {
            return;
        };
        map = child;
    }

    let key = resolve_key(indices, &at, last);
    map.insert(key, Value::String(value));
}

fn resolve_key(indices: &mut AppendIndices, at: &[String], segment: &str) -> String {
    if segment.is_empty() {
        indices.take_next(at).to_string()
    } else {
        indices.observe(at, segment);
        segment.to_owned()
    }
}

/// Encode a mapping as a query string, flattening nested values into
/// bracketed keys. Booleans become `1`/`0` and `null` entries are skipped.
pub fn encode_nested(payload: &Payload) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in payload {
        append_pairs(&mut serializer, key.clone(), value);
    }
    serializer.finish()
}

fn append_pairs(
    serializer: &mut url::form_urlencoded::Serializer<'_, String>,
    key: String,
    value: &Value,
) {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            serializer.append_pair(&key, if *b { "1" } else { "0" });
        }
        Value::Number(n) => {
            serializer.append_pair(&key, &n.to_string());
        }
        Value::String(s) => {
            serializer.append_pair(&key, s);
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                append_pairs(serializer, format!("{key}[{index}]"), item);
            }
        }
        Value::Object(map) => {
            for (child, item) in map {
                append_pairs(serializer, format!("{key}[{child}]"), item);
            }
        }
    }
}
