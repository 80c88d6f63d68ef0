use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::debug;

/// The value of one query key: a single string, or every value of a repeated key in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Multiple(Vec<String>),
}

impl QueryValue {
    /// The first value given for the key.
    pub fn first(&self) -> Option<&str> {
        self.as_slice().first().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        match self {
            QueryValue::Single(value) => std::slice::from_ref(value),
            QueryValue::Multiple(values) => values,
        }
    }

    fn push(&mut self, value: String) {
        match self {
            QueryValue::Single(first) => *self = QueryValue::Multiple(vec![std::mem::take(first), value]),
            QueryValue::Multiple(values) => values.push(value),
        }
    }
}

/// A decoded query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Query {
    entries: BTreeMap<String, QueryValue>,
}

impl Query {
    /// Decodes `raw` (without the leading `?`). A malformed query string decodes to an empty map.
    pub fn parse(raw: &str) -> Self {
        match serde_urlencoded::from_str::<Vec<(String, String)>>(raw) {
            Ok(pairs) => pairs.into_iter().collect(),
            Err(e) => {
                debug!(cause = %e, query = raw, "can't decode query string");
                Self::default()
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries.get(key)
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(QueryValue::first)
    }

    /// Every value given for `key`, empty if the key is absent.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.get(key).map_or(&[], QueryValue::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for Query {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut entries = BTreeMap::new();
        for (key, value) in iter {
            match entries.entry(key) {
                Entry::Vacant(entry) => {
                    entry.insert(QueryValue::Single(value));
                }
                Entry::Occupied(mut entry) => entry.get_mut().push(value),
            }
        }
        Self { entries }
    }
}
