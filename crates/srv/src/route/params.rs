use serde::ser::{Serialize, SerializeMap, Serializer};

/// Path parameters captured by route templates.
///
/// Named parameters come from `:name` segments, positional ones from unnamed
/// `(pattern)` groups and are addressed by their index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    named: Vec<(String, String)>,
    positional: Vec<String>,
}

impl PathParams {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Gets the value of a named parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// Gets the value of an unnamed group by its index in the template.
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }

    /// Iterates over the named parameters in template order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.named.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.named.len() + self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.positional.is_empty()
    }

    /// Combines the parameters of an enclosing route with the ones captured by a nested route.
    ///
    /// Named parameters of `inner` override those of `self` with the same name. Positional
    /// parameters of `inner` replace those of `self` when it has any.
    #[must_use]
    pub fn merge(&self, inner: &PathParams) -> PathParams {
        let mut merged = self.clone();
        for (name, value) in &inner.named {
            merged.insert(name.clone(), value.clone());
        }
        if !inner.positional.is_empty() {
            merged.positional.clone_from(&inner.positional);
        }
        merged
    }

    pub(crate) fn insert(&mut self, name: String, value: String) {
        match self.named.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.named.push((name, value)),
        }
    }

    pub(crate) fn push_positional(&mut self, value: String) {
        self.positional.push(value);
    }
}

/// Serializes as a flat map, unnamed groups keyed by their index (`"0"`, `"1"`, ...).
impl Serialize for PathParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (index, value) in self.positional.iter().enumerate() {
            map.serialize_entry(&index.to_string(), value)?;
        }
        for (name, value) in &self.named {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(named: &[(&str, &str)], positional: &[&str]) -> PathParams {
        let mut params = PathParams::empty();
        for (name, value) in named {
            params.insert((*name).to_owned(), (*value).to_owned());
        }
        for value in positional {
            params.push_positional((*value).to_owned());
        }
        params
    }

    #[test]
    fn lookup() {
        let params = params(&[("primary", "foo"), ("secondary", "bar")], &["add/2"]);
        assert_eq!(params.get("primary"), Some("foo"));
        assert_eq!(params.get("missing"), None);
        assert_eq!(params.positional(0), Some("add/2"));
        assert_eq!(params.positional(1), None);
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn merge_prefers_inner() {
        let outer = params(&[("org", "acme"), ("id", "outer")], &["x"]);
        let inner = params(&[("id", "inner")], &[]);

        let merged = outer.merge(&inner);
        assert_eq!(merged.get("org"), Some("acme"));
        assert_eq!(merged.get("id"), Some("inner"));
        assert_eq!(merged.positional(0), Some("x"));
        assert_eq!(outer.get("id"), Some("outer"));
    }

    #[test]
    fn serializes_as_map() {
        let params = params(&[("primary", "foo"), ("secondary", "bar")], &["add/2"]);
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json, serde_json::json!({"0": "add/2", "primary": "foo", "secondary": "bar"}));
    }
}
