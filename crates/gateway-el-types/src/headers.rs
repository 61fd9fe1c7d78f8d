//! Multi-valued, case-insensitive header container

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    /// Name as first added
    name: String,
    values: Vec<String>,
}

/// HTTP-style headers: names compare case-insensitively, insertion order is kept
/// and every name maps to an ordered list of values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: IndexMap<String, Entry>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str) -> String {
        name.to_ascii_lowercase()
    }

    /// Append a value, keeping existing ones
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        self.entries
            .entry(Self::key(&name))
            .or_insert_with(|| Entry {
                name,
                values: Vec::new(),
            })
            .values
            .push(value.into());
        self
    }

    /// Replace all values of `name` with a single value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        self.entries.insert(
            Self::key(&name),
            Entry {
                name,
                values: vec![value.into()],
            },
        );
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.entries
            .shift_remove(&Self::key(name))
            .map(|entry| entry.values)
    }

    /// First value of `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// All values of `name`, empty when absent
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&Self::key(name))
            .map(|entry| entry.values.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&Self::key(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|entry| entry.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .values()
            .map(|entry| (entry.name.as_str(), entry.values.as_slice()))
    }

    /// Number of distinct header names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name to first value
    pub fn to_single_value_map(&self) -> IndexMap<String, String> {
        self.iter()
            .filter_map(|(name, values)| values.first().map(|v| (name.to_string(), v.clone())))
            .collect()
    }

    pub fn to_list_values_map(&self) -> IndexMap<String, Vec<String>> {
        self.iter()
            .map(|(name, values)| (name.to_string(), values.to_vec()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.add(name, value);
        }
        headers
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, values)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}=[{}]", name, values.join(", "))?;
        }
        f.write_str("}")
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, values) in self.iter() {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_case_insensitive_multi_values() {
        let mut headers = Headers::new();
        headers.add("X-Gravitee-Endpoint", "a").add("x-gravitee-endpoint", "b");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("X-GRAVITEE-ENDPOINT"), Some("a"));
        assert_eq!(headers.get_all("x-gravitee-endpoint"), ["a", "b"]);
        assert_eq!(headers.names().collect::<Vec<_>>(), vec!["X-Gravitee-Endpoint"]);
    }

    #[test]
    fn test_set_and_remove() {
        let mut headers: Headers = [("Accept", "a"), ("Accept", "b")].into_iter().collect();
        headers.set("accept", "c");
        assert_eq!(headers.get_all("Accept"), ["c"]);

        assert_eq!(headers.remove("ACCEPT"), Some(vec!["c".to_string()]));
        assert!(headers.is_empty());
        assert!(headers.get_all("Accept").is_empty());
    }

    #[test]
    fn test_maps_and_display() {
        let headers: Headers = [("A", "1"), ("B", "2"), ("A", "3")].into_iter().collect();
        assert_eq!(headers.to_single_value_map().get("A").map(String::as_str), Some("1"));
        assert_eq!(headers.to_list_values_map()["A"], vec!["1", "3"]);
        assert_eq!(headers.to_string(), "{A=[1, 3], B=[2]}");
    }
}
