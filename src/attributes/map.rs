//! Ordered key/value attribute mapping.

use super::AttributeValue;
use std::collections::BTreeMap;

/// A mapping from attribute key to attribute value, both stored as bytes.
///
/// Keys are kept in ascending byte order so that positional enumeration
/// (`entry_at(0..len)`) is stable and matches the order of the encoded
/// trailer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl AttributeMap {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces one attribute, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<AttributeValue>,
        value: impl Into<AttributeValue>,
    ) -> Option<Vec<u8>> {
        self.entries
            .insert(key.into().into_bytes(), value.into().into_bytes())
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&[u8]> {
        self.entries.get(key.as_ref()).map(Vec::as_slice)
    }

    /// Removes the value stored under `key`.
    pub fn remove(&mut self, key: impl AsRef<[u8]>) -> Option<Vec<u8>> {
        self.entries.remove(key.as_ref())
    }

    /// Returns the `index`-th entry in key order.
    pub fn entry_at(&self, index: usize) -> Option<(&[u8], &[u8])> {
        self.entries
            .iter()
            .nth(index)
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Returns the number of attributes.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no attributes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Merges all entries of `other` into `self`, replacing duplicates.
    pub fn extend_from(&mut self, other: AttributeMap) {
        self.entries.extend(other.entries);
    }
}

impl<K, V> FromIterator<(K, V)> for AttributeMap
where
    K: Into<AttributeValue>,
    V: Into<AttributeValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl IntoIterator for AttributeMap {
    type Item = (Vec<u8>, Vec<u8>);
    type IntoIter = std::collections::btree_map::IntoIter<Vec<u8>, Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_enumerate_in_key_order() {
        let map: AttributeMap = [("b", "2"), ("a", "1"), ("c", "3")].into_iter().collect();

        assert_eq!(map.len(), 3);
        assert_eq!(map.entry_at(0), Some((&b"a"[..], &b"1"[..])));
        assert_eq!(map.entry_at(2), Some((&b"c"[..], &b"3"[..])));
        assert_eq!(map.entry_at(3), None);
    }

    #[test]
    fn test_insert_replaces() {
        let mut map = AttributeMap::new();
        assert_eq!(map.insert("k", "v1"), None);
        assert_eq!(map.insert("k", AttributeValue::integer(2)), Some(b"v1".to_vec()));
        assert_eq!(map.get("k"), Some(&b"2"[..]));
    }

    #[test]
    fn test_extend_from_merges() {
        let mut map: AttributeMap = [("a", "1"), ("b", "2")].into_iter().collect();
        let other: AttributeMap = [("b", "20"), ("c", "30")].into_iter().collect();

        map.extend_from(other);

        assert_eq!(map.len(), 3);
        assert_eq!(map.get("b"), Some(&b"20"[..]));
    }
}
