//! Tags are the dimensional half of a meter's identity. A meter is identified
//! by its name plus the full set of key/value pairs attached to it, so `Tags`
//! has to behave like a proper value type: structural equality, a stable hash,
//! and deterministic ordering regardless of the order call sites listed the
//! pairs in.

use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

/// A single key/value pair. Ordering and equality are by key first, then
/// value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag {
    key: String,
    value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// An insertion-ordered sequence of tags with unique keys. Pushing a key that
/// is already present overwrites the value in place, keeping the key's
/// original position. Insertion order is preserved for export label ordering;
/// equality and hashing go through the key-sorted view so that two call sites
/// listing the same pairs in different orders produce the same identity.
#[derive(Debug, Clone, Default)]
pub struct Tags {
    inner: SmallVec<[Tag; 8]>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, value)` pairs, deduplicating by key with
    /// last-write-wins semantics.
    pub fn from_pairs<K, V>(pairs: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut tags = Self::new();
        for (k, v) in pairs {
            tags.push(Tag::new(k.as_ref(), v.as_ref()));
        }
        tags
    }

    /// Insert a tag. If the key already exists the value is replaced and the
    /// key keeps its first-seen position.
    pub fn push(&mut self, tag: Tag) {
        if let Some(existing) = self.inner.iter_mut().find(|t| t.key == tag.key) {
            existing.value = tag.value;
        } else {
            self.inner.push(tag);
        }
    }

    /// Concatenate `extra` onto `self`, deduplicating by key with the same
    /// last-write-wins policy as [`push`](Self::push).
    pub fn merge(&self, extra: &Tags) -> Tags {
        let mut merged = self.clone();
        for tag in extra.iter() {
            merged.push(tag.clone());
        }
        merged
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.inner.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(|t| t.key.as_str())
    }

    /// The key-sorted view used for identity comparison and mid hashing.
    pub(crate) fn sorted(&self) -> SmallVec<[&Tag; 8]> {
        let mut view: SmallVec<[&Tag; 8]> = self.inner.iter().collect();
        view.sort_unstable();
        view
    }
}

impl PartialEq for Tags {
    fn eq(&self, other: &Self) -> bool {
        self.sorted() == other.sorted()
    }
}

impl Eq for Tags {}

impl Hash for Tags {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for tag in self.sorted() {
            tag.hash(state);
        }
    }
}

impl FromIterator<Tag> for Tags {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut tags = Self::new();
        for tag in iter {
            tags.push(tag);
        }
        tags
    }
}

/// A meter's primary key: convention-applied name plus its full tag set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeterId {
    pub name: String,
    pub tags: Tags,
}

impl MeterId {
    pub fn new(name: impl Into<String>, tags: Tags) -> Self {
        Self {
            name: name.into(),
            tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(tags: &Tags) -> u64 {
        let mut h = DefaultHasher::new();
        tags.hash(&mut h);
        h.finish()
    }

    #[test]
    fn duplicate_keys_overwrite_in_place() {
        let tags = Tags::from_pairs(&[("method", "get"), ("status", "200"), ("method", "post")]);
        assert_eq!(tags.len(), 2);
        let pairs: Vec<_> = tags.iter().map(|t| (t.key(), t.value())).collect();
        assert_eq!(pairs, vec![("method", "post"), ("status", "200")]);
    }

    #[test]
    fn merge_is_last_write_wins() {
        let base = Tags::from_pairs(&[("region", "us-east"), ("service", "api")]);
        let extra = Tags::from_pairs(&[("service", "worker"), ("zone", "b")]);
        let merged = base.merge(&extra);
        let pairs: Vec<_> = merged.iter().map(|t| (t.key(), t.value())).collect();
        assert_eq!(
            pairs,
            vec![("region", "us-east"), ("service", "worker"), ("zone", "b")]
        );
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let a = Tags::from_pairs(&[("a", "1"), ("b", "2")]);
        let b = Tags::from_pairs(&[("b", "2"), ("a", "1")]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn differing_values_are_distinct() {
        let a = Tags::from_pairs(&[("a", "1")]);
        let b = Tags::from_pairs(&[("a", "2")]);
        assert_ne!(a, b);
    }
}
