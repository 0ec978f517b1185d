//! Structured data attached to a stack of resources.
//!
//! A [`Tag`] is an ordered compound of named [`TagValue`]s. Two stacks only
//! stack together when their tags are value-equal, with the stripping rule
//! applied: an empty compound is the same thing as no tag at all. Slots never
//! store an empty compound; [`normalize`] turns it into `None` on the way in.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Q32.32 fixed-point used for fractional tag values, so equality is exact.
pub type Fixed64 = I32F32;

/// Convert an f64 to Fixed64. Use only when building tags from external input.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64 for display.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// A single value stored under a key in a [`Tag`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagValue {
    Bool(bool),
    Int(i64),
    Fixed(Fixed64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<TagValue>),
    Compound(Tag),
}

/// An ordered compound of named values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag {
    entries: BTreeMap<String, TagValue>,
}

impl Tag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous value under that key.
    pub fn insert(&mut self, key: impl Into<String>, value: TagValue) -> Option<TagValue> {
        self.entries.insert(key.into(), value)
    }

    /// Builder-style [`insert`](Tag::insert).
    pub fn with(mut self, key: impl Into<String>, value: TagValue) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<TagValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            TagValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_fixed(&self, key: &str) -> Option<Fixed64> {
        match self.get(key)? {
            TagValue::Fixed(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            TagValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_compound(&self, key: &str) -> Option<&Tag> {
        match self.get(key)? {
            TagValue::Compound(v) => Some(v),
            _ => None,
        }
    }
}

/// Apply the stripping rule: an empty compound becomes `None`.
pub fn normalize(tag: Option<Tag>) -> Option<Tag> {
    tag.filter(|t| !t.is_empty())
}

/// Value equality between optional tags, treating an empty compound as absent.
pub fn tags_equal(a: Option<&Tag>, b: Option<&Tag>) -> bool {
    match (a.filter(|t| !t.is_empty()), b.filter(|t| !t.is_empty())) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn damaged(amount: i64) -> Tag {
        Tag::new().with("Damage", TagValue::Int(amount))
    }

    #[test]
    fn empty_tag_normalizes_to_none() {
        assert_eq!(normalize(Some(Tag::new())), None);
        assert_eq!(normalize(None), None);
        assert_eq!(normalize(Some(damaged(3))), Some(damaged(3)));
    }

    #[test]
    fn tags_equal_by_value() {
        let a = damaged(3);
        let b = damaged(3);
        assert!(tags_equal(Some(&a), Some(&b)));
        assert!(!tags_equal(Some(&a), Some(&damaged(4))));
    }

    #[test]
    fn empty_tag_equals_absent_tag() {
        let empty = Tag::new();
        assert!(tags_equal(Some(&empty), None));
        assert!(tags_equal(None, Some(&empty)));
        assert!(!tags_equal(Some(&damaged(1)), None));
    }

    #[test]
    fn nested_compounds_compare_deeply() {
        let inner = Tag::new().with("Level", TagValue::Int(2));
        let a = Tag::new().with("Enchant", TagValue::Compound(inner.clone()));
        let b = Tag::new().with("Enchant", TagValue::Compound(inner));
        assert!(tags_equal(Some(&a), Some(&b)));
        assert_eq!(a.get_compound("Enchant").and_then(|t| t.get_int("Level")), Some(2));
    }

    #[test]
    fn typed_getters_reject_other_variants() {
        let tag = Tag::new()
            .with("Name", TagValue::String("Bob".into()))
            .with("Heat", TagValue::Fixed(f64_to_fixed64(1.5)));
        assert_eq!(tag.get_str("Name"), Some("Bob"));
        assert_eq!(tag.get_int("Name"), None);
        assert_eq!(tag.get_fixed("Heat").map(fixed64_to_f64), Some(1.5));
        assert_eq!(tag.len(), 2);
    }
}
