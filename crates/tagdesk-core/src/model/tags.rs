//! Insertion-ordered tag sets and the stored `System.Tags` string form.
//!
//! The store keeps tags as a single string joined with `"; "`. A [`TagSet`]
//! is parsed from that string when a row is selected and joined back into it
//! on save, so the split and join delimiters must stay identical for an
//! unmodified set to round-trip exactly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Delimiter used by the store between tags.
pub const TAG_DELIMITER: &str = "; ";

/// A set of tags that remembers the order tags were first added in.
///
/// Membership is case-sensitive exact string matching. Re-inserting a tag
/// that is already present leaves both membership and order unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet {
    tags: Vec<String>,
}

impl TagSet {
    /// Create an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self { tags: Vec::new() }
    }

    /// Parse the stored tag string.
    ///
    /// An empty string yields an empty set. A non-empty string is split on
    /// [`TAG_DELIMITER`] exactly; empty segments are kept as empty tags, and
    /// repeated segments collapse onto their first occurrence.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::new();
        }
        raw.split(TAG_DELIMITER).map(str::to_string).collect()
    }

    /// Join the set back into the stored form, in iteration order.
    #[must_use]
    pub fn join(&self) -> String {
        self.tags.join(TAG_DELIMITER)
    }

    /// Insert a tag at the end. Returns `false` if it was already present.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Remove a tag by exact match. Returns `false` if it was absent.
    pub fn remove(&mut self, tag: &str) -> bool {
        let Some(pos) = self.tags.iter().position(|t| t == tag) else {
            return false;
        };
        self.tags.remove(pos);
        true
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.tags.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tag at a position in iteration order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.tags.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.tags
    }
}

impl FromIterator<String> for TagSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = Self::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join())
    }
}
