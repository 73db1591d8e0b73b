//! Tags: the `(key, value)` pairs attached to events and projection states.
//!
//! Tags are the secondary-index vocabulary of the store. An event carries zero
//! or more tags; a [`crate::query::QueryItem`] matches an event only if every
//! tag it names is present on the event.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error returned when constructing a [`Tag`] from invalid parts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    /// The tag key was empty.
    #[error("tag key cannot be empty")]
    EmptyKey,
    /// The tag value was empty.
    #[error("tag value cannot be empty")]
    EmptyValue,
}

/// A `(key, value)` pair attached to an event or a projection state.
///
/// Both `key` and `value` must be non-empty strings. Order is insignificant
/// for matching but is preserved on an event's tag list as written.
///
/// # Examples
///
/// ```
/// use dcb_core::tag::Tag;
///
/// let tag = Tag::new("courseId", "c-101").unwrap();
/// assert_eq!(tag.key(), "courseId");
/// assert_eq!(tag.value(), "c-101");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tag {
    key: String,
    value: String,
}

impl Tag {
    /// Construct a tag, rejecting empty keys or values.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::EmptyKey`] or [`TagError::EmptyValue`] if either
    /// part is empty.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self, TagError> {
        let key = key.into();
        let value = value.into();
        if key.is_empty() {
            return Err(TagError::EmptyKey);
        }
        if value.is_empty() {
            return Err(TagError::EmptyValue);
        }
        Ok(Self { key, value })
    }

    /// The tag's key, exactly as supplied (case preserved).
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The tag's value, exactly as supplied (case preserved).
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Lowercased `(key, value)` tuple, used for case-insensitive index lookups.
    #[must_use]
    pub fn to_lowercase_pair(&self) -> (String, String) {
        (self.key.to_lowercase(), self.value.to_lowercase())
    }

    /// A filesystem-safe `key_value` identifier for this tag's index file name.
    ///
    /// Characters outside `[A-Za-z0-9-]` are percent-escaped so that tag
    /// values containing `/`, `_`, or whitespace cannot collide with the
    /// `<key>_<value>` separator or escape the indices directory.
    #[must_use]
    pub fn index_file_stem(&self) -> String {
        format!(
            "{}_{}",
            escape_path_component(&self.key),
            escape_path_component(&self.value)
        )
    }
}

/// Percent-escape everything but `[A-Za-z0-9-]` so the result is safe to use
/// verbatim as a single path component.
fn escape_path_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

impl TryFrom<(&str, &str)> for Tag {
    type Error = TagError;

    fn try_from((key, value): (&str, &str)) -> Result<Self, Self::Error> {
        Self::new(key, value)
    }
}
