//! Identifier normalization
//!
//! The catalog matches identifiers case-insensitively in several places
//! (array layering, delete matching). Rather than re-lowercasing at every
//! comparison site, [`Slug`] normalizes once on construction and every
//! comparison downstream is a plain equality check.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize};

/// A lowercase-normalized public identifier
///
/// Construction lowercases and trims; the inner string is never mutated
/// afterwards. Two slugs differing only in case compare equal because
/// both were normalized on the way in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Slug(String);

// Deserialization goes through the normalizing constructor so persisted
// blobs produced before normalization still compare correctly.
impl<'de> Deserialize<'de> for Slug {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}

impl Slug {
    /// Normalize an identifier into a slug
    #[inline]
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    /// The normalized identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the slug is empty after normalization
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for Slug {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Slug {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Slug {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
