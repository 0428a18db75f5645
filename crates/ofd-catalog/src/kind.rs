//! Entity kind tags for the five-level catalog hierarchy

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The five entity kinds, ordered root to leaf
///
/// Stores form their own single-level namespace; brands root the
/// brand → material → filament → variant chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Retail store selling filaments
    Store,

    /// Filament manufacturer
    Brand,

    /// Material type under a brand (PLA, PETG, ...)
    Material,

    /// Filament product line under a material
    Filament,

    /// Color variant of a filament
    Variant,
}

impl EntityKind {
    /// Kind of the parent entity, if any
    ///
    /// Stores and brands are roots.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        match self {
            Self::Store | Self::Brand => None,
            Self::Material => Some(Self::Brand),
            Self::Filament => Some(Self::Material),
            Self::Variant => Some(Self::Filament),
        }
    }

    /// Namespace label under which children of this kind are addressed
    ///
    /// Returns `None` for leaf kinds (stores, variants).
    #[inline]
    #[must_use]
    pub fn child_namespace(&self) -> Option<&'static str> {
        match self {
            Self::Brand => Some("materials"),
            Self::Material => Some("filaments"),
            Self::Filament => Some("variants"),
            Self::Store | Self::Variant => None,
        }
    }

    /// Depth in the hierarchy (roots are 0)
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Store | Self::Brand => 0,
            Self::Material => 1,
            Self::Filament => 2,
            Self::Variant => 3,
        }
    }

    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Brand => "brand",
            Self::Material => "material",
            Self::Filament => "filament",
            Self::Variant => "variant",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "store" => Ok(Self::Store),
            "brand" => Ok(Self::Brand),
            "material" => Ok(Self::Material),
            "filament" => Ok(Self::Filament),
            "variant" => Ok(Self::Variant),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Error for unrecognized kind names
#[derive(Debug, thiserror::Error)]
#[error("unknown entity kind: {0}")]
pub struct UnknownKind(pub String);
