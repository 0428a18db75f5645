//! Typed entity paths
//!
//! Provides [`EntityPath`], the tagged address of a catalog hierarchy node,
//! and its canonical slash-delimited string codec.
//!
//! Canonical forms (exactly five shapes, fixed segment counts):
//! - `stores/{id}`
//! - `brands/{id}`
//! - `brands/{id}/materials/{type}`
//! - `brands/{id}/materials/{type}/filaments/{id}`
//! - `brands/{id}/materials/{type}/filaments/{id}/variants/{slug}`
//!
//! `Display` and `FromStr` are strict inverses: for every valid path `p`
//! and canonical string `s`, `parse(build(p)) = p` and `build(parse(s)) = s`.
//! Segment case is preserved verbatim; case normalization is a layering
//! concern, not an addressing one.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use ofd_catalog::EntityKind;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The two top-level namespaces of the change tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootNamespace {
    /// `stores/...`
    Stores,

    /// `brands/...`
    Brands,
}

impl RootNamespace {
    /// Namespace label as it appears in canonical paths
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stores => "stores",
            Self::Brands => "brands",
        }
    }
}

/// Typed, tagged address of one catalog entity
///
/// Each variant carries the full chain of parent identifiers, so a path is
/// self-contained: no surrounding context is needed to locate the entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityPath {
    /// A retail store: `stores/{store_id}`
    Store { store_id: String },

    /// A brand: `brands/{brand_id}`
    Brand { brand_id: String },

    /// A material under a brand: `brands/{brand_id}/materials/{material_type}`
    Material {
        brand_id: String,
        material_type: String,
    },

    /// A filament line: `.../filaments/{filament_id}`
    Filament {
        brand_id: String,
        material_type: String,
        filament_id: String,
    },

    /// A color variant: `.../variants/{variant_slug}`
    Variant {
        brand_id: String,
        material_type: String,
        filament_id: String,
        variant_slug: String,
    },
}

impl EntityPath {
    /// Store path constructor
    #[inline]
    #[must_use]
    pub fn store(store_id: impl Into<String>) -> Self {
        Self::Store {
            store_id: store_id.into(),
        }
    }

    /// Brand path constructor
    #[inline]
    #[must_use]
    pub fn brand(brand_id: impl Into<String>) -> Self {
        Self::Brand {
            brand_id: brand_id.into(),
        }
    }

    /// Material path constructor
    #[inline]
    #[must_use]
    pub fn material(brand_id: impl Into<String>, material_type: impl Into<String>) -> Self {
        Self::Material {
            brand_id: brand_id.into(),
            material_type: material_type.into(),
        }
    }

    /// Filament path constructor
    #[inline]
    #[must_use]
    pub fn filament(
        brand_id: impl Into<String>,
        material_type: impl Into<String>,
        filament_id: impl Into<String>,
    ) -> Self {
        Self::Filament {
            brand_id: brand_id.into(),
            material_type: material_type.into(),
            filament_id: filament_id.into(),
        }
    }

    /// Variant path constructor
    #[inline]
    #[must_use]
    pub fn variant(
        brand_id: impl Into<String>,
        material_type: impl Into<String>,
        filament_id: impl Into<String>,
        variant_slug: impl Into<String>,
    ) -> Self {
        Self::Variant {
            brand_id: brand_id.into(),
            material_type: material_type.into(),
            filament_id: filament_id.into(),
            variant_slug: variant_slug.into(),
        }
    }

    /// Entity kind this path addresses
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Store { .. } => EntityKind::Store,
            Self::Brand { .. } => EntityKind::Brand,
            Self::Material { .. } => EntityKind::Material,
            Self::Filament { .. } => EntityKind::Filament,
            Self::Variant { .. } => EntityKind::Variant,
        }
    }

    /// Root namespace this path lives under
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> RootNamespace {
        match self {
            Self::Store { .. } => RootNamespace::Stores,
            _ => RootNamespace::Brands,
        }
    }

    /// Identifier of the addressed entity (the last path segment)
    #[inline]
    #[must_use]
    pub fn leaf_id(&self) -> &str {
        match self {
            Self::Store { store_id } => store_id,
            Self::Brand { brand_id } => brand_id,
            Self::Material { material_type, .. } => material_type,
            Self::Filament { filament_id, .. } => filament_id,
            Self::Variant { variant_slug, .. } => variant_slug,
        }
    }

    /// Parent entity path
    ///
    /// Stores and brands are roots and have no parent. For everything else
    /// this strips the trailing namespace/identifier segment pair.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        match self {
            Self::Store { .. } | Self::Brand { .. } => None,
            Self::Material { brand_id, .. } => Some(Self::brand(brand_id.clone())),
            Self::Filament {
                brand_id,
                material_type,
                ..
            } => Some(Self::material(brand_id.clone(), material_type.clone())),
            Self::Variant {
                brand_id,
                material_type,
                filament_id,
                ..
            } => Some(Self::filament(
                brand_id.clone(),
                material_type.clone(),
                filament_id.clone(),
            )),
        }
    }

    /// Canonical segments, root namespace first
    #[must_use]
    pub fn segments(&self) -> Vec<&str> {
        match self {
            Self::Store { store_id } => vec!["stores", store_id],
            Self::Brand { brand_id } => vec!["brands", brand_id],
            Self::Material {
                brand_id,
                material_type,
            } => vec!["brands", brand_id, "materials", material_type],
            Self::Filament {
                brand_id,
                material_type,
                filament_id,
            } => vec![
                "brands", brand_id, "materials", material_type, "filaments", filament_id,
            ],
            Self::Variant {
                brand_id,
                material_type,
                filament_id,
                variant_slug,
            } => vec![
                "brands", brand_id, "materials", material_type, "filaments", filament_id,
                "variants", variant_slug,
            ],
        }
    }

    /// Whether `self` equals `other` or lies below it
    #[must_use]
    pub fn is_at_or_under(&self, other: &Self) -> bool {
        let own = self.segments();
        let prefix = other.segments();
        prefix.len() <= own.len() && own[..prefix.len()] == prefix[..]
    }

    /// Rewrite the `old_prefix` of this path to `new_prefix`
    ///
    /// The relative suffix is preserved byte-identical. Returns `None` when
    /// this path is not at or under `old_prefix`, or when the rewritten
    /// string no longer parses (prefix kinds differ).
    #[must_use]
    pub fn rebase(&self, old_prefix: &Self, new_prefix: &Self) -> Option<Self> {
        if !self.is_at_or_under(old_prefix) {
            return None;
        }
        let own = self.to_string();
        let old = old_prefix.to_string();
        let suffix = &own[old.len()..];
        format!("{new_prefix}{suffix}").parse().ok()
    }
}

impl Display for EntityPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let segments = self.segments();
        let mut first = true;
        for segment in segments {
            if !first {
                f.write_str("/")?;
            }
            f.write_str(segment)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for EntityPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s.split('/').collect();
        if segments.iter().any(|seg| seg.is_empty()) {
            return Err(PathError::Malformed(s.to_string()));
        }

        match segments.as_slice() {
            ["stores", id] => Ok(Self::store(*id)),
            ["brands", id] => Ok(Self::brand(*id)),
            ["brands", b, "materials", m] => Ok(Self::material(*b, *m)),
            ["brands", b, "materials", m, "filaments", f] => Ok(Self::filament(*b, *m, *f)),
            ["brands", b, "materials", m, "filaments", f, "variants", v] => {
                Ok(Self::variant(*b, *m, *f, *v))
            }
            _ => Err(PathError::Malformed(s.to_string())),
        }
    }
}

// Paths serialize as their canonical string so the persisted blob stays a
// flat JSON-safe form.
impl Serialize for EntityPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Path parsing failures
///
/// Parsing never panics; a malformed string is an error value, which
/// callers outside the engine surface as "not found".
#[derive(Debug, Clone, thiserror::Error)]
pub enum PathError {
    /// String does not match any of the five canonical shapes
    #[error("malformed entity path: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn build_variant_path() {
        let path = EntityPath::variant("b", "PLA", "f", "red");
        assert_eq!(
            path.to_string(),
            "brands/b/materials/PLA/filaments/f/variants/red"
        );
    }

    #[test]
    fn parse_all_five_shapes() {
        for s in [
            "stores/printed-solid",
            "brands/prusament",
            "brands/prusament/materials/PLA",
            "brands/prusament/materials/PLA/filaments/basic",
            "brands/prusament/materials/PLA/filaments/basic/variants/galaxy-black",
        ] {
            let path: EntityPath = s.parse().unwrap();
            assert_eq!(path.to_string(), s);
        }
    }

    #[test]
    fn parse_rejects_wrong_shapes() {
        for s in [
            "",
            "brands",
            "stores",
            "brands/b/materials",
            "brands/b/filaments/f",
            "stores/a/materials/PLA",
            "brands/b/materials/PLA/variants/red",
            "brands//materials/PLA",
            "brands/b/materials/PLA/filaments/f/variants/red/extra/x",
        ] {
            assert!(s.parse::<EntityPath>().is_err(), "accepted {s:?}");
        }
    }

    #[test]
    fn parent_chain() {
        let path = EntityPath::variant("b", "PLA", "f", "red");
        let filament = path.parent().unwrap();
        assert_eq!(filament.to_string(), "brands/b/materials/PLA/filaments/f");
        let material = filament.parent().unwrap();
        assert_eq!(material.to_string(), "brands/b/materials/PLA");
        let brand = material.parent().unwrap();
        assert_eq!(brand.to_string(), "brands/b");
        assert!(brand.parent().is_none());
        assert!(EntityPath::store("s").parent().is_none());
    }

    #[test]
    fn leaf_id_is_last_segment() {
        assert_eq!(EntityPath::material("b", "PLA").leaf_id(), "PLA");
        assert_eq!(EntityPath::store("acme").leaf_id(), "acme");
    }

    #[test]
    fn at_or_under() {
        let brand = EntityPath::brand("b");
        let variant = EntityPath::variant("b", "PLA", "f", "red");
        assert!(variant.is_at_or_under(&brand));
        assert!(variant.is_at_or_under(&variant));
        assert!(!brand.is_at_or_under(&variant));
        assert!(!EntityPath::brand("bx").is_at_or_under(&brand));
    }

    #[test]
    fn rebase_preserves_suffix() {
        let old = EntityPath::material("b", "PLA");
        let new = EntityPath::material("b", "PETG");
        let variant = EntityPath::variant("b", "PLA", "f", "red");

        let moved = variant.rebase(&old, &new).unwrap();
        assert_eq!(
            moved.to_string(),
            "brands/b/materials/PETG/filaments/f/variants/red"
        );

        // Unrelated path: no rebase
        assert!(EntityPath::brand("other").rebase(&old, &new).is_none());
    }

    #[test]
    fn serde_uses_canonical_string() {
        let path = EntityPath::material("b", "PLA");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"brands/b/materials/PLA\"");
        let back: EntityPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }

    fn segment_strategy() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_-]{1,12}"
    }

    fn path_strategy() -> impl Strategy<Value = EntityPath> {
        let seg = segment_strategy;
        prop_oneof![
            seg().prop_map(EntityPath::store),
            seg().prop_map(EntityPath::brand),
            (seg(), seg()).prop_map(|(b, m)| EntityPath::material(b, m)),
            (seg(), seg(), seg()).prop_map(|(b, m, f)| EntityPath::filament(b, m, f)),
            (seg(), seg(), seg(), seg())
                .prop_map(|(b, m, f, v)| EntityPath::variant(b, m, f, v)),
        ]
    }

    proptest! {
        #[test]
        fn prop_parse_inverts_build(path in path_strategy()) {
            let built = path.to_string();
            let parsed: EntityPath = built.parse().unwrap();
            prop_assert_eq!(parsed, path);
        }

        #[test]
        fn prop_build_inverts_parse(path in path_strategy()) {
            // Every canonical string is produced by some valid path, so
            // exercising build∘parse over built strings covers the law.
            let s = path.to_string();
            let round: EntityPath = s.parse().unwrap();
            prop_assert_eq!(round.to_string(), s);
        }
    }
}
