//! Per-kind entity snapshots
//!
//! A snapshot is the full state of one entity as the editor last saw it.
//! Well-known fields are typed; everything else the source JSON carried is
//! preserved verbatim in a flattened `extra` map, since the upstream JSON
//! schemas, not these structs, are the source of truth for the long tail
//! of fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::kind::EntityKind;
use crate::slug::Slug;

/// A retail store entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: Slug,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storefront_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ships_from: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// A filament manufacturer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    pub id: Slug,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// A material type under a brand (PLA, PETG, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: Slug,
    pub brand_id: Slug,
    /// Material type name as displayed (may differ in case from `id`)
    #[serde(default)]
    pub material: String,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// A filament product line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filament {
    pub id: Slug,
    pub brand_id: Slug,
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// A color variant of a filament
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: Slug,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_hex: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hex_variants: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Full snapshot of one entity, tagged by kind
///
/// This is the only payload shape the change tree stores. Loose JSON is
/// validated into a snapshot once, via [`EntitySnapshot::from_value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntitySnapshot {
    Store(Store),
    Brand(Brand),
    Material(Material),
    Filament(Filament),
    Variant(Variant),
}

impl EntitySnapshot {
    /// Validate loose JSON into a typed snapshot of the given kind
    ///
    /// # Errors
    /// Returns [`CatalogError::Shape`] when the value does not match the
    /// kind's shape (missing `id`, wrong types).
    pub fn from_value(kind: EntityKind, value: JsonValue) -> Result<Self, CatalogError> {
        let snapshot = match kind {
            EntityKind::Store => Self::Store(from_json(value)?),
            EntityKind::Brand => Self::Brand(from_json(value)?),
            EntityKind::Material => Self::Material(from_json(value)?),
            EntityKind::Filament => Self::Filament(from_json(value)?),
            EntityKind::Variant => Self::Variant(from_json(value)?),
        };
        Ok(snapshot)
    }

    /// Kind of this snapshot
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Store(_) => EntityKind::Store,
            Self::Brand(_) => EntityKind::Brand,
            Self::Material(_) => EntityKind::Material,
            Self::Filament(_) => EntityKind::Filament,
            Self::Variant(_) => EntityKind::Variant,
        }
    }

    /// Stable public identifier (the layering key)
    #[inline]
    #[must_use]
    pub fn public_id(&self) -> &Slug {
        match self {
            Self::Store(s) => &s.id,
            Self::Brand(b) => &b.id,
            Self::Material(m) => &m.id,
            Self::Filament(f) => &f.id,
            Self::Variant(v) => &v.id,
        }
    }

    /// Display name, falling back to the identifier
    #[must_use]
    pub fn display_name(&self) -> &str {
        let name = match self {
            Self::Store(s) => &s.name,
            Self::Brand(b) => &b.name,
            Self::Material(m) => &m.material,
            Self::Filament(f) => &f.name,
            Self::Variant(v) => &v.name,
        };
        if name.is_empty() {
            self.public_id().as_str()
        } else {
            name
        }
    }

    /// Flatten to a property map for field-level diffing
    ///
    /// The kind tag is excluded; it is identity, not an editable property.
    #[must_use]
    pub fn to_properties(&self) -> Map<String, JsonValue> {
        let value = match self {
            Self::Store(s) => serde_json::to_value(s),
            Self::Brand(b) => serde_json::to_value(b),
            Self::Material(m) => serde_json::to_value(m),
            Self::Filament(f) => serde_json::to_value(f),
            Self::Variant(v) => serde_json::to_value(v),
        };
        match value {
            Ok(JsonValue::Object(map)) => map,
            // Snapshots are structs; serialization always yields an object.
            _ => Map::new(),
        }
    }
}

fn from_json<T: serde::de::DeserializeOwned>(value: JsonValue) -> Result<T, CatalogError> {
    serde_json::from_value(value).map_err(CatalogError::Shape)
}

/// Errors validating loose JSON into snapshots
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Value does not match the declared kind's shape
    #[error("entity does not match expected shape: {0}")]
    Shape(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn from_value_validates_brand() {
        let snapshot = EntitySnapshot::from_value(
            EntityKind::Brand,
            json!({"id": "Prusament", "name": "Prusament", "website": "https://prusa3d.com"}),
        )
        .unwrap();

        assert_eq!(snapshot.kind(), EntityKind::Brand);
        assert_eq!(snapshot.public_id().as_str(), "prusament");
    }

    #[test]
    fn from_value_preserves_unknown_fields() {
        let snapshot = EntitySnapshot::from_value(
            EntityKind::Variant,
            json!({"id": "galaxy-black", "name": "Galaxy Black", "td_value": 3.1}),
        )
        .unwrap();

        let EntitySnapshot::Variant(variant) = &snapshot else {
            panic!("expected variant");
        };
        assert_eq!(variant.extra.get("td_value"), Some(&json!(3.1)));

        // Unknown fields survive a serialize round-trip
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value.get("td_value"), Some(&json!(3.1)));
    }

    #[test]
    fn from_value_rejects_missing_id() {
        let result =
            EntitySnapshot::from_value(EntityKind::Brand, json!({"name": "No Id Here"}));
        assert!(matches!(result, Err(CatalogError::Shape(_))));
    }

    #[test]
    fn snapshot_round_trips_with_kind_tag() {
        let snapshot = EntitySnapshot::from_value(
            EntityKind::Material,
            json!({"id": "pla", "brand_id": "acme", "material": "PLA"}),
        )
        .unwrap();

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: EntitySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let snapshot = EntitySnapshot::from_value(
            EntityKind::Brand,
            json!({"id": "acme"}),
        )
        .unwrap();
        assert_eq!(snapshot.display_name(), "acme");
    }

    #[test]
    fn to_properties_excludes_kind_tag() {
        let snapshot = EntitySnapshot::from_value(
            EntityKind::Brand,
            json!({"id": "acme", "name": "Acme"}),
        )
        .unwrap();
        let props = snapshot.to_properties();
        assert!(props.get("kind").is_none());
        assert_eq!(props.get("name"), Some(&json!("Acme")));
    }
}
