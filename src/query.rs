//! Wire types shared between the query interpreter and the filter engine.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::catalog::{DietaryType, SpiceLevel};

/// Normalized, machine-readable representation of search intent extracted
/// from free text. One instance per query; consumed once by the engine.
///
/// Wire contract: unset scalar fields serialize as the empty string and
/// unset lists as empty arrays, never omitted and never null. Unknown
/// enum spellings coming back from the model deserialize to unset rather
/// than failing the whole extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct StructuredFilter {
    /// Descriptive keywords: ingredients, textures, colors, categories.
    pub tags: Vec<String>,
    /// Restricted to {vegan, vegetarian, gluten-free, dairy-free}; other
    /// values are folded into `tags` by the interpreter.
    pub dietary: Vec<String>,
    #[schemars(with = "String")]
    #[serde(
        serialize_with = "ser_dietary_type",
        deserialize_with = "de_dietary_type"
    )]
    pub dietary_type: Option<DietaryType>,
    pub main_ingredients: Vec<String>,
    #[schemars(with = "String")]
    #[serde(serialize_with = "ser_spice_level", deserialize_with = "de_spice_level")]
    pub spice_level: Option<SpiceLevel>,
    /// Categories to drop from the result set, e.g. "dessert" for savory
    /// queries.
    pub exclude_categories: Vec<String>,
}

fn ser_dietary_type<S: Serializer>(
    value: &Option<DietaryType>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.map_or("", DietaryType::as_str))
}

fn de_dietary_type<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DietaryType>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(DietaryType::parse))
}

fn ser_spice_level<S: Serializer>(
    value: &Option<SpiceLevel>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.map_or("", SpiceLevel::as_str))
}

fn de_spice_level<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<SpiceLevel>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(SpiceLevel::parse))
}

/// User-toggled UI constraints, applied after text-driven filtering and
/// ranking with AND semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterId {
    Spicy,
    Vegetarian,
    Vegan,
    GlutenFree,
    Popular,
}

impl FilterId {
    /// Maps a wire identifier to a filter. Unrecognized identifiers return
    /// `None` and are treated as no-ops by the caller.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "spicy" => Some(Self::Spicy),
            "vegetarian" => Some(Self::Vegetarian),
            "vegan" => Some(Self::Vegan),
            "gluten-free" => Some(Self::GlutenFree),
            "popular" => Some(Self::Popular),
            _ => None,
        }
    }
}
