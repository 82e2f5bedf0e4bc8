use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Menu shipped with the binary, used when no catalog file is configured.
const DEFAULT_MENU: &str = include_str!("../data/menu.json");

/// Coarse dietary classification of a dish.
///
/// Distinct from the finer `dietary` label set: a dish is exactly one of
/// these, while it may carry several dietary labels. Vegan dishes satisfy
/// vegetarian queries (see `engine`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DietaryType {
    #[serde(rename = "vegetarian")]
    Vegetarian,
    #[serde(rename = "vegan")]
    Vegan,
    #[serde(rename = "non-vegetarian")]
    NonVegetarian,
}

impl DietaryType {
    /// Case-insensitive parse of the wire spelling. Unknown values map to
    /// `None` so a noisy extraction never fails the pipeline.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "vegetarian" => Some(Self::Vegetarian),
            "vegan" => Some(Self::Vegan),
            "non-vegetarian" | "non vegetarian" => Some(Self::NonVegetarian),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vegetarian => "vegetarian",
            Self::Vegan => "vegan",
            Self::NonVegetarian => "non-vegetarian",
        }
    }
}

/// Spice intensity of a dish. `None` marks dishes with no heat at all;
/// search requests only ever ask for `Mild`, `Medium` or `Hot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpiceLevel {
    None,
    Mild,
    Medium,
    Hot,
}

impl SpiceLevel {
    /// Parses the requestable levels. "None", empty and unknown values all
    /// map to `Option::None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mild" => Some(Self::Mild),
            "medium" => Some(Self::Medium),
            "hot" => Some(Self::Hot),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Mild => "Mild",
            Self::Medium => "Medium",
            Self::Hot => "Hot",
        }
    }
}

/// One dish in the catalog. Immutable for the lifetime of the process.
///
/// Optional fields deserialize to empty defaults, so predicate code never
/// has to guard against missing attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DishRecord {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub restaurant: String,
    pub price: f64,
    pub rating: f64,
    pub prep_time: String,
    /// Lowercase free-form descriptors: ingredients, textures, colors,
    /// categories.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub main_ingredients: Vec<String>,
    /// Labels drawn from {vegan, vegetarian, gluten-free, dairy-free}.
    #[serde(default)]
    pub dietary: Vec<String>,
    #[serde(default)]
    pub dietary_type: Option<DietaryType>,
    #[serde(default)]
    pub spice_level: Option<SpiceLevel>,
    #[serde(default)]
    pub is_popular: bool,
    #[serde(default)]
    pub image: String,
}

/// Loads the catalog, either from the configured JSON file or from the
/// embedded default menu. Called once at startup; the result is shared
/// read-only afterwards.
pub fn load(path: Option<&Path>) -> Result<Vec<DishRecord>> {
    let raw = match path {
        Some(p) => fs::read_to_string(p)
            .with_context(|| format!("failed to read catalog file {}", p.display()))?,
        None => DEFAULT_MENU.to_string(),
    };
    let dishes: Vec<DishRecord> =
        serde_json::from_str(&raw).context("failed to parse catalog JSON")?;
    Ok(dishes)
}
