//! Deterministic filter engine.
//!
//! `search` is a pure function over the catalog: same inputs, same ordered
//! output, no I/O. The interpreter may be noisy or unavailable; everything
//! in here is exact and testable.

use std::cmp::Reverse;

use crate::catalog::{DietaryType, DishRecord, SpiceLevel};
use crate::query::{FilterId, StructuredFilter};

/// Runs the full search pipeline over the catalog.
///
/// Stages, in order:
///
/// 1. Exact/substring name match on the raw query short-circuits every
///    structured narrowing stage. A literal dish-name search must never be
///    overridden by noisy model-derived tag filters.
/// 2. Dietary-type narrowing (vegan counts as vegetarian). The result of
///    this stage is kept as the fallback base.
/// 3. Ingredient, tag, dietary-label, spice and exclusion narrowing, each
///    chained on the previous stage's output.
/// 4. If everything was narrowed away but a dietary type was requested,
///    fall back to the dietary-narrowed set: a dietary constraint is more
///    reliable than the rest of the extraction.
/// 5. Ranking by tag overlap, then popularity, otherwise stable.
/// 6. Active UI filters (AND semantics). These always apply, including to
///    name-match results and when no text query was issued at all.
pub fn search(
    catalog: &[DishRecord],
    raw_query: &str,
    structured: &StructuredFilter,
    active_filters: &[FilterId],
) -> Vec<DishRecord> {
    let query_lower = raw_query.trim().to_lowercase();

    if !query_lower.is_empty() {
        let name_matches: Vec<&DishRecord> = catalog
            .iter()
            .filter(|dish| dish.name.to_lowercase().contains(&query_lower))
            .collect();
        if !name_matches.is_empty() {
            return apply_active_filters(name_matches, active_filters);
        }
    }

    let dietary_narrowed: Vec<&DishRecord> = match structured.dietary_type {
        Some(wanted) => catalog
            .iter()
            .filter(|dish| matches_dietary_type(dish, wanted))
            .collect(),
        None => catalog.iter().collect(),
    };

    let mut results = dietary_narrowed.clone();

    if !structured.main_ingredients.is_empty() {
        results.retain(|dish| {
            structured.main_ingredients.iter().any(|wanted| {
                any_substring_match(&dish.main_ingredients, wanted)
                    || any_substring_match(&dish.tags, wanted)
            })
        });
    }

    if !structured.tags.is_empty() {
        results.retain(|dish| {
            structured
                .tags
                .iter()
                .any(|wanted| any_substring_match(&dish.tags, wanted))
        });
    }

    if !structured.dietary.is_empty() {
        results.retain(|dish| {
            structured.dietary.iter().any(|wanted| {
                dish.dietary
                    .iter()
                    .any(|label| label.eq_ignore_ascii_case(wanted))
            })
        });
    }

    if let Some(level) = structured.spice_level {
        results.retain(|dish| dish.spice_level == Some(level));
    }

    if !structured.exclude_categories.is_empty() {
        results.retain(|dish| {
            !structured.exclude_categories.iter().any(|category| {
                dish.tags.iter().any(|tag| tag.eq_ignore_ascii_case(category))
            })
        });
    }

    // Recall over precision: a requested dietary type survives even when
    // the narrower extracted filters match nothing.
    if results.is_empty() && structured.dietary_type.is_some() {
        results = dietary_narrowed;
    }

    rank(&mut results, &structured.tags);

    apply_active_filters(results, active_filters)
}

/// Ranks by descending tag-overlap count, breaking ties by popularity.
/// The sort is stable, so otherwise-equal dishes keep their prior order.
fn rank(results: &mut [&DishRecord], wanted_tags: &[String]) {
    results.sort_by_cached_key(|dish| {
        (
            Reverse(tag_match_count(dish, wanted_tags)),
            Reverse(dish.is_popular),
        )
    });
}

fn tag_match_count(dish: &DishRecord, wanted_tags: &[String]) -> usize {
    wanted_tags
        .iter()
        .filter(|wanted| any_substring_match(&dish.tags, wanted))
        .count()
}

fn matches_dietary_type(dish: &DishRecord, wanted: DietaryType) -> bool {
    match wanted {
        DietaryType::NonVegetarian => {
            dish.dietary_type == Some(DietaryType::NonVegetarian)
        }
        // Vegan is a subset of vegetarian for filtering purposes.
        DietaryType::Vegetarian => matches!(
            dish.dietary_type,
            Some(DietaryType::Vegetarian | DietaryType::Vegan)
        ),
        DietaryType::Vegan => dish.dietary_type == Some(DietaryType::Vegan),
    }
}

/// Case-insensitive substring match in either direction against any entry.
fn any_substring_match(entries: &[String], wanted: &str) -> bool {
    let wanted = wanted.to_lowercase();
    entries.iter().any(|entry| {
        let entry = entry.to_lowercase();
        entry.contains(&wanted) || wanted.contains(&entry)
    })
}

fn apply_active_filters(
    results: Vec<&DishRecord>,
    active_filters: &[FilterId],
) -> Vec<DishRecord> {
    results
        .into_iter()
        .filter(|dish| {
            active_filters
                .iter()
                .all(|filter| passes_active_filter(dish, *filter))
        })
        .cloned()
        .collect()
}

fn passes_active_filter(dish: &DishRecord, filter: FilterId) -> bool {
    match filter {
        FilterId::Spicy => {
            matches!(
                dish.spice_level,
                Some(SpiceLevel::Hot | SpiceLevel::Medium)
            ) || has_tag(dish, "spicy")
        }
        FilterId::Vegetarian => {
            has_dietary_label(dish, "vegetarian") || has_tag(dish, "vegetarian")
        }
        FilterId::Vegan => has_dietary_label(dish, "vegan") || has_tag(dish, "vegan"),
        FilterId::GlutenFree => has_dietary_label(dish, "gluten-free"),
        FilterId::Popular => dish.is_popular,
    }
}

fn has_tag(dish: &DishRecord, tag: &str) -> bool {
    dish.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

fn has_dietary_label(dish: &DishRecord, label: &str) -> bool {
    dish.dietary.iter().any(|l| l.eq_ignore_ascii_case(label))
}
