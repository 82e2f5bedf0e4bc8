//! Query interpreter: free text in, `StructuredFilter` out.
//!
//! The model call is the only non-deterministic, fallible part of the
//! search pipeline. Everything after the raw response (JSON extraction
//! and normalization) is deterministic and covered by unit tests. The
//! caller degrades any error here to an empty filter.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::query::StructuredFilter;
use crate::settings::Interpreter as InterpreterSettings;

/// Labels the `dietary` field may carry; anything else the model puts
/// there is folded into `tags` instead.
const DIETARY_LABELS: [&str; 4] = ["vegan", "vegetarian", "gluten-free", "dairy-free"];

/// Client for the extraction model. Holds a pre-built HTTP client with a
/// request timeout; a timed-out call is an extraction failure like any
/// other.
pub struct QueryInterpreter {
    client: reqwest::Client,
    generate_url: String,
    model: String,
    format: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl QueryInterpreter {
    pub fn new(settings: &InterpreterSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("failed to build interpreter HTTP client")?;
        let format = serde_json::to_value(schemars::schema_for!(StructuredFilter))
            .context("failed to render structured-filter schema")?;
        Ok(Self {
            client,
            generate_url: format!("{}/api/generate", settings.ollama_url.trim_end_matches('/')),
            model: settings.model.clone(),
            format,
        })
    }

    /// Sends the extraction prompt and returns the normalized filter.
    ///
    /// Any transport error, non-2xx status or unparseable body is an
    /// `Err`; the search path maps that to `StructuredFilter::default()`.
    pub async fn interpret(&self, query: &str) -> Result<StructuredFilter> {
        let payload = serde_json::json!({
            "model": self.model,
            "prompt": build_prompt(query),
            "stream": false,
            "format": self.format,
            "options": { "temperature": 0.1 },
        });

        let response = self
            .client
            .post(&self.generate_url)
            .json(&payload)
            .send()
            .await
            .context("interpreter request failed")?;
        if !response.status().is_success() {
            bail!("interpreter model returned status {}", response.status());
        }

        let body: GenerateResponse = response
            .json()
            .await
            .context("interpreter returned a non-JSON body")?;
        debug!("raw extraction response: {}", body.response);

        parse_filter(&body.response)
    }
}

fn build_prompt(query: &str) -> String {
    format!(
        r#"You are a food search assistant. The user typed: "{query}"

Return a JSON object with these fields:
{{
  "tags": [],
  "dietary": [],
  "dietaryType": "",
  "mainIngredients": [],
  "spiceLevel": "",
  "excludeCategories": []
}}

CRITICAL RULES:
1. **Dietary Type Priority**: If the user mentions "vegetarian", "vegan", or "non-vegetarian", this is the MOST IMPORTANT filter
   - For "chicken", "mutton", "fish", "meat" queries: dietaryType = "non-vegetarian"
   - For "vegetarian" queries: dietaryType = "vegetarian"
   - For "vegan" queries: dietaryType = "vegan"

2. **Main Ingredients**: Extract the primary food items mentioned
   - Examples: ["chicken"], ["paneer"], ["lentils"], ["vegetables"]

3. **Tags**: Include descriptive keywords like 'chicken', 'spicy', 'creamy', 'curry', 'gravy', 'red sauce'

4. **Dietary**: Must be from ['vegan', 'vegetarian', 'gluten-free', 'dairy-free']

5. **Spice Level**:
   - "Mild" for "not spicy", "not too spicy", "mild"
   - "Medium" for "moderate spice", "medium spicy"
   - "Hot" for "very spicy", "fiery", "extra spicy"

6. **Exclude Categories**: If the user wants savory dishes with sauce/gravy, add "dessert" to exclude desserts

Examples:
- "chicken gravy red color" -> dietaryType: "non-vegetarian", mainIngredients: ["chicken"], tags: ["chicken", "gravy", "red sauce"]
- "vegetarian creamy sauce" -> dietaryType: "vegetarian", tags: ["vegetarian", "creamy", "sauce"], excludeCategories: ["dessert"]
- "vegan spicy food" -> dietaryType: "vegan", tags: ["vegan", "spicy"]

Output must be **valid JSON only**"#
    )
}

/// Extracts the JSON object from the model response and normalizes it.
/// Tolerates markdown fences and prose around the object.
fn parse_filter(raw: &str) -> Result<StructuredFilter> {
    let object = Regex::new(r"(?s)\{.*\}")
        .context("invalid extraction regex")?
        .find(raw)
        .context("no JSON object in model response")?;
    let filter: StructuredFilter = serde_json::from_str(object.as_str())
        .context("model response is not a valid structured filter")?;
    Ok(normalize(filter))
}

/// Deterministic cleanup of the extracted filter. Enum fields are already
/// clamped during deserialization; this handles the list fields.
fn normalize(mut filter: StructuredFilter) -> StructuredFilter {
    let mut dietary = Vec::new();
    for label in filter.dietary.drain(..) {
        let label = label.trim().to_lowercase();
        if label.is_empty() {
            continue;
        }
        if DIETARY_LABELS.contains(&label.as_str()) {
            dietary.push(label);
        } else {
            // Not a recognized dietary label; keep the signal as a tag.
            filter.tags.push(label);
        }
    }
    filter.dietary = dietary;

    filter.tags = cleaned(filter.tags, false);
    filter.main_ingredients = cleaned(filter.main_ingredients, false);
    filter.exclude_categories = cleaned(filter.exclude_categories, true);
    filter
}

fn cleaned(values: Vec<String>, lowercase: bool) -> Vec<String> {
    values
        .into_iter()
        .map(|v| {
            let v = v.trim();
            if lowercase {
                v.to_lowercase()
            } else {
                v.to_string()
            }
        })
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DietaryType, SpiceLevel};

    #[test]
    fn parses_a_plain_json_response() {
        let filter = parse_filter(
            r#"{"tags": ["chicken", "gravy"], "dietary": [], "dietaryType": "non-vegetarian",
                "mainIngredients": ["chicken"], "spiceLevel": "Hot", "excludeCategories": ["dessert"]}"#,
        )
        .unwrap();
        assert_eq!(filter.dietary_type, Some(DietaryType::NonVegetarian));
        assert_eq!(filter.spice_level, Some(SpiceLevel::Hot));
        assert_eq!(filter.tags, vec!["chicken", "gravy"]);
    }

    #[test]
    fn strips_markdown_fences_and_prose() {
        let raw = "Sure! Here is the extraction:\n```json\n{\"tags\": [\"curry\"], \"dietaryType\": \"vegan\"}\n```\nLet me know if you need anything else.";
        let filter = parse_filter(raw).unwrap();
        assert_eq!(filter.tags, vec!["curry"]);
        assert_eq!(filter.dietary_type, Some(DietaryType::Vegan));
    }

    #[test]
    fn rejects_responses_without_a_json_object() {
        assert!(parse_filter("I could not understand the query.").is_err());
        assert!(parse_filter("").is_err());
    }

    #[test]
    fn unknown_dietary_labels_fold_into_tags() {
        let filter = parse_filter(
            r#"{"dietary": ["vegan", "Keto", "gluten-free", " "], "tags": ["curry"]}"#,
        )
        .unwrap();
        assert_eq!(filter.dietary, vec!["vegan", "gluten-free"]);
        assert_eq!(filter.tags, vec!["curry", "keto"]);
    }

    #[test]
    fn blank_entries_are_dropped_and_exclusions_lowercased() {
        let filter = parse_filter(
            r#"{"tags": ["  creamy  ", ""], "mainIngredients": [" paneer ", "  "],
                "excludeCategories": ["Dessert"]}"#,
        )
        .unwrap();
        assert_eq!(filter.tags, vec!["creamy"]);
        assert_eq!(filter.main_ingredients, vec!["paneer"]);
        assert_eq!(filter.exclude_categories, vec!["dessert"]);
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let filter = parse_filter(r#"{"tags": ["sweet"]}"#).unwrap();
        assert_eq!(filter.dietary_type, None);
        assert_eq!(filter.spice_level, None);
        assert!(filter.dietary.is_empty());
        assert!(filter.exclude_categories.is_empty());
    }

    #[test]
    fn prompt_embeds_the_user_query() {
        let prompt = build_prompt("vegan spicy food");
        assert!(prompt.contains("\"vegan spicy food\""));
        assert!(prompt.contains("valid JSON only"));
    }
}
