//! Recipe extraction from HTML pages
//!
//! The fast path reads schema.org `Recipe` objects from JSON-LD blocks. Pages
//! without usable markup can fall back to a chat-completion model that is
//! asked to return the recipe as JSON.

use super::html::{clean_text, page_text, truncate_chars};
use crate::{
    config::LlmConfig,
    models::{CreateRecipeRequest, NutritionInfo, Recipe},
    services::{nutrition_service, recipe_service},
    utils::AppError,
};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

pub const MAX_LLM_INPUT_CHARS: usize = 12_000;
const MAX_WALK_DEPTH: usize = 8;

lazy_static::lazy_static! {
    static ref LD_JSON_RE: Regex = Regex::new(
        r#"(?is)<script[^>]*type\s*=\s*["']?application/ld\+json["']?[^>]*>(.*?)</script\s*>"#
    ).expect("valid regex");
    static ref ISO_DURATION_RE: Regex = Regex::new(
        r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$"
    ).expect("valid regex");
    static ref NUMBER_RE: Regex = Regex::new(r"(\d+(?:[.,]\d+)*)").expect("valid regex");
    static ref CODE_FENCE_RE: Regex = Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("valid regex");
}

/// Recipe fields scraped from a page, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScrapedRecipe {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub servings: Option<u32>,
    #[serde(default)]
    pub prep_time_minutes: Option<u32>,
    #[serde(default)]
    pub cook_time_minutes: Option<u32>,
    #[serde(default)]
    pub nutrition: Option<NutritionInfo>,
}

impl ScrapedRecipe {
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty() && !self.ingredients.is_empty() && !self.steps.is_empty()
    }

    /// Validates the scraped fields and builds a recipe attributed to `source_url`
    pub fn into_recipe(self, source_url: &str, author_id: Option<String>) -> Result<Recipe, AppError> {
        if !self.is_complete() {
            return Err(AppError::InvalidRequest("Page does not contain a recipe".to_string()));
        }
        let request = CreateRecipeRequest {
            title: self.title,
            description: self.description,
            region: self.region,
            image_url: self.image_url,
            ingredients: self.ingredients,
            steps: self.steps,
            servings: self.servings.filter(|s| *s > 0),
            prep_time_minutes: self.prep_time_minutes,
            cook_time_minutes: self.cook_time_minutes,
            nutrition: self.nutrition,
        };
        let mut recipe = recipe_service::build_recipe(&request, author_id)?;
        recipe.source_url = Some(source_url.to_string());
        Ok(recipe)
    }
}

// ==================== JSON-LD ====================

fn has_recipe_type(node: &Value) -> bool {
    match node.get("@type") {
        Some(Value::String(t)) => t.eq_ignore_ascii_case("recipe") || t.ends_with("/Recipe"),
        Some(Value::Array(types)) => types
            .iter()
            .any(|t| t.as_str().map(|s| s.eq_ignore_ascii_case("recipe")).unwrap_or(false)),
        _ => false,
    }
}

fn find_recipe_node(node: &Value, depth: usize) -> Option<&Value> {
    if depth > MAX_WALK_DEPTH {
        return None;
    }
    match node {
        Value::Object(map) => {
            if has_recipe_type(node) {
                return Some(node);
            }
            if let Some(found) = map.get("@graph").and_then(|g| find_recipe_node(g, depth + 1)) {
                return Some(found);
            }
            map.iter()
                .filter(|(key, _)| key.as_str() != "@graph")
                .find_map(|(_, value)| find_recipe_node(value, depth + 1))
        }
        Value::Array(items) => items.iter().find_map(|item| find_recipe_node(item, depth + 1)),
        _ => None,
    }
}

/// Minutes in an ISO 8601 duration such as `PT1H30M`
pub fn parse_iso_duration(value: &str) -> Option<u32> {
    let caps = ISO_DURATION_RE.captures(value.trim())?;
    let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<f64>().ok()).unwrap_or(0.0);
    let minutes = part(1) * 1440.0 + part(2) * 60.0 + part(3) + part(4) / 60.0;
    if minutes <= 0.0 {
        return None;
    }
    Some(minutes.round() as u32)
}

fn first_number(text: &str) -> Option<f64> {
    NUMBER_RE
        .captures(text)
        .and_then(|c| nutrition_service::parse_number(&c[1]))
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(clean_text(s)).filter(|s| !s.is_empty()),
        Value::Array(items) => items.iter().find_map(text_of),
        Value::Object(map) => map.get("name").or_else(|| map.get("text")).and_then(text_of),
        _ => None,
    }
}

fn parse_yield(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_f64().map(|v| v.round() as u32),
        Value::String(s) => first_number(s).map(|v| v.round() as u32),
        Value::Array(items) => items.iter().find_map(parse_yield),
        _ => None,
    }
    .filter(|v| *v > 0)
}

fn parse_image(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Array(items) => items.iter().find_map(parse_image),
        Value::Object(map) => map.get("url").or_else(|| map.get("contentUrl")).and_then(parse_image),
        _ => None,
    }
}

fn collect_instructions(value: &Value, out: &mut Vec<String>, depth: usize) {
    if depth > MAX_WALK_DEPTH {
        return;
    }
    match value {
        Value::String(s) => {
            // Some sites put every step into one string
            for line in s.split('\n') {
                let line = clean_text(line);
                if !line.is_empty() {
                    out.push(line);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_instructions(item, out, depth + 1);
            }
        }
        Value::Object(map) => {
            if let Some(elements) = map.get("itemListElement") {
                collect_instructions(elements, out, depth + 1);
            } else if let Some(text) = map.get("text").or_else(|| map.get("name")) {
                collect_instructions(text, out, depth + 1);
            }
        }
        _ => {}
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(clean_text)
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s.split('\n').map(clean_text).filter(|s| !s.is_empty()).collect(),
        _ => vec![],
    }
}

fn nutrient(map: &serde_json::Map<String, Value>, key: &str) -> Option<f64> {
    match map.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let value = first_number(s)?;
            let lower = s.to_lowercase();
            // Sodium is sometimes given in grams
            if key == "sodiumContent" && lower.contains('g') && !lower.contains("mg") {
                Some(value * 1000.0)
            } else {
                Some(value)
            }
        }
        _ => None,
    }
}

/// schema.org NutritionInformation is per serving; stored values are per recipe
fn parse_nutrition(value: &Value, servings: Option<u32>) -> Option<NutritionInfo> {
    let map = value.as_object()?;
    let calories = nutrient(map, "calories");
    let protein = nutrient(map, "proteinContent");
    let fat = nutrient(map, "fatContent");
    let carbs = nutrient(map, "carbohydrateContent");
    if calories.is_none() && protein.is_none() && fat.is_none() && carbs.is_none() {
        return None;
    }

    let per_serving = NutritionInfo {
        calories: calories.unwrap_or(0.0),
        protein_g: protein.unwrap_or(0.0),
        fat_g: fat.unwrap_or(0.0),
        carbohydrates_g: carbs.unwrap_or(0.0),
        fiber_g: nutrient(map, "fiberContent").unwrap_or(0.0),
        sugar_g: nutrient(map, "sugarContent").unwrap_or(0.0),
        sodium_mg: nutrient(map, "sodiumContent").unwrap_or(0.0),
    };
    Some(per_serving.scaled(servings.unwrap_or(1) as f64).rounded())
}

/// Absolute image URL; relative paths resolve against the page
fn resolve_image(image: String, page: Option<&Url>) -> Option<String> {
    match Url::parse(&image) {
        Ok(absolute) => Some(absolute.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => page?.join(&image).ok().map(|u| u.to_string()),
        Err(_) => None,
    }
}

fn recipe_from_node(node: &Value, page: Option<&Url>) -> ScrapedRecipe {
    let servings = node.get("recipeYield").and_then(parse_yield);
    let mut steps = Vec::new();
    if let Some(instructions) = node.get("recipeInstructions") {
        collect_instructions(instructions, &mut steps, 0);
    }

    ScrapedRecipe {
        title: node.get("name").and_then(text_of).unwrap_or_default(),
        description: node.get("description").and_then(text_of),
        region: node.get("recipeCuisine").and_then(text_of),
        image_url: node.get("image").and_then(parse_image).and_then(|img| resolve_image(img, page)),
        ingredients: node
            .get("recipeIngredient")
            .or_else(|| node.get("ingredients"))
            .map(string_list)
            .unwrap_or_default(),
        steps,
        servings,
        prep_time_minutes: node.get("prepTime").and_then(Value::as_str).and_then(parse_iso_duration),
        cook_time_minutes: node.get("cookTime").and_then(Value::as_str).and_then(parse_iso_duration),
        nutrition: node.get("nutrition").and_then(|n| parse_nutrition(n, servings)),
    }
}

/// First schema.org Recipe found in the page's JSON-LD blocks of the page at `url`
pub fn extract_json_ld_recipe(html: &str, url: &str) -> Option<ScrapedRecipe> {
    let page = Url::parse(url).ok();
    for caps in LD_JSON_RE.captures_iter(html) {
        let raw = caps[1].trim();
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                log::debug!("Skipping invalid JSON-LD block: {}", e);
                continue;
            }
        };
        if let Some(node) = find_recipe_node(&value, 0) {
            return Some(recipe_from_node(node, page.as_ref()));
        }
    }
    None
}

// ==================== LLM FALLBACK ====================

/// Chat-completion backend used when a page has no recipe markup
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, AppError>;
}

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl OpenAiClient {
    /// `None` when no API key is configured
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Some(OpenAiClient {
            http,
            api_key,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, AppError> {
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ]
        });

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to reach LLM API: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!("LLM API error: {}", response.status())));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to parse LLM response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::ExternalService("LLM returned no content".to_string()))
    }
}

const LLM_SYSTEM_PROMPT: &str = "You extract cooking recipes from web page text. \
Reply with a single JSON object and nothing else, using the keys: \
title (string), description (string or null), region (string or null, the Philippine region or cuisine), \
image_url (null), ingredients (array of strings, one per line with quantities), \
steps (array of strings), servings (integer or null), prep_time_minutes (integer or null), \
cook_time_minutes (integer or null). If the page is not a recipe, reply with {\"title\": \"\"}.";

/// The JSON object inside a model reply, tolerating code fences and chatter
pub fn extract_json_object(reply: &str) -> Option<&str> {
    let body = match CODE_FENCE_RE.captures(reply).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => reply,
    };
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&body[start..=end])
}

pub async fn extract_with_llm(llm: &dyn LlmClient, html: &str, url: &str) -> Result<ScrapedRecipe, AppError> {
    let text = page_text(html);
    let text = truncate_chars(&text, MAX_LLM_INPUT_CHARS);
    if text.trim().is_empty() {
        return Err(AppError::InvalidRequest("Page has no readable text".to_string()));
    }

    let prompt = format!("URL: {}\n\nPage text:\n{}", url, text);
    let reply = llm.complete(LLM_SYSTEM_PROMPT, &prompt).await?;

    let json = extract_json_object(&reply)
        .ok_or_else(|| AppError::ExternalService("LLM reply did not contain JSON".to_string()))?;
    let recipe: ScrapedRecipe = serde_json::from_str(json)
        .map_err(|e| AppError::ExternalService(format!("LLM returned malformed recipe JSON: {}", e)))?;

    if !recipe.is_complete() {
        return Err(AppError::InvalidRequest("Page does not contain a recipe".to_string()));
    }
    Ok(recipe)
}

/// JSON-LD first, then the model when one is configured
pub async fn extract_recipe(html: &str, url: &str, llm: Option<&dyn LlmClient>) -> Result<ScrapedRecipe, AppError> {
    let structured = extract_json_ld_recipe(html, url);
    if let Some(recipe) = structured.as_ref().filter(|r| r.is_complete()) {
        return Ok(recipe.clone());
    }

    match llm {
        Some(llm) => {
            log::info!("🤖 No usable JSON-LD on {}, asking the LLM", url);
            extract_with_llm(llm, html, url).await
        }
        None => Err(AppError::InvalidRequest(
            "No recipe markup found on the page and LLM extraction is disabled".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADOBO_PAGE: &str = r#"<html><head>
        <script type="application/ld+json">{"@context": "https://schema.org", "@type": "WebSite", "name": "Kusina"}</script>
        <script type="application/ld+json">
        {
          "@context": "https://schema.org",
          "@graph": [
            {"@type": "WebPage", "name": "Adobo page"},
            {
              "@type": ["Recipe", "NewsArticle"],
              "name": "Chicken Adobo &amp; Potatoes",
              "description": "<p>A classic braise.</p>",
              "image": [{"@type": "ImageObject", "url": "https://example.com/adobo.jpg"}],
              "recipeYield": ["4", "4 servings"],
              "prepTime": "PT15M",
              "cookTime": "PT1H5M",
              "recipeCuisine": ["Tagalog"],
              "recipeIngredient": ["1 kg chicken", "1/2 cup soy sauce", "  "],
              "recipeInstructions": [
                {"@type": "HowToSection", "name": "Marinate", "itemListElement": [
                  {"@type": "HowToStep", "text": "Combine chicken and soy sauce."}
                ]},
                {"@type": "HowToStep", "text": "Simmer for 45 minutes."}
              ],
              "nutrition": {"@type": "NutritionInformation", "calories": "350 kcal", "proteinContent": "30 g", "sodiumContent": "1.2 g"}
            }
          ]
        }
        </script></head><body></body></html>"#;

    #[test]
    fn test_extract_json_ld_graph() {
        let recipe = extract_json_ld_recipe(ADOBO_PAGE, "https://example.com/adobo").unwrap();
        assert_eq!(recipe.title, "Chicken Adobo & Potatoes");
        assert_eq!(recipe.description.as_deref(), Some("A classic braise."));
        assert_eq!(recipe.image_url.as_deref(), Some("https://example.com/adobo.jpg"));
        assert_eq!(recipe.region.as_deref(), Some("Tagalog"));
        assert_eq!(recipe.servings, Some(4));
        assert_eq!(recipe.prep_time_minutes, Some(15));
        assert_eq!(recipe.cook_time_minutes, Some(65));
        assert_eq!(recipe.ingredients, vec!["1 kg chicken", "1/2 cup soy sauce"]);
        assert_eq!(recipe.steps, vec!["Combine chicken and soy sauce.", "Simmer for 45 minutes."]);

        let nutrition = recipe.nutrition.unwrap();
        assert_eq!(nutrition.calories, 1400.0);
        assert_eq!(nutrition.protein_g, 120.0);
        assert_eq!(nutrition.sodium_mg, 4800.0);
    }

    #[test]
    fn test_plain_string_instructions() {
        let html = r#"<script type='application/ld+json'>{"@type": "Recipe", "name": "Sinigang",
            "recipeIngredient": ["pork", "tamarind"], "recipeInstructions": "Boil pork.\nAdd tamarind.",
            "recipeYield": 6, "image": "https://example.com/s.jpg"}</script>"#;
        let recipe = extract_json_ld_recipe(html, "https://example.com/sinigang").unwrap();
        assert_eq!(recipe.steps, vec!["Boil pork.", "Add tamarind."]);
        assert_eq!(recipe.servings, Some(6));
        assert_eq!(recipe.image_url.as_deref(), Some("https://example.com/s.jpg"));
        assert!(recipe.nutrition.is_none());
    }

    #[test]
    fn test_no_recipe_markup() {
        assert!(extract_json_ld_recipe("<html><body>No data</body></html>", "https://example.com").is_none());
        let broken = r#"<script type="application/ld+json">{not json</script>"#;
        assert!(extract_json_ld_recipe(broken, "https://example.com").is_none());
    }

    #[test]
    fn test_nutrition_with_thousands_separator() {
        let html = r#"<script type="application/ld+json">{"@type": "Recipe", "name": "Lechon",
            "recipeIngredient": ["1 whole pig"], "recipeInstructions": "Roast.", "recipeYield": 1,
            "nutrition": {"calories": "1,250 kcal", "sodiumContent": "1,200 mg", "fatContent": "95,5 g"}}</script>"#;
        let nutrition = extract_json_ld_recipe(html, "https://example.com/lechon").unwrap().nutrition.unwrap();
        assert_eq!(nutrition.calories, 1250.0);
        assert_eq!(nutrition.sodium_mg, 1200.0);
        assert_eq!(nutrition.fat_g, 95.5);
    }

    #[test]
    fn test_relative_image_resolves_against_page() {
        let html = r#"<script type="application/ld+json">{"@type": "Recipe", "name": "Turon",
            "recipeIngredient": ["saba"], "recipeInstructions": "Fry.", "image": "/img/turon.jpg"}</script>"#;
        let recipe = extract_json_ld_recipe(html, "https://example.com/desserts/turon").unwrap();
        assert_eq!(recipe.image_url.as_deref(), Some("https://example.com/img/turon.jpg"));
    }

    #[test]
    fn test_iso_durations() {
        assert_eq!(parse_iso_duration("PT45M"), Some(45));
        assert_eq!(parse_iso_duration("PT1H30M"), Some(90));
        assert_eq!(parse_iso_duration("P0DT2H0M"), Some(120));
        assert_eq!(parse_iso_duration("P1D"), Some(1440));
        assert_eq!(parse_iso_duration("PT0M"), None);
        assert_eq!(parse_iso_duration("45 minutes"), None);
    }

    #[test]
    fn test_into_recipe_sets_source() {
        let scraped = extract_json_ld_recipe(ADOBO_PAGE, "https://example.com/adobo").unwrap();
        let recipe = scraped.into_recipe("https://example.com/adobo", None).unwrap();
        assert_eq!(recipe.source_url.as_deref(), Some("https://example.com/adobo"));
        assert_eq!(recipe.region, "Tagalog");

        assert!(ScrapedRecipe::default().into_recipe("https://example.com", None).is_err());
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(extract_json_object("```json\n{\"title\": \"x\"}\n```"), Some("{\"title\": \"x\"}"));
        assert_eq!(extract_json_object("Sure! {\"a\": {\"b\": 1}} hope this helps"), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(extract_json_object("no json here"), None);
    }

    struct CannedLlm(&'static str);

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn complete(&self, _system: &str, user: &str) -> Result<String, AppError> {
            assert!(user.chars().count() <= MAX_LLM_INPUT_CHARS + 200);
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_llm_fallback() {
        let html = "<html><body><h1>Lola's Pancit</h1><p>Noodles, cabbage. Stir fry.</p></body></html>";
        let llm = CannedLlm(
            "```json\n{\"title\": \"Pancit\", \"ingredients\": [\"250 g noodles\"], \"steps\": [\"Stir fry.\"], \"servings\": 4}\n```",
        );
        let recipe = extract_recipe(html, "https://example.com/pancit", Some(&llm as &dyn LlmClient)).await.unwrap();
        assert_eq!(recipe.title, "Pancit");
        assert_eq!(recipe.servings, Some(4));
    }

    #[tokio::test]
    async fn test_llm_says_not_a_recipe() {
        let html = "<html><body><p>About us</p></body></html>";
        let llm = CannedLlm("{\"title\": \"\"}");
        let result = extract_recipe(html, "https://example.com/about", Some(&llm as &dyn LlmClient)).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_no_markup_without_llm() {
        let result = extract_recipe("<p>hi</p>", "https://example.com", None).await;
        assert!(result.is_err());
    }
}
