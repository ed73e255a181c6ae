//! Rule-based cooking assistant
//!
//! Replies are composed from keyword intents and recipe lookups; no language
//! model is involved.

use crate::{
    database::MongoDB,
    models::RecipeSummary,
    services::recipe_service::{self, RecipeQuery},
    utils::AppError,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

const MAX_MESSAGE_LEN: usize = 1000;
const MAX_SUGGESTIONS: usize = 5;

lazy_static::lazy_static! {
    static ref INGREDIENT_RE: Regex = Regex::new(
        r"(?:cook|make|recipes?|dish(?:es)?)\s+(?:with|using)\s+(.+)|(?:using|i have|i've got|got some)\s+(.+)"
    ).expect("valid regex");
    static ref SPLIT_RE: Regex = Regex::new(r"\s*(?:,|\band\b|&|\+)\s*").expect("valid regex");
}

const GREETINGS: &[&str] = &["hi", "hello", "hey", "kumusta", "kamusta", "good morning", "good evening", "magandang"];
const NUTRITION_WORDS: &[&str] = &["calorie", "calories", "nutrition", "protein", "healthy", "fat", "carb", "sodium"];
const REGION_WORDS: &[&str] = &["region", "province", "from the", "regional", "where"];
const HELP_WORDS: &[&str] = &["help", "what can you do", "how do i", "how to use"];

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ChatResponse {
    pub success: bool,
    pub intent: String,
    pub reply: String,
    pub suggestions: Vec<RecipeSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Greeting,
    RecipeByIngredient(Vec<String>),
    Nutrition,
    Region(Option<String>),
    Help,
    Fallback,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::RecipeByIngredient(_) => "recipe_by_ingredient",
            Intent::Nutrition => "nutrition",
            Intent::Region(_) => "region",
            Intent::Help => "help",
            Intent::Fallback => "fallback",
        }
    }
}

fn contains_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|w| w == word)
        || (word.contains(' ') && text.contains(word))
}

fn extract_ingredients(fragment: &str) -> Vec<String> {
    let fragment = fragment.trim_end_matches(|c: char| c == '?' || c == '!' || c == '.').trim();
    let mut out: Vec<String> = Vec::new();
    for part in SPLIT_RE.split(fragment) {
        let part = part
            .trim()
            .trim_start_matches("some ")
            .trim_start_matches("a ")
            .trim_start_matches("an ")
            .trim();
        if !part.is_empty() && !out.iter().any(|o| o == part) {
            out.push(part.to_string());
        }
    }
    out
}

/// Picks the assistant intent for a lower-cased message
pub fn detect_intent(message: &str, regions: &[String]) -> Intent {
    let text = message.trim().to_lowercase();

    if let Some(caps) = INGREDIENT_RE.captures(&text) {
        let fragment = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or("");
        let ingredients = extract_ingredients(fragment);
        if !ingredients.is_empty() {
            return Intent::RecipeByIngredient(ingredients);
        }
    }

    if NUTRITION_WORDS.iter().any(|w| contains_word(&text, w)) {
        return Intent::Nutrition;
    }

    let mentioned_region = regions.iter().find(|r| contains_word(&text, &r.to_lowercase())).cloned();
    if mentioned_region.is_some() || REGION_WORDS.iter().any(|w| contains_word(&text, w)) {
        return Intent::Region(mentioned_region);
    }

    if HELP_WORDS.iter().any(|w| contains_word(&text, w)) {
        return Intent::Help;
    }

    if GREETINGS.iter().any(|w| contains_word(&text, w)) {
        return Intent::Greeting;
    }

    Intent::Fallback
}

fn format_suggestions(recipes: &[RecipeSummary]) -> String {
    recipes
        .iter()
        .map(|r| format!("• {} ({})", r.title, r.region))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn respond(db: &MongoDB, request: &ChatRequest) -> Result<ChatResponse, AppError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(AppError::InvalidRequest("Message cannot be empty".to_string()));
    }
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::InvalidRequest(format!("Message must be at most {} characters", MAX_MESSAGE_LEN)));
    }

    let regions = recipe_service::list_regions(db).await?;
    let intent = detect_intent(message, &regions);
    log::debug!("💬 Chat intent: {}", intent.name());

    let (reply, suggestions) = match &intent {
        Intent::Greeting => (
            "Kumusta! I'm your kitchen assistant. Tell me what ingredients you have and I'll suggest Filipino recipes.".to_string(),
            vec![],
        ),
        Intent::Help => (
            "Try asking \"what can I cook with chicken and garlic?\", \"show me recipes from Bicol\" or \"how many calories are in adobo?\". You can also scan a photo of your ingredients.".to_string(),
            vec![],
        ),
        Intent::Nutrition => (
            "Open any recipe and use the nutrition analysis to get calories, protein, fat and carbohydrates per serving, based on USDA FoodData Central.".to_string(),
            vec![],
        ),
        Intent::RecipeByIngredient(ingredients) => {
            let suggestions: Vec<RecipeSummary> = recipe_service::find_by_ingredients(db, ingredients, MAX_SUGGESTIONS)
                .await?
                .into_iter()
                .map(|(recipe, _)| recipe)
                .collect();
            let reply = if suggestions.is_empty() {
                format!("I couldn't find recipes using {}. Try another ingredient?", ingredients.join(", "))
            } else {
                format!(
                    "Here are some dishes you can make with {}:\n{}",
                    ingredients.join(", "),
                    format_suggestions(&suggestions)
                )
            };
            (reply, suggestions)
        }
        Intent::Region(Some(region)) => {
            let query = RecipeQuery {
                region: Some(region.clone()),
                limit: Some(MAX_SUGGESTIONS as i64),
                ..Default::default()
            };
            let suggestions = recipe_service::list_recipes(db, &query).await?.recipes;
            let reply = if suggestions.is_empty() {
                format!("I don't have recipes from {} yet.", region)
            } else {
                format!("Popular dishes from {}:\n{}", region, format_suggestions(&suggestions))
            };
            (reply, suggestions)
        }
        Intent::Region(None) => {
            let reply = if regions.is_empty() {
                "There are no regional recipes yet.".to_string()
            } else {
                format!("I have recipes from these regions: {}. Which one would you like?", regions.join(", "))
            };
            (reply, vec![])
        }
        Intent::Fallback => (
            "Sorry, I didn't get that. Tell me an ingredient, like \"recipes with pork\", or type \"help\".".to_string(),
            vec![],
        ),
    };

    Ok(ChatResponse {
        success: true,
        intent: intent.name().to_string(),
        reply,
        suggestions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions() -> Vec<String> {
        vec!["Bicol".to_string(), "Ilocos".to_string(), "Visayas".to_string()]
    }

    #[test]
    fn test_ingredient_intents() {
        assert_eq!(
            detect_intent("What can I cook with chicken and garlic?", &regions()),
            Intent::RecipeByIngredient(vec!["chicken".to_string(), "garlic".to_string()])
        );
        assert_eq!(
            detect_intent("any recipe with pork, coconut milk", &regions()),
            Intent::RecipeByIngredient(vec!["pork".to_string(), "coconut milk".to_string()])
        );
        assert_eq!(
            detect_intent("I have some eggplant", &regions()),
            Intent::RecipeByIngredient(vec!["eggplant".to_string()])
        );
    }

    #[test]
    fn test_other_intents() {
        assert_eq!(detect_intent("Hello!", &regions()), Intent::Greeting);
        assert_eq!(detect_intent("how many calories in adobo", &regions()), Intent::Nutrition);
        assert_eq!(detect_intent("show me dishes from bicol", &regions()), Intent::Region(Some("Bicol".to_string())));
        assert_eq!(detect_intent("which region has the best food", &regions()), Intent::Region(None));
        assert_eq!(detect_intent("help", &regions()), Intent::Help);
        assert_eq!(detect_intent("asdf qwerty", &regions()), Intent::Fallback);
    }

    #[test]
    fn test_greeting_word_boundaries() {
        // "this" contains "hi" but is not a greeting
        assert_eq!(detect_intent("this is weird", &regions()), Intent::Fallback);
    }
}
