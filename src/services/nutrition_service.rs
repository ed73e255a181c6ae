//! Ingredient line parsing, gram conversion and recipe nutrition totals
//!
//! Parsing is a single-pass heuristic: a leading quantity (integer, decimal,
//! fraction, mixed number, unicode fraction or range), an optional unit
//! token, and the remaining text as the ingredient name. Volumes are turned
//! into grams with a small density table; count units use grams per piece.

use crate::{
    models::NutritionInfo,
    services::fdc_service::{nutrition_per_100g, FoodLookup},
    utils::AppError,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

const ML_PER_CUP: f64 = 240.0;
const ML_PER_TBSP: f64 = 15.0;
const ML_PER_TSP: f64 = 5.0;
const GRAMS_PER_OZ: f64 = 28.35;
const GRAMS_PER_LB: f64 = 453.6;
const GRAMS_PER_PINCH: f64 = 0.36;
const GRAMS_PER_CAN: f64 = 400.0;
const GRAMS_PER_SLICE: f64 = 30.0;
const GRAMS_PER_BUNCH: f64 = 100.0;
const GRAMS_PER_HEAD: f64 = 50.0;
const GRAMS_PER_CLOVE: f64 = 5.0;
const DEFAULT_GRAMS_PER_PIECE: f64 = 100.0;
const DEFAULT_DENSITY: f64 = 1.0;

pub const MAX_ANALYZE_LINES: usize = 60;

lazy_static::lazy_static! {
    static ref MIXED_RE: Regex = Regex::new(r"^(\d+)\s+(\d+)\s*/\s*(\d+)").expect("valid regex");
    static ref FRACTION_RE: Regex = Regex::new(r"^(\d+)\s*/\s*(\d+)").expect("valid regex");
    static ref DECIMAL_RE: Regex = Regex::new(r"^(\d+(?:[.,]\d+)*)").expect("valid regex");
    static ref RANGE_SEP_RE: Regex = Regex::new(r"^\s*(?:-|–|to)\s*").expect("valid regex");
    static ref PARENS_RE: Regex = Regex::new(r"\([^)]*\)").expect("valid regex");
    static ref SPACES_RE: Regex = Regex::new(r"\s+").expect("valid regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Gram,
    Kilogram,
    Milligram,
    Ounce,
    Pound,
    Milliliter,
    Liter,
    Cup,
    Tablespoon,
    Teaspoon,
    Clove,
    Piece,
    Pinch,
    Can,
    Slice,
    Bunch,
    Head,
}

impl Unit {
    pub fn from_token(token: &str) -> Option<Unit> {
        let token = token.trim_end_matches('.');
        let unit = match token {
            "g" | "gr" | "gram" | "grams" | "gramo" => Unit::Gram,
            "kg" | "kgs" | "kilo" | "kilos" | "kilogram" | "kilograms" => Unit::Kilogram,
            "mg" | "milligram" | "milligrams" => Unit::Milligram,
            "oz" | "ounce" | "ounces" => Unit::Ounce,
            "lb" | "lbs" | "pound" | "pounds" => Unit::Pound,
            "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => Unit::Milliliter,
            "l" | "liter" | "liters" | "litre" | "litres" => Unit::Liter,
            "cup" | "cups" | "c" => Unit::Cup,
            "tbsp" | "tbsps" | "tbs" | "tablespoon" | "tablespoons" => Unit::Tablespoon,
            "tsp" | "tsps" | "teaspoon" | "teaspoons" => Unit::Teaspoon,
            "clove" | "cloves" => Unit::Clove,
            "piece" | "pieces" | "pc" | "pcs" | "whole" => Unit::Piece,
            "pinch" | "pinches" | "dash" | "dashes" => Unit::Pinch,
            "can" | "cans" | "tin" | "tins" => Unit::Can,
            "slice" | "slices" => Unit::Slice,
            "bunch" | "bunches" | "tali" => Unit::Bunch,
            "head" | "heads" => Unit::Head,
            _ => return None,
        };
        Some(unit)
    }

    fn millilitres(&self) -> Option<f64> {
        match self {
            Unit::Milliliter => Some(1.0),
            Unit::Liter => Some(1000.0),
            Unit::Cup => Some(ML_PER_CUP),
            Unit::Tablespoon => Some(ML_PER_TBSP),
            Unit::Teaspoon => Some(ML_PER_TSP),
            _ => None,
        }
    }
}

/// Approximate densities in g/ml, matched by substring (longest key wins)
const DENSITIES: &[(&str, f64)] = &[
    ("water", 1.0),
    ("milk", 1.03),
    ("coconut milk", 0.97),
    ("coconut cream", 1.0),
    ("oil", 0.92),
    ("soy sauce", 1.2),
    ("fish sauce", 1.2),
    ("oyster sauce", 1.25),
    ("vinegar", 1.01),
    ("sugar", 0.85),
    ("brown sugar", 0.93),
    ("flour", 0.53),
    ("cornstarch", 0.54),
    ("rice", 0.85),
    ("salt", 1.2),
    ("butter", 0.96),
    ("honey", 1.42),
    ("peanut butter", 1.08),
    ("ketchup", 1.15),
    ("mayonnaise", 0.91),
];

/// Grams per piece for countable ingredients
const PIECE_WEIGHTS: &[(&str, f64)] = &[
    ("egg", 50.0),
    ("onion", 110.0),
    ("red onion", 110.0),
    ("tomato", 120.0),
    ("potato", 170.0),
    ("carrot", 60.0),
    ("bell pepper", 120.0),
    ("chili", 15.0),
    ("siling haba", 10.0),
    ("calamansi", 10.0),
    ("lemon", 60.0),
    ("lime", 45.0),
    ("banana", 120.0),
    ("saba", 80.0),
    ("eggplant", 250.0),
    ("garlic", GRAMS_PER_CLOVE),
    ("ginger", 30.0),
    ("bay leaf", 0.2),
    ("bay leaves", 0.2),
    ("chicken thigh", 120.0),
    ("chicken breast", 170.0),
    ("pork chop", 200.0),
    ("shrimp", 15.0),
    ("hotdog", 45.0),
    ("bread", 30.0),
];

fn lookup_table(table: &[(&str, f64)], name: &str) -> Option<f64> {
    table
        .iter()
        .filter(|(key, _)| name.contains(key))
        .max_by_key(|(key, _)| key.len())
        .map(|(_, value)| *value)
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct ParsedIngredient {
    pub original: String,
    pub quantity: f64,
    pub unit: Unit,
    pub name: String,
}

impl ParsedIngredient {
    /// Estimated weight in grams
    pub fn grams(&self) -> f64 {
        let q = self.quantity;
        let grams = match self.unit {
            Unit::Gram => q,
            Unit::Kilogram => q * 1000.0,
            Unit::Milligram => q / 1000.0,
            Unit::Ounce => q * GRAMS_PER_OZ,
            Unit::Pound => q * GRAMS_PER_LB,
            Unit::Milliliter | Unit::Liter | Unit::Cup | Unit::Tablespoon | Unit::Teaspoon => {
                let ml = q * self.unit.millilitres().unwrap_or(1.0);
                ml * lookup_table(DENSITIES, &self.name).unwrap_or(DEFAULT_DENSITY)
            }
            Unit::Clove => q * GRAMS_PER_CLOVE,
            Unit::Piece => q * lookup_table(PIECE_WEIGHTS, &self.name).unwrap_or(DEFAULT_GRAMS_PER_PIECE),
            Unit::Pinch => q * GRAMS_PER_PINCH,
            Unit::Can => q * GRAMS_PER_CAN,
            Unit::Slice => q * GRAMS_PER_SLICE,
            Unit::Bunch => q * GRAMS_PER_BUNCH,
            Unit::Head => q * GRAMS_PER_HEAD,
        };
        (grams * 100.0).round() / 100.0
    }
}

fn replace_unicode_fractions(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        let replacement = match c {
            '½' => Some("1/2"),
            '⅓' => Some("1/3"),
            '⅔' => Some("2/3"),
            '¼' => Some("1/4"),
            '¾' => Some("3/4"),
            '⅛' => Some("1/8"),
            '⅜' => Some("3/8"),
            '⅝' => Some("5/8"),
            '⅞' => Some("7/8"),
            '⅕' => Some("1/5"),
            _ => None,
        };
        match replacement {
            Some(r) => {
                // "1½" becomes "1 1/2"
                if out.chars().last().map(|p| p.is_ascii_digit()).unwrap_or(false) {
                    out.push(' ');
                }
                out.push_str(r);
            }
            None => out.push(c),
        }
    }
    out
}

/// Parses a numeric token such as `2`, `0.5`, `0,5`, `1,000` or `1,250.5`.
///
/// A comma followed by exactly three digits groups thousands; any other
/// single comma is a decimal comma.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if !s.contains(',') {
        return s.parse().ok();
    }

    let (int_part, frac) = match s.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (s, None),
    };
    let groups: Vec<&str> = int_part.split(',').collect();
    let thousands = groups.len() > 1
        && !groups[0].is_empty()
        && groups[0].len() <= 3
        && groups[1..].iter().all(|g| g.len() == 3);

    if thousands {
        let digits = groups.concat();
        return match frac {
            Some(frac) => format!("{}.{}", digits, frac).parse().ok(),
            None => digits.parse().ok(),
        };
    }
    if frac.is_none() && groups.len() == 2 {
        return s.replace(',', ".").parse().ok();
    }
    None
}

/// Reads one quantity from the start of `s`, returning it with the rest
fn take_quantity(s: &str) -> Option<(f64, &str)> {
    let s = s.trim_start();

    if let Some(caps) = MIXED_RE.captures(s) {
        let whole = parse_number(&caps[1])?;
        let num = parse_number(&caps[2])?;
        let den = parse_number(&caps[3])?;
        if den > 0.0 {
            return Some((whole + num / den, &s[caps[0].len()..]));
        }
    }
    if let Some(caps) = FRACTION_RE.captures(s) {
        let num = parse_number(&caps[1])?;
        let den = parse_number(&caps[2])?;
        if den > 0.0 {
            return Some((num / den, &s[caps[0].len()..]));
        }
    }
    if let Some(caps) = DECIMAL_RE.captures(s) {
        let value = parse_number(&caps[1])?;
        return Some((value, &s[caps[0].len()..]));
    }
    None
}

fn clean_name(rest: &str) -> String {
    let rest = rest.trim().trim_start_matches("of ").trim();
    let rest = rest.split(',').next().unwrap_or(rest);
    let rest = SPACES_RE.replace_all(rest.trim(), " ");
    rest.trim_matches(|c: char| c == '-' || c == '.' || c.is_whitespace()).to_string()
}

/// Parses a free-form ingredient line such as "1 1/2 cups rice, washed"
pub fn parse_ingredient_line(line: &str) -> Option<ParsedIngredient> {
    let original = line.trim().to_string();
    if original.is_empty() {
        return None;
    }

    let lowered = replace_unicode_fractions(&original.to_lowercase());
    let without_notes = PARENS_RE.replace_all(&lowered, " ");
    let text = without_notes.trim().trim_start_matches(|c: char| c == '-' || c == '*' || c == '•').trim();

    let (quantity, rest) = match take_quantity(text) {
        Some((first, rest)) => match RANGE_SEP_RE.find(rest) {
            Some(sep) => match take_quantity(&rest[sep.end()..]) {
                Some((second, after)) => ((first + second) / 2.0, after),
                None => (first, rest),
            },
            None => (first, rest),
        },
        None => (1.0, text),
    };

    let rest = rest.trim_start();
    let (unit, rest) = {
        let token_end = rest
            .find(|c: char| !(c.is_alphabetic() || c == '.'))
            .unwrap_or(rest.len());
        let token = &rest[..token_end];
        match Unit::from_token(token) {
            Some(unit) if !token.is_empty() => (unit, &rest[token_end..]),
            _ => (Unit::Piece, rest),
        }
    };

    let name = clean_name(rest);
    if name.is_empty() {
        return None;
    }

    Some(ParsedIngredient {
        original,
        quantity,
        unit,
        name,
    })
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AnalyzeRequest {
    pub ingredients: Vec<String>,
    pub servings: Option<u32>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct IngredientNutrition {
    pub line: String,
    pub parsed: Option<ParsedIngredient>,
    pub grams: Option<f64>,
    pub fdc_id: Option<u64>,
    pub matched_food: Option<String>,
    pub nutrition: Option<NutritionInfo>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct NutritionAnalysis {
    pub success: bool,
    pub ingredients: Vec<IngredientNutrition>,
    pub total: NutritionInfo,
    pub servings: Option<u32>,
    pub per_serving: Option<NutritionInfo>,
    pub matched: usize,
    pub unmatched: usize,
}

/// Analyzes ingredient lines one by one; lookup failures are reported per line
pub async fn analyze_ingredients<L: FoodLookup + ?Sized>(
    lookup: &L,
    lines: &[String],
    servings: Option<u32>,
) -> Result<NutritionAnalysis, AppError> {
    let lines: Vec<&String> = lines.iter().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return Err(AppError::InvalidRequest("At least one ingredient is required".to_string()));
    }
    if lines.len() > MAX_ANALYZE_LINES {
        return Err(AppError::InvalidRequest(format!(
            "At most {} ingredients can be analyzed at once",
            MAX_ANALYZE_LINES
        )));
    }

    let mut total = NutritionInfo::default();
    let mut results = Vec::with_capacity(lines.len());

    for line in lines {
        let parsed = match parse_ingredient_line(line) {
            Some(p) => p,
            None => {
                results.push(IngredientNutrition {
                    line: line.clone(),
                    parsed: None,
                    grams: None,
                    fdc_id: None,
                    matched_food: None,
                    nutrition: None,
                    error: Some("Could not parse ingredient".to_string()),
                });
                continue;
            }
        };
        let grams = parsed.grams();

        let entry = match lookup.best_match(&parsed.name).await {
            Ok(Some(food)) => {
                let nutrition = nutrition_per_100g(&food).scaled(grams / 100.0);
                total.add(&nutrition);
                IngredientNutrition {
                    line: line.clone(),
                    grams: Some(grams),
                    fdc_id: Some(food.fdc_id),
                    matched_food: Some(food.description),
                    nutrition: Some(nutrition.rounded()),
                    error: None,
                    parsed: Some(parsed),
                }
            }
            Ok(None) => IngredientNutrition {
                line: line.clone(),
                grams: Some(grams),
                fdc_id: None,
                matched_food: None,
                nutrition: None,
                error: Some(format!("No FoodData Central match for '{}'", parsed.name)),
                parsed: Some(parsed),
            },
            Err(e) => {
                log::warn!("⚠️  Nutrition lookup failed for '{}': {}", parsed.name, e);
                IngredientNutrition {
                    line: line.clone(),
                    grams: Some(grams),
                    fdc_id: None,
                    matched_food: None,
                    nutrition: None,
                    error: Some(e.message().to_string()),
                    parsed: Some(parsed),
                }
            }
        };
        results.push(entry);
    }

    let matched = results.iter().filter(|r| r.nutrition.is_some()).count();
    let unmatched = results.len() - matched;
    let servings = servings.filter(|s| *s > 0);
    let per_serving = servings.map(|s| total.scaled(1.0 / s as f64).rounded());

    Ok(NutritionAnalysis {
        success: true,
        ingredients: results,
        total: total.rounded(),
        servings,
        per_serving,
        matched,
        unmatched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fdc_service::{FdcFood, FdcNutrient};
    use async_trait::async_trait;

    fn parse(line: &str) -> ParsedIngredient {
        parse_ingredient_line(line).unwrap()
    }

    #[test]
    fn test_simple_quantity_and_unit() {
        let p = parse("2 cups rice");
        assert_eq!(p.quantity, 2.0);
        assert_eq!(p.unit, Unit::Cup);
        assert_eq!(p.name, "rice");
    }

    #[test]
    fn test_mixed_number_and_notes() {
        let p = parse("1 1/2 tbsp Soy Sauce (low sodium), divided");
        assert_eq!(p.quantity, 1.5);
        assert_eq!(p.unit, Unit::Tablespoon);
        assert_eq!(p.name, "soy sauce");
    }

    #[test]
    fn test_fraction_and_unicode_fraction() {
        assert_eq!(parse("1/4 tsp salt").quantity, 0.25);
        let p = parse("1½ kg pork belly");
        assert_eq!(p.quantity, 1.5);
        assert_eq!(p.unit, Unit::Kilogram);
        assert_eq!(p.name, "pork belly");
        assert_eq!(parse("¾ cup vinegar").quantity, 0.75);
    }

    #[test]
    fn test_attached_unit_and_decimal_comma() {
        let p = parse("500g chicken thighs");
        assert_eq!(p.quantity, 500.0);
        assert_eq!(p.unit, Unit::Gram);
        assert_eq!(p.name, "chicken thighs");
        assert_eq!(parse("0,5 l water").quantity, 0.5);
    }

    #[test]
    fn test_thousands_separator() {
        let p = parse("1,000 g flour");
        assert_eq!(p.quantity, 1000.0);
        assert_eq!(p.unit, Unit::Gram);
        assert_eq!(p.grams(), 1000.0);
        assert_eq!(p.name, "flour");

        assert_eq!(parse_number("1,250"), Some(1250.0));
        assert_eq!(parse_number("12,345,678"), Some(12345678.0));
        assert_eq!(parse_number("1,250.5"), Some(1250.5));
        assert_eq!(parse_number("2,25"), Some(2.25));
        assert_eq!(parse_number("0,5"), Some(0.5));
        assert_eq!(parse_number("1,2345"), Some(1.2345));
        assert_eq!(parse_number("1.2.3"), None);
    }

    #[test]
    fn test_range_is_averaged() {
        let p = parse("2-3 cloves garlic, minced");
        assert_eq!(p.quantity, 2.5);
        assert_eq!(p.unit, Unit::Clove);
        assert_eq!(p.name, "garlic");
        assert_eq!(parse("1 to 2 pieces siling haba").quantity, 1.5);
    }

    #[test]
    fn test_no_quantity_or_unit() {
        let p = parse("Salt and pepper to taste");
        assert_eq!(p.quantity, 1.0);
        assert_eq!(p.unit, Unit::Piece);
        assert_eq!(p.name, "salt and pepper to taste");

        let p = parse("3 eggs");
        assert_eq!(p.unit, Unit::Piece);
        assert_eq!(p.name, "eggs");
    }

    #[test]
    fn test_word_starting_like_unit_is_not_a_unit() {
        // "large" must not be read as "l"
        let p = parse("1 large onion");
        assert_eq!(p.unit, Unit::Piece);
        assert_eq!(p.name, "large onion");
        assert_eq!(p.grams(), 110.0);
    }

    #[test]
    fn test_blank_lines() {
        assert!(parse_ingredient_line("   ").is_none());
        assert!(parse_ingredient_line("2 cups").is_none());
    }

    #[test]
    fn test_gram_conversion() {
        assert_eq!(parse("1 kg chicken").grams(), 1000.0);
        assert_eq!(parse("2 oz cheese").grams(), 56.7);
        assert_eq!(parse("1 cup water").grams(), 240.0);
        assert_eq!(parse("1 cup flour").grams(), 127.2);
        assert_eq!(parse("2 tbsp soy sauce").grams(), 36.0);
        assert_eq!(parse("1 tbsp brown sugar").grams(), 13.95);
        assert_eq!(parse("2 eggs").grams(), 100.0);
        assert_eq!(parse("1 pinch salt").grams(), 0.36);
        assert_eq!(parse("1 can coconut milk").grams(), 400.0);
        assert_eq!(parse("3 cloves garlic").grams(), 15.0);
    }

    struct MockLookup;

    #[async_trait]
    impl FoodLookup for MockLookup {
        async fn search(&self, query: &str, _page_size: u32) -> Result<Vec<FdcFood>, AppError> {
            match query {
                "rice" => Ok(vec![FdcFood {
                    fdc_id: 169756,
                    description: "Rice, white, long-grain, raw".to_string(),
                    data_type: Some("SR Legacy".to_string()),
                    food_nutrients: vec![
                        FdcNutrient { nutrient_id: Some(1008), nutrient_name: None, unit_name: Some("KCAL".into()), value: Some(365.0) },
                        FdcNutrient { nutrient_id: Some(1003), nutrient_name: None, unit_name: Some("G".into()), value: Some(7.0) },
                    ],
                }]),
                "unobtainium" => Ok(vec![]),
                _ => Err(AppError::ExternalService("FoodData Central error: 429".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_analyze_is_best_effort() {
        let lines = vec![
            "1 cup rice".to_string(),
            "".to_string(),
            "2 g unobtainium".to_string(),
            "1 tbsp patis".to_string(),
        ];
        let analysis = analyze_ingredients(&MockLookup, &lines, Some(2)).await.unwrap();

        assert_eq!(analysis.ingredients.len(), 3);
        assert_eq!(analysis.matched, 1);
        assert_eq!(analysis.unmatched, 2);

        // 1 cup rice = 240 ml * 0.85 g/ml = 204 g -> 365 * 2.04 kcal
        assert_eq!(analysis.total.calories, 744.6);
        assert_eq!(analysis.per_serving.unwrap().calories, 372.3);

        assert!(analysis.ingredients[1].error.as_deref().unwrap().contains("No FoodData Central match"));
        assert!(analysis.ingredients[2].error.is_some());
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty_input() {
        let lines = vec!["  ".to_string()];
        assert!(analyze_ingredients(&MockLookup, &lines, None).await.is_err());
    }
}
