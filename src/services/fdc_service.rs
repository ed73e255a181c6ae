//! USDA FoodData Central client
//!
//! Only the search endpoint is used: search results already carry the
//! nutrient values per 100 g, which is all the recipe analysis needs.
//! Responses are cached in-process for 24 hours.

use crate::{
    config::FdcConfig,
    models::NutritionInfo,
    utils::{cache, AppError},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CACHE_TTL: Duration = Duration::from_secs(24 * 3600);
const DATA_TYPES: &str = "Foundation,SR Legacy";

// FDC nutrient ids
const ENERGY_KCAL: u32 = 1008;
const ENERGY_ATWATER_GENERAL: u32 = 2047;
const ENERGY_ATWATER_SPECIFIC: u32 = 2048;
const PROTEIN: u32 = 1003;
const FAT: u32 = 1004;
const CARBOHYDRATE: u32 = 1005;
const FIBER: u32 = 1079;
const SUGARS: u32 = 2000;
const SODIUM: u32 = 1093;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FdcNutrient {
    #[serde(default)]
    pub nutrient_id: Option<u32>,
    #[serde(default)]
    pub nutrient_name: Option<String>,
    #[serde(default)]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FdcFood {
    pub fdc_id: u64,
    pub description: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub food_nutrients: Vec<FdcNutrient>,
}

#[derive(Debug, Deserialize)]
struct FdcSearchResponse {
    #[serde(default)]
    foods: Vec<FdcFood>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FoodMatch {
    pub fdc_id: u64,
    pub description: String,
    pub data_type: Option<String>,
    pub per_100g: NutritionInfo,
}

impl From<&FdcFood> for FoodMatch {
    fn from(food: &FdcFood) -> Self {
        FoodMatch {
            fdc_id: food.fdc_id,
            description: food.description.clone(),
            data_type: food.data_type.clone(),
            per_100g: nutrition_per_100g(food),
        }
    }
}

fn nutrient_value(food: &FdcFood, id: u32) -> Option<f64> {
    food.food_nutrients
        .iter()
        .find(|n| n.nutrient_id == Some(id))
        .and_then(|n| {
            // Energy is also reported in kJ under other ids; only kcal is accepted here
            match n.unit_name.as_deref() {
                Some(unit) if unit.eq_ignore_ascii_case("kj") => None,
                _ => n.value,
            }
        })
}

/// Maps FDC nutrients (per 100 g) onto our nutrition fields
pub fn nutrition_per_100g(food: &FdcFood) -> NutritionInfo {
    let calories = nutrient_value(food, ENERGY_KCAL)
        .or_else(|| nutrient_value(food, ENERGY_ATWATER_GENERAL))
        .or_else(|| nutrient_value(food, ENERGY_ATWATER_SPECIFIC))
        .unwrap_or(0.0);

    NutritionInfo {
        calories,
        protein_g: nutrient_value(food, PROTEIN).unwrap_or(0.0),
        fat_g: nutrient_value(food, FAT).unwrap_or(0.0),
        carbohydrates_g: nutrient_value(food, CARBOHYDRATE).unwrap_or(0.0),
        fiber_g: nutrient_value(food, FIBER).unwrap_or(0.0),
        sugar_g: nutrient_value(food, SUGARS).unwrap_or(0.0),
        sodium_mg: nutrient_value(food, SODIUM).unwrap_or(0.0),
    }
}

/// Source of per-100 g food data, mocked in tests
#[async_trait]
pub trait FoodLookup: Send + Sync {
    async fn search(&self, query: &str, page_size: u32) -> Result<Vec<FdcFood>, AppError>;

    async fn best_match(&self, query: &str) -> Result<Option<FdcFood>, AppError> {
        Ok(self.search(query, 1).await?.into_iter().next())
    }
}

pub struct FdcClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl FdcClient {
    pub fn new(config: &FdcConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        FdcClient {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl FoodLookup for FdcClient {
    async fn search(&self, query: &str, page_size: u32) -> Result<Vec<FdcFood>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidRequest("Search query cannot be empty".to_string()));
        }
        let page_size = page_size.clamp(1, 50);

        let cache_key = format!("fdc:{}:{}", query.to_lowercase(), page_size);
        if let Some(cached) = cache::get_cached(&cache_key) {
            if let Ok(foods) = serde_json::from_str::<Vec<FdcFood>>(&cached) {
                log::debug!("💾 FDC cache hit: {}", query);
                return Ok(foods);
            }
        }

        log::info!("🥕 Querying FoodData Central: {}", query);

        let url = format!("{}/foods/search", self.base_url);
        let page_size = page_size.to_string();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("query", query),
                ("pageSize", page_size.as_str()),
                ("dataType", DATA_TYPES),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to reach FoodData Central: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!("FoodData Central error: {}", response.status())));
        }

        let body: FdcSearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to parse FoodData Central response: {}", e)))?;

        if let Ok(serialized) = serde_json::to_string(&body.foods) {
            cache::set_cache(cache_key, serialized, CACHE_TTL);
        }

        Ok(body.foods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_JSON: &str = r#"{
        "totalHits": 1,
        "foods": [{
            "fdcId": 171287,
            "description": "Egg, whole, raw, fresh",
            "dataType": "SR Legacy",
            "foodNutrients": [
                {"nutrientId": 1003, "nutrientName": "Protein", "unitName": "G", "value": 12.6},
                {"nutrientId": 1004, "nutrientName": "Total lipid (fat)", "unitName": "G", "value": 9.51},
                {"nutrientId": 1005, "nutrientName": "Carbohydrate, by difference", "unitName": "G", "value": 0.72},
                {"nutrientId": 1008, "nutrientName": "Energy", "unitName": "KCAL", "value": 143.0},
                {"nutrientId": 1062, "nutrientName": "Energy", "unitName": "kJ", "value": 599.0},
                {"nutrientId": 1093, "nutrientName": "Sodium, Na", "unitName": "MG", "value": 142.0},
                {"nutrientId": 2000, "nutrientName": "Sugars, total", "unitName": "G", "value": 0.37}
            ]
        }]
    }"#;

    #[test]
    fn test_parse_search_response() {
        let body: FdcSearchResponse = serde_json::from_str(SEARCH_JSON).unwrap();
        assert_eq!(body.foods.len(), 1);
        let egg = &body.foods[0];
        assert_eq!(egg.fdc_id, 171287);

        let n = nutrition_per_100g(egg);
        assert_eq!(n.calories, 143.0);
        assert_eq!(n.protein_g, 12.6);
        assert_eq!(n.fat_g, 9.51);
        assert_eq!(n.sodium_mg, 142.0);
        assert_eq!(n.fiber_g, 0.0);
    }

    #[test]
    fn test_atwater_energy_fallback() {
        let food = FdcFood {
            fdc_id: 1,
            description: "Onions, raw".to_string(),
            data_type: Some("Foundation".to_string()),
            food_nutrients: vec![
                FdcNutrient { nutrient_id: Some(2048), nutrient_name: None, unit_name: Some("KCAL".into()), value: Some(44.0) },
                FdcNutrient { nutrient_id: Some(2047), nutrient_name: None, unit_name: Some("KCAL".into()), value: Some(40.0) },
            ],
        };
        assert_eq!(nutrition_per_100g(&food).calories, 40.0);
    }

    #[test]
    fn test_kilojoules_are_not_calories() {
        let food = FdcFood {
            fdc_id: 2,
            description: "Rice".to_string(),
            data_type: None,
            food_nutrients: vec![FdcNutrient {
                nutrient_id: Some(1008),
                nutrient_name: None,
                unit_name: Some("kJ".into()),
                value: Some(1527.0),
            }],
        };
        assert_eq!(nutrition_per_100g(&food).calories, 0.0);
    }

    #[tokio::test]
    #[ignore] // Requires network access to api.nal.usda.gov
    async fn test_live_search() {
        let client = FdcClient::new(&FdcConfig {
            api_key: "DEMO_KEY".to_string(),
            base_url: "https://api.nal.usda.gov/fdc/v1".to_string(),
        });
        let foods = client.search("garlic", 3).await.unwrap();
        assert!(!foods.is_empty());
    }
}
