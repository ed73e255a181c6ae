use actix_web::{web, HttpResponse, ResponseError};
use crate::services::{
    fdc_service::{FdcClient, FoodLookup, FoodMatch},
    nutrition_service::{self, AnalyzeRequest, NutritionAnalysis},
};
use serde::Deserialize;

const DEFAULT_SEARCH_RESULTS: u32 = 10;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct FoodSearchQuery {
    /// Food name, e.g. "chicken thigh"
    pub q: String,
    /// Max results (1..=50, default 10)
    pub limit: Option<u32>,
}

#[utoipa::path(
    post,
    path = "/api/v1/nutrition/analyze",
    tag = "Nutrition",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Per-ingredient breakdown, totals and per-serving values", body = NutritionAnalysis),
        (status = 400, description = "No ingredients or too many lines")
    )
)]
pub async fn analyze(fdc: web::Data<FdcClient>, request: web::Json<AnalyzeRequest>) -> HttpResponse {
    log::info!("🥗 POST /nutrition/analyze - {} lines", request.ingredients.len());

    match nutrition_service::analyze_ingredients(fdc.get_ref(), &request.ingredients, request.servings).await {
        Ok(analysis) => {
            log::info!(
                "✅ Analysis done: {:.0} kcal ({} matched, {} unmatched)",
                analysis.total.calories, analysis.matched, analysis.unmatched
            );
            HttpResponse::Ok().json(analysis)
        }
        Err(e) => {
            log::warn!("❌ Nutrition analysis failed: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/nutrition/search",
    tag = "Nutrition",
    params(FoodSearchQuery),
    responses(
        (status = 200, description = "Top FoodData Central matches with per-100 g nutrition", body = [FoodMatch]),
        (status = 400, description = "Empty query"),
        (status = 502, description = "FoodData Central unavailable")
    )
)]
pub async fn search_foods(fdc: web::Data<FdcClient>, query: web::Query<FoodSearchQuery>) -> HttpResponse {
    log::debug!("🔎 GET /nutrition/search - q: {}", query.q);

    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_RESULTS);
    match fdc.search(&query.q, limit).await {
        Ok(foods) => {
            let foods: Vec<FoodMatch> = foods.iter().map(FoodMatch::from).collect();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "query": query.q.trim(),
                "foods": foods,
                "total": foods.len()
            }))
        }
        Err(e) => {
            log::warn!("❌ Food search failed for '{}': {}", query.q, e);
            e.error_response()
        }
    }
}
