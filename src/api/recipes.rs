use actix_web::{web, HttpResponse, ResponseError};
use crate::{
    database::MongoDB,
    middleware::AuthUser,
    models::{CreateRecipeRequest, RecipeResponse, UpdateRecipeRequest},
    services::{fdc_service::FdcClient, nutrition_service, recipe_service},
    services::nutrition_service::NutritionAnalysis,
    services::recipe_service::{RecipeListResponse, RecipeQuery},
};

#[utoipa::path(
    get,
    path = "/api/v1/recipes",
    tag = "Recipes",
    params(RecipeQuery),
    responses(
        (status = 200, description = "Paginated recipe summaries, newest first", body = RecipeListResponse)
    )
)]
pub async fn list_recipes(db: web::Data<MongoDB>, query: web::Query<RecipeQuery>) -> HttpResponse {
    log::debug!("📋 GET /recipes - q: {:?}, region: {:?}, ingredient: {:?}", query.q, query.region, query.ingredient);

    match recipe_service::list_recipes(&db, &query).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::error!("❌ Failed to list recipes: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/recipes/regions",
    tag = "Recipes",
    responses((status = 200, description = "Distinct recipe regions, sorted"))
)]
pub async fn list_regions(db: web::Data<MongoDB>) -> HttpResponse {
    match recipe_service::list_regions(&db).await {
        Ok(regions) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "regions": regions
        })),
        Err(e) => {
            log::error!("❌ Failed to list regions: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/recipes/{id}",
    tag = "Recipes",
    params(("id" = String, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Full recipe with comments", body = RecipeResponse),
        (status = 400, description = "Invalid recipe ID"),
        (status = 404, description = "Recipe not found")
    )
)]
pub async fn get_recipe(db: web::Data<MongoDB>, path: web::Path<String>) -> HttpResponse {
    let recipe_id = path.into_inner();

    match recipe_service::get_recipe(&db, &recipe_id).await {
        Ok(recipe) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "recipe": RecipeResponse::from(recipe)
        })),
        Err(e) => {
            log::warn!("❌ Failed to get recipe {}: {}", recipe_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/recipes",
    tag = "Recipes",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created", body = RecipeResponse),
        (status = 400, description = "Missing title, ingredients or steps"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_recipe(
    db: web::Data<MongoDB>,
    user: AuthUser,
    request: web::Json<CreateRecipeRequest>,
) -> HttpResponse {
    log::info!("🍳 POST /recipes - '{}' by {}", request.title, user.0.user_id);

    match recipe_service::create_recipe(&db, &user.0, &request).await {
        Ok(recipe) => {
            log::info!("✅ Recipe created: {}", recipe.title);
            HttpResponse::Created().json(serde_json::json!({
                "success": true,
                "recipe": RecipeResponse::from(recipe)
            }))
        }
        Err(e) => {
            log::warn!("❌ Failed to create recipe: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/recipes/{id}",
    tag = "Recipes",
    request_body = UpdateRecipeRequest,
    params(("id" = String, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Recipe updated", body = RecipeResponse),
        (status = 403, description = "Not the author or an admin"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_recipe(
    db: web::Data<MongoDB>,
    user: AuthUser,
    path: web::Path<String>,
    request: web::Json<UpdateRecipeRequest>,
) -> HttpResponse {
    let recipe_id = path.into_inner();
    log::info!("✏️ PUT /recipes/{} - {}", recipe_id, user.0.user_id);

    match recipe_service::update_recipe(&db, &recipe_id, &user.0, &request).await {
        Ok(recipe) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "recipe": RecipeResponse::from(recipe)
        })),
        Err(e) => {
            log::warn!("❌ Failed to update recipe {}: {}", recipe_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/recipes/{id}",
    tag = "Recipes",
    params(("id" = String, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Recipe deleted and removed from favorites"),
        (status = 403, description = "Not the author or an admin"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_recipe(db: web::Data<MongoDB>, user: AuthUser, path: web::Path<String>) -> HttpResponse {
    let recipe_id = path.into_inner();
    log::info!("🗑️ DELETE /recipes/{} - {}", recipe_id, user.0.user_id);

    match recipe_service::delete_recipe(&db, &recipe_id, &user.0).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Recipe deleted"
        })),
        Err(e) => {
            log::warn!("❌ Failed to delete recipe {}: {}", recipe_id, e);
            e.error_response()
        }
    }
}

/// 🥗 Recomputes the recipe's nutrition from its ingredient lines and stores the totals
#[utoipa::path(
    post,
    path = "/api/v1/recipes/{id}/nutrition",
    tag = "Recipes",
    params(("id" = String, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Nutrition recomputed", body = NutritionAnalysis),
        (status = 403, description = "Not the author or an admin"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn recompute_nutrition(
    db: web::Data<MongoDB>,
    fdc: web::Data<FdcClient>,
    user: AuthUser,
    path: web::Path<String>,
) -> HttpResponse {
    let recipe_id = path.into_inner();
    log::info!("🥗 POST /recipes/{}/nutrition - {}", recipe_id, user.0.user_id);

    let recipe = match recipe_service::get_recipe_for_update(&db, &recipe_id, &user.0).await {
        Ok(recipe) => recipe,
        Err(e) => {
            log::warn!("❌ Nutrition recompute refused for {}: {}", recipe_id, e);
            return e.error_response();
        }
    };

    let analysis = match nutrition_service::analyze_ingredients(fdc.get_ref(), &recipe.ingredients, recipe.servings).await {
        Ok(analysis) => analysis,
        Err(e) => {
            log::warn!("❌ Nutrition analysis failed for {}: {}", recipe_id, e);
            return e.error_response();
        }
    };

    match recipe_service::set_nutrition(&db, &recipe_id, &user.0, &analysis.total).await {
        Ok(()) => {
            log::info!(
                "✅ Nutrition stored for '{}': {:.0} kcal ({} matched, {} unmatched)",
                recipe.title, analysis.total.calories, analysis.matched, analysis.unmatched
            );
            HttpResponse::Ok().json(analysis)
        }
        Err(e) => {
            log::error!("❌ Failed to store nutrition for {}: {}", recipe_id, e);
            e.error_response()
        }
    }
}
