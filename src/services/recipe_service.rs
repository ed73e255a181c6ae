use crate::{
    database::{MongoDB, RECIPES, USERS},
    models::{
        CreateRecipeRequest, CurrentUser, NutritionInfo, Recipe, RecipeSummary, UpdateRecipeRequest, User,
        DEFAULT_REGION,
    },
    utils::{validation, AppError},
};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document, Regex as BsonRegex};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct RecipeQuery {
    pub q: Option<String>,
    pub region: Option<String>,
    pub ingredient: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RecipeListResponse {
    pub success: bool,
    pub recipes: Vec<RecipeSummary>,
    pub total: u64,
    pub page: u64,
    pub limit: i64,
}

pub fn parse_recipe_id(id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id.trim()).map_err(|_| AppError::InvalidRequest("Invalid recipe ID".to_string()))
}

/// Case-insensitive "contains" match on user input, with regex metacharacters escaped
pub fn contains_ci(value: &str) -> BsonRegex {
    BsonRegex {
        pattern: regex::escape(value.trim()),
        options: "i".to_string(),
    }
}

/// Builds the MongoDB filter for a listing query
pub fn build_filter(query: &RecipeQuery) -> Document {
    let mut filter = Document::new();

    if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        filter.insert("title", contains_ci(q));
    }
    if let Some(region) = query.region.as_deref().filter(|r| !r.trim().is_empty()) {
        filter.insert(
            "region",
            BsonRegex {
                pattern: format!("^{}$", regex::escape(region.trim())),
                options: "i".to_string(),
            },
        );
    }
    if let Some(ingredient) = query.ingredient.as_deref().filter(|i| !i.trim().is_empty()) {
        filter.insert("ingredients", contains_ci(ingredient));
    }

    filter
}

fn clean_lines(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

fn clean_optional(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

/// Validates a create request and builds the document to insert
pub fn build_recipe(request: &CreateRecipeRequest, author_id: Option<String>) -> Result<Recipe, AppError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidRequest("Title is required".to_string()));
    }

    let ingredients = clean_lines(&request.ingredients);
    if ingredients.is_empty() {
        return Err(AppError::InvalidRequest("At least one ingredient is required".to_string()));
    }

    let steps = clean_lines(&request.steps);
    if steps.is_empty() {
        return Err(AppError::InvalidRequest("At least one step is required".to_string()));
    }

    if request.servings == Some(0) {
        return Err(AppError::InvalidRequest("Servings must be greater than zero".to_string()));
    }

    let now = chrono::Utc::now().timestamp();
    Ok(Recipe {
        id: None,
        title: title.to_string(),
        description: clean_optional(&request.description),
        region: clean_optional(&request.region).unwrap_or_else(|| DEFAULT_REGION.to_string()),
        image_url: clean_optional(&request.image_url),
        ingredients,
        steps,
        servings: request.servings,
        prep_time_minutes: request.prep_time_minutes,
        cook_time_minutes: request.cook_time_minutes,
        nutrition: request.nutrition,
        author_id,
        source_url: None,
        comments: vec![],
        created_at: now,
        updated_at: now,
    })
}

/// Validates a partial update and builds the `$set` document
pub fn build_update(request: &UpdateRecipeRequest) -> Result<Document, AppError> {
    let mut set = Document::new();

    if let Some(title) = &request.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::InvalidRequest("Title cannot be empty".to_string()));
        }
        set.insert("title", title);
    }
    if let Some(description) = &request.description {
        set.insert("description", description.trim());
    }
    if let Some(region) = &request.region {
        let region = region.trim();
        set.insert("region", if region.is_empty() { DEFAULT_REGION } else { region });
    }
    if let Some(image_url) = &request.image_url {
        set.insert("image_url", image_url.trim());
    }
    if let Some(ingredients) = &request.ingredients {
        let ingredients = clean_lines(ingredients);
        if ingredients.is_empty() {
            return Err(AppError::InvalidRequest("At least one ingredient is required".to_string()));
        }
        set.insert("ingredients", ingredients);
    }
    if let Some(steps) = &request.steps {
        let steps = clean_lines(steps);
        if steps.is_empty() {
            return Err(AppError::InvalidRequest("At least one step is required".to_string()));
        }
        set.insert("steps", steps);
    }
    if let Some(servings) = request.servings {
        if servings == 0 {
            return Err(AppError::InvalidRequest("Servings must be greater than zero".to_string()));
        }
        set.insert("servings", servings as i64);
    }
    if let Some(prep) = request.prep_time_minutes {
        set.insert("prep_time_minutes", prep as i64);
    }
    if let Some(cook) = request.cook_time_minutes {
        set.insert("cook_time_minutes", cook as i64);
    }
    if let Some(nutrition) = &request.nutrition {
        set.insert("nutrition", mongodb::bson::to_bson(nutrition)?);
    }

    if set.is_empty() {
        return Err(AppError::InvalidRequest("No fields to update".to_string()));
    }

    set.insert("updated_at", chrono::Utc::now().timestamp());
    Ok(set)
}

pub async fn list_recipes(db: &MongoDB, query: &RecipeQuery) -> Result<RecipeListResponse, AppError> {
    let (page, limit, skip) = validation::pagination(query.page, query.limit);
    let filter = build_filter(query);
    let collection = db.collection::<Recipe>(RECIPES);

    let total = collection.count_documents(filter.clone()).await?;

    let recipes: Vec<Recipe> = collection
        .find(filter)
        .projection(doc! { "comments": 0 })
        .sort(doc! { "created_at": -1 })
        .skip(skip)
        .limit(limit)
        .await?
        .try_collect()
        .await?;

    Ok(RecipeListResponse {
        success: true,
        recipes: recipes.into_iter().map(RecipeSummary::from).collect(),
        total,
        page,
        limit,
    })
}

pub async fn get_recipe(db: &MongoDB, recipe_id: &str) -> Result<Recipe, AppError> {
    let oid = parse_recipe_id(recipe_id)?;
    db.collection::<Recipe>(RECIPES)
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".to_string()))
}

/// Recipes whose ids are in `ids`, skipping malformed or stale ids
pub async fn get_recipes_by_ids(db: &MongoDB, ids: &[String]) -> Result<Vec<RecipeSummary>, AppError> {
    let oids: Vec<ObjectId> = ids.iter().filter_map(|id| ObjectId::parse_str(id).ok()).collect();
    if oids.is_empty() {
        return Ok(vec![]);
    }

    let recipes: Vec<Recipe> = db
        .collection::<Recipe>(RECIPES)
        .find(doc! { "_id": { "$in": oids } })
        .projection(doc! { "comments": 0 })
        .await?
        .try_collect()
        .await?;

    Ok(recipes.into_iter().map(RecipeSummary::from).collect())
}

pub async fn list_regions(db: &MongoDB) -> Result<Vec<String>, AppError> {
    let values = db.collection::<Recipe>(RECIPES).distinct("region", doc! {}).await?;

    let mut regions: Vec<String> = values
        .into_iter()
        .filter_map(|v| v.as_str().map(String::from))
        .filter(|r| !r.is_empty())
        .collect();
    regions.sort_by_key(|r| r.to_lowercase());
    regions.dedup();
    Ok(regions)
}

/// Recipes matching any of the given ingredient names, best matches first
pub async fn find_by_ingredients(db: &MongoDB, ingredients: &[String], limit: usize) -> Result<Vec<(RecipeSummary, Vec<String>)>, AppError> {
    if ingredients.is_empty() {
        return Ok(vec![]);
    }

    let clauses: Vec<Document> = ingredients
        .iter()
        .map(|i| doc! { "ingredients": contains_ci(i) })
        .collect();

    let candidates: Vec<Recipe> = db
        .collection::<Recipe>(RECIPES)
        .find(doc! { "$or": clauses })
        .projection(doc! { "comments": 0 })
        .limit(200)
        .await?
        .try_collect()
        .await?;

    Ok(rank_by_ingredients(candidates, ingredients, limit))
}

/// Ranks recipes by how many of `wanted` appear in their ingredient lines
pub fn rank_by_ingredients(recipes: Vec<Recipe>, wanted: &[String], limit: usize) -> Vec<(RecipeSummary, Vec<String>)> {
    let mut scored: Vec<(Recipe, Vec<String>)> = recipes
        .into_iter()
        .map(|recipe| {
            let lines: Vec<String> = recipe.ingredients.iter().map(|l| l.to_lowercase()).collect();
            let matched: Vec<String> = wanted
                .iter()
                .filter(|w| {
                    let w = w.to_lowercase();
                    lines.iter().any(|l| l.contains(&w))
                })
                .cloned()
                .collect();
            (recipe, matched)
        })
        .filter(|(_, matched)| !matched.is_empty())
        .collect();

    scored.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(b.0.created_at.cmp(&a.0.created_at)));

    scored
        .into_iter()
        .take(limit)
        .map(|(recipe, matched)| (RecipeSummary::from(recipe), matched))
        .collect()
}

pub async fn create_recipe(db: &MongoDB, actor: &CurrentUser, request: &CreateRecipeRequest) -> Result<Recipe, AppError> {
    let mut recipe = build_recipe(request, Some(actor.user_id.clone()))?;
    recipe.id = Some(insert_recipe(db, &recipe).await?);
    Ok(recipe)
}

/// Inserts an already validated recipe
pub async fn insert_recipe(db: &MongoDB, recipe: &Recipe) -> Result<ObjectId, AppError> {
    let result = db.collection::<Recipe>(RECIPES).insert_one(recipe).await?;
    result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::Internal("Inserted recipe has no ObjectId".to_string()))
}

async fn load_for_modification(db: &MongoDB, recipe_id: &str, actor: &CurrentUser) -> Result<(ObjectId, Recipe), AppError> {
    let oid = parse_recipe_id(recipe_id)?;
    let recipe = db
        .collection::<Recipe>(RECIPES)
        .find_one(doc! { "_id": oid })
        .projection(doc! { "comments": 0 })
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".to_string()))?;

    if !recipe.can_modify(&actor.user_id, actor.is_admin()) {
        return Err(AppError::Forbidden("Only the author or an admin can modify this recipe".to_string()));
    }

    Ok((oid, recipe))
}

pub async fn update_recipe(db: &MongoDB, recipe_id: &str, actor: &CurrentUser, request: &UpdateRecipeRequest) -> Result<Recipe, AppError> {
    let set = build_update(request)?;
    let (oid, _) = load_for_modification(db, recipe_id, actor).await?;

    db.collection::<Recipe>(RECIPES)
        .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".to_string()))
}

pub async fn delete_recipe(db: &MongoDB, recipe_id: &str, actor: &CurrentUser) -> Result<(), AppError> {
    let (oid, _) = load_for_modification(db, recipe_id, actor).await?;

    db.collection::<Recipe>(RECIPES).delete_one(doc! { "_id": oid }).await?;

    // Favorites hold hex ids
    let hex = oid.to_hex();
    let unfavorited = db
        .collection::<User>(USERS)
        .update_many(doc! { "favorites": &hex }, doc! { "$pull": { "favorites": &hex } })
        .await?;
    log::debug!("🧹 Removed recipe {} from {} favorites lists", hex, unfavorited.modified_count);

    Ok(())
}

pub async fn set_nutrition(db: &MongoDB, recipe_id: &str, actor: &CurrentUser, nutrition: &NutritionInfo) -> Result<(), AppError> {
    let (oid, _) = load_for_modification(db, recipe_id, actor).await?;
    db.collection::<Recipe>(RECIPES)
        .update_one(
            doc! { "_id": oid },
            doc! { "$set": { "nutrition": mongodb::bson::to_bson(nutrition)?, "updated_at": chrono::Utc::now().timestamp() } },
        )
        .await?;
    Ok(())
}

/// Loads a recipe for nutrition recomputation, enforcing modification rights
pub async fn get_recipe_for_update(db: &MongoDB, recipe_id: &str, actor: &CurrentUser) -> Result<Recipe, AppError> {
    load_for_modification(db, recipe_id, actor).await.map(|(_, recipe)| recipe)
}

pub async fn source_url_exists(db: &MongoDB, source_url: &str) -> Result<bool, AppError> {
    let count = db
        .collection::<Recipe>(RECIPES)
        .count_documents(doc! { "source_url": source_url })
        .await?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::Bson;

    fn create_request() -> CreateRecipeRequest {
        CreateRecipeRequest {
            title: "  Sinigang na Baboy ".to_string(),
            description: Some("  ".to_string()),
            region: None,
            image_url: None,
            ingredients: vec!["1 kg pork ribs".to_string(), " ".to_string(), "2 tomatoes".to_string()],
            steps: vec!["Boil pork".to_string()],
            servings: Some(6),
            prep_time_minutes: Some(10),
            cook_time_minutes: Some(90),
            nutrition: None,
        }
    }

    fn recipe(title: &str, ingredients: &[&str], created_at: i64) -> Recipe {
        let mut r = build_recipe(
            &CreateRecipeRequest {
                title: title.to_string(),
                description: None,
                region: Some("Luzon".to_string()),
                image_url: None,
                ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
                steps: vec!["Cook".to_string()],
                servings: None,
                prep_time_minutes: None,
                cook_time_minutes: None,
                nutrition: None,
            },
            None,
        )
        .unwrap();
        r.created_at = created_at;
        r
    }

    #[test]
    fn test_build_recipe_cleans_input() {
        let r = build_recipe(&create_request(), Some("u-1".to_string())).unwrap();
        assert_eq!(r.title, "Sinigang na Baboy");
        assert_eq!(r.description, None);
        assert_eq!(r.region, DEFAULT_REGION);
        assert_eq!(r.ingredients, vec!["1 kg pork ribs", "2 tomatoes"]);
        assert_eq!(r.author_id.as_deref(), Some("u-1"));
    }

    #[test]
    fn test_build_recipe_rejects_missing_parts() {
        let mut req = create_request();
        req.title = " ".to_string();
        assert!(build_recipe(&req, None).is_err());

        let mut req = create_request();
        req.ingredients = vec!["  ".to_string()];
        assert!(build_recipe(&req, None).is_err());

        let mut req = create_request();
        req.steps = vec![];
        assert!(build_recipe(&req, None).is_err());

        let mut req = create_request();
        req.servings = Some(0);
        assert!(build_recipe(&req, None).is_err());
    }

    #[test]
    fn test_build_update() {
        let req = UpdateRecipeRequest {
            title: Some("Kare-Kare".to_string()),
            servings: Some(4),
            ..Default::default()
        };
        let set = build_update(&req).unwrap();
        assert_eq!(set.get_str("title").unwrap(), "Kare-Kare");
        assert_eq!(set.get_i64("servings").unwrap(), 4);
        assert!(set.contains_key("updated_at"));
    }

    #[test]
    fn test_build_update_rejects_empty() {
        assert!(build_update(&UpdateRecipeRequest::default()).is_err());
        let req = UpdateRecipeRequest { steps: Some(vec![]), ..Default::default() };
        assert!(build_update(&req).is_err());
    }

    #[test]
    fn test_build_filter_escapes_input() {
        let query = RecipeQuery {
            q: Some("adobo (spicy)".to_string()),
            region: Some("Visayas".to_string()),
            ..Default::default()
        };
        let filter = build_filter(&query);
        match filter.get("title") {
            Some(Bson::RegularExpression(title)) => {
                assert_eq!(title.pattern, r"adobo \(spicy\)");
                assert_eq!(title.options, "i");
            }
            other => panic!("unexpected title filter: {:?}", other),
        }
        match filter.get("region") {
            Some(Bson::RegularExpression(region)) => assert_eq!(region.pattern, "^Visayas$"),
            other => panic!("unexpected region filter: {:?}", other),
        }
        assert!(!filter.contains_key("ingredients"));
    }

    #[test]
    fn test_empty_query_matches_everything() {
        assert!(build_filter(&RecipeQuery::default()).is_empty());
    }

    #[test]
    fn test_parse_recipe_id() {
        assert!(parse_recipe_id("not-an-id").is_err());
        let oid = ObjectId::new();
        assert_eq!(parse_recipe_id(&oid.to_hex()).unwrap(), oid);
    }

    #[test]
    fn test_rank_by_ingredients() {
        let recipes = vec![
            recipe("Tinola", &["1 kg chicken", "2 cups green papaya", "1 thumb ginger"], 1),
            recipe("Chicken Adobo", &["1 kg chicken", "1/2 cup vinegar", "1 head garlic"], 2),
            recipe("Halo-Halo", &["1 cup shaved ice"], 3),
        ];
        let wanted = vec!["chicken".to_string(), "garlic".to_string()];
        let ranked = rank_by_ingredients(recipes, &wanted, 10);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0.title, "Chicken Adobo");
        assert_eq!(ranked[0].1, vec!["chicken", "garlic"]);
        assert_eq!(ranked[1].0.title, "Tinola");
    }
}
