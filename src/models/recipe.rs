use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const DEFAULT_REGION: &str = "Unknown";

/// Nutrition totals for a whole recipe (or a single ingredient)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NutritionInfo {
    pub calories: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carbohydrates_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
}

impl NutritionInfo {
    pub fn add(&mut self, other: &NutritionInfo) {
        self.calories += other.calories;
        self.protein_g += other.protein_g;
        self.fat_g += other.fat_g;
        self.carbohydrates_g += other.carbohydrates_g;
        self.fiber_g += other.fiber_g;
        self.sugar_g += other.sugar_g;
        self.sodium_mg += other.sodium_mg;
    }

    pub fn scaled(&self, factor: f64) -> NutritionInfo {
        NutritionInfo {
            calories: self.calories * factor,
            protein_g: self.protein_g * factor,
            fat_g: self.fat_g * factor,
            carbohydrates_g: self.carbohydrates_g * factor,
            fiber_g: self.fiber_g * factor,
            sugar_g: self.sugar_g * factor,
            sodium_mg: self.sodium_mg * factor,
        }
    }

    /// Rounds every value to one decimal place for presentation
    pub fn rounded(&self) -> NutritionInfo {
        let r = |v: f64| (v * 10.0).round() / 10.0;
        NutritionInfo {
            calories: r(self.calories),
            protein_g: r(self.protein_g),
            fat_g: r(self.fat_g),
            carbohydrates_g: r(self.carbohydrates_g),
            fiber_g: r(self.fiber_g),
            sugar_g: r(self.sugar_g),
            sodium_mg: r(self.sodium_mg),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Reply {
    pub reply_id: String,
    pub user_id: String,
    pub user_name: String,
    pub text: String,
    #[serde(default)]
    pub likes: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Comment {
    pub comment_id: String,
    pub user_id: String,
    pub user_name: String,
    pub text: String,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub replies: Vec<Reply>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Comment {
    pub fn find_reply(&self, reply_id: &str) -> Option<&Reply> {
        self.replies.iter().find(|r| r.reply_id == reply_id)
    }
}

/// Recipe document stored in the `recipes` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
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
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: i64,
    pub updated_at: i64,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl Recipe {
    pub fn find_comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.comment_id == comment_id)
    }

    /// Authors and admins may modify a recipe
    pub fn can_modify(&self, user_id: &str, is_admin: bool) -> bool {
        is_admin || self.author_id.as_deref() == Some(user_id)
    }
}

/// Request para criar receita
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateRecipeRequest {
    pub title: String,
    pub description: Option<String>,
    pub region: Option<String>,
    pub image_url: Option<String>,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub servings: Option<u32>,
    pub prep_time_minutes: Option<u32>,
    pub cook_time_minutes: Option<u32>,
    pub nutrition: Option<NutritionInfo>,
}

/// Request para atualizar receita (partial)
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateRecipeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub region: Option<String>,
    pub image_url: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub steps: Option<Vec<String>>,
    pub servings: Option<u32>,
    pub prep_time_minutes: Option<u32>,
    pub cook_time_minutes: Option<u32>,
    pub nutrition: Option<NutritionInfo>,
}

/// Full recipe response, including comments
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RecipeResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub region: String,
    pub image_url: Option<String>,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub servings: Option<u32>,
    pub prep_time_minutes: Option<u32>,
    pub cook_time_minutes: Option<u32>,
    pub nutrition: Option<NutritionInfo>,
    pub author_id: Option<String>,
    pub source_url: Option<String>,
    pub comments: Vec<Comment>,
    pub comments_count: usize,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Recipe> for RecipeResponse {
    fn from(recipe: Recipe) -> Self {
        RecipeResponse {
            id: recipe.id.map(|id| id.to_hex()).unwrap_or_default(),
            comments_count: recipe.comments.len(),
            title: recipe.title,
            description: recipe.description,
            region: recipe.region,
            image_url: recipe.image_url,
            ingredients: recipe.ingredients,
            steps: recipe.steps,
            servings: recipe.servings,
            prep_time_minutes: recipe.prep_time_minutes,
            cook_time_minutes: recipe.cook_time_minutes,
            nutrition: recipe.nutrition,
            author_id: recipe.author_id,
            source_url: recipe.source_url,
            comments: recipe.comments,
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
        }
    }
}

/// Compact listing item (sem comentários)
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RecipeSummary {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub region: String,
    pub image_url: Option<String>,
    pub ingredients_count: usize,
    pub total_time_minutes: Option<u32>,
    pub calories: Option<f64>,
    pub created_at: i64,
}

impl From<Recipe> for RecipeSummary {
    fn from(recipe: Recipe) -> Self {
        let total_time_minutes = match (recipe.prep_time_minutes, recipe.cook_time_minutes) {
            (None, None) => None,
            (prep, cook) => Some(prep.unwrap_or(0) + cook.unwrap_or(0)),
        };
        RecipeSummary {
            id: recipe.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: recipe.title,
            description: recipe.description,
            region: recipe.region,
            image_url: recipe.image_url,
            ingredients_count: recipe.ingredients.len(),
            total_time_minutes,
            calories: recipe.nutrition.map(|n| n.calories),
            created_at: recipe.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(author: Option<&str>) -> Recipe {
        Recipe {
            id: Some(ObjectId::new()),
            title: "Chicken Adobo".to_string(),
            description: None,
            region: "Luzon".to_string(),
            image_url: None,
            ingredients: vec!["1 kg chicken".to_string(), "1/2 cup soy sauce".to_string()],
            steps: vec!["Marinate".to_string(), "Simmer".to_string()],
            servings: Some(4),
            prep_time_minutes: Some(15),
            cook_time_minutes: None,
            nutrition: None,
            author_id: author.map(String::from),
            source_url: None,
            comments: vec![],
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn test_can_modify() {
        let r = recipe(Some("u-1"));
        assert!(r.can_modify("u-1", false));
        assert!(!r.can_modify("u-2", false));
        assert!(r.can_modify("u-2", true));

        let imported = recipe(None);
        assert!(!imported.can_modify("u-1", false));
        assert!(imported.can_modify("u-1", true));
    }

    #[test]
    fn test_summary_total_time() {
        let summary = RecipeSummary::from(recipe(None));
        assert_eq!(summary.total_time_minutes, Some(15));
        assert_eq!(summary.ingredients_count, 2);
    }

    #[test]
    fn test_nutrition_add_and_scale() {
        let mut total = NutritionInfo::default();
        let egg = NutritionInfo { calories: 72.0, protein_g: 6.3, fat_g: 4.8, ..Default::default() };
        total.add(&egg);
        total.add(&egg);
        assert_eq!(total.calories, 144.0);
        let half = total.scaled(0.5).rounded();
        assert_eq!(half.calories, 72.0);
        assert_eq!(half.protein_g, 6.3);
    }

    #[test]
    fn test_recipe_defaults_region() {
        let doc = mongodb::bson::doc! {
            "title": "Pancit",
            "created_at": 1_i64,
            "updated_at": 1_i64,
        };
        let r: Recipe = mongodb::bson::from_document(doc).unwrap();
        assert_eq!(r.region, DEFAULT_REGION);
        assert!(r.comments.is_empty());
    }
}
