use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "KusinAI API",
        version = "1.0.0",
        description = "Filipino recipe platform API.\n\n**Authentication:** write endpoints require a JWT Bearer token obtained from `/api/v1/auth/login`.\n\n**Features:**\n- Accounts with email verification\n- Recipes, comments, replies and likes\n- Personal kitchen notes and favorites\n- Nutrition analysis backed by USDA FoodData Central\n- Ingredient scanning from photos\n- Recipe import from recipe websites\n- Admin moderation",
        contact(
            name = "KusinAI Team",
            email = "support@kusinai.app"
        )
    ),
    paths(
        // Auth
        crate::api::auth::register,
        crate::api::auth::verify_email,
        crate::api::auth::resend_verification,
        crate::api::auth::login,
        crate::api::auth::get_me,
        crate::api::auth::change_password,
        crate::api::auth::delete_account,

        // Health
        crate::api::health::health_check,

        // Users
        crate::api::users::get_profile,
        crate::api::users::update_profile,
        crate::api::users::list_notes,
        crate::api::users::add_note,
        crate::api::users::update_note,
        crate::api::users::delete_note,
        crate::api::users::list_favorites,
        crate::api::users::add_favorite,
        crate::api::users::remove_favorite,

        // Recipes
        crate::api::recipes::list_recipes,
        crate::api::recipes::list_regions,
        crate::api::recipes::get_recipe,
        crate::api::recipes::create_recipe,
        crate::api::recipes::update_recipe,
        crate::api::recipes::delete_recipe,
        crate::api::recipes::recompute_nutrition,

        // Comments
        crate::api::comments::list_comments,
        crate::api::comments::add_comment,
        crate::api::comments::edit_comment,
        crate::api::comments::delete_comment,
        crate::api::comments::toggle_comment_like,
        crate::api::comments::add_reply,
        crate::api::comments::delete_reply,
        crate::api::comments::toggle_reply_like,

        // Nutrition
        crate::api::nutrition::analyze,
        crate::api::nutrition::search_foods,

        // Scan & Chat
        crate::api::scan::scan,
        crate::api::chat::send_message,

        // Admin
        crate::api::admin::list_users,
        crate::api::admin::ban_user,
        crate::api::admin::unban_user,
        crate::api::admin::set_role,
        crate::api::admin::delete_user,
        crate::api::admin::get_stats,
        crate::api::admin::import_url,
        crate::api::admin::import_site,
        crate::api::admin::list_import_jobs,
        crate::api::admin::get_import_job,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::ResendVerificationRequest,
            crate::services::auth_service::ChangePasswordRequest,
            crate::services::auth_service::AuthResponse,
            crate::services::auth_service::RegisterResponse,
            crate::models::UserInfo,
            crate::models::Role,

            // Health
            crate::api::health::HealthResponse,

            // Users
            crate::services::user_service::UpdateProfileRequest,
            crate::services::user_service::NoteRequest,
            crate::services::user_service::UpdateNoteRequest,
            crate::models::Note,

            // Recipes & comments
            crate::models::CreateRecipeRequest,
            crate::models::UpdateRecipeRequest,
            crate::models::RecipeResponse,
            crate::models::RecipeSummary,
            crate::models::NutritionInfo,
            crate::models::Comment,
            crate::models::Reply,
            crate::services::recipe_service::RecipeListResponse,
            crate::services::comment_service::CommentRequest,
            crate::services::comment_service::LikeResponse,

            // Nutrition
            crate::services::nutrition_service::AnalyzeRequest,
            crate::services::nutrition_service::NutritionAnalysis,
            crate::services::nutrition_service::IngredientNutrition,
            crate::services::nutrition_service::ParsedIngredient,
            crate::services::nutrition_service::Unit,
            crate::services::fdc_service::FoodMatch,

            // Scan & Chat
            crate::services::scan_service::ScanRequest,
            crate::services::scan_service::ScanResponse,
            crate::services::scan_service::ScanMatch,
            crate::services::chat_service::ChatRequest,
            crate::services::chat_service::ChatResponse,

            // Admin & import
            crate::services::admin_service::BanRequest,
            crate::services::admin_service::RoleRequest,
            crate::services::admin_service::StatsResponse,
            crate::services::import_service::ImportUrlRequest,
            crate::services::import_service::ImportSiteRequest,
            crate::services::import_service::ImportStartedResponse,
            crate::models::ImportJobResponse,
            crate::models::ImportJobStatus,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, email verification, login and account management."),
        (name = "Health", description = "Service and database health."),
        (name = "Users", description = "Profile, personal kitchen notes and favorite recipes."),
        (name = "Recipes", description = "Browse, search and manage Filipino recipes."),
        (name = "Comments", description = "Comments, replies and likes on recipes."),
        (name = "Nutrition", description = "Ingredient parsing and nutrition analysis via USDA FoodData Central."),
        (name = "Scan", description = "Detect ingredients on a photo and suggest recipes."),
        (name = "Chat", description = "Keyword-based kitchen assistant."),
        (name = "Admin", description = "User moderation and platform statistics. Admin only."),
        (name = "Import", description = "Import recipes from web pages and whole sites. Admin only."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token from /api/v1/auth/login"))
                        .build()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/v1/auth/login"));
        assert!(paths.contains_key("/api/v1/recipes/{id}/comments/{comment_id}/replies/{reply_id}/like"));
        assert!(paths.contains_key("/api/v1/admin/import/site"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
