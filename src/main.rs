mod api;
mod config;
mod database;
mod importer;
mod jobs;
mod middleware;
mod models;
mod seeds;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::{Compress, Logger}, web, App, HttpServer};
use dotenv::dotenv;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::importer::Importer;
use crate::middleware::AuthMiddleware;
use crate::services::fdc_service::FdcClient;
use crate::utils::AppError;

// Base64 photos for /scan are ~4/3 of the 5 MiB image limit
const JSON_PAYLOAD_LIMIT: usize = 8 * 1024 * 1024;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;

    log::info!("🍲 Starting KusinAI Service...");
    log::info!("📊 Database: {}", database::database_name_from_uri(&config.database_url));

    // Initialize MongoDB connection
    let db = database::MongoDB::new(&config.database_url)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to connect to MongoDB: {}", e)))?;

    log::info!("✅ MongoDB connected successfully");

    // 🌱 Seeds
    if let Some(admin) = &config.admin_seed {
        seeds::admin_seed::seed_admin(&db, admin).await;
    }
    if config.seed_sample_recipes {
        seeds::recipes_seed::seed_sample_recipes(&db).await;
    }

    // 🧹 Background jobs
    log::info!("📅 Starting background jobs...");
    jobs::verification_cleanup::start_verification_cleanup(db.clone()).await;
    log::info!("✅ Background jobs started");

    if config.vision.api_key.is_none() {
        log::warn!("⚠️  VISION_API_KEY not set, /api/v1/scan will answer 503");
    }

    let bind_addr = format!("{}:{}", config.host, config.port);
    log::info!("🌐 Server starting on {}", bind_addr);
    log::info!("📚 Swagger UI available at: http://{}/swagger-ui/", bind_addr);
    log::info!("📄 OpenAPI spec at: http://{}/api-docs/openapi.json", bind_addr);

    let db_data = web::Data::new(db);
    let fdc_data = web::Data::new(FdcClient::new(&config.fdc));
    let importer_data = web::Data::new(Importer::new(&config.llm));
    let config_data = web::Data::new(config);

    // Start HTTP server
    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .expose_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);
        for origin in &config_data.cors_origins {
            cors = cors.allowed_origin(origin);
        }

        let json_config = web::JsonConfig::default()
            .limit(JSON_PAYLOAD_LIMIT)
            .error_handler(|err, _req| AppError::InvalidRequest(format!("Invalid JSON body: {}", err)).into());
        let query_config = web::QueryConfig::default()
            .error_handler(|err, _req| AppError::InvalidRequest(format!("Invalid query string: {}", err)).into());

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(config_data.clone())
            .app_data(db_data.clone())
            .app_data(fdc_data.clone())
            .app_data(importer_data.clone())
            .app_data(json_config)
            .app_data(query_config)
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Compress::default())
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
            // Health check
            .route("/health", web::get().to(api::health::health_check))
            // Auth endpoints (me, change-password and delete-account use the AuthUser extractor)
            .service(
                web::scope("/api/v1/auth")
                    .wrap(AuthMiddleware::optional())
                    .route("/register", web::post().to(api::auth::register))
                    .route("/verify-email", web::get().to(api::auth::verify_email))
                    .route("/resend-verification", web::post().to(api::auth::resend_verification))
                    .route("/login", web::post().to(api::auth::login))
                    .route("/me", web::get().to(api::auth::get_me))
                    .route("/change-password", web::put().to(api::auth::change_password))
                    .route("/delete-account", web::delete().to(api::auth::delete_account))
            )

            // ==================== USERS ====================
            .service(
                web::scope("/api/v1/users")
                    .wrap(AuthMiddleware::required())
                    .route("/profile", web::get().to(api::users::get_profile))
                    .route("/profile", web::put().to(api::users::update_profile))
                    .route("/notes", web::get().to(api::users::list_notes))
                    .route("/notes", web::post().to(api::users::add_note))
                    .route("/notes/{note_id}", web::put().to(api::users::update_note))
                    .route("/notes/{note_id}", web::delete().to(api::users::delete_note))
                    .route("/favorites", web::get().to(api::users::list_favorites))
                    .route("/favorites/{recipe_id}", web::post().to(api::users::add_favorite))
                    .route("/favorites/{recipe_id}", web::delete().to(api::users::remove_favorite))
            )

            // ==================== RECIPES & COMMENTS ====================
            // Reads are public, writes need a token (AuthUser extractor)
            .service(
                web::scope("/api/v1/recipes")
                    .wrap(AuthMiddleware::optional())
                    .route("", web::get().to(api::recipes::list_recipes))
                    .route("", web::post().to(api::recipes::create_recipe))
                    .route("/regions", web::get().to(api::recipes::list_regions))  // antes de /{id}
                    .route("/{id}", web::get().to(api::recipes::get_recipe))
                    .route("/{id}", web::put().to(api::recipes::update_recipe))
                    .route("/{id}", web::delete().to(api::recipes::delete_recipe))
                    .route("/{id}/nutrition", web::post().to(api::recipes::recompute_nutrition))
                    .route("/{id}/comments", web::get().to(api::comments::list_comments))
                    .route("/{id}/comments", web::post().to(api::comments::add_comment))
                    .route("/{id}/comments/{comment_id}", web::put().to(api::comments::edit_comment))
                    .route("/{id}/comments/{comment_id}", web::delete().to(api::comments::delete_comment))
                    .route("/{id}/comments/{comment_id}/like", web::post().to(api::comments::toggle_comment_like))
                    .route("/{id}/comments/{comment_id}/replies", web::post().to(api::comments::add_reply))
                    .route(
                        "/{id}/comments/{comment_id}/replies/{reply_id}",
                        web::delete().to(api::comments::delete_reply),
                    )
                    .route(
                        "/{id}/comments/{comment_id}/replies/{reply_id}/like",
                        web::post().to(api::comments::toggle_reply_like),
                    )
            )

            // ==================== NUTRITION / SCAN / CHAT ====================
            .service(
                web::scope("/api/v1/nutrition")
                    .route("/analyze", web::post().to(api::nutrition::analyze))
                    .route("/search", web::get().to(api::nutrition::search_foods))
            )
            .service(
                web::scope("/api/v1/scan")
                    .wrap(AuthMiddleware::required())
                    .route("", web::post().to(api::scan::scan))
            )
            .service(
                web::scope("/api/v1/chat")
                    .wrap(AuthMiddleware::optional())
                    .route("/message", web::post().to(api::chat::send_message))
            )

            // ==================== ADMIN ====================
            // Token required here, admin role checked by the AdminUser extractor
            .service(
                web::scope("/api/v1/admin")
                    .wrap(AuthMiddleware::required())
                    .route("/users", web::get().to(api::admin::list_users))
                    .route("/users/{user_id}/ban", web::put().to(api::admin::ban_user))
                    .route("/users/{user_id}/unban", web::put().to(api::admin::unban_user))
                    .route("/users/{user_id}/role", web::put().to(api::admin::set_role))
                    .route("/users/{user_id}", web::delete().to(api::admin::delete_user))
                    .route("/stats", web::get().to(api::admin::get_stats))
                    .route("/import/url", web::post().to(api::admin::import_url))
                    .route("/import/site", web::post().to(api::admin::import_site))
                    .route("/import/jobs", web::get().to(api::admin::list_import_jobs))
                    .route("/import/jobs/{job_id}", web::get().to(api::admin::get_import_job))
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
