use actix_web::{web, HttpResponse, ResponseError};
use crate::{
    config::AppConfig,
    database::MongoDB,
    middleware::AuthUser,
    services::scan_service::{self, ScanRequest, ScanResponse},
};

/// 📷 Detects ingredients on a photo and suggests recipes that use them
#[utoipa::path(
    post,
    path = "/api/v1/scan",
    tag = "Scan",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Detected ingredients and matching recipes", body = ScanResponse),
        (status = 400, description = "Image missing, not base64 or larger than 5 MiB"),
        (status = 502, description = "Vision API error"),
        (status = 503, description = "Image scanning is not configured")
    ),
    security(("bearer_auth" = []))
)]
pub async fn scan(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    user: AuthUser,
    request: web::Json<ScanRequest>,
) -> HttpResponse {
    log::info!("📷 POST /scan - {}", user.0.user_id);

    match scan_service::scan_image(&db, &config.vision, &request).await {
        Ok(response) => {
            log::info!(
                "✅ Scan: {} ingredients, {} recipes",
                response.ingredients.len(),
                response.recipes.len()
            );
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::warn!("❌ Scan failed: {}", e);
            e.error_response()
        }
    }
}
