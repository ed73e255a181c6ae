use actix_web::{web, HttpResponse, ResponseError};
use crate::{
    config::AppConfig,
    database::MongoDB,
    importer::Importer,
    middleware::AdminUser,
    models::RecipeResponse,
    services::{admin_service, import_service},
    services::admin_service::{BanRequest, RoleRequest, StatsResponse, UserListQuery},
    services::import_service::{ImportSiteRequest, ImportStartedResponse, ImportUrlRequest},
};

// ==================== USERS ====================

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "Admin",
    params(UserListQuery),
    responses(
        (status = 200, description = "Paginated user accounts"),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(db: web::Data<MongoDB>, admin: AdminUser, query: web::Query<UserListQuery>) -> HttpResponse {
    log::debug!("🛡️ GET /admin/users - {} (q: {:?}, banned: {:?})", admin.0.email, query.q, query.banned);

    match admin_service::list_users(&db, &query).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::error!("❌ Failed to list users: {}", e);
            e.error_response()
        }
    }
}

/// The body is optional; a missing or unreadable one bans without a reason
fn ban_reason(request: Option<web::Json<BanRequest>>) -> Option<String> {
    request.and_then(|r| r.into_inner().reason)
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{user_id}/ban",
    tag = "Admin",
    request_body = BanRequest,
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User banned, comments and likes removed"),
        (status = 400, description = "Admins cannot ban themselves"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn ban_user(
    db: web::Data<MongoDB>,
    admin: AdminUser,
    path: web::Path<String>,
    request: Option<web::Json<BanRequest>>,
) -> HttpResponse {
    let user_id = path.into_inner();
    log::info!("🚫 PUT /admin/users/{}/ban - by {}", user_id, admin.0.email);

    match admin_service::ban_user(&db, &admin.0, &user_id, ban_reason(request)).await {
        Ok(user) => HttpResponse::Ok().json(serde_json::json!({ "success": true, "user": user })),
        Err(e) => {
            log::warn!("❌ Failed to ban {}: {}", user_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{user_id}/unban",
    tag = "Admin",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User unbanned"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn unban_user(db: web::Data<MongoDB>, admin: AdminUser, path: web::Path<String>) -> HttpResponse {
    let user_id = path.into_inner();
    log::info!("✅ PUT /admin/users/{}/unban - by {}", user_id, admin.0.email);

    match admin_service::unban_user(&db, &user_id).await {
        Ok(user) => HttpResponse::Ok().json(serde_json::json!({ "success": true, "user": user })),
        Err(e) => {
            log::warn!("❌ Failed to unban {}: {}", user_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{user_id}/role",
    tag = "Admin",
    request_body = RoleRequest,
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Role changed"),
        (status = 400, description = "Unknown role or self-demotion"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn set_role(
    db: web::Data<MongoDB>,
    admin: AdminUser,
    path: web::Path<String>,
    request: web::Json<RoleRequest>,
) -> HttpResponse {
    let user_id = path.into_inner();
    log::info!("🎖️ PUT /admin/users/{}/role -> {} - by {}", user_id, request.role, admin.0.email);

    match admin_service::set_role(&db, &admin.0, &user_id, &request.role).await {
        Ok(user) => HttpResponse::Ok().json(serde_json::json!({ "success": true, "user": user })),
        Err(e) => {
            log::warn!("❌ Failed to change role of {}: {}", user_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{user_id}",
    tag = "Admin",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User and their activity deleted"),
        (status = 400, description = "Admins cannot delete themselves"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(db: web::Data<MongoDB>, admin: AdminUser, path: web::Path<String>) -> HttpResponse {
    let user_id = path.into_inner();
    log::info!("🗑️ DELETE /admin/users/{} - by {}", user_id, admin.0.email);

    match admin_service::delete_user(&db, &admin.0, &user_id).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "User deleted"
        })),
        Err(e) => {
            log::warn!("❌ Failed to delete {}: {}", user_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    tag = "Admin",
    responses((status = 200, description = "Platform counters", body = StatsResponse)),
    security(("bearer_auth" = []))
)]
pub async fn get_stats(db: web::Data<MongoDB>, _admin: AdminUser) -> HttpResponse {
    match admin_service::get_stats(&db).await {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => {
            log::error!("❌ Failed to compute stats: {}", e);
            e.error_response()
        }
    }
}

// ==================== IMPORT ====================

#[utoipa::path(
    post,
    path = "/api/v1/admin/import/url",
    tag = "Import",
    request_body = ImportUrlRequest,
    responses(
        (status = 201, description = "Recipe imported", body = RecipeResponse),
        (status = 400, description = "Invalid URL or page is not a recipe"),
        (status = 409, description = "Recipe from this URL already imported"),
        (status = 502, description = "Page could not be fetched")
    ),
    security(("bearer_auth" = []))
)]
pub async fn import_url(
    db: web::Data<MongoDB>,
    importer: web::Data<Importer>,
    admin: AdminUser,
    request: web::Json<ImportUrlRequest>,
) -> HttpResponse {
    log::info!("📥 POST /admin/import/url - {} by {}", request.url, admin.0.email);

    match import_service::import_single_url(&db, &importer, &admin.0, &request).await {
        Ok(recipe) => {
            log::info!("✅ Imported '{}' from {}", recipe.title, request.url);
            HttpResponse::Created().json(serde_json::json!({ "success": true, "recipe": recipe }))
        }
        Err(e) => {
            log::warn!("❌ Import failed for {}: {}", request.url, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/import/site",
    tag = "Import",
    request_body = ImportSiteRequest,
    responses(
        (status = 202, description = "Crawl job queued", body = ImportStartedResponse),
        (status = 400, description = "Invalid site URL")
    ),
    security(("bearer_auth" = []))
)]
pub async fn import_site(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    importer: web::Data<Importer>,
    admin: AdminUser,
    request: web::Json<ImportSiteRequest>,
) -> HttpResponse {
    log::info!("🕷️ POST /admin/import/site - {} by {}", request.site, admin.0.email);

    match import_service::start_site_import(&db, &config, &importer, &admin.0, &request).await {
        Ok(started) => HttpResponse::Accepted().json(started),
        Err(e) => {
            log::warn!("❌ Failed to start import for {}: {}", request.site, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/import/jobs",
    tag = "Import",
    responses((status = 200, description = "Most recent import jobs")),
    security(("bearer_auth" = []))
)]
pub async fn list_import_jobs(db: web::Data<MongoDB>, _admin: AdminUser) -> HttpResponse {
    match import_service::list_jobs(&db).await {
        Ok(jobs) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "jobs": jobs,
            "total": jobs.len()
        })),
        Err(e) => {
            log::error!("❌ Failed to list import jobs: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/import/jobs/{job_id}",
    tag = "Import",
    params(("job_id" = String, Path, description = "Import job ID")),
    responses(
        (status = 200, description = "Import job progress"),
        (status = 404, description = "Import job not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_import_job(db: web::Data<MongoDB>, _admin: AdminUser, path: web::Path<String>) -> HttpResponse {
    let job_id = path.into_inner();

    match import_service::get_job(&db, &job_id).await {
        Ok(job) => HttpResponse::Ok().json(serde_json::json!({ "success": true, "job": job })),
        Err(e) => {
            log::warn!("❌ Import job {}: {}", job_id, e);
            e.error_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test as actix_test, App};

    async fn echo_reason(request: Option<web::Json<BanRequest>>) -> HttpResponse {
        HttpResponse::Ok().body(ban_reason(request).unwrap_or_else(|| "-".to_string()))
    }

    #[actix_web::test]
    async fn test_ban_body_is_optional() {
        let app = actix_test::init_service(App::new().route("/ban", web::put().to(echo_reason))).await;

        let req = actix_test::TestRequest::put().uri("/ban").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(actix_test::read_body(resp).await, "-");

        let req = actix_test::TestRequest::put()
            .uri("/ban")
            .set_json(serde_json::json!({ "reason": "spam" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(actix_test::read_body(resp).await, "spam");
    }
}
