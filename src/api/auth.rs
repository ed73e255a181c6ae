use actix_web::{web, HttpResponse, ResponseError};
use crate::{config::AppConfig, database::MongoDB, middleware::AuthUser, services::auth_service};
use crate::services::auth_service::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, RegisterResponse, ResendVerificationRequest,
};
use crate::models::UserInfo;
use serde::Deserialize;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct VerifyEmailQuery {
    pub token: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, verification email sent", body = RegisterResponse),
        (status = 400, description = "Invalid name, email or password"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    request: web::Json<RegisterRequest>,
) -> HttpResponse {
    log::info!("📝 POST /auth/register - email: {}", request.email);

    match auth_service::register(&db, &config, &request).await {
        Ok(response) => {
            log::info!("✅ Registration successful: {}", request.email);
            HttpResponse::Created().json(response)
        }
        Err(e) => {
            log::warn!("❌ Registration failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/verify-email",
    tag = "Auth",
    params(VerifyEmailQuery),
    responses(
        (status = 200, description = "Email verified", body = UserInfo),
        (status = 400, description = "Unknown or expired verification token")
    )
)]
pub async fn verify_email(
    db: web::Data<MongoDB>,
    query: web::Query<VerifyEmailQuery>,
) -> HttpResponse {
    log::info!("📧 GET /auth/verify-email");

    match auth_service::verify_email(&db, &query.token).await {
        Ok(user) => {
            log::info!("✅ Email verified: {}", user.email);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Email verified, you can now log in",
                "user": user
            }))
        }
        Err(e) => {
            log::warn!("❌ Email verification failed: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/resend-verification",
    tag = "Auth",
    request_body = ResendVerificationRequest,
    responses(
        (status = 200, description = "Verification email sent if the account exists"),
        (status = 400, description = "Account already verified")
    )
)]
pub async fn resend_verification(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    request: web::Json<ResendVerificationRequest>,
) -> HttpResponse {
    log::info!("📧 POST /auth/resend-verification - email: {}", request.email);

    match auth_service::resend_verification(&db, &config, &request.email).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "If an unverified account exists for this email, a new verification link was sent"
        })),
        Err(e) => {
            log::warn!("❌ Resend verification failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account banned or email not verified")
    )
)]
pub async fn login(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    request: web::Json<LoginRequest>,
) -> HttpResponse {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match auth_service::login(&db, &config, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", request.email);
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "User information retrieved", body = UserInfo),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(db: web::Data<MongoDB>, user: AuthUser) -> HttpResponse {
    log::info!("👤 GET /auth/me - {}", user.0.user_id);

    match auth_service::get_current_user(&db, &user.0.user_id).await {
        Ok(info) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": info
        })),
        Err(e) => {
            log::error!("❌ Failed to get user: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/change-password",
    tag = "Auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "New password too weak"),
        (status = 401, description = "Current password is wrong")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn change_password(
    db: web::Data<MongoDB>,
    user: AuthUser,
    request: web::Json<ChangePasswordRequest>,
) -> HttpResponse {
    log::info!("🔑 PUT /auth/change-password - {}", user.0.user_id);

    match auth_service::change_password(&db, &user.0.user_id, &request).await {
        Ok(()) => {
            log::info!("✅ Password changed: {}", user.0.user_id);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Password changed successfully"
            }))
        }
        Err(e) => {
            log::warn!("❌ Password change failed: {} - {}", user.0.user_id, e);
            e.error_response()
        }
    }
}

/// 🗑️ Deletes the caller's account, their comments, replies and likes
#[utoipa::path(
    delete,
    path = "/api/v1/auth/delete-account",
    tag = "Auth",
    responses(
        (status = 200, description = "Account deleted"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_account(db: web::Data<MongoDB>, user: AuthUser) -> HttpResponse {
    let user_id = &user.0.user_id;
    log::info!("🗑️ DELETE /auth/delete-account - {}", user_id);

    match auth_service::delete_user_account(&db, user_id).await {
        Ok(()) => {
            log::info!("✅ Account deleted successfully: {}", user_id);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Account deleted successfully"
            }))
        }
        Err(e) => {
            log::error!("❌ Failed to delete account {}: {}", user_id, e);
            e.error_response()
        }
    }
}
