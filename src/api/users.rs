use actix_web::{web, HttpResponse, ResponseError};
use crate::{
    database::MongoDB,
    middleware::AuthUser,
    models::{Note, RecipeSummary, UserInfo},
    services::{auth_service, user_service},
    services::user_service::{NoteRequest, UpdateNoteRequest, UpdateProfileRequest},
};

#[utoipa::path(
    get,
    path = "/api/v1/users/profile",
    tag = "Users",
    responses(
        (status = 200, description = "Profile of the current user", body = UserInfo),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_profile(db: web::Data<MongoDB>, user: AuthUser) -> HttpResponse {
    log::debug!("👤 GET /users/profile - {}", user.0.user_id);

    match auth_service::get_current_user(&db, &user.0.user_id).await {
        Ok(info) => HttpResponse::Ok().json(serde_json::json!({ "success": true, "user": info })),
        Err(e) => {
            log::error!("❌ Failed to load profile {}: {}", user.0.user_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/users/profile",
    tag = "Users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserInfo),
        (status = 400, description = "Invalid name")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    db: web::Data<MongoDB>,
    user: AuthUser,
    request: web::Json<UpdateProfileRequest>,
) -> HttpResponse {
    log::info!("✏️ PUT /users/profile - {}", user.0.user_id);

    match user_service::update_profile(&db, &user.0.user_id, &request).await {
        Ok(info) => HttpResponse::Ok().json(serde_json::json!({ "success": true, "user": info })),
        Err(e) => {
            log::warn!("❌ Profile update failed for {}: {}", user.0.user_id, e);
            e.error_response()
        }
    }
}

// ==================== NOTES ====================

#[utoipa::path(
    get,
    path = "/api/v1/users/notes",
    tag = "Users",
    responses((status = 200, description = "Kitchen notes of the current user", body = [Note])),
    security(("bearer_auth" = []))
)]
pub async fn list_notes(db: web::Data<MongoDB>, user: AuthUser) -> HttpResponse {
    match user_service::list_notes(&db, &user.0.user_id).await {
        Ok(notes) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "notes": notes,
            "total": notes.len()
        })),
        Err(e) => {
            log::error!("❌ Failed to list notes for {}: {}", user.0.user_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/users/notes",
    tag = "Users",
    request_body = NoteRequest,
    responses(
        (status = 201, description = "Note created", body = Note),
        (status = 400, description = "Invalid title or content")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_note(db: web::Data<MongoDB>, user: AuthUser, request: web::Json<NoteRequest>) -> HttpResponse {
    log::info!("📝 POST /users/notes - {}", user.0.user_id);

    match user_service::add_note(&db, &user.0.user_id, &request).await {
        Ok(note) => HttpResponse::Created().json(serde_json::json!({ "success": true, "note": note })),
        Err(e) => {
            log::warn!("❌ Failed to add note: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/users/notes/{note_id}",
    tag = "Users",
    request_body = UpdateNoteRequest,
    params(("note_id" = String, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Note updated", body = Note),
        (status = 404, description = "Note not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_note(
    db: web::Data<MongoDB>,
    user: AuthUser,
    path: web::Path<String>,
    request: web::Json<UpdateNoteRequest>,
) -> HttpResponse {
    let note_id = path.into_inner();
    log::info!("✏️ PUT /users/notes/{} - {}", note_id, user.0.user_id);

    match user_service::update_note(&db, &user.0.user_id, &note_id, &request).await {
        Ok(note) => HttpResponse::Ok().json(serde_json::json!({ "success": true, "note": note })),
        Err(e) => {
            log::warn!("❌ Failed to update note {}: {}", note_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/notes/{note_id}",
    tag = "Users",
    params(("note_id" = String, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Note deleted"),
        (status = 404, description = "Note not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_note(db: web::Data<MongoDB>, user: AuthUser, path: web::Path<String>) -> HttpResponse {
    let note_id = path.into_inner();
    log::info!("🗑️ DELETE /users/notes/{} - {}", note_id, user.0.user_id);

    match user_service::delete_note(&db, &user.0.user_id, &note_id).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Note deleted"
        })),
        Err(e) => {
            log::warn!("❌ Failed to delete note {}: {}", note_id, e);
            e.error_response()
        }
    }
}

// ==================== FAVORITES ====================

#[utoipa::path(
    get,
    path = "/api/v1/users/favorites",
    tag = "Users",
    responses((status = 200, description = "Favorite recipes", body = [RecipeSummary])),
    security(("bearer_auth" = []))
)]
pub async fn list_favorites(db: web::Data<MongoDB>, user: AuthUser) -> HttpResponse {
    match user_service::list_favorites(&db, &user.0.user_id).await {
        Ok(recipes) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "recipes": recipes,
            "total": recipes.len()
        })),
        Err(e) => {
            log::error!("❌ Failed to list favorites for {}: {}", user.0.user_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/users/favorites/{recipe_id}",
    tag = "Users",
    params(("recipe_id" = String, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Recipe is in favorites"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_favorite(db: web::Data<MongoDB>, user: AuthUser, path: web::Path<String>) -> HttpResponse {
    let recipe_id = path.into_inner();
    log::info!("⭐ POST /users/favorites/{} - {}", recipe_id, user.0.user_id);

    match user_service::add_favorite(&db, &user.0.user_id, &recipe_id).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "recipe_id": recipe_id,
            "favorite": true
        })),
        Err(e) => {
            log::warn!("❌ Failed to favorite {}: {}", recipe_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/favorites/{recipe_id}",
    tag = "Users",
    params(("recipe_id" = String, Path, description = "Recipe ID")),
    responses((status = 200, description = "Recipe is not in favorites")),
    security(("bearer_auth" = []))
)]
pub async fn remove_favorite(db: web::Data<MongoDB>, user: AuthUser, path: web::Path<String>) -> HttpResponse {
    let recipe_id = path.into_inner();
    log::info!("☆ DELETE /users/favorites/{} - {}", recipe_id, user.0.user_id);

    match user_service::remove_favorite(&db, &user.0.user_id, &recipe_id).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "recipe_id": recipe_id,
            "favorite": false
        })),
        Err(e) => {
            log::warn!("❌ Failed to unfavorite {}: {}", recipe_id, e);
            e.error_response()
        }
    }
}
