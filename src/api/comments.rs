use actix_web::{web, HttpResponse, ResponseError};
use crate::{
    database::MongoDB,
    middleware::AuthUser,
    models::{Comment, Reply},
    services::comment_service::{self, CommentRequest, LikeResponse, LikeToggle},
};

fn like_response(toggle: LikeToggle) -> HttpResponse {
    HttpResponse::Ok().json(LikeResponse {
        success: true,
        liked: toggle.liked,
        likes: toggle.likes,
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/recipes/{id}/comments",
    tag = "Comments",
    params(("id" = String, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Comments with their replies", body = [Comment]),
        (status = 404, description = "Recipe not found")
    )
)]
pub async fn list_comments(db: web::Data<MongoDB>, path: web::Path<String>) -> HttpResponse {
    let recipe_id = path.into_inner();

    match comment_service::list_comments(&db, &recipe_id).await {
        Ok(comments) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "comments": comments,
            "total": comments.len()
        })),
        Err(e) => {
            log::warn!("❌ Failed to list comments for {}: {}", recipe_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/recipes/{id}/comments",
    tag = "Comments",
    request_body = CommentRequest,
    params(("id" = String, Path, description = "Recipe ID")),
    responses(
        (status = 201, description = "Comment added", body = Comment),
        (status = 400, description = "Empty or too long comment"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_comment(
    db: web::Data<MongoDB>,
    user: AuthUser,
    path: web::Path<String>,
    request: web::Json<CommentRequest>,
) -> HttpResponse {
    let recipe_id = path.into_inner();
    log::info!("💬 POST /recipes/{}/comments - {}", recipe_id, user.0.user_id);

    match comment_service::add_comment(&db, &recipe_id, &user.0, &request.text).await {
        Ok(comment) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "comment": comment
        })),
        Err(e) => {
            log::warn!("❌ Failed to add comment on {}: {}", recipe_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/recipes/{id}/comments/{comment_id}",
    tag = "Comments",
    request_body = CommentRequest,
    params(
        ("id" = String, Path, description = "Recipe ID"),
        ("comment_id" = String, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Comment edited", body = Comment),
        (status = 403, description = "Only the owner can edit"),
        (status = 404, description = "Recipe or comment not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn edit_comment(
    db: web::Data<MongoDB>,
    user: AuthUser,
    path: web::Path<(String, String)>,
    request: web::Json<CommentRequest>,
) -> HttpResponse {
    let (recipe_id, comment_id) = path.into_inner();
    log::info!("✏️ PUT /recipes/{}/comments/{} - {}", recipe_id, comment_id, user.0.user_id);

    match comment_service::edit_comment(&db, &recipe_id, &comment_id, &user.0, &request.text).await {
        Ok(comment) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "comment": comment
        })),
        Err(e) => {
            log::warn!("❌ Failed to edit comment {}: {}", comment_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/recipes/{id}/comments/{comment_id}",
    tag = "Comments",
    params(
        ("id" = String, Path, description = "Recipe ID"),
        ("comment_id" = String, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Comment deleted"),
        (status = 403, description = "Only the owner or an admin can delete"),
        (status = 404, description = "Recipe or comment not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_comment(
    db: web::Data<MongoDB>,
    user: AuthUser,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (recipe_id, comment_id) = path.into_inner();
    log::info!("🗑️ DELETE /recipes/{}/comments/{} - {}", recipe_id, comment_id, user.0.user_id);

    match comment_service::delete_comment(&db, &recipe_id, &comment_id, &user.0).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Comment deleted"
        })),
        Err(e) => {
            log::warn!("❌ Failed to delete comment {}: {}", comment_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/recipes/{id}/comments/{comment_id}/like",
    tag = "Comments",
    params(
        ("id" = String, Path, description = "Recipe ID"),
        ("comment_id" = String, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Like toggled", body = LikeResponse),
        (status = 404, description = "Recipe or comment not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn toggle_comment_like(
    db: web::Data<MongoDB>,
    user: AuthUser,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (recipe_id, comment_id) = path.into_inner();

    match comment_service::toggle_comment_like(&db, &recipe_id, &comment_id, &user.0).await {
        Ok(toggle) => like_response(toggle),
        Err(e) => {
            log::warn!("❌ Failed to toggle like on comment {}: {}", comment_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/recipes/{id}/comments/{comment_id}/replies",
    tag = "Comments",
    request_body = CommentRequest,
    params(
        ("id" = String, Path, description = "Recipe ID"),
        ("comment_id" = String, Path, description = "Comment ID")
    ),
    responses(
        (status = 201, description = "Reply added", body = Reply),
        (status = 400, description = "Empty or too long reply"),
        (status = 404, description = "Recipe or comment not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_reply(
    db: web::Data<MongoDB>,
    user: AuthUser,
    path: web::Path<(String, String)>,
    request: web::Json<CommentRequest>,
) -> HttpResponse {
    let (recipe_id, comment_id) = path.into_inner();
    log::info!("↩️ POST /recipes/{}/comments/{}/replies - {}", recipe_id, comment_id, user.0.user_id);

    match comment_service::add_reply(&db, &recipe_id, &comment_id, &user.0, &request.text).await {
        Ok(reply) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "reply": reply
        })),
        Err(e) => {
            log::warn!("❌ Failed to reply to comment {}: {}", comment_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/recipes/{id}/comments/{comment_id}/replies/{reply_id}",
    tag = "Comments",
    params(
        ("id" = String, Path, description = "Recipe ID"),
        ("comment_id" = String, Path, description = "Comment ID"),
        ("reply_id" = String, Path, description = "Reply ID")
    ),
    responses(
        (status = 200, description = "Reply deleted"),
        (status = 403, description = "Only the owner or an admin can delete"),
        (status = 404, description = "Recipe, comment or reply not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_reply(
    db: web::Data<MongoDB>,
    user: AuthUser,
    path: web::Path<(String, String, String)>,
) -> HttpResponse {
    let (recipe_id, comment_id, reply_id) = path.into_inner();
    log::info!("🗑️ DELETE /recipes/{}/comments/{}/replies/{} - {}", recipe_id, comment_id, reply_id, user.0.user_id);

    match comment_service::delete_reply(&db, &recipe_id, &comment_id, &reply_id, &user.0).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Reply deleted"
        })),
        Err(e) => {
            log::warn!("❌ Failed to delete reply {}: {}", reply_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/recipes/{id}/comments/{comment_id}/replies/{reply_id}/like",
    tag = "Comments",
    params(
        ("id" = String, Path, description = "Recipe ID"),
        ("comment_id" = String, Path, description = "Comment ID"),
        ("reply_id" = String, Path, description = "Reply ID")
    ),
    responses(
        (status = 200, description = "Like toggled", body = LikeResponse),
        (status = 404, description = "Recipe, comment or reply not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn toggle_reply_like(
    db: web::Data<MongoDB>,
    user: AuthUser,
    path: web::Path<(String, String, String)>,
) -> HttpResponse {
    let (recipe_id, comment_id, reply_id) = path.into_inner();

    match comment_service::toggle_reply_like(&db, &recipe_id, &comment_id, &reply_id, &user.0).await {
        Ok(toggle) => like_response(toggle),
        Err(e) => {
            log::warn!("❌ Failed to toggle like on reply {}: {}", reply_id, e);
            e.error_response()
        }
    }
}
