use actix_web::{web, HttpResponse, ResponseError};
use crate::{
    database::MongoDB,
    services::chat_service::{self, ChatRequest, ChatResponse},
};

#[utoipa::path(
    post,
    path = "/api/v1/chat/message",
    tag = "Chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply with recipe suggestions", body = ChatResponse),
        (status = 400, description = "Empty or too long message")
    )
)]
pub async fn send_message(db: web::Data<MongoDB>, request: web::Json<ChatRequest>) -> HttpResponse {
    match chat_service::respond(&db, &request).await {
        Ok(response) => {
            log::info!("💬 Chat [{}] -> {} suggestions", response.intent, response.suggestions.len());
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::warn!("❌ Chat failed: {}", e);
            e.error_response()
        }
    }
}
