use crate::database::MongoDB;
use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub database: String,
    pub timestamp: i64,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up; `status` is `degraded` when MongoDB does not answer", body = HealthResponse)
    )
)]
pub async fn health_check(db: web::Data<MongoDB>) -> impl Responder {
    let database_ok = db.ping().await;

    HttpResponse::Ok().json(HealthResponse {
        status: if database_ok { "healthy" } else { "degraded" }.to_string(),
        service: "kusinai-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if database_ok { "connected" } else { "unreachable" }.to_string(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}
