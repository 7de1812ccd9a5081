use actix_web::{HttpResponse, Responder, get};

/// Liveness probe used by deployment health checks.
#[get("/health_check")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().finish()
}
