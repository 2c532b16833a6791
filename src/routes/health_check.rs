use actix_web::HttpResponse;

/// GET /health_check: liveness only, touches no store.
pub async fn health_check() -> HttpResponse {
    tracing::debug!("Health check endpoint called");
    HttpResponse::Ok().content_type("text/plain").body("OK")
}
