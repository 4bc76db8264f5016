use actix_web::{web, HttpResponse};
use sqlx::PgPool;

/// GET /health_check
///
/// 200 with an empty body while the database answers, 503 otherwise.
pub async fn health_check(pool: web::Data<PgPool>) -> HttpResponse {
    match sqlx::query("SELECT 1").execute(pool.get_ref()).await {
        Ok(_) => HttpResponse::Ok().finish(),
        Err(e) => {
            tracing::error!(error = %e, "Health check could not reach the database");
            HttpResponse::ServiceUnavailable().finish()
        }
    }
}
