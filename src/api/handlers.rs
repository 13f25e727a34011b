// HTTP request handlers for the read API.

use crate::api::models::{CasesResponse, ErrorResponse, HealthResponse};
use crate::config::Config;
use crate::database_ops::{cases, db::Db};
use actix_web::{web, HttpResponse};

/// Every stored row plus the oldest `last_updated` among them. Storage
/// failures surface as a 500 with the error message, never a partial body.
pub async fn get_cases(db: web::Data<Db>, config: web::Data<Config>) -> HttpResponse {
    match cases::fetch_all(&db, &config.cases_table).await {
        Ok((last_updated, rows)) => HttpResponse::Ok().json(CasesResponse {
            last_updated,
            cases: rows,
        }),
        Err(err) => {
            tracing::error!(error = %err, "failed to read cases");
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: err.to_string(),
            })
        }
    }
}

/// Health check endpoint with a quick database connectivity probe.
pub async fn health_check(db: web::Data<Db>) -> HttpResponse {
    let database = match sqlx::query_scalar::<_, bool>("SELECT true")
        .persistent(false)
        .fetch_one(&db.pool)
        .await
    {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        database,
    })
}
