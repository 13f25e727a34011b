// API route configuration

use crate::api::handlers;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/cases", web::get().to(handlers::get_cases))
        .route("/health", web::get().to(handlers::health_check));
}
