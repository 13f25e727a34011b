// API server implementation using actix-web

use crate::api::routes;
use crate::config::Config;
use crate::database_ops::db::Db;
use actix_cors::Cors;
use actix_web::{
    http::header,
    middleware::{Compress, Logger},
    web, App, HttpServer,
};
use anyhow::{Context, Result};
use std::sync::Arc;

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
}

impl ApiServer {
    /// Create server from environment variables
    pub fn from_env() -> Result<Self> {
        crate::util::env::init_env();

        let host = crate::util::env::env_opt("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = crate::util::env::env_opt("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse()
            .context("Invalid API_PORT")?;
        let allowed_origins = crate::util::env::env_opt("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string());

        Ok(Self {
            host,
            port,
            allowed_origins,
        })
    }

    /// Start the HTTP server
    pub async fn run(self, db: Db, config: Arc<Config>) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);

        tracing::info!(
            host = %self.host,
            port = %self.port,
            "starting casewatch read API"
        );

        let db_data = web::Data::new(db);
        let config_data = web::Data::from(config);
        let allowed_origins = self.allowed_origins.clone();

        HttpServer::new(move || {
            let cors = build_cors(&allowed_origins);

            App::new()
                .app_data(db_data.clone())
                .app_data(config_data.clone())
                .wrap(Logger::default())
                .wrap(Compress::default())
                .wrap(cors)
                .configure(routes::configure_routes)
        })
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {}", bind_addr))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}

fn build_cors(allowed_origins: &str) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .max_age(3600);

    for origin in allowed_origins.split(',') {
        let origin = origin.trim();
        if !origin.is_empty() {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}
