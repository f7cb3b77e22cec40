//! GSM Gateway Engine
//!
//! Long-running service that ingests call events from one Asterisk manager
//! session into the call record store, and answers call admission lookups
//! (blacklists, routing rules, SIM pools, spam screening) over HTTP.

use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpResponse, HttpServer};
use anyhow::Context;
use gsmgw_ami::{AmiConnector, CallRecordHandler};
use gsmgw_core::AppConfig;
use gsmgw_db::{
    create_pool, PgBlacklistRepository, PgCallRecordRepository, PgRoutingRuleRepository,
    PgSimPoolRepository,
};
use gsmgw_services::{AdmissionPipeline, CallScreener, SpamAnalyzer, SpamDetector};
use std::env;
use std::sync::Arc;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging
///
/// `RUST_LOG` wins when set; otherwise `LOG_LEVEL` applies to the engine's
/// crates. `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "gsmgw={lvl},gsmgw_ami={lvl},gsmgw_services={lvl},gsmgw_db={lvl},gsmgw_api={lvl},actix_web=info,sqlx=warn",
            lvl = log_level
        ))
    });

    let json = env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| fmt::layer().json().with_current_span(true)))
        .with((!json).then(|| {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
        }))
        .init();
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    info!("🚀 Starting GSM gateway engine v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load().context("Failed to load configuration")?;
    info!(
        ami = %config.ami.address(),
        server_id = %config.ami.server_id(),
        "Configuration loaded"
    );

    info!("Connecting to database...");
    let pool = create_pool(&config.database)
        .await
        .context("Failed to create database pool")?;
    info!(
        "✅ Database pool created with {} max connections",
        config.database.max_connections
    );

    // Stores
    let call_records = Arc::new(PgCallRecordRepository::new(pool.clone()));
    let blacklist = Arc::new(PgBlacklistRepository::new(pool.clone()));
    let rules = Arc::new(PgRoutingRuleRepository::new(pool.clone()));
    let pools = Arc::new(PgSimPoolRepository::new(pool));

    // Switch session
    let handler = Arc::new(CallRecordHandler::new(
        config.ami.server_id(),
        call_records.clone(),
    ));
    let connector = AmiConnector::new(config.ami.clone(), handler);
    connector.start();
    info!("✅ AMI connector started for {}", connector.server_id());

    // Admission services
    let detector = Arc::new(SpamDetector::new(
        call_records,
        SpamAnalyzer::from_offset_minutes(config.spam.utc_offset_minutes),
    ));
    let pipeline = Arc::new(AdmissionPipeline::new(blacklist.clone(), rules, pools));
    let screener = Arc::new(
        CallScreener::new(pipeline, detector.clone(), blacklist)
            .with_auto_blacklist_hours(config.spam.auto_blacklist_hours),
    );

    let cors_origins = env::var("CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());

    let bind_addr = config.server_addr();
    info!(
        "🌐 Starting HTTP server on {} with {} workers",
        bind_addr, config.server.workers
    );

    // Runs until SIGINT/SIGTERM
    let server = HttpServer::new(move || {
        let cors_origins_inner = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                origin.to_str().map_or(false, |origin_str| {
                    cors_origins_inner
                        .split(',')
                        .any(|o| o.trim() == origin_str)
                })
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(screener.clone()))
            .app_data(web::Data::new(detector.clone()))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                let error_message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest().json(serde_json::json!({
                        "error": "invalid_query",
                        "message": error_message
                    })),
                )
                .into()
            }))
            .wrap(cors)
            .wrap(TracingLogger::default())
            .configure(gsmgw_api::configure)
    })
    .workers(config.server.workers)
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr));

    let serve = async move {
        server?.run().await.context("HTTP server failed")
    };
    serve_then_stop(serve, &connector).await?;

    info!("👋 Shutdown complete");
    Ok(())
}

/// Await the HTTP server, then log off the switch whether or not it failed
async fn serve_then_stop<F>(serve: F, connector: &AmiConnector) -> anyhow::Result<()>
where
    F: std::future::Future<Output = anyhow::Result<()>>,
{
    let served = serve.await;
    if let Err(e) = &served {
        error!("HTTP server exited with error: {:#}", e);
    }

    info!("HTTP server stopped, closing switch session");
    connector.stop().await;

    served
}
