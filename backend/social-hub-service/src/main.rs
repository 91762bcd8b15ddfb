use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use social_hub_service::{
    config::StoreBackend,
    db, handlers, logging, metrics,
    repository::Repositories,
    AppState, Config,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        env = %config.app.env,
        backend = ?config.storage.backend,
        "Starting social hub service"
    );

    let repos = match config.storage.backend {
        StoreBackend::Postgres => {
            let pool = db::create_pool(&config.database)
                .await
                .context("Failed to connect to database")?;
            db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            Repositories::postgres(pool)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Repositories::in_memory()
        }
    };

    let addr = format!("{}:{}", config.app.host, config.app.port);
    let state = web::Data::new(AppState::new(config, repos));

    tracing::info!("Starting HTTP server on {}", addr);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .wrap(middleware::from_fn(metrics::track_http))
            .route("/health", web::get().to(handlers::health))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(handlers::register_routes)
    })
    .bind(&addr)
    .with_context(|| format!("Failed to bind {}", addr))?
    .run()
    .await
    .context("HTTP server error")?;

    tracing::info!("Social hub service stopped");
    Ok(())
}
