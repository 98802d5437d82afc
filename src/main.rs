use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use newsdesk::config::Config;
use newsdesk::openapi::ApiDoc;
use newsdesk::routes::{self, AppState};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds; deployments set their
    // environment externally (systemd, Docker, etc.).
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = Config::from_env();
    info!("Bootstrapping newsdesk server");

    #[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
    let repo = {
        info!("Using in-memory repository backend");
        newsdesk::repo::inmem::InMemRepo::new()
    };

    #[cfg(feature = "postgres-store")]
    let repo = {
        use sqlx::postgres::PgPoolOptions;
        let db_url = cfg
            .database_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set for the postgres backend"))?;
        let pool = PgPoolOptions::new()
            .max_connections(cfg.db_max_connections)
            .acquire_timeout(cfg.db_acquire_timeout)
            .connect_lazy(&db_url)?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(
            max_connections = cfg.db_max_connections,
            "Using Postgres repository backend"
        );
        newsdesk::repo::pg::PgRepo::new(pool)
    };

    let state = AppState {
        repo: Arc::new(repo),
        route_miss_not_found: cfg.route_miss_not_found,
    };
    let openapi = ApiDoc::openapi();
    let (host, port) = (cfg.host.clone(), cfg.port);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(Cors::permissive())
            .app_data(web::Data::new(state.clone()))
            .app_data(web::JsonConfig::default().error_handler(routes::json_error_handler))
            .configure(routes::config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind((host.clone(), port))?;

    info!("Listening on http://{host}:{port}");

    server.run().await?;
    Ok(())
}
