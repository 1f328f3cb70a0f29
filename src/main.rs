use log::info;
use std::sync::Arc;

use clipbind::api::{build_router, AppState};
use clipbind::config::AppConfig;
use clipbind::db;
use clipbind::domains::binding::SqliteBindingRepository;
use clipbind::domains::export::{ExportServiceImpl, SqliteExportJobRepository};
use clipbind::storage::{HttpObjectStore, LocalObjectStore, ObjectStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env();
    info!("starting clipbind v{}", env!("CARGO_PKG_VERSION"));

    let pool = db::connect(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("database ready at {}", config.database_url);

    let store: Arc<dyn ObjectStore> = match &config.storage_api_url {
        Some(url) => {
            info!("using remote object store at {}", url);
            Arc::new(HttpObjectStore::new(url, &config.storage_api_token)?)
        }
        None => {
            info!("using local object store under {}", config.storage_root);
            Arc::new(LocalObjectStore::new(&config.storage_root)?)
        }
    };

    let service = ExportServiceImpl::new(
        Arc::new(SqliteBindingRepository::new(pool.clone())),
        Arc::new(SqliteExportJobRepository::new(pool)),
        store,
        &config,
    );
    let router = build_router(AppState::new(Arc::new(service)));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("listening on {}", config.bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
