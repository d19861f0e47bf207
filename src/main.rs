use library_api::{
    adapters::{mock, postgres},
    api::{AppState, create_router},
    application::ServiceDependencies,
    config::{AppConfig, StorageBackend},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 設定された保存先に応じてリポジトリを組み立てる
async fn build_service_dependencies(config: &AppConfig) -> Result<ServiceDependencies, BoxError> {
    match config.storage {
        StorageBackend::Postgres => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(&config.database_url)
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Database migrations applied");

            Ok(ServiceDependencies {
                book_repository: Arc::new(postgres::PostgresBookRepository::new(pool.clone())),
                loan_repository: Arc::new(postgres::PostgresLoanRepository::new(pool)),
            })
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage. All data will be lost on shutdown.");

            Ok(ServiceDependencies {
                book_repository: Arc::new(mock::BookRepository::new()),
                loan_repository: Arc::new(mock::LoanRepository::new()),
            })
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().inspect_err(|e| {
        tracing::error!("Invalid configuration: {}", e);
    })?;

    tracing::info!(storage = ?config.storage, "Starting library api");

    let service_deps = build_service_dependencies(&config)
        .await
        .inspect_err(|e| tracing::error!("Failed to initialize storage: {}", e))?;

    let app = create_router(Arc::new(AppState { service_deps }));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
