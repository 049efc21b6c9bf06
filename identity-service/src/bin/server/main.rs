use std::sync::Arc;

use auth::Authenticator;
use identity_service::account::ports::AuthServicePort;
use identity_service::account::service::AuthService;
use identity_service::config::Config;
use identity_service::inbound::http::router::create_router;
use identity_service::outbound::notifications::LogNotifier;
use identity_service::outbound::repositories::InMemoryStore;
use identity_service::outbound::repositories::PostgresTokenRepository;
use identity_service::outbound::repositories::PostgresUserRepository;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;
    let lifetimes = config.lifetimes();

    tracing::info!(
        http_port = config.server.http_port,
        persistent = config.database.url.is_some(),
        access_token_ttl_minutes = config.jwt.access_token_ttl_minutes,
        refresh_token_ttl_days = config.tokens.refresh_token_ttl_days,
        "Configuration loaded"
    );

    let authenticator = Arc::new(Authenticator::new(
        config.jwt.secret.as_bytes(),
        lifetimes.access_token,
    )?);
    let notifier = Arc::new(LogNotifier::from_config(&config));

    let auth_service: Arc<dyn AuthServicePort> = match &config.database.url {
        Some(database_url) => {
            let pg_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(database_url)
                .await?;
            tracing::info!(
                max_connections = config.database.max_connections,
                database = "postgresql",
                "Database connection pool created"
            );

            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            Arc::new(AuthService::new(
                Arc::new(PostgresUserRepository::new(pg_pool.clone())),
                Arc::new(PostgresTokenRepository::new(pg_pool)),
                notifier,
                Arc::clone(&authenticator),
                lifetimes,
            ))
        }
        None => {
            tracing::warn!("No database URL configured, accounts are kept in memory only");

            let store = Arc::new(InMemoryStore::new());
            Arc::new(AuthService::new(
                Arc::clone(&store),
                store,
                notifier,
                Arc::clone(&authenticator),
                lifetimes,
            ))
        }
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(auth_service, authenticator);
    axum::serve(http_listener, http_application).await?;

    tracing::info!("Server exited");
    Ok(())
}
