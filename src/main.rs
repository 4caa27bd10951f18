use std::net::TcpListener;
use std::sync::Arc;

use auth_api::auth::{AuthFlow, SystemClock};
use auth_api::configuration::get_configuration;
use auth_api::startup::run;
use auth_api::store::PgUserStore;
use auth_api::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    tracing::info!("Attempting to connect to database");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(configuration.auth.store_timeout())
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run migrations: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
    })?;

    tracing::info!("Database ready");

    // The signing secret is validated here; a missing key stops startup.
    let flow = AuthFlow::from_settings(
        Arc::new(PgUserStore::new(pool)),
        &configuration.jwt,
        &configuration.auth,
        Arc::new(SystemClock),
    )
    .map_err(|e| {
        tracing::error!("Failed to initialise auth: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Auth configuration error")
    })?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, flow)?;
    server.await
}
