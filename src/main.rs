use friendcode_accounts::auth::TokenCodec;
use friendcode_accounts::configuration::get_configuration;
use friendcode_accounts::startup::{build_store, run};
use friendcode_accounts::telemetry::init_telemetry;
use std::net::TcpListener;

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

    let store = build_store(&configuration).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to initialise user store");
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "User store error")
    })?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let codec = TokenCodec::new(&configuration.jwt);
    let server = run(listener, store, codec)?;
    tracing::info!("Server started successfully");

    server.await
}
