use tiffin_server::{Config, Server, ServerState, init_logger};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Environment (dotenv is best-effort, logging must come up)
    let _ = dotenv::dotenv();
    init_logger();

    tracing::info!("Tiffin Server starting...");

    // 2. Load configuration
    let config = Config::from_env();

    // 3. Initialize server state (pool, cache, services)
    let state = ServerState::initialize(&config).await?;

    // 4. Run the HTTP server until ctrl-c
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
