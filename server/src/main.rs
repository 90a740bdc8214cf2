use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use timetable_server::config::ServerConfig;
use timetable_server::state::AppState;
use timetable_server::{app, cors_layer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    let cors = cors_layer(config.client_url.as_deref())?;
    let app = app(AppState::new(config.solve_delay, config.job_ttl)).layer(cors);

    let listener = TcpListener::bind(&config.addr).await?;
    tracing::info!(addr = %config.addr, delay = ?config.solve_delay, ttl = ?config.job_ttl, "timetable server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
