use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use demo_api::config::Config;
use demo_api::{App, Server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = Config::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "demo_api=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate()?;

    let app = App::new(&config);
    let server = Server::bind(config.addr()).await?;
    info!(
        "API running on http://{}{}",
        server.local_addr(),
        demo_api::api::API_PREFIX
    );
    if config.seed_users {
        info!("demo accounts: admin@test.com / user@test.com (password123)");
    }

    server.run_until(app.service(), shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
