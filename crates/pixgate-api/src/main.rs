use pixgate_api::setup;
use pixgate_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (storage, services, routes)
    let (_state, router) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router).await
}
