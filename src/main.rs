use stylematch::{create_router, init, AppState, Config, Result};

use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the application
    init()?;

    let config = Config::from_env()?;
    let addr = config.bind_addr;

    // Initialize application state
    let state = AppState::new(config)?;
    log::info!(
        "Loaded catalog with {} items",
        state.catalog.catalog().len()
    );

    // Embed the catalog ahead of the first request when we can
    if let Some(pipeline) = state.default_pipeline() {
        let pipeline = Arc::clone(pipeline);
        let catalog = Arc::clone(&state.catalog);
        tokio::spawn(async move {
            match catalog.embedded(pipeline.embedder(), pipeline.limiter()).await {
                Ok(table) => log::info!(
                    "Catalog embeddings ready ({} items, model {})",
                    table.items().len(),
                    table.model()
                ),
                Err(e) => log::warn!("Catalog warm-up failed, will retry on first request: {}", e),
            }
        });
    }

    let app = create_router(state);

    // Set up the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
