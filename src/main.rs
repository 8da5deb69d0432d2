// Propbase Server - property listings, favorites, and recommendations

use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use propbase::{api::create_router, app_state::AppState, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;

    // Build main application router
    let app = Router::new()
        .merge(create_router(app_state))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    // Start server
    let addr = config.server_address();
    println!("🏠 Propbase server starting on http://{}", addr);
    println!("📋 API Documentation:");
    println!("  POST   /api/auth/register            - Create an account");
    println!("  POST   /api/auth/login               - Log in");
    println!("  GET    /api/auth/me                  - Current user");
    println!("  GET    /api/properties               - Browse/filter listings");
    println!("  POST   /api/properties               - Create a listing");
    println!("  GET    /api/properties/mine          - Own listings");
    println!("  GET    /api/properties/{{id}}          - Single listing");
    println!("  PUT    /api/properties/{{id}}          - Update own listing");
    println!("  DELETE /api/properties/{{id}}          - Delete own listing");
    println!("  POST   /api/favorites/{{property_id}}  - Favorite a listing");
    println!("  DELETE /api/favorites/{{property_id}}  - Unfavorite");
    println!("  GET    /api/favorites                - Favorited listings");
    println!("  POST   /api/recommendations          - Recommend by email");
    println!("  GET    /api/recommendations          - Received recommendations");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
