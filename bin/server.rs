// Residential Console - Web Server
// REST API with Axum for house grouping

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use residential_console::{
    init_tracing, ConsoleConfig, GroupingStrategy, HouseGroup, HouseGrouping, ResidentRecord,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    config: Arc<ConsoleConfig>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

/// Optional per-request override of the configured strategy
#[derive(Debug, Deserialize)]
struct GroupParams {
    strategy: Option<GroupingStrategy>,
}

/// Grouping response (assignments left out: callers only need the houses)
#[derive(Serialize)]
struct GroupingResponse {
    strategy: GroupingStrategy,
    house_count: usize,
    grouped_residents: usize,
    excluded: usize,
    houses: Vec<HouseGroup>,
}

impl From<HouseGrouping> for GroupingResponse {
    fn from(grouping: HouseGrouping) -> Self {
        Self {
            strategy: grouping.strategy,
            house_count: grouping.house_count(),
            grouped_residents: grouping.total_members(),
            excluded: grouping.excluded,
            houses: grouping.groups,
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/houses/group - Group a JSON array of resident records
async fn group_houses(
    State(state): State<AppState>,
    Query(params): Query<GroupParams>,
    Json(records): Json<Vec<ResidentRecord>>,
) -> impl IntoResponse {
    let mut engine = state.config.grouping.engine();
    if let Some(strategy) = params.strategy {
        engine.strategy = strategy;
    }

    let grouping = engine.group_houses(&records);
    tracing::info!(
        records = records.len(),
        houses = grouping.house_count(),
        "grouped houses"
    );

    (StatusCode::OK, Json(ApiResponse::ok(GroupingResponse::from(grouping))))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    println!("🌐 Residential Console - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = ConsoleConfig::from_env()?;
    println!("✓ Grouping strategy: {}", config.grouping.strategy.as_str());

    // Create shared state
    let state = AppState {
        config: Arc::new(config),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/houses/group", post(group_houses))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    // Start server
    let addr = std::env::var("RESIDENTIAL_CONSOLE_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: POST http://{}/api/houses/group", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await?;
    Ok(())
}
