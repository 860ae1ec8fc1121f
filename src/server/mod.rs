//! HTTP API and static file server
//!
//! State is built once at startup and never mutated; every valuation request
//! runs its own fetch pass.

mod error;
mod handlers;

use axum::{
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use reqwest::Client;
use std::any::Any as PanicPayload;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
};

use crate::config::{Config, Environment};
use crate::market::MarketSource;
use crate::program::AllocationProgramConfig;

pub use error::ApiError;
pub use handlers::{PointsQuery, ValuationResponse};

pub struct AppState {
    pub config: Config,
    pub program: AllocationProgramConfig,
    pub market: Arc<dyn MarketSource>,

    /// Used by the stats proxies
    pub http_client: Client,
}

pub fn router(state: Arc<AppState>) -> Router {
    let environment = state.config.environment.clone();

    // Unknown paths get the SPA entry point so client-side routes resolve
    let static_dir = &state.config.static_dir;
    let spa = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    let app = Router::new()
        .route("/api/arma/stats", get(handlers::arma_stats))
        .route("/api/pulse/stats", get(handlers::pulse_stats))
        .route("/api/health", get(handlers::health))
        .route("/api/valuation", get(handlers::valuation))
        .route("/api/valuation/points", get(handlers::points_value))
        .route("/api/valuation/bonus", get(handlers::bonus))
        .fallback_service(spa)
        .with_state(state);

    with_middleware(app, environment)
}

/// Permissive CORS, and a panicking handler becomes a JSON 500 instead of a dropped connection
fn with_middleware(app: Router, environment: Environment) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let on_panic = move |payload: Box<dyn PanicPayload + Send + 'static>| -> Response {
        ApiError::internal(&environment, panic_message(payload.as_ref())).into_response()
    };

    app.layer(CatchPanicLayer::custom(on_panic)).layer(cors)
}

fn panic_message(payload: &(dyn PanicPayload + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "handler panicked".to_string()
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::FakeMarket;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn state(market: FakeMarket, environment: Environment) -> Arc<AppState> {
        Arc::new(AppState {
            config: Config {
                environment,
                ..Default::default()
            },
            program: AllocationProgramConfig::default(),
            market: Arc::new(market),
            http_client: Client::new(),
        })
    }

    fn full_market() -> FakeMarket {
        FakeMarket {
            fdvs: vec![
                ("giza".into(), Some(1_000_000_000.0)),
                ("newton-protocol".into(), Some(400_000_000.0)),
            ],
            eth_price: Some(3_000.0),
            aggregator_tvl: Some(30_000_000.0),
            onchain_balance: Some(2_779_544.0),
            ..Default::default()
        }
    }

    async fn get_bytes(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let (status, bytes) = get_bytes(app, uri).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn exploding_handler() -> &'static str {
        panic!("valuation state corrupted")
    }

    fn exploding_app(environment: Environment) -> Router {
        let app = Router::new().route("/api/explode", get(exploding_handler));
        with_middleware(app, environment)
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(state(FakeMarket::default(), Environment::Production));
        let (status, body) = get_json(app, "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        assert_eq!(body["environment"], "production");
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_valuation() {
        let app = router(state(full_market(), Environment::Development));
        let (status, body) = get_json(app, "/api/valuation").await;

        assert_eq!(status, StatusCode::OK);
        let giza = &body["valuation"]["per_reference"][0];
        assert_eq!(giza["label"], "Giza");
        assert_eq!(giza["valuation"]["implied_token_price"], 1.0);
        assert_eq!(giza["valuation"]["flat_allocation_value"], 5_000_000.0);
        // Arma and Pulse unavailable: fixed reference TVL, ratio 2
        assert_eq!(body["valuation"]["tvl"]["ratio"]["value"], 2.0);
        assert_eq!(body["valuation"]["tvl_scaled"]["flat_allocation_value"], 10_000_000.0);
    }

    #[tokio::test]
    async fn test_points_value() {
        let app = router(state(full_market(), Environment::Development));
        let (status, body) = get_json(app, "/api/valuation/points?points=10000").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["points"], 10_000.0);
        assert_eq!(body["per_reference"][0]["value"], 10_000.0);
        let newton = body["per_reference"][1]["value"].as_f64().unwrap();
        assert!((newton - 4_000.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_valuation_without_tokens_is_bad_gateway() {
        let app = router(state(FakeMarket::default(), Environment::Development));
        let (status, body) = get_json(app, "/api/valuation").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Market data unavailable");
        assert_eq!(body["message"], "no reference token data could be fetched");
    }

    #[tokio::test]
    async fn test_bonus() {
        let app = router(state(FakeMarket::default(), Environment::Development));
        let (status, body) = get_json(
            app,
            "/api/valuation/bonus?assumed_fdv_millions=100&user_deposit=0&current_tvl=1000000",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["apr"], 0.0);
        assert_eq!(body["yearly_bonus"], 0.0);
    }

    #[tokio::test]
    async fn test_pulse_proxy_unconfigured() {
        let app = router(state(FakeMarket::default(), Environment::Production));
        let (status, body) = get_json(app, "/api/pulse/stats").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch Pulse API data");
        assert_eq!(body["message"], "PULSE_STATS_URL is not configured");
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let (status, body) = get_json(exploding_app(Environment::Development), "/api/explode").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["message"], "valuation state corrupted");
    }

    #[tokio::test]
    async fn test_panic_message_hidden_in_production() {
        let (status, body) = get_json(exploding_app(Environment::Production), "/api/explode").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["message"], "Something went wrong");
    }

    #[tokio::test]
    async fn test_spa_fallback_serves_index() {
        let dir = std::env::temp_dir().join(format!("fdv_spa_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let index = "<!doctype html><div id=\"root\"></div>";
        std::fs::write(dir.join("index.html"), index).unwrap();
        std::fs::write(dir.join("app.js"), "console.log(1);").unwrap();

        let state = Arc::new(AppState {
            config: Config {
                static_dir: dir.clone(),
                ..Default::default()
            },
            program: AllocationProgramConfig::default(),
            market: Arc::new(FakeMarket::default()),
            http_client: Client::new(),
        });
        let app = router(state);

        let (status, body) = get_bytes(app.clone(), "/some/client/route").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, index.as_bytes());

        let (status, body) = get_bytes(app, "/app.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"console.log(1);");

        std::fs::remove_dir_all(&dir).ok();
    }
}
