// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Public:
//   GET  /                       liveness banner
//   GET  /api/health             status + gateway guard counters
//   GET  /api/market/:symbol     rolling z-score snapshot
//   GET  /api/orderbook/:symbol  depth-limited order book
//   POST /signup, POST /login
//
// Authenticated (Bearer token):
//   GET  /verify-token
//
// Path symbols use a dash (`BTC-USD`); the market service converts them to
// the exchange's slash form.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::auth::AuthBearer;
use super::error::ApiError;
use super::extract::{ApiJson, ApiQuery};
use crate::app_state::AppState;
use crate::auth::{LoginRequest, LoginResponse, SignupRequest};
use crate::exchange::GuardSnapshot;
use crate::market_data::{MarketSnapshot, OrderBookView};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full router with CORS, request tracing and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Service ─────────────────────────────────────────────────
        .route("/", get(root))
        .route("/api/health", get(health))
        // ── Accounts ────────────────────────────────────────────────
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/verify-token", get(verify_token))
        // ── Market data ─────────────────────────────────────────────
        .route("/api/market/:symbol", get(market))
        .route("/api/orderbook/:symbol", get(orderbook))
        // ── Middleware & State ──────────────────────────────────────
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Service
// =============================================================================

async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Signal desk API is running",
        "status": "online",
    }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    uptime_secs: i64,
    gateway: GuardSnapshot,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let now = Utc::now();
    Json(HealthResponse {
        status: "healthy",
        timestamp: now.to_rfc3339(),
        uptime_secs: (now - state.started_at).num_seconds(),
        gateway: state.market.guard().snapshot(),
    })
}

// =============================================================================
// Accounts
// =============================================================================

async fn signup(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.auth.signup(req)?;
    Ok(Json(json!({
        "message": "Account created successfully",
        "user": user,
    })))
}

async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    Ok(Json(state.auth.login(req)?))
}

async fn verify_token(AuthBearer(user): AuthBearer) -> impl IntoResponse {
    Json(json!({ "status": "ok", "user": user }))
}

// =============================================================================
// Market data
// =============================================================================

#[derive(Debug, Deserialize)]
struct MarketQuery {
    #[serde(default)]
    timeframe: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

async fn market(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    ApiQuery(query): ApiQuery<MarketQuery>,
) -> Result<Json<MarketSnapshot>, ApiError> {
    let snapshot = state
        .market
        .market_snapshot(&symbol, query.timeframe.as_deref(), query.limit)
        .await?;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
struct DepthQuery {
    #[serde(default)]
    limit: Option<usize>,
}

async fn orderbook(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    ApiQuery(query): ApiQuery<DepthQuery>,
) -> Result<Json<OrderBookView>, ApiError> {
    Ok(Json(state.market.order_book(&symbol, query.limit).await?))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::exchange::fake::{hourly_rows, sample_book, sample_ticker, FakeGateway};
    use crate::exchange::GatewayError;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(fake: Arc<FakeGateway>) -> Router {
        let config = ServiceConfig {
            token_secret: Some("router-test-secret".into()),
            ..ServiceConfig::default()
        };
        router(Arc::new(AppState::new(config, fake)))
    }

    fn market_fake() -> Arc<FakeGateway> {
        Arc::new(FakeGateway::with_candles(hourly_rows(25, 100.0, 1.0), sample_ticker()))
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn root_and_health() {
        let app = app(market_fake());
        let (status, body) = send(app.clone(), get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "online");

        let (status, body) = send(app, get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["gateway"]["calls"], 0);
        assert_eq!(body["gateway"]["in_flight"], 0);
    }

    #[tokio::test]
    async fn market_snapshot_endpoint() {
        let app = app(market_fake());
        let (status, body) = send(app, get("/api/market/BTC-USD?timeframe=1h&limit=100")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "BTC/USD");
        assert_eq!(body["currentPrice"], 50_000.0);
        assert_eq!(body["change24h"], 2.5);
        assert_eq!(body["volume24h"], 1_000_000.0);
        assert_eq!(body["chartData"].as_array().unwrap().len(), 25);
        assert_eq!(body["chartData"][0]["timestamp"], "2024-01-01T00:00:00Z");
        assert_eq!(body["signal"], "NEUTRAL");
        assert!(body["zscore"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn market_endpoint_uses_defaults() {
        let (status, body) = send(app(market_fake()), get("/api/market/ETH-USD")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "ETH/USD");
    }

    #[tokio::test]
    async fn out_of_range_limit_is_bad_request() {
        let (status, body) = send(app(market_fake()), get("/api/market/BTC-USD?limit=0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");
    }

    #[tokio::test]
    async fn undecodable_limit_is_json_bad_request() {
        for uri in [
            "/api/market/BTC-USD?limit=abc",
            "/api/market/BTC-USD?limit=-1",
            "/api/orderbook/BTC-USD?limit=abc",
        ] {
            let fake = market_fake();
            let (status, body) = send(app(fake.clone()), get(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"], "invalid_request", "{uri}");
            assert_eq!(body["detail"], "malformed query string", "{uri}");
            assert_eq!(fake.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn undecodable_auth_bodies_are_json_bad_request() {
        let app = app(market_fake());

        let (status, body) = send(app.clone(), post_json("/signup", json!({"email": "a@b"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");
        assert_eq!(body["detail"], "malformed JSON body");
        assert!(!body.to_string().contains("username"));

        let (status, body) = send(app.clone(), post_json("/login", json!({"email": 42}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");

        let no_content_type = Request::post("/login")
            .body(Body::from(r#"{"email":"a@b","password":"pw"}"#))
            .unwrap();
        let (status, body) = send(app, no_content_type).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");
    }

    #[tokio::test]
    async fn upstream_failures_map_to_gateway_statuses() {
        let fake = market_fake();
        *fake.ticker.lock() = Err(GatewayError::Exchange("EQuery:Unknown asset pair".into()));
        let (status, body) = send(app(fake), get("/api/market/BTC-USD")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "upstream_unavailable");
        assert!(!body["detail"].as_str().unwrap().contains("EQuery"));

        let fake = market_fake();
        *fake.candles.lock() = Err(GatewayError::Timeout(Duration::from_secs(10)));
        let (status, body) = send(app(fake), get("/api/market/BTC-USD")).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"], "upstream_timeout");

        let fake = market_fake();
        *fake.candles.lock() = Err(GatewayError::Unsupported("timeframe 7m".into()));
        let (status, _) = send(app(fake), get("/api/market/BTC-USD?timeframe=7m")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_candles_are_bad_gateway() {
        let mut rows = hourly_rows(25, 100.0, 1.0);
        rows[3].truncate(2);
        let fake = Arc::new(FakeGateway::with_candles(rows, sample_ticker()));
        let (status, body) = send(app(fake), get("/api/market/BTC-USD")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "upstream_data");
    }

    #[tokio::test]
    async fn orderbook_endpoint() {
        let fake = Arc::new(FakeGateway::default());
        *fake.book.lock() = Ok(sample_book(30));
        let (status, body) = send(app(fake), get("/api/orderbook/BTC-USD?limit=5")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "BTC/USD");
        assert_eq!(body["bids"].as_array().unwrap().len(), 5);
        assert_eq!(body["asks"][0]["price"], 101.0);
        assert_eq!(body["asks"][0]["size"], 0.5);
        assert_eq!(body["timestamp"], 1_704_067_200_000i64);
    }

    #[tokio::test]
    async fn orderbook_default_depth_is_twenty() {
        let fake = Arc::new(FakeGateway::default());
        *fake.book.lock() = Ok(sample_book(30));
        let (_, body) = send(app(fake), get("/api/orderbook/BTC-USD")).await;
        assert_eq!(body["bids"].as_array().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn signup_login_verify_round_trip() {
        let app = app(market_fake());

        let signup = json!({"username": "alice", "email": "alice@example.com", "password": "pw1"});
        let (status, body) = send(app.clone(), post_json("/signup", signup.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "alice");

        let (status, body) = send(app.clone(), post_json("/signup", signup)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "user_exists");

        let (status, body) = send(
            app.clone(),
            post_json("/login", json!({"email": "nobody@example.com", "password": "pw1"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "user_not_found");

        let (status, body) = send(
            app.clone(),
            post_json("/login", json!({"email": "alice@example.com", "password": "wrong"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_password");

        let (status, body) = send(
            app.clone(),
            post_json("/login", json!({"email": "alice@example.com", "password": "pw1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();
        assert_eq!(body["user"]["email"], "alice@example.com");

        let req = Request::get("/verify-token")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["user"]["email"], "alice@example.com");
        assert_eq!(body["user"]["username"], "alice");
    }

    #[tokio::test]
    async fn verify_token_rejects_missing_or_forged_tokens() {
        let app = app(market_fake());

        let (status, body) = send(app.clone(), get("/verify-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_token");

        let req = Request::get("/verify-token")
            .header(header::AUTHORIZATION, "Bearer 7b7d.00")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_token");
    }
}
