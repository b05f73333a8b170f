//! # API REST
//!
//! REST API implementation for HemoLink.
//!
//! Handles:
//! - HTTP endpoints with axum, nested under `/api`
//! - Bearer-token sessions on top of the core session store
//! - Server-sent events for breaches, low stock and transfers
//! - OpenAPI/Swagger documentation
//!
//! Uses `api-shared` for wire types and `hemolink-core` for all policy.

#![warn(rust_2018_idioms)]

mod convert;
mod error;
mod handlers;

use api_shared::wire;
use axum::{
    routing::{get, patch, post},
    Router,
};
use chrono::Utc;
use hemolink_core::{load_seed_file, ColdChainEngine, ConfigOverrides, CoreConfig, EngineSeed};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state for the REST API server.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ColdChainEngine>,
}

impl AppState {
    pub fn new(engine: Arc<ColdChainEngine>) -> Self {
        Self { engine }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::login,
        handlers::logout,
        handlers::me,
        handlers::unlock_privacy,
        handlers::lock_privacy,
        handlers::list_inventory,
        handlers::transfer_unit,
        handlers::update_temperature,
        handlers::list_hospitals,
        handlers::request_transfer,
        handlers::list_transfers,
        handlers::accept_transfer,
        handlers::reject_transfer,
        handlers::dashboard_stats,
        handlers::register_donor,
        handlers::record_donation,
        handlers::appointments,
        handlers::events,
    ),
    components(schemas(
        wire::HealthRes,
        wire::LoginReq,
        wire::LoginRes,
        wire::UserRes,
        wire::PrivacyReq,
        wire::PrivacyRes,
        wire::BloodUnitRes,
        wire::TransferUnitReq,
        wire::TemperatureReq,
        wire::TemperatureRes,
        wire::HospitalRes,
        wire::TransferReq,
        wire::TransferRes,
        wire::DashboardStatsRes,
        wire::DonorRegisterReq,
        wire::AppointmentRes,
        wire::DonorCardRes,
        wire::DonationReq,
        wire::DonationRes,
    ))
)]
struct ApiDoc;

/// Builds the full application: API routes, Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))
        .route(
            "/auth/privacy",
            post(handlers::unlock_privacy).delete(handlers::lock_privacy),
        )
        .route("/inventory", get(handlers::list_inventory))
        .route("/inventory/:id/transfer", post(handlers::transfer_unit))
        .route(
            "/inventory/:id/temperature",
            patch(handlers::update_temperature),
        )
        .route("/hospitals", get(handlers::list_hospitals))
        .route(
            "/transfers",
            get(handlers::list_transfers).post(handlers::request_transfer),
        )
        .route("/transfers/:id/accept", post(handlers::accept_transfer))
        .route("/transfers/:id/reject", post(handlers::reject_transfer))
        .route("/dashboard/stats", get(handlers::dashboard_stats))
        .route("/donors/register", post(handlers::register_donor))
        .route("/donors/appointments", get(handlers::appointments))
        .route("/donors/:id/donations", post(handlers::record_donation))
        .route("/events", get(handlers::events));

    Router::new()
        .nest("/api", api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Resolves configuration from the environment and builds the engine, seeded from a YAML
/// file when `seed_file` is given and from the demo data otherwise.
///
/// # Errors
///
/// Returns an error if a `HEMOLINK_*` variable is invalid or the seed file cannot be read,
/// parsed or loaded.
pub fn build_engine(seed_file: Option<&Path>) -> anyhow::Result<Arc<ColdChainEngine>> {
    let cfg = Arc::new(CoreConfig::resolve(ConfigOverrides::from_env())?);
    let today = Utc::now().date_naive();

    let seed = match seed_file {
        Some(path) => {
            tracing::info!("Loading seed data from {}", path.display());
            load_seed_file(path)?.into_seed(today, cfg.shelf_life_days())?
        }
        None => {
            tracing::info!("No seed file given, using demo data");
            EngineSeed::demo(today, cfg.shelf_life_days())?
        }
    };

    Ok(Arc::new(ColdChainEngine::new(cfg, seed)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let engine = ColdChainEngine::demo(Arc::new(CoreConfig::default()), Utc::now().date_naive())
            .expect("demo engine");
        router(AppState::new(Arc::new(engine)))
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn login(app: &Router, email: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": "demo123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_needs_no_login() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));
    }

    #[tokio::test]
    async fn test_inventory_requires_token() {
        let app = app();
        let (status, _) = send(&app, Method::GET, "/api/inventory", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let app = app();
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "admin@hemolink.com", "password": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_inventory_listed_earliest_expiry_first() {
        let app = app();
        let token = login(&app, "admin@hemolink.com").await;
        let (status, body) = send(&app, Method::GET, "/api/inventory", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let units = body.as_array().unwrap();
        assert_eq!(units.len(), 8);
        let days: Vec<i64> = units
            .iter()
            .map(|u| u["daysToExpiry"].as_i64().unwrap())
            .collect();
        let mut sorted = days.clone();
        sorted.sort();
        assert_eq!(days, sorted);
    }

    #[tokio::test]
    async fn test_breach_locks_unit_against_transfer() {
        let app = app();
        let token = login(&app, "admin@hemolink.com").await;

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/api/inventory/BB001/temperature",
            Some(&token),
            Some(json!({ "temperature": 9.5 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["breached"], json!(true));
        assert_eq!(body["unit"]["status"], json!("breach"));

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/inventory/BB001/transfer",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_out_of_range_reading_is_unprocessable() {
        let app = app();
        let token = login(&app, "admin@hemolink.com").await;
        let (status, _) = send(
            &app,
            Method::PATCH,
            "/api/inventory/BB002/temperature",
            Some(&token),
            Some(json!({ "temperature": 400.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_hospital_stock_hidden_until_privacy_unlock() {
        let app = app();
        let token = login(&app, "admin@hemolink.com").await;

        let (_, body) = send(&app, Method::GET, "/api/hospitals", Some(&token), None).await;
        assert!(body[0].get("stock").is_none());
        assert!(body[0]["totalUnits"].is_u64());

        let (_, unlocked) = send(
            &app,
            Method::POST,
            "/api/auth/privacy",
            Some(&token),
            Some(json!({ "key": "wrong" })),
        )
        .await;
        assert_eq!(unlocked["unlocked"], json!(false));

        let (_, unlocked) = send(
            &app,
            Method::POST,
            "/api/auth/privacy",
            Some(&token),
            Some(json!({ "key": hemolink_core::constants::DEFAULT_PRIVACY_KEY })),
        )
        .await;
        assert_eq!(unlocked["unlocked"], json!(true));

        let (_, body) = send(&app, Method::GET, "/api/hospitals", Some(&token), None).await;
        assert!(body[0]["stock"].is_object());
    }

    #[tokio::test]
    async fn test_transfer_request_and_reject() {
        let app = app();
        let token = login(&app, "admin@hemolink.com").await;

        let (status, created) = send(
            &app,
            Method::POST,
            "/api/transfers",
            Some(&token),
            Some(json!({ "hospitalId": "H001", "bloodType": "O+", "units": 1, "urgency": "urgent" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], json!("submitted"));
        let id = created["id"].as_str().unwrap().to_string();

        let (status, rejected) = send(
            &app,
            Method::POST,
            &format!("/api/transfers/{}/reject", id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rejected["status"], json!("rejected"));

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/transfers/{}/accept", id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_receptionist_cannot_request_transfer() {
        let app = app();
        let token = login(&app, "receptionist@hemolink.com").await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/transfers",
            Some(&token),
            Some(json!({ "hospitalId": "H001", "bloodType": "O+", "units": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_donor_registration_is_public() {
        let app = app();
        let date = (Utc::now().date_naive() + chrono::Duration::days(7))
            .format("%Y-%m-%d")
            .to_string();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/donors/register",
            None,
            Some(json!({
                "name": "Jane Roe",
                "phone": "555-0199",
                "email": "jane.roe@example.com",
                "bloodType": "AB-",
                "preferredDate": date,
                "preferredTime": "10:30"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["appointment"]["status"], json!("scheduled"));
        assert_eq!(body["appointment"]["time"], json!("10:30"));
    }

    #[tokio::test]
    async fn test_dashboard_stats() {
        let app = app();
        let token = login(&app, "admin@hemolink.com").await;
        let (status, body) =
            send(&app, Method::GET, "/api/dashboard/stats", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalUnits"], json!(8));
        assert_eq!(body["criticalAlerts"], json!(1));
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let app = app();
        let token = login(&app, "admin@hemolink.com").await;
        let (status, _) = send(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_future_donation_is_rejected_and_state_stays_usable() {
        let app = app();
        let token = login(&app, "labtech@hemolink.com").await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/donors/D001/donations",
            Some(&token),
            Some(json!({ "date": "9999-12-31" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let admin = login(&app, "admin@hemolink.com").await;
        let (status, body) = send(&app, Method::GET, "/api/inventory", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 8);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/donors/D001/donations",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["donations"], json!(1));
    }
}
