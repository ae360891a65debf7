//! HTTP delivery layer: router, shared state, and server lifecycle.
//!
//! The router is built over an `Arc`-shared state holding the two
//! application services, generic over the store and classifier ports so
//! handlers can be driven by test doubles. CORS is restricted to the
//! single configured frontend origin. Shutdown is graceful on SIGINT and
//! SIGTERM.

pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::adapters::model::ArtifactModel;
use crate::adapters::mongo::MongoStore;
use crate::application::{AuthService, PredictionService};
use crate::ports::{Classifier, Store};
use crate::Config;

/// Services shared across all request handlers.
pub struct AppState<S, C> {
    pub auth: AuthService<S>,
    pub predictions: PredictionService<S, C>,
}

pub type SharedState<S, C> = Arc<AppState<S, C>>;

impl<S: Store, C: Classifier> AppState<S, C> {
    pub fn new(store: S, classifier: C, jwt_secret: String) -> Self {
        let store = Arc::new(store);
        let classifier = Arc::new(classifier);
        Self {
            auth: AuthService::new(store.clone(), jwt_secret),
            predictions: PredictionService::new(store, classifier),
        }
    }
}

pub fn router<S, C>(state: SharedState<S, C>, cors_origin: &str) -> Router
where
    S: Store + 'static,
    C: Classifier + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(
            cors_origin
                .parse::<HeaderValue>()
                .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:5173")),
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, ACCEPT])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/signup", post(handlers::signup::<S, C>))
        .route("/login", post(handlers::login::<S, C>))
        .route("/predict", post(handlers::predict::<S, C>))
        .route("/user/predictions", get(handlers::user_predictions::<S, C>))
        .route(
            "/user/predictions/{id}",
            delete(handlers::delete_prediction::<S, C>),
        )
        .route("/predictions", get(handlers::filtered_predictions::<S, C>))
        .route(
            "/predictions/bulk-delete",
            post(handlers::bulk_delete_predictions::<S, C>),
        )
        .route(
            "/predictions/{id}",
            get(handlers::get_prediction::<S, C>).put(handlers::update_prediction::<S, C>),
        )
        .route("/admin/predictions", get(handlers::admin_predictions::<S, C>))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until a shutdown signal arrives.
///
/// # Errors
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(
    state: SharedState<MongoStore, ArtifactModel>,
    config: &Config,
) -> anyhow::Result<()> {
    let app = router(state, &config.cors_origin);

    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::ports::{ClassifierError, Inference};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct FixedClassifier;

    impl Classifier for FixedClassifier {
        fn infer(&self, _features: &[f64]) -> Result<Inference, ClassifierError> {
            Ok(Inference {
                label: 1,
                probability: 0.87,
            })
        }
    }

    fn app() -> Router {
        let state = Arc::new(AppState::new(
            MemoryStore::new(),
            FixedClassifier,
            "test-secret".to_string(),
        ));
        router(state, "http://localhost:5173")
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Should build request");

        let response = app
            .clone()
            .oneshot(request)
            .await
            .expect("Should route request");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn predict_payload() -> Value {
        json!({
            "age": 57, "gender": 1, "chestPain": "asymptomatic",
            "restingBP": 152, "cholesterol": 274, "fastingBS": 0,
            "restingECG": "st-t", "maxHR": 122, "smoking": 1, "obesity": 0
        })
    }

    #[tokio::test]
    async fn test_signup_login_predict_history_flow() {
        let app = app();

        let (status, body) = send(
            &app,
            "POST",
            "/signup",
            None,
            Some(json!({ "email": "a@x.com", "password": "p", "name": "A" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["email"], "a@x.com");

        let (status, body) = send(
            &app,
            "POST",
            "/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "p" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().expect("Should carry token").to_string();

        let (status, body) = send(
            &app,
            "POST",
            "/predict",
            Some(&token),
            Some(predict_payload()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], 1);
        assert_eq!(body["risk_level"], "High");
        assert_eq!(body["user_name"], "A");

        let (status, body) = send(&app, "GET", "/user/predictions", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let predictions = body["predictions"].as_array().expect("Should list");
        assert_eq!(predictions.len(), 1);

        // The stored snapshot reflects exactly what was submitted.
        let snapshot = &predictions[0]["input_data"];
        assert_eq!(snapshot["age"], 57.0);
        assert_eq!(snapshot["gender"], "male");
        assert_eq!(snapshot["chestPain"], "asymptomatic");
        assert_eq!(snapshot["fastingBS"], "no");
        assert_eq!(snapshot["smoking"], "yes");
    }

    #[tokio::test]
    async fn test_malformed_json_gets_error_envelope() {
        let app = app();

        let request = Request::builder()
            .method("POST")
            .uri("/signup")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .expect("Should build request");

        let response = app.oneshot(request).await.expect("Should route request");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let body: Value = serde_json::from_slice(&bytes).expect("Body should be JSON");
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_bad_body_without_token_is_unauthorized() {
        let app = app();

        let request = Request::builder()
            .method("POST")
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .expect("Should build request");

        let response = app.oneshot(request).await.expect("Should route request");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let body: Value = serde_json::from_slice(&bytes).expect("Body should be JSON");
        assert_eq!(body["error"], "Token is missing");
    }

    #[tokio::test]
    async fn test_non_numeric_page_gets_error_envelope() {
        let app = app();

        let (_, body) = send(
            &app,
            "POST",
            "/signup",
            None,
            Some(json!({ "email": "a@x.com", "password": "p", "name": "A" })),
        )
        .await;
        let token = body["token"].as_str().expect("Should carry token").to_string();

        let (status, body) =
            send(&app, "GET", "/predictions?page=abc", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_missing_signup_field_reported_by_name() {
        let app = app();

        let (status, body) = send(
            &app,
            "POST",
            "/signup",
            None,
            Some(json!({ "email": "a@x.com", "name": "A" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required field: password");
    }
}
