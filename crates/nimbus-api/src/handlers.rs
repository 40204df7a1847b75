//! HTTP handlers.
//!
//! Each handler turns coalescer or store outcomes into the service's
//! JSON bodies; the error vocabulary the clients see lives here and
//! nowhere else.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ApiState;

/// Query string of `GET /weather`.
#[derive(Debug, Deserialize)]
pub struct WeatherParams {
    q: Option<String>,
}

/// Success body of `GET /weather`.
#[derive(Debug, Serialize)]
struct WeatherResponse {
    location: String,
    temperature: f64,
}

/// Error body shared by all failure responses of `GET /weather`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    code: u16,
    message: &'static str,
}

fn error_response(status: StatusCode, error: &'static str, message: &'static str) -> impl IntoResponse {
    (
        status,
        Json(ErrorBody {
            error,
            code: status.as_u16(),
            message,
        }),
    )
}

/// GET / — liveness.
pub async fn liveness() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Weather API Server is running",
        "status": "ok"
    }))
}

/// GET /weather?q=<location>
pub async fn get_weather(
    State(state): State<ApiState>,
    Query(params): Query<WeatherParams>,
) -> impl IntoResponse {
    let Some(location) = params.q.filter(|q| !q.is_empty()) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "MISSING_LOCATION",
            "Location parameter 'q' is required",
        )
        .into_response();
    };

    info!(%location, "weather requested");
    match state.coalescer.get(&location).await {
        Ok(aggregate) => {
            info!(%location, temperature = aggregate.average_temp, "weather request served");
            Json(WeatherResponse {
                location: aggregate.location,
                temperature: aggregate.average_temp,
            })
            .into_response()
        }
        Err(e) => {
            warn!(%location, error = %e, "weather request failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "WEATHER_SERVICE_ERROR",
                "Failed to fetch weather data",
            )
            .into_response()
        }
    }
}

/// GET /queries — persisted aggregations, newest first. Debug mode only.
pub async fn list_queries(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.recent_queries().await {
        Ok(queries) => Json(queries).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to list persisted queries");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "Data not found",
                    "message": e.to_string()
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use nimbus_coalescer::{Aggregate, CoalesceError, CoalesceResult, Coalescer, Fetch};
    use nimbus_store::QueryStore;

    use crate::build_router;

    /// Stub fan-out: instant fixed readings, or instant failure.
    struct StubFetch {
        fail: bool,
    }

    #[async_trait]
    impl Fetch for StubFetch {
        async fn fetch(&self, location: &str, _request_count: usize) -> CoalesceResult<Aggregate> {
            if self.fail {
                return Err(CoalesceError::Upstream("provider down".to_string()));
            }
            Ok(Aggregate {
                location: location.to_string(),
                service_a_temp: 20.0,
                service_b_temp: 22.0,
                average_temp: 21.0,
            })
        }
    }

    async fn test_state(fail: bool) -> ApiState {
        ApiState {
            // max_requests of 1 so a single request fires immediately.
            coalescer: Coalescer::new(
                Arc::new(StubFetch { fail }),
                1,
                Duration::from_secs(5),
            ),
            store: QueryStore::open_in_memory().await.unwrap(),
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn liveness_reports_ok() {
        let router = build_router(test_state(false).await, false);
        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn weather_returns_the_mean() {
        let router = build_router(test_state(false).await, false);
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/weather?q=Istanbul")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["location"], "Istanbul");
        assert_eq!(body["temperature"], 21.0);
    }

    #[tokio::test]
    async fn missing_location_is_a_400() {
        let router = build_router(test_state(false).await, false);
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/weather")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "MISSING_LOCATION");
        assert_eq!(body["code"], 400);
        assert_eq!(body["message"], "Location parameter 'q' is required");
    }

    #[tokio::test]
    async fn empty_location_is_a_400() {
        let router = build_router(test_state(false).await, false);
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/weather?q=")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "MISSING_LOCATION");
    }

    #[tokio::test]
    async fn upstream_failure_is_a_500() {
        let router = build_router(test_state(true).await, false);
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/weather?q=Istanbul")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "WEATHER_SERVICE_ERROR");
        assert_eq!(body["code"], 500);
        assert_eq!(body["message"], "Failed to fetch weather data");
    }

    #[tokio::test]
    async fn queries_store_failure_is_a_500() {
        let state = test_state(false).await;
        // A closed pool makes every read fail.
        state.store.close().await;

        let router = build_router(state, true);
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/queries")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Data not found");
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn queries_route_only_exists_in_debug_mode() {
        let state = test_state(false).await;

        let without_debug = build_router(state.clone(), false);
        let response = without_debug
            .oneshot(
                Request::builder()
                    .uri("/queries")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let with_debug = build_router(state, true);
        let response = with_debug
            .oneshot(
                Request::builder()
                    .uri("/queries")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }
}
