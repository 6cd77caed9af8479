use std::fmt::Write as _;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use siam_shared::ClientConfig;

use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "upstream": &*state.upstream,
        "ide_eje": state.client_config.ide_eje,
        "observability": {
            "proxied_requests_total": observability.proxied_requests_total,
            "upstream_errors_total": observability.upstream_errors_total,
            "upstream_client_errors_total": observability.upstream_client_errors_total,
        }
    }))
}

/// Runtime settings for the wasm bundle, which has no environment of its own.
pub async fn client_config(State(state): State<AppState>) -> Response {
    let mut response = Json(ClientConfig::clone(&state.client_config)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = render_prometheus_metrics(state.observability.snapshot());
    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn render_prometheus_metrics(observability: ObservabilitySnapshot) -> String {
    let mut body = String::new();
    let counters = [
        (
            "siam_proxied_requests_total",
            "Total requests forwarded to the backend.",
            observability.proxied_requests_total,
        ),
        (
            "siam_upstream_errors_total",
            "Total transport failures while reaching the backend.",
            observability.upstream_errors_total,
        ),
        (
            "siam_upstream_client_errors_total",
            "Total 4xx responses relayed from the backend.",
            observability.upstream_client_errors_total,
        ),
    ];
    for (name, help, value) in counters {
        let _ = writeln!(body, "# HELP {name} {help}");
        let _ = writeln!(body, "# TYPE {name} counter");
        let _ = writeln!(body, "{name} {value}");
    }
    body
}

#[cfg(test)]
mod tests {
    use super::{ObservabilitySnapshot, render_prometheus_metrics};
    use crate::app::spawn_test_server;
    use crate::state::AppState;
    use siam_shared::ClientConfig;

    #[test]
    fn metrics_output_contains_help_type_and_values() {
        let metrics = render_prometheus_metrics(ObservabilitySnapshot {
            proxied_requests_total: 12,
            upstream_errors_total: 3,
            upstream_client_errors_total: 4,
        });
        assert!(metrics.contains("# HELP siam_proxied_requests_total"));
        assert!(metrics.contains("# TYPE siam_upstream_errors_total counter"));
        assert!(metrics.contains("siam_proxied_requests_total 12"));
        assert!(metrics.contains("siam_upstream_errors_total 3"));
        assert!(metrics.contains("siam_upstream_client_errors_total 4"));
    }

    #[tokio::test]
    async fn health_and_client_config_expose_expected_contract() {
        let config = ClientConfig {
            ide_eje: 5,
            whatsapp_number: Some("51987654321".into()),
        };
        let state = AppState::new("http://127.0.0.1:9/", config.clone()).expect("state");
        let (addr, server_handle) = spawn_test_server(state, "client/dist").await;
        let base_url = format!("http://{addr}");
        let client = reqwest::Client::new();

        let health = client
            .get(format!("{base_url}/api/health"))
            .send()
            .await
            .expect("health request")
            .error_for_status()
            .expect("health status")
            .json::<serde_json::Value>()
            .await
            .expect("parse health");
        assert_eq!(health.get("status").and_then(|v| v.as_str()), Some("ok"));
        assert_eq!(
            health.get("upstream").and_then(|v| v.as_str()),
            Some("http://127.0.0.1:9")
        );
        assert_eq!(
            health
                .get("observability")
                .and_then(|v| v.get("proxied_requests_total"))
                .and_then(|v| v.as_u64()),
            Some(0)
        );

        let served = client
            .get(format!("{base_url}/api/client-config"))
            .send()
            .await
            .expect("client-config request")
            .error_for_status()
            .expect("client-config status")
            .json::<ClientConfig>()
            .await
            .expect("parse client-config");
        assert_eq!(served, config);

        let metrics = client
            .get(format!("{base_url}/api/metrics"))
            .send()
            .await
            .expect("metrics request")
            .text()
            .await
            .expect("metrics text");
        assert!(metrics.contains("siam_proxied_requests_total 0"));

        server_handle.abort();
        let _ = server_handle.await;
    }
}
