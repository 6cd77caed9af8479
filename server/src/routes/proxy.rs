//! Pass-through for backend calls made with relative `/api/...` URLs.

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use siam_shared::api::ErrorBody;

use crate::state::AppState;

/// Request headers copied to the backend. Everything else (host, cookies,
/// hop-by-hop) stays behind.
const FORWARDED_REQUEST_HEADERS: [header::HeaderName; 3] =
    [header::CONTENT_TYPE, header::ACCEPT, header::ACCEPT_LANGUAGE];

pub async fn forward(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.observability.record_proxied_request();
    let url = upstream_url(&state.upstream, &uri);

    let mut request = state.http_client.request(method.clone(), &url);
    for name in FORWARDED_REQUEST_HEADERS {
        if let Some(value) = headers.get(&name) {
            request = request.header(name, value.clone());
        }
    }
    if !body.is_empty() {
        request = request.body(body);
    }

    let upstream = match request.send().await {
        Ok(resp) => resp,
        Err(e) => {
            state.observability.record_upstream_error();
            tracing::warn!(error = %e, %method, %url, timeout = e.is_timeout(), "backend request failed");
            return bad_gateway("No se pudo establecer conexión con el servidor.");
        }
    };

    let status = upstream.status();
    if status.is_client_error() {
        state.observability.record_upstream_client_error();
        tracing::debug!(%method, %url, status = status.as_u16(), "backend returned client error");
    } else if status.is_server_error() {
        tracing::warn!(%method, %url, status = status.as_u16(), "backend returned server error");
    }

    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            state.observability.record_upstream_error();
            tracing::warn!(error = %e, %method, %url, "failed to read backend response body");
            return bad_gateway("Respuesta incompleta del servidor.");
        }
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    if let Some(content_type) = content_type {
        headers.insert(header::CONTENT_TYPE, content_type);
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn upstream_url(base: &str, uri: &Uri) -> String {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    format!("{base}{path_and_query}")
}

fn bad_gateway(message: &str) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(ErrorBody {
            success: Some(false),
            error: Some(message.to_owned()),
            message: None,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::Router;
    use axum::extract::{Path, Query};
    use axum::http::{StatusCode, Uri};
    use axum::routing::{get, post, put};
    use serde_json::{Value, json};
    use siam_shared::ClientConfig;

    use super::upstream_url;
    use crate::app::spawn_test_server;
    use crate::state::AppState;

    async fn spawn_fake_backend() -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let backend = Router::new()
            .route(
                "/api/auth/identify",
                post(|axum::Json(body): axum::Json<Value>| async move {
                    if body["username"] == "ana" {
                        axum::Json(json!({"success": true, "data": {"nlineno": 7, "nom_trb": "ANA"}}))
                    } else {
                        axum::Json(json!({"success": false}))
                    }
                }),
            )
            .route(
                "/api/mantenimiento/siam/notarias/search",
                get(|Query(q): Query<std::collections::HashMap<String, String>>| async move {
                    axum::Json(json!([{"ide_not": 1, "nom_com": q.get("q").cloned().unwrap_or_default()}]))
                }),
            )
            .route(
                "/api/mantenimiento/siam/suspend-request/{id}",
                put(|Path(id): Path<i64>, axum::Json(body): axum::Json<Value>| async move {
                    axum::Json(json!({"nro_sol": id, "flg_sus": body["flg_sus"]}))
                }),
            )
            .route(
                "/api/mantenimiento/siam/solicitud-alta-notaria",
                post(|| async {
                    (
                        StatusCode::CONFLICT,
                        axum::Json(json!({"solicitud": {"nro_sol": 17, "flg_apr": 0}})),
                    )
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("backend address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, backend).await.expect("serve fake backend");
        });
        (addr, handle)
    }

    #[test]
    fn upstream_url_keeps_path_and_query() {
        let uri: Uri = "/api/mantenimiento/siam/notarias/search?q=lima%20norte"
            .parse()
            .expect("uri");
        assert_eq!(
            upstream_url("http://backend:3001", &uri),
            "http://backend:3001/api/mantenimiento/siam/notarias/search?q=lima%20norte"
        );
    }

    #[tokio::test]
    async fn forwards_method_body_query_and_status() {
        let (backend_addr, backend_handle) = spawn_fake_backend().await;
        let state = AppState::new(format!("http://{backend_addr}"), ClientConfig::default())
            .expect("state");
        let observability = state.observability.clone();
        let (addr, server_handle) = spawn_test_server(state, "client/dist").await;
        let base_url = format!("http://{addr}");
        let client = reqwest::Client::new();

        let identified = client
            .post(format!("{base_url}/api/auth/identify"))
            .json(&json!({"username": "ana"}))
            .send()
            .await
            .expect("identify request")
            .json::<Value>()
            .await
            .expect("identify body");
        assert_eq!(identified["data"]["nlineno"], 7);

        let found = client
            .get(format!("{base_url}/api/mantenimiento/siam/notarias/search?q=lima"))
            .send()
            .await
            .expect("search request")
            .json::<Value>()
            .await
            .expect("search body");
        assert_eq!(found[0]["nom_com"], "lima");

        let suspended = client
            .put(format!("{base_url}/api/mantenimiento/siam/suspend-request/9"))
            .json(&json!({"flg_sus": 1}))
            .send()
            .await
            .expect("suspend request")
            .json::<Value>()
            .await
            .expect("suspend body");
        assert_eq!(suspended, json!({"nro_sol": 9, "flg_sus": 1}));

        let conflict = client
            .post(format!("{base_url}/api/mantenimiento/siam/solicitud-alta-notaria"))
            .json(&json!({}))
            .send()
            .await
            .expect("alta request");
        assert_eq!(conflict.status(), reqwest::StatusCode::CONFLICT);
        let body = conflict.json::<Value>().await.expect("conflict body");
        assert_eq!(body["solicitud"]["nro_sol"], 17);

        let snapshot = observability.snapshot();
        assert_eq!(snapshot.proxied_requests_total, 4);
        assert_eq!(snapshot.upstream_client_errors_total, 1);
        assert_eq!(snapshot.upstream_errors_total, 0);

        server_handle.abort();
        let _ = server_handle.await;
        backend_handle.abort();
        let _ = backend_handle.await;
    }

    #[tokio::test]
    async fn unreachable_backend_maps_to_bad_gateway() {
        let closed = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind closed listener");
        let dead_addr = closed.local_addr().expect("closed listener address");
        drop(closed);

        let state = AppState::new(format!("http://{dead_addr}"), ClientConfig::default())
            .expect("state");
        let (addr, server_handle) = spawn_test_server(state, "client/dist").await;

        let resp = reqwest::Client::new()
            .get(format!("http://{addr}/api/company/info"))
            .send()
            .await
            .expect("company request");
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_GATEWAY);
        let body = resp.json::<Value>().await.expect("error body");
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));

        server_handle.abort();
        let _ = server_handle.await;
    }
}
