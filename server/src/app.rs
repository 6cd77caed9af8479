use std::path::Path;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::{HeaderValue, header},
    middleware::{self, Next},
    response::Response,
    routing::{any, get},
};
use tower_http::compression::CompressionLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::config::MAX_PROXY_BODY_BYTES;
use crate::routes;
use crate::state::AppState;

/// API routes, the backend pass-through, and the client bundle with
/// `index.html` as the fallback for client-side routes such as `/contacto`.
pub(crate) fn build_app(state: AppState, static_dir: &str) -> Router {
    let index = Path::new(static_dir).join("index.html");
    let static_assets = Router::new()
        .fallback_service(
            ServeDir::new(static_dir)
                .precompressed_br()
                .precompressed_gzip()
                .fallback(ServeFile::new(index)),
        )
        .layer(middleware::from_fn(set_static_cache_control));

    let app = Router::new()
        .route("/api/health", get(routes::api::health))
        .route("/api/metrics", get(routes::api::metrics))
        .route("/api/client-config", get(routes::api::client_config))
        .route("/api/{*rest}", any(routes::proxy::forward))
        .layer(DefaultBodyLimit::max(MAX_PROXY_BODY_BYTES));

    app.layer(CompressionLayer::new())
        .fallback_service(static_assets)
        .with_state(state)
}

async fn set_static_cache_control(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;

    if response.status().is_success()
        && let Some(cache_control) = cache_control_for_path(&path)
    {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(cache_control),
        );
    }

    response
}

/// Trunk names the bundle `siam-client-<hash>.js` and `siam-client-<hash>_bg.wasm`.
const BUNDLE_PREFIX: &str = "siam-client-";
const IMMUTABLE: &str = "public, max-age=31536000, immutable";
const REVALIDATE: &str = "no-cache";

fn cache_control_for_path(path: &str) -> Option<&'static str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    if is_hashed_bundle_asset(name) {
        return Some(IMMUTABLE);
    }

    // The shell page pins the current bundle hashes and answers every client route.
    if name.is_empty() || name == "index.html" || !name.contains('.') {
        return Some(REVALIDATE);
    }

    None
}

fn is_hashed_bundle_asset(name: &str) -> bool {
    let Some(rest) = name.strip_prefix(BUNDLE_PREFIX) else {
        return false;
    };
    rest.strip_suffix("_bg.wasm")
        .or_else(|| rest.strip_suffix(".js"))
        .is_some_and(|hash| hash.len() >= 8 && hash.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
pub(crate) async fn spawn_test_server(
    state: AppState,
    static_dir: &str,
) -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    let app = build_app(state, static_dir);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test app");
    });
    (addr, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use siam_shared::ClientConfig;

    #[test]
    fn immutable_cache_for_hashed_bundle_assets() {
        assert_eq!(
            cache_control_for_path("/siam-client-71578f6b278221f3_bg.wasm"),
            Some(IMMUTABLE)
        );
        assert_eq!(
            cache_control_for_path("/siam-client-71578f6b278221f3.js"),
            Some(IMMUTABLE)
        );
    }

    #[test]
    fn unhashed_or_foreign_files_get_no_override() {
        assert_eq!(cache_control_for_path("/siam-client.js"), None);
        assert_eq!(cache_control_for_path("/siam-client-dev_bg.wasm"), None);
        assert_eq!(cache_control_for_path("/vendor-a93762ff3bf6d63a.js"), None);
        assert_eq!(cache_control_for_path("/favicon.ico"), None);
    }

    #[test]
    fn shell_page_and_client_routes_revalidate() {
        assert_eq!(cache_control_for_path("/"), Some(REVALIDATE));
        assert_eq!(cache_control_for_path("/index.html"), Some(REVALIDATE));
        assert_eq!(cache_control_for_path("/contacto"), Some(REVALIDATE));
        assert_eq!(cache_control_for_path("/contacto/"), Some(REVALIDATE));
    }

    #[tokio::test]
    async fn client_routes_fall_back_to_index() {
        let dir = std::env::temp_dir().join(format!("siam-static-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create static dir");
        std::fs::write(dir.join("index.html"), "<html>siam</html>").expect("write index");
        let static_dir = dir.to_str().expect("utf-8 temp path").to_owned();

        let state = AppState::new("http://127.0.0.1:9", ClientConfig::default()).expect("state");
        let (addr, server_handle) = spawn_test_server(state, &static_dir).await;

        let response = reqwest::get(format!("http://{addr}/contacto?eje=3"))
            .await
            .expect("spa request");
        assert_eq!(
            response
                .headers()
                .get(reqwest::header::CACHE_CONTROL)
                .and_then(|v| v.to_str().ok()),
            Some(REVALIDATE)
        );
        let body = response.text().await.expect("spa body");
        assert_eq!(body, "<html>siam</html>");

        server_handle.abort();
        let _ = server_handle.await;
        let _ = std::fs::remove_dir_all(&dir);
    }
}
