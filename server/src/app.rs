use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, header},
    middleware::{self, Next},
    response::Response,
};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;

use crate::routes;
use crate::state::AppState;

const NO_STORE: &str = "no-store";
/// Telegram's webview holds on to the page shell; make it revalidate so a new
/// deploy picks up the new bundle names.
const REVALIDATE: &str = "no-cache";
const IMMUTABLE: &str = "public, max-age=31536000, immutable";
const ONE_DAY: &str = "public, max-age=86400";

/// Length of the content hash Trunk appends to bundle file names.
const TRUNK_HASH_LEN: usize = 16;

pub(crate) fn build_app(state: AppState, static_dir: &str) -> Router {
    let static_assets = Router::new().fallback_service(
        ServeDir::new(static_dir)
            .precompressed_br()
            .precompressed_gzip(),
    );

    let app = Router::new()
        .route("/api/matches", axum::routing::get(routes::api::get_matches))
        .route("/api/health", axum::routing::get(routes::api::health))
        .route("/api/metrics", axum::routing::get(routes::api::metrics));

    app.layer(CompressionLayer::new())
        .fallback_service(static_assets)
        .layer(middleware::from_fn(set_cache_control))
        .with_state(state)
}

async fn set_cache_control(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;

    let rule = if is_api_path(&path) {
        Some(NO_STORE)
    } else if response.status().is_success() {
        static_cache_control(&path)
    } else {
        None
    };
    if let Some(cache_control) = rule {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(cache_control),
        );
    }

    response
}

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

fn static_cache_control(path: &str) -> Option<&'static str> {
    if path == "/" || path.ends_with(".html") {
        return Some(REVALIDATE);
    }
    if is_trunk_bundle_asset(path) {
        return Some(IMMUTABLE);
    }
    if [".png", ".svg", ".ico"].iter().any(|ext| path.ends_with(ext)) {
        return Some(ONE_DAY);
    }
    None
}

/// `name-<hash>.js`, `name-<hash>_bg.wasm` or `style-<hash>.css` as written
/// by Trunk.
fn is_trunk_bundle_asset(path: &str) -> bool {
    let file = path.rsplit('/').next().unwrap_or(path);
    let Some((stem, ext)) = file.rsplit_once('.') else {
        return false;
    };
    if !matches!(ext, "wasm" | "js" | "css") {
        return false;
    }

    let stem = stem.strip_suffix("_bg").unwrap_or(stem);
    stem.rsplit_once('-').is_some_and(|(_, hash)| {
        hash.len() == TRUNK_HASH_LEN && hash.chars().all(|c| c.is_ascii_hexdigit())
    })
}
