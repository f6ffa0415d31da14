//! 路由组装：API、上传、本地文件与前端回退。

use axum::extract::{DefaultBodyLimit, Extension};
use axum::http::Request;
use axum::routing::{get, post};
use axum::{Router, middleware};
use std::sync::Arc;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info_span};

use crate::auth::CredentialVerifier;
use crate::config::Buckets;
use crate::storage::{LocalStorage, StorageBackend};
use crate::{files, frontend, health, http, listing, upload};

/// 路由依赖的共享组件。
pub struct AppContext {
    pub storage: Arc<dyn StorageBackend>,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub buckets: Arc<Buckets>,
    /// 使用本地后端时提供 `/files` 访问。
    pub local_files: Option<Arc<LocalStorage>>,
    pub upload_max_size: usize,
}

pub fn build_router(context: AppContext) -> Router {
    let upload_limit = DefaultBodyLimit::max(context.upload_max_size);
    let mut app = Router::new()
        .route("/api/songs", get(listing::default_songs))
        .route("/api/seasonal/songs", get(listing::seasonal_songs))
        .route("/api/buckets", get(listing::bucket_names))
        .route(
            "/api/admin/upload",
            post(upload::upload_to_selected_bucket).layer(upload_limit),
        )
        .route(
            "/api/upload",
            post(upload::upload_to_default_bucket).layer(upload_limit),
        )
        .route("/api/health", get(health::health));

    if let Some(local) = context.local_files {
        app = app
            .route("/files/{bucket}/{*name}", get(files::serve_object))
            .layer(Extension(local));
    }

    app.fallback(frontend::serve_frontend)
        .layer(middleware::from_fn(http::add_response_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let client_ip = http::client_ip(request)
                        .map(|ip| ip.to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    info_span!(
                        env!("CARGO_CRATE_NAME"),
                        client_ip,
                        method = ?request.method(),
                        path = ?request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(Extension(context.storage))
        .layer(Extension(context.verifier))
        .layer(Extension(context.buckets))
}
