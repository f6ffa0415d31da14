//! 嵌入式页面与静态资源。

use axum::body::Body as AxumBody;
use axum::http::{HeaderMap, HeaderValue, Request, header};
use axum::response::{IntoResponse, Response};
use rust_embed::RustEmbed;

use crate::error::ApiError;

#[derive(RustEmbed)]
#[folder = "frontend"]
/// 嵌入式前端页面。
pub struct FrontendAssets;

/// 页面路由到嵌入文件的映射。
fn page_asset(path: &str) -> Option<&'static str> {
    match path.trim_end_matches('/') {
        "" | "/index.html" => Some("index.html"),
        "/seasonal" => Some("seasonal.html"),
        "/admin" => Some("admin.html"),
        _ => None,
    }
}

/// 前端回退处理器：页面路由优先，其次按路径查找静态资源。
pub async fn serve_frontend(req: Request<AxumBody>) -> Result<Response, ApiError> {
    let path = req.uri().path();
    let requested = page_asset(path).unwrap_or_else(|| path.trim_start_matches('/'));
    load_embedded_asset(requested)?.ok_or_else(|| ApiError::NotFound("not found".into()))
}

fn load_embedded_asset(path: &str) -> Result<Option<Response>, ApiError> {
    let Some(asset) = FrontendAssets::get(path) else {
        return Ok(None);
    };
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str())
            .map_err(|_| ApiError::Internal("invalid mime type".into()))?,
    );
    Ok(Some(
        (headers, AxumBody::from(asset.data.into_owned())).into_response(),
    ))
}
