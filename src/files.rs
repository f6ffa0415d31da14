//! 本地存储后端的公开文件访问。

use axum::body::Body as AxumBody;
use axum::extract::{Extension, Path};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::ApiError;
use crate::storage::{LocalStorage, StorageError};

/// 读取桶内对象并以流的形式返回。
pub async fn serve_object(
    Path((bucket, name)): Path<(String, String)>,
    Extension(storage): Extension<Arc<LocalStorage>>,
) -> Result<Response, ApiError> {
    let target = storage.object_path(&bucket, &name)?;
    let metadata = fs::metadata(&target).await.map_err(StorageError::from)?;
    if !metadata.is_file() {
        return Err(ApiError::NotFound("not found".into()));
    }
    let file = File::open(&target).await.map_err(StorageError::from)?;

    let mime = mime_guess::from_path(&name).first_or_octet_stream();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str())
            .map_err(|_| ApiError::Internal("invalid mime type".into()))?,
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );
    debug!(bucket, name, size = metadata.len(), "serve object");

    Ok((
        StatusCode::OK,
        headers,
        AxumBody::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
