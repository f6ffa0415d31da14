//! 管理员上传处理器：口令校验、桶选择、文件名清洗与并发写入。

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Extension, Multipart};
use axum::http::StatusCode;
use axum::response::Json as JsonResponse;
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::CredentialVerifier;
use crate::config::Buckets;
use crate::error::ApiError;
use crate::names::sanitize_file_name;
use crate::storage::StorageBackend;

pub const WRONG_PASSWORD: &str = "Wrong Password";
pub const INVALID_BUCKET: &str = "Invalid bucket selected";
pub const NO_FILES: &str = "No files selected";
pub const UPLOAD_TOO_LARGE: &str = "Upload too large";
pub const UPLOAD_FAILED: &str = "Upload failed";

/// 上传的目标桶来源。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadTarget {
    /// 表单中的 `bucket` 字段选择桶，须在白名单内。
    Selectable,
    /// 忽略 `bucket` 字段，总是写入默认桶。
    DefaultOnly,
}

#[derive(Clone, Debug)]
pub struct UploadFile {
    pub name: String,
    pub data: Bytes,
}

/// 一次表单提交解析出的内容。
#[derive(Debug, Default)]
pub struct UploadRequest {
    pub password: String,
    pub bucket: Option<String>,
    pub files: Vec<UploadFile>,
    pub oversized: bool,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    success: bool,
}

impl UploadRequest {
    /// 从 multipart 表单读取字段；畸形或缺失的字段按空值处理。
    pub async fn from_multipart(mut multipart: Multipart) -> Self {
        let mut request = UploadRequest::default();

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(err) => {
                    request.note_error(err.status(), &err.body_text());
                    break;
                }
            };

            let field_name = field.name().unwrap_or_default().to_string();
            match field_name.as_str() {
                "password" => match field.text().await {
                    Ok(text) => request.password = text,
                    Err(err) => request.note_error(err.status(), &err.body_text()),
                },
                "bucket" => match field.text().await {
                    Ok(text) if !text.is_empty() => request.bucket = Some(text),
                    Ok(_) => {}
                    Err(err) => request.note_error(err.status(), &err.body_text()),
                },
                "files" => {
                    let name = field.file_name().unwrap_or_default().to_string();
                    match field.bytes().await {
                        Ok(data) => request.files.push(UploadFile { name, data }),
                        Err(err) => request.note_error(err.status(), &err.body_text()),
                    }
                }
                other => debug!(field = other, "ignoring unknown form field"),
            }
        }

        request
    }

    fn note_error(&mut self, status: StatusCode, detail: &str) {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            self.oversized = true;
        }
        debug!(%status, detail, "malformed upload form");
    }
}

/// 校验并写入一批文件，返回清洗后的对象名。
///
/// 校验顺序固定：口令、桶、请求大小、文件是否为空，首个失败即返回，不会产生写入。
/// 所有写入并发发起并全部等待完成；任一失败则返回按输入顺序第一个失败的消息，
/// 已成功的写入不会回滚。
pub async fn process_upload(
    verifier: &dyn CredentialVerifier,
    buckets: &Buckets,
    storage: &dyn StorageBackend,
    target: UploadTarget,
    request: UploadRequest,
) -> Result<Vec<String>, ApiError> {
    if !verifier.verify(&request.password) {
        warn!("upload rejected: wrong password");
        return Err(ApiError::Unauthorized(WRONG_PASSWORD.into()));
    }

    let bucket = match target {
        UploadTarget::Selectable => match buckets.resolve(request.bucket.as_deref()) {
            Some(bucket) => bucket,
            None => {
                warn!(
                    bucket = request.bucket.as_deref().unwrap_or_default(),
                    "upload rejected: bucket not allowed"
                );
                return Err(ApiError::BadRequest(INVALID_BUCKET.into()));
            }
        },
        UploadTarget::DefaultOnly => buckets.default.as_str(),
    };

    if request.oversized {
        return Err(ApiError::PayloadTooLarge(UPLOAD_TOO_LARGE.into()));
    }

    match request.files.first() {
        Some(first) if !first.data.is_empty() => {}
        _ => return Err(ApiError::BadRequest(NO_FILES.into())),
    }

    let writes = request.files.into_iter().map(|file| async move {
        let name = sanitize_file_name(&file.name);
        let size = file.data.len();
        let result = storage.upload(bucket, &name, file.data, true).await;
        match &result {
            Ok(()) => debug!(bucket, name, size, "file stored"),
            Err(err) => warn!(bucket, name, error = %err, "file upload failed"),
        }
        result.map(|()| name)
    });
    let results = join_all(writes).await;

    let mut stored = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(name) => stored.push(name),
            Err(err) => {
                let message = err.to_string();
                let message = if message.is_empty() {
                    UPLOAD_FAILED.to_string()
                } else {
                    message
                };
                return Err(ApiError::Internal(message));
            }
        }
    }

    info!(bucket, count = stored.len(), "upload complete");
    Ok(stored)
}

async fn handle_upload(
    verifier: &dyn CredentialVerifier,
    buckets: &Buckets,
    storage: &dyn StorageBackend,
    target: UploadTarget,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<JsonResponse<UploadResponse>, ApiError> {
    let request = match multipart {
        Ok(multipart) => UploadRequest::from_multipart(multipart).await,
        Err(rejection) => {
            debug!(error = %rejection, "upload body is not a multipart form");
            UploadRequest::default()
        }
    };
    process_upload(verifier, buckets, storage, target, request).await?;
    Ok(JsonResponse(UploadResponse { success: true }))
}

/// 管理页上传：按表单选择的桶写入。
pub async fn upload_to_selected_bucket(
    Extension(verifier): Extension<Arc<dyn CredentialVerifier>>,
    Extension(buckets): Extension<Arc<Buckets>>,
    Extension(storage): Extension<Arc<dyn StorageBackend>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<JsonResponse<UploadResponse>, ApiError> {
    handle_upload(
        verifier.as_ref(),
        &buckets,
        storage.as_ref(),
        UploadTarget::Selectable,
        multipart,
    )
    .await
}

/// 固定写入默认桶的上传。
pub async fn upload_to_default_bucket(
    Extension(verifier): Extension<Arc<dyn CredentialVerifier>>,
    Extension(buckets): Extension<Arc<Buckets>>,
    Extension(storage): Extension<Arc<dyn StorageBackend>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<JsonResponse<UploadResponse>, ApiError> {
    handle_upload(
        verifier.as_ref(),
        &buckets,
        storage.as_ref(),
        UploadTarget::DefaultOnly,
        multipart,
    )
    .await
}
