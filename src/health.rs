//! 健康检查与版本信息。

use axum::extract::Extension;
use axum::response::Json as JsonResponse;
use serde::Serialize;
use std::sync::Arc;

use crate::storage::StorageBackend;

#[derive(Serialize)]
pub struct HealthInfo {
    status: &'static str,
    version: &'static str,
    commit: &'static str,
    storage: &'static str,
}

/// 返回服务状态、构建版本与当前存储后端类型。
pub async fn health(
    Extension(storage): Extension<Arc<dyn StorageBackend>>,
) -> JsonResponse<HealthInfo> {
    JsonResponse(HealthInfo {
        status: "ok",
        version: crate::build::PKG_VERSION,
        commit: crate::build::SHORT_COMMIT,
        storage: storage.kind(),
    })
}
