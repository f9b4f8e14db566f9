use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::ApiResponse;

/// GET /api/health - 健康检查
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "querytrail service is running"
    }))
}

#[derive(Debug, Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
    pub build_time: &'static str,
}

/// GET /api/version - 版本信息
pub async fn version_info() -> Json<ApiResponse<VersionInfo>> {
    Json(ApiResponse::success(VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
        build_time: env!("BUILD_TIME"),
    }))
}
