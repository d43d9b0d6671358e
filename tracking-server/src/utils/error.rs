//! 统一错误处理
//!
//! 将领域错误 [`HubError`] 映射为 HTTP 响应：
//!
//! | 变体 | 状态码 | 错误码 |
//! |------|--------|--------|
//! | `InvalidTransition` | 422 | E0005 |
//! | `OrderNotFound` | 404 | E0003 |
//! | `InvalidPing` | 400 | E0002 |
//! | `RoomNotTrackable` | 409 | E0004 |
//! | 其他 | 500 | E9001 |
//!
//! # 使用示例
//!
//! ```ignore
//! // 返回错误
//! Err(ApiError::from(HubError::OrderNotFound(42)))
//!
//! // 返回成功响应
//! Ok(Json(ApiResponse::success(data)))
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use shared::HubError;
use tracing::error;

/// API 统一响应结构
///
/// ```json
/// {
///   "code": "0000",
///   "message": "success",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// 错误码 (0000 表示成功)
    pub code: String,
    /// 消息
    pub message: String,
    /// 响应数据
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            code: "0000".to_string(),
            message: "success".to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// 创建无数据的成功响应
    pub fn ok() -> Self {
        Self {
            code: "0000".to_string(),
            message: "success".to_string(),
            data: None,
        }
    }
}

/// HTTP boundary wrapper around [`HubError`].
#[derive(Debug)]
pub struct ApiError(pub HubError);

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            HubError::InvalidTransition { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "E0005"),
            HubError::OrderNotFound(_) => (StatusCode::NOT_FOUND, "E0003"),
            HubError::InvalidPing(_) => (StatusCode::BAD_REQUEST, "E0002"),
            HubError::RoomNotTrackable(_) => (StatusCode::CONFLICT, "E0004"),
            HubError::SubscriberUnreachable(_) | HubError::Internal(_) => {
                error!(error = %self.0, "Internal error surfaced at API boundary");
                (StatusCode::INTERNAL_SERVER_ERROR, "E9001")
            }
        };

        let body = ApiResponse::<()> {
            code: code.to_string(),
            message: self.0.to_string(),
            data: None,
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;
