//! 工具模块 - 通用工具函数和类型
//!
//! # 内容
//!
//! - [`ApiResponse`] / [`ApiError`] - API 响应结构与错误映射
//! - 日志初始化

pub mod error;
pub mod logger;

pub use error::{ApiError, ApiResponse, ApiResult};
