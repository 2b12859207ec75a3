// ==========================================
// 仓库出入库单据系统 - API 层
// ==========================================
// 职责: 提供单据业务 API,供边界层 (app::commands) 调用
// ==========================================

pub mod error;
pub mod record_api;
pub mod validator;

// 重导出核心类型
pub use error::{ApiError, ApiResult, ValidationViolation};
pub use record_api::RecordApi;
pub use validator::{parse_quantity, RecordValidator};
