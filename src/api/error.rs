// ==========================================
// 仓库出入库单据系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型,转换Repository/引擎错误为调用方可区分的错误
// 约定: 每个错误都有稳定的错误码 (code),供边界层映射响应
// ==========================================

use crate::engine::projection::ProjectionError;
use crate::engine::status_machine::StatusError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入错误
    // ==========================================
    /// 必填字段缺失 / 数量非正 / 状态不在词表内
    #[error("数据验证失败: {reason}")]
    ValidationError {
        reason: String,
        violations: Vec<ValidationViolation>,
    },

    #[error("重复单据: {0}")]
    DuplicateRecord(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("乐观锁冲突: {0}")]
    OptimisticLockFailure(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("存储不可用: {0}")]
    StoreUnavailable(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 单条违规的校验错误
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        ApiError::ValidationError {
            reason: reason.clone(),
            violations: vec![ValidationViolation::new(field, reason)],
        }
    }

    /// 稳定错误码
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::DuplicateRecord(_) => "DUPLICATE_RECORD",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::OptimisticLockFailure(_) => "OPTIMISTIC_LOCK_FAILURE",
            ApiError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            ApiError::InternalError(_) | ApiError::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// 违规明细（非校验错误为空）
    pub fn violations(&self) -> &[ValidationViolation] {
        match self {
            ApiError::ValidationError { violations, .. } => violations,
            _ => &[],
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::OptimisticLockFailure {
                record_id,
                expected,
                actual,
            } => ApiError::OptimisticLockFailure(format!(
                "单据{}已被其他用户修改（期望revision={},实际revision={}）",
                record_id, expected, actual
            )),

            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DuplicateRecord { family, key } => {
                ApiError::DuplicateRecord(format!("{}已存在相同单据（key={}）", family, key))
            }

            // 存储错误
            RepositoryError::DatabaseConnectionError(msg) => ApiError::StoreUnavailable(msg),
            RepositoryError::DatabaseTransactionError(msg) => ApiError::StoreUnavailable(msg),
            RepositoryError::LockError(msg) => {
                ApiError::StoreUnavailable(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::StoreUnavailable(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DuplicateRecord(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::InternalError(format!("外键约束违反: {}", msg))
            }

            // 数据质量错误（校验器之后仍被存储约束拦截）
            RepositoryError::ValidationError(msg) => ApiError::ValidationError {
                reason: msg,
                violations: Vec::new(),
            },
            RepositoryError::FieldValueError { field, message } => {
                ApiError::invalid(&field, message)
            }

            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<StatusError> for ApiError {
    fn from(err: StatusError) -> Self {
        ApiError::invalid("status", err.to_string())
    }
}

impl From<ProjectionError> for ApiError {
    fn from(err: ProjectionError) -> Self {
        ApiError::invalid("size", err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 校验违规详情
// ==========================================

/// 校验违规详情
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationViolation {
    /// 字段名（明细字段形如 details[0].quantity）
    pub field: String,
    /// 违规原因
    pub reason: String,
}

impl ValidationViolation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::RecordFamily;

    #[test]
    fn test_repository_error_conversion() {
        let api_err: ApiError = RepositoryError::record_not_found(RecordFamily::Borrow, 9).into();
        match &api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("borrow"));
                assert!(msg.contains("9"));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
        assert_eq!(api_err.code(), "NOT_FOUND");

        let api_err: ApiError = RepositoryError::OptimisticLockFailure {
            record_id: 3,
            expected: 1,
            actual: 2,
        }
        .into();
        assert_eq!(api_err.code(), "OPTIMISTIC_LOCK_FAILURE");
        assert!(api_err.to_string().contains("已被其他用户修改"));

        let api_err: ApiError = RepositoryError::DuplicateRecord {
            family: "export".to_string(),
            key: "ken".to_string(),
        }
        .into();
        assert_eq!(api_err.code(), "DUPLICATE_RECORD");

        let api_err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        assert_eq!(api_err.code(), "STORE_UNAVAILABLE");
    }

    #[test]
    fn test_status_error_becomes_validation_error() {
        let err: ApiError = StatusError::InvalidStatus {
            family: RecordFamily::Order,
            value: "Returned".to_string(),
            allowed: "Pending".to_string(),
        }
        .into();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(err.violations()[0].field, "status");
    }
}
