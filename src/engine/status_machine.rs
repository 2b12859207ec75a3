// ==========================================
// 仓库出入库单据系统 - 状态机
// ==========================================
// 规则: 只校验“状态属于该族状态集合”,不限制迁移方向
//       (Completed → Pending 之类的回退同样允许,是否收紧待产品确认)
// ==========================================

use crate::domain::types::{RecordFamily, RecordStatus};
use thiserror::Error;

/// 状态校验错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    #[error("状态值不属于 {family} 的状态集合: {value} (允许: {allowed})")]
    InvalidStatus {
        family: RecordFamily,
        value: String,
        allowed: String,
    },

    #[error("{family} 不建模状态,不接受状态值: {value}")]
    StatusNotModeled { family: RecordFamily, value: String },
}

/// 一次状态迁移的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: Option<RecordStatus>,
    pub to: Option<RecordStatus>,
}

impl StatusChange {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// 状态文本是否属于该族状态集合
pub fn validate_status(family: RecordFamily, value: &str) -> bool {
    RecordStatus::parse(family, value).is_some()
}

/// 空白视为未提交
fn requested_value(requested: Option<&str>) -> Option<&str> {
    requested.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_for(family: RecordFamily, value: &str) -> Result<RecordStatus, StatusError> {
    if !family.has_status() {
        return Err(StatusError::StatusNotModeled {
            family,
            value: value.to_string(),
        });
    }
    RecordStatus::parse(family, value).ok_or_else(|| StatusError::InvalidStatus {
        family,
        value: value.to_string(),
        allowed: RecordStatus::vocabulary(family).join(", "),
    })
}

/// 创建时确定状态: 未提交则取该族初始状态
pub fn resolve_initial(
    family: RecordFamily,
    requested: Option<&str>,
) -> Result<Option<RecordStatus>, StatusError> {
    match requested_value(requested) {
        Some(value) => parse_for(family, value).map(Some),
        None => Ok(RecordStatus::initial(family)),
    }
}

/// 编辑时确定状态: 未提交则保持当前状态
///
/// 任意合法状态之间均可迁移,包括原地迁移
pub fn transition(
    family: RecordFamily,
    current: Option<RecordStatus>,
    requested: Option<&str>,
) -> Result<StatusChange, StatusError> {
    let to = match requested_value(requested) {
        Some(value) => Some(parse_for(family, value)?),
        // 旧数据缺状态时补初始状态,保证编辑后状态非空
        None => current.or_else(|| RecordStatus::initial(family)),
    };
    Ok(StatusChange { from: current, to })
}
