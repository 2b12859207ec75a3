// ==========================================
// 仓库出入库单据系统 - 操作日志领域模型
// ==========================================
// 红线: 所有成功写入必须记录
// 用途: 审计追踪 (谁在何时对哪张单据做了什么)
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::types::RecordFamily;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,            // 日志ID (uuid)
    pub family: RecordFamily,         // 单据族
    pub record_id: i64,               // 单据头ID
    pub action_type: ActionType,      // 操作类型
    pub action_ts: NaiveDateTime,     // 操作时间戳
    pub actor: String,                // 操作人 (身份令牌对应的主体)
    pub payload_json: Option<JsonValue>, // 操作参数快照
    pub detail: Option<String>,       // 详细描述
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreateRecord,  // 新建单据
    UpdateRecord,  // 修改单据（含明细整体替换）
    DeleteRecord,  // 删除单据（级联明细）
    AppendDetail,  // 追加明细行
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateRecord => "CreateRecord",
            ActionType::UpdateRecord => "UpdateRecord",
            ActionType::DeleteRecord => "DeleteRecord",
            ActionType::AppendDetail => "AppendDetail",
        }
    }

    /// 从字符串解析
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CreateRecord" => Some(ActionType::CreateRecord),
            "UpdateRecord" => Some(ActionType::UpdateRecord),
            "DeleteRecord" => Some(ActionType::DeleteRecord),
            "AppendDetail" => Some(ActionType::AppendDetail),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ActionLog {
    /// 以当前时间创建一条日志
    pub fn new(
        family: RecordFamily,
        record_id: i64,
        action_type: ActionType,
        actor: &str,
        payload_json: Option<JsonValue>,
    ) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            family,
            record_id,
            action_type,
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            payload_json,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
