// ==========================================
// 仓库出入库单据系统 - 领域模型层
// ==========================================
// 职责: 定义单据头/明细聚合、单据族与状态词表、操作日志
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod record;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use record::{
    BorrowFields, DetailDraft, DetailLine, ExportFields, HeaderDraft, HeaderFields, HeaderPayload,
    ImportFields, OrderFields, RawQuantity, RecordHeader, RepairFields,
};
pub use types::{
    BorrowStatus, ExportStatus, OrderStatus, RecordFamily, RecordStatus, RepairStatus,
    UnknownFamily,
};
