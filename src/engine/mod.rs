// ==========================================
// 仓库出入库单据系统 - 引擎层
// ==========================================
// 职责: 状态机 / 重复校验 / 明细追加 / 列表投影
// 红线: Engine 不拼 SQL,存储访问只经由仓储 trait
// ==========================================

pub mod duplicate_guard;
pub mod nested_write;
pub mod projection;
pub mod status_machine;

pub use nested_write::{AppendOutcome, NestedWriteCoordinator};
pub use projection::{ListingPage, ListingProjection, ProjectionError};
pub use status_machine::{StatusChange, StatusError};
