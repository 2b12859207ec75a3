// ==========================================
// 仓库出入库单据系统 - 操作日志数据仓储
// ==========================================
// 红线: 所有成功写入必须记录
// 说明: action_log 不对 record_header 建外键,单据删除后审计记录仍保留
// ==========================================

mod core;
mod queries;


pub use self::core::ActionLogRepository;
