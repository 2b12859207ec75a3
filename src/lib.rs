// ==========================================
// 仓库出入库单据系统 - 核心库
// ==========================================
// 五个单据族 (Order / Import / Export / Borrow / Repair) 的
// 单据头 + 明细事务引擎
// 技术栈: Rust + SQLite
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 单据与状态词表
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 状态机 / 重复校验 / 明细追加 / 列表投影
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 共享状态与请求路由
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    BorrowStatus, ExportStatus, OrderStatus, RecordFamily, RecordStatus, RepairStatus,
};

// 领域实体
pub use domain::{ActionLog, ActionType, DetailDraft, DetailLine, HeaderDraft, RecordHeader};

// 引擎
pub use engine::{ListingPage, ListingProjection, NestedWriteCoordinator};

// API
pub use api::{ApiError, ApiResult, RecordApi};

// 应用层
pub use app::{AppState, Request, RequestRouter, Response};

// ==========================================
// 系统常量
// ==========================================

/// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 系统名称
pub const APP_NAME: &str = "仓库出入库单据系统";

/// 数据库版本
pub const DB_VERSION: &str = "v1.0";
