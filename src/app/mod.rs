// ==========================================
// 仓库出入库单据系统 - 应用层
// ==========================================
// 职责: 组装共享状态,对外提供请求路由
// ==========================================

pub mod commands;
pub mod state;

// 重导出
pub use commands::{
    map_api_error, ErrorResponse, IdentityVerifier, Method, Request, RequestRouter, Response,
    StaticTokenVerifier,
};
pub use state::{get_default_db_path, AppState};
