// ==========================================
// 仓库出入库单据系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::RecordApi;
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use crate::repository::{ActionLogRepository, SqliteRecordRepository};

/// 应用状态
///
/// 单据 API、配置管理器、操作日志仓储共享同一个数据库连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 单据API
    pub record_api: Arc<RecordApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（":memory:" 为内存库）
    ///
    /// # 说明
    /// 1. 打开连接并建表（幂等）
    /// 2. 从 config_kv 读取引擎参数
    /// 3. 创建仓储与 API 实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn =
            open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库表结构初始化失败: {}", e))?;

        match read_schema_version(&conn) {
            Ok(Some(version)) if version != CURRENT_SCHEMA_VERSION => {
                tracing::warn!(
                    found = version,
                    expected = CURRENT_SCHEMA_VERSION,
                    "数据库 schema 版本与程序不一致"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("schema_version 读取失败(将继续启动): {}", e),
        }

        let conn = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let settings = config_manager
            .load_engine_settings()
            .map_err(|e| format!("引擎配置读取失败: {}", e))?;
        tracing::debug!(?settings, "引擎参数已加载");

        let record_repo = Arc::new(SqliteRecordRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn));

        let record_api = Arc::new(RecordApi::new(
            record_repo,
            action_log_repo.clone(),
            settings,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            record_api,
            config_manager,
            action_log_repo,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 WAREHOUSE_RECORDS_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("WAREHOUSE_RECORDS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./warehouse_records.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("warehouse-records");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("warehouse_records.db");
        }
    }

    path.to_string_lossy().to_string()
}
