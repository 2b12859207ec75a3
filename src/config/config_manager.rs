// ==========================================
// 仓库出入库单据系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope,当前只用 global)
// ==========================================

use crate::config::engine_config_trait::EngineConfigReader;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// EngineSettings - 引擎运行参数快照
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineSettings {
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub search_details: bool,
    pub audit_enabled: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 200,
            search_details: false,
            audit_enabled: true,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value, "配置已更新");
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&config_map)?)
    }

    /// 读取整数配置,缺失或格式错误时回退默认值
    fn get_usize_or(&self, key: &str, default: usize) -> Result<usize, Box<dyn Error>> {
        let Some(raw) = self.get_config_value(key)? else {
            return Ok(default);
        };
        match raw.trim().parse::<usize>() {
            Ok(v) if v > 0 => Ok(v),
            _ => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default,
                    "配置格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    fn get_bool_or(&self, key: &str, default: bool) -> Result<bool, Box<dyn Error>> {
        let Some(raw) = self.get_config_value(key)? else {
            return Ok(default);
        };
        match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default,
                    "配置格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 同步读取引擎参数快照（启动时使用）
    pub fn load_engine_settings(&self) -> Result<EngineSettings, Box<dyn Error>> {
        let defaults = EngineSettings::default();
        let default_page_size =
            self.get_usize_or(config_keys::DEFAULT_PAGE_SIZE, defaults.default_page_size)?;
        let max_page_size = self.get_usize_or(config_keys::MAX_PAGE_SIZE, defaults.max_page_size)?;

        Ok(EngineSettings {
            // 默认页大小不超过上限
            default_page_size: default_page_size.min(max_page_size),
            max_page_size,
            search_details: self.get_bool_or(config_keys::SEARCH_DETAILS, defaults.search_details)?,
            audit_enabled: self.get_bool_or(config_keys::AUDIT_ENABLED, defaults.audit_enabled)?,
        })
    }
}

// ==========================================
// EngineConfigReader Trait 实现
// ==========================================
#[async_trait]
impl EngineConfigReader for ConfigManager {
    async fn get_default_page_size(&self) -> Result<usize, Box<dyn Error>> {
        Ok(self.load_engine_settings()?.default_page_size)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 列表分页
    pub const DEFAULT_PAGE_SIZE: &str = "default_page_size";
    pub const MAX_PAGE_SIZE: &str = "max_page_size";

    // 过滤是否检索明细
    pub const SEARCH_DETAILS: &str = "search_details";

    // 写操作是否记录操作日志
    pub const AUDIT_ENABLED: &str = "audit_enabled";
}
