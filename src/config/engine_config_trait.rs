// ==========================================
// 仓库出入库单据系统 - 引擎配置读取 Trait
// ==========================================
// 职责: 定义边界层/引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// EngineConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait EngineConfigReader: Send + Sync {
    /// 未指定 size 时的分页大小
    ///
    /// # 默认值
    /// - 20（不超过 max_page_size）
    async fn get_default_page_size(&self) -> Result<usize, Box<dyn Error>>;
}
