// ==========================================
// 仓库出入库单据系统 - 单据 API
// ==========================================
// 职责: 单据的列表 / 查询 / 新建 / 编辑 / 删除 / 追加明细 / 导出
// 红线: 所有成功写入记录 ActionLog（audit_enabled 关闭时除外）
// 红线: 存储错误原样上抛,不吞错、不重试
// ==========================================

use std::io::Write;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::RecordValidator;
use crate::config::config_manager::EngineSettings;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::record::{DetailDraft, HeaderDraft, RecordHeader};
use crate::domain::types::RecordFamily;
use crate::engine::duplicate_guard;
use crate::engine::nested_write::NestedWriteCoordinator;
use crate::engine::projection::{self, ListingPage, ListingProjection};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::error::RepositoryError;
use crate::repository::record_repo::RecordRepository;

// ==========================================
// RecordApi - 单据 API
// ==========================================

/// 单据API
///
/// 五个单据族共用一套操作,按 `family` 参数区分。
/// 新建时盖当天日期;编辑不改日期。
pub struct RecordApi {
    record_repo: Arc<dyn RecordRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    settings: EngineSettings,
}

impl RecordApi {
    /// 创建新的RecordApi实例
    ///
    /// # 参数
    /// - record_repo: 单据仓储
    /// - action_log_repo: 操作日志仓储
    /// - settings: 引擎参数快照
    pub fn new(
        record_repo: Arc<dyn RecordRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            record_repo,
            action_log_repo,
            settings,
        }
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    fn projection(&self) -> ListingProjection {
        ListingProjection::new(self.settings.search_details, self.settings.max_page_size)
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 列出单据族下的单据（含明细）,可选过滤
    pub fn list(&self, family: RecordFamily, filter: Option<&str>) -> ApiResult<Vec<RecordHeader>> {
        let headers = self.record_repo.list(family)?;
        let filtered = self.projection().filter(headers, filter);
        debug!(family = %family, count = filtered.len(), "单据列表查询");
        Ok(filtered)
    }

    /// 过滤后分页
    ///
    /// # 参数
    /// - page: 页码（从 0 开始）
    /// - size: 页大小,缺省取配置的默认值
    pub fn list_page(
        &self,
        family: RecordFamily,
        filter: Option<&str>,
        page: usize,
        size: Option<usize>,
    ) -> ApiResult<ListingPage> {
        let filtered = self.list(family, filter)?;
        let size = size.unwrap_or(self.settings.default_page_size);
        Ok(self.projection().paginate(filtered, page, size)?)
    }

    /// 按 id 查询单据（含明细）
    pub fn get(&self, family: RecordFamily, id: i64) -> ApiResult<RecordHeader> {
        self.record_repo
            .find_by_id(family, id)?
            .ok_or_else(|| RepositoryError::record_not_found(family, id).into())
    }

    /// 仍归属某单据的明细行数
    pub fn count_details(&self, header_id: i64) -> ApiResult<usize> {
        Ok(self.record_repo.count_details(header_id)?)
    }

    /// 单据的操作日志
    pub fn audit_trail(&self, family: RecordFamily, id: i64) -> ApiResult<Vec<ActionLog>> {
        Ok(self.action_log_repo.find_by_record(family, id)?)
    }

    /// 导出过滤后的单据为 CSV
    ///
    /// # 返回
    /// - 导出的单据行数
    pub fn export_csv<W: Write>(
        &self,
        family: RecordFamily,
        filter: Option<&str>,
        writer: W,
    ) -> ApiResult<usize> {
        let headers = self.list(family, filter)?;
        projection::write_csv(&headers, writer)
            .map_err(|e| ApiError::InternalError(format!("CSV 导出失败: {}", e)))?;
        info!(family = %family, rows = headers.len(), "单据导出完成");
        Ok(headers.len())
    }

    /// 提交前的重复预检（基于当前已存储单据的一次快照）
    ///
    /// 新建时仓储仍会在事务内再次校验
    pub fn precheck_duplicate(&self, family: RecordFamily, draft: &HeaderDraft) -> ApiResult<()> {
        let payload = RecordValidator::validate_create(family, draft)?;
        let Some(key) = duplicate_guard::uniqueness_key(
            Self::today(),
            payload.description.as_deref(),
            &payload.fields,
        ) else {
            return Ok(());
        };

        let existing = self.record_repo.list(family)?;
        match duplicate_guard::find_collision(&key, &existing) {
            Some(hit) => Err(ApiError::DuplicateRecord(format!(
                "{}已存在相同单据（id={}）",
                family, hit.id
            ))),
            None => Ok(()),
        }
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 新建单据
    ///
    /// # 返回
    /// - 已存储的单据（含分配的 id 与当天日期）
    pub fn create(
        &self,
        family: RecordFamily,
        draft: &HeaderDraft,
        actor: &str,
    ) -> ApiResult<RecordHeader> {
        let payload = RecordValidator::validate_create(family, draft)?;
        let date = Self::today();
        let dup_key =
            duplicate_guard::uniqueness_key(date, payload.description.as_deref(), &payload.fields);

        let header = self.record_repo.insert(&payload, date, dup_key.as_deref())?;

        info!(
            family = %family,
            record_id = header.id,
            detail_count = header.details.len(),
            actor,
            "单据已新建"
        );
        self.record_action(
            ActionLog::new(family, header.id, ActionType::CreateRecord, actor, to_json(&header)),
        );
        Ok(header)
    }

    /// 编辑单据: 覆盖单据头字段,整体替换明细
    ///
    /// 草稿带 `revision` 时按乐观锁校验,否则后写覆盖
    pub fn update(
        &self,
        family: RecordFamily,
        id: i64,
        draft: &HeaderDraft,
        actor: &str,
    ) -> ApiResult<RecordHeader> {
        let current = self.get(family, id)?;
        let payload = RecordValidator::validate_update(&current, draft)?;
        let dup_key = duplicate_guard::uniqueness_key(
            current.date,
            payload.description.as_deref(),
            &payload.fields,
        );

        let header = self.record_repo.update(id, &payload, dup_key.as_deref())?;

        if current.status != header.status {
            info!(
                family = %family,
                record_id = id,
                from = current.status.map(|s| s.as_str()).unwrap_or("-"),
                to = header.status.map(|s| s.as_str()).unwrap_or("-"),
                "单据状态变更"
            );
        }
        info!(
            family = %family,
            record_id = id,
            revision = header.revision,
            detail_count = header.details.len(),
            actor,
            "单据已更新"
        );

        let mut log = ActionLog::new(family, id, ActionType::UpdateRecord, actor, to_json(&header));
        if current.status != header.status {
            log = log.with_detail(format!(
                "状态 {} -> {}",
                current.status.map(|s| s.as_str()).unwrap_or("-"),
                header.status.map(|s| s.as_str()).unwrap_or("-")
            ));
        }
        self.record_action(log);
        Ok(header)
    }

    /// 删除单据（级联删除明细）
    pub fn delete(&self, family: RecordFamily, id: i64, actor: &str) -> ApiResult<()> {
        self.record_repo.delete(family, id)?;

        info!(family = %family, record_id = id, actor, "单据已删除");
        self.record_action(ActionLog::new(family, id, ActionType::DeleteRecord, actor, None));
        Ok(())
    }

    /// 向已有单据追加一条明细
    ///
    /// # 错误
    /// - NotFound: 单据不存在
    /// - ValidationError: 明细缺 item 或数量非正
    /// - OptimisticLockFailure: 追加期间单据被并发修改
    pub fn append_detail(
        &self,
        family: RecordFamily,
        header_id: i64,
        draft: &DetailDraft,
        actor: &str,
    ) -> ApiResult<RecordHeader> {
        let line = RecordValidator::validate_new_detail(draft)?;
        let outcome = NestedWriteCoordinator::new(self.record_repo.as_ref())
            .append(family, header_id, line)?;

        let appended = outcome.header.details.iter().find(|d| d.id == outcome.line_id);
        self.record_action(
            ActionLog::new(
                family,
                header_id,
                ActionType::AppendDetail,
                actor,
                appended.and_then(to_json),
            )
            .with_detail(format!("line_id={}", outcome.line_id)),
        );
        Ok(outcome.header)
    }

    // ==========================================
    // 操作日志
    // ==========================================

    /// 写入操作日志
    ///
    /// 主写入已提交,日志失败只告警不回滚
    fn record_action(&self, log: ActionLog) {
        if !self.settings.audit_enabled {
            return;
        }
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(
                family = %log.family,
                record_id = log.record_id,
                action_type = %log.action_type,
                error = %e,
                "操作日志写入失败"
            );
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Option<serde_json::Value> {
    serde_json::to_value(value).ok()
}
