// ==========================================
// 仓库出入库单据系统 - 单据数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（校验、状态判定、重复键计算均在上层）
// 红线: 单据头与明细作为一个整体读写（同一事务）
// ==========================================

mod core;
mod queries;


pub use self::core::SqliteRecordRepository;

use crate::domain::record::{HeaderPayload, RecordHeader};
use crate::domain::types::RecordFamily;
use crate::repository::error::RepositoryResult;
use chrono::NaiveDate;

// ==========================================
// RecordRepository Trait
// ==========================================
// 五个单据族共用同一套存取契约,按 family 参数区分
// 实现者: SqliteRecordRepository
pub trait RecordRepository: Send + Sync {
    /// 查询单据族下全部单据头（含明细）,按 id 升序
    ///
    /// 每次调用都重新查询当前状态,不保留游标
    fn list(&self, family: RecordFamily) -> RepositoryResult<Vec<RecordHeader>>;

    /// 按 id 查询单据头（含明细）
    ///
    /// # 返回
    /// - `Ok(None)`: 该族下不存在此 id
    fn find_by_id(&self, family: RecordFamily, id: i64) -> RepositoryResult<Option<RecordHeader>>;

    /// 新建单据头及其明细
    ///
    /// # 参数
    /// - `date`: 提交日期（由调用方按提交时刻盖章）
    /// - `dup_key`: 重复校验键;存在同族同键的单据时返回 `DuplicateRecord` 且不写入
    fn insert(
        &self,
        payload: &HeaderPayload,
        date: NaiveDate,
        dup_key: Option<&str>,
    ) -> RepositoryResult<RecordHeader>;

    /// 覆盖单据头字段并整体替换明细集合
    ///
    /// # 错误
    /// - `NotFound`: 该族下不存在此 id
    /// - `OptimisticLockFailure`: payload 带期望修订号且与当前不一致
    fn update(
        &self,
        id: i64,
        payload: &HeaderPayload,
        dup_key: Option<&str>,
    ) -> RepositoryResult<RecordHeader>;

    /// 删除单据头（级联删除明细）
    fn delete(&self, family: RecordFamily, id: i64) -> RepositoryResult<()>;

    /// 统计仍归属某单据头 id 的明细行数
    fn count_details(&self, header_id: i64) -> RepositoryResult<usize>;
}
