// ==========================================
// 仓库出入库单据系统 - 明细追加协调器
// ==========================================
// 流程: 读取单据头 → 分配新明细 id (max + 1) → 追加 → 整体更新
// 并发: 更新时携带读取到的修订号,被并发写入抢先时返回乐观锁冲突,
//       不会悄悄丢失另一方追加的明细
// ==========================================

use crate::domain::record::{DetailLine, HeaderPayload, RecordHeader};
use crate::domain::types::RecordFamily;
use crate::engine::duplicate_guard;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_repo::RecordRepository;
use tracing::{debug, info};

/// 一次追加的结果
#[derive(Debug, Clone)]
pub struct AppendOutcome {
    pub header: RecordHeader,
    pub line_id: i64,
}

/// 新明细 id: 现有最大 id + 1,无明细时为 1
///
/// 现有最大 id 已到 i64 上限时无法再分配,返回字段错误
pub fn next_detail_id(header: &RecordHeader) -> RepositoryResult<i64> {
    header
        .max_detail_id()
        .checked_add(1)
        .ok_or_else(|| RepositoryError::FieldValueError {
            field: "detail.id".to_string(),
            message: format!("单据{}的明细 id 已达上限,无法追加", header.id),
        })
}

/// 生成追加后的写入载荷（不落库）
pub fn plan_append(
    header: &RecordHeader,
    mut line: DetailLine,
) -> RepositoryResult<(HeaderPayload, i64)> {
    let line_id = next_detail_id(header)?;
    line.id = line_id;

    let mut payload = HeaderPayload::from_header(header);
    payload.details.push(line);
    Ok((payload, line_id))
}

pub struct NestedWriteCoordinator<'a> {
    repo: &'a dyn RecordRepository,
}

impl<'a> NestedWriteCoordinator<'a> {
    pub fn new(repo: &'a dyn RecordRepository) -> Self {
        Self { repo }
    }

    /// 向已有单据追加一条明细
    ///
    /// # 参数
    /// - line: 已校验的明细,其 id 会被覆盖
    ///
    /// # 返回
    /// - NotFound: 单据不存在
    /// - OptimisticLockFailure: 读取后单据已被修改
    pub fn append(
        &self,
        family: RecordFamily,
        header_id: i64,
        line: DetailLine,
    ) -> RepositoryResult<AppendOutcome> {
        let header = self
            .repo
            .find_by_id(family, header_id)?
            .ok_or_else(|| RepositoryError::record_not_found(family, header_id))?;

        let (payload, line_id) = plan_append(&header, line)?;
        debug!(
            family = %family,
            header_id,
            line_id,
            revision = header.revision,
            "追加明细"
        );

        let dup_key = duplicate_guard::header_key(&header);
        let header = self.repo.update(header_id, &payload, dup_key.as_deref())?;

        info!(
            family = %family,
            header_id,
            line_id,
            detail_count = header.details.len(),
            "明细追加完成"
        );
        Ok(AppendOutcome { header, line_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{HeaderFields, RepairFields};
    use crate::domain::types::RecordStatus;
    use chrono::NaiveDate;

    fn line(id: i64) -> DetailLine {
        DetailLine {
            id,
            item: "Toner".to_string(),
            item_codes: Vec::new(),
            quantity: 1,
            return_date: None,
            approver: None,
            comment: None,
            description: None,
        }
    }

    fn repair_with(details: Vec<DetailLine>) -> RecordHeader {
        let date = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        RecordHeader {
            id: 4,
            family: RecordFamily::Repair,
            date,
            status: RecordStatus::initial(RecordFamily::Repair),
            description: None,
            fields: HeaderFields::Repair(RepairFields {
                item: "Printer".to_string(),
                ..Default::default()
            }),
            details,
            revision: 3,
            updated_at: date.and_hms_opt(9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_next_detail_id() {
        assert_eq!(next_detail_id(&repair_with(vec![])).unwrap(), 1);
        assert_eq!(
            next_detail_id(&repair_with(vec![line(1), line(7), line(3)])).unwrap(),
            8
        );
    }

    #[test]
    fn test_next_detail_id_at_upper_bound() {
        let header = repair_with(vec![line(1), line(i64::MAX)]);
        assert!(matches!(
            next_detail_id(&header),
            Err(RepositoryError::FieldValueError { ref field, .. }) if field == "detail.id"
        ));
        assert!(plan_append(&header, line(0)).is_err());
    }

    #[test]
    fn test_plan_append_keeps_existing_lines_and_revision() {
        let header = repair_with(vec![line(1), line(2)]);
        let (payload, line_id) = plan_append(&header, line(0)).unwrap();

        assert_eq!(line_id, 3);
        assert_eq!(payload.expected_revision, Some(3));
        assert_eq!(
            payload.details.iter().map(|d| d.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(payload.fields, header.fields);
    }
}
