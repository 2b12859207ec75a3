// ==========================================
// 仓库出入库单据系统 - 单据校验器
// ==========================================
// 职责: 把调用方草稿 (HeaderDraft / DetailDraft) 校验为写入载荷
// 必填字段:
// - Order : description
// - Import: quantity (> 0),不接受 status
// - Export: user
// - Borrow: borrower, item
// - Repair: item
// - 明细  : item, quantity (> 0);明细 id 单据内唯一
// 所有违规一次性收集后返回,不在第一条违规处中断
// ==========================================

use std::collections::HashSet;

use crate::api::error::{ApiError, ApiResult, ValidationViolation};
use crate::domain::record::{
    BorrowFields, DetailDraft, DetailLine, ExportFields, HeaderDraft, HeaderFields, HeaderPayload,
    ImportFields, OrderFields, RawQuantity, RecordHeader, RepairFields,
};
use crate::domain::types::{RecordFamily, RecordStatus};
use crate::engine::status_machine::{self, StatusError};

// ==========================================
// RecordValidator - 单据校验器
// ==========================================

/// 单据校验器（无状态）
pub struct RecordValidator;

impl RecordValidator {
    /// 校验新建草稿
    ///
    /// 未提交状态时取该族初始状态
    pub fn validate_create(family: RecordFamily, draft: &HeaderDraft) -> ApiResult<HeaderPayload> {
        let status = status_machine::resolve_initial(family, draft.status.as_deref());
        build_payload(family, draft, status)
    }

    /// 校验编辑草稿
    ///
    /// 未提交状态时保持当前状态;`date` 不在草稿中,始终保留已存储的值
    pub fn validate_update(
        current: &RecordHeader,
        draft: &HeaderDraft,
    ) -> ApiResult<HeaderPayload> {
        let requested = draft.status.as_deref();
        let status = status_machine::transition(current.family, current.status, requested)
            .map(|change| change.to);
        build_payload(current.family, draft, status)
    }

    /// 校验单条追加明细（id 由协调器分配）
    pub fn validate_new_detail(draft: &DetailDraft) -> ApiResult<DetailLine> {
        let mut violations = Vec::new();
        let line = validate_detail(draft, "detail", 0, &mut violations);
        finish(violations)?;
        Ok(line)
    }
}

/// 解析数量: 接受整数或整数文本,必须为正
pub fn parse_quantity(raw: Option<&RawQuantity>) -> Result<i64, String> {
    let value = match raw {
        None => return Err("数量必填".to_string()),
        Some(RawQuantity::Integer(q)) => *q,
        Some(RawQuantity::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err("数量必填".to_string());
            }
            trimmed
                .parse::<i64>()
                .map_err(|_| format!("数量不是整数: {}", text))?
        }
    };

    if value <= 0 {
        return Err(format!("数量必须为正整数: {}", value));
    }
    Ok(value)
}

// ==========================================
// 内部实现
// ==========================================

/// 去首尾空白,空串视为缺省
fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn required(
    value: &Option<String>,
    field: &str,
    violations: &mut Vec<ValidationViolation>,
) -> String {
    clean(value).unwrap_or_else(|| {
        violations.push(ValidationViolation::new(field, "必填字段不能为空"));
        String::new()
    })
}

fn build_payload(
    family: RecordFamily,
    draft: &HeaderDraft,
    status: Result<Option<RecordStatus>, StatusError>,
) -> ApiResult<HeaderPayload> {
    let mut violations = Vec::new();

    let status = status.unwrap_or_else(|e| {
        violations.push(ValidationViolation::new("status", e.to_string()));
        None
    });

    let description = clean(&draft.description);
    if family == RecordFamily::Order && description.is_none() {
        violations.push(ValidationViolation::new("description", "必填字段不能为空"));
    }

    let fields = match family {
        RecordFamily::Order => HeaderFields::Order(OrderFields {
            requester: clean(&draft.requester),
            supplier: clean(&draft.supplier),
        }),
        RecordFamily::Import => {
            let quantity = parse_quantity(draft.quantity.as_ref()).unwrap_or_else(|reason| {
                violations.push(ValidationViolation::new("quantity", reason));
                0
            });
            HeaderFields::Import(ImportFields {
                user: clean(&draft.user),
                quantity,
            })
        }
        RecordFamily::Export => HeaderFields::Export(ExportFields {
            user: required(&draft.user, "user", &mut violations),
            approver: clean(&draft.approver),
        }),
        RecordFamily::Borrow => HeaderFields::Borrow(BorrowFields {
            borrower: required(&draft.borrower, "borrower", &mut violations),
            item: required(&draft.item, "item", &mut violations),
            approver: clean(&draft.approver),
        }),
        RecordFamily::Repair => HeaderFields::Repair(RepairFields {
            item: required(&draft.item, "item", &mut violations),
            requester: clean(&draft.requester),
            approver: clean(&draft.approver),
        }),
    };

    let details = validate_details(&draft.details, &mut violations);

    finish(violations)?;
    Ok(HeaderPayload {
        status,
        description,
        fields,
        details,
        expected_revision: draft.revision,
    })
}

/// 校验明细集合并补齐缺省 id（从已给出的最大 id 之后顺延）
fn validate_details(
    drafts: &[DetailDraft],
    violations: &mut Vec<ValidationViolation>,
) -> Vec<DetailLine> {
    let mut next_id = drafts
        .iter()
        .filter_map(|d| d.id)
        .filter(|id| *id > 0)
        .max()
        .unwrap_or(0);
    let mut seen = HashSet::new();
    let mut lines = Vec::with_capacity(drafts.len());

    for (index, draft) in drafts.iter().enumerate() {
        let prefix = format!("details[{}]", index);
        let id = match draft.id {
            Some(id) if id <= 0 => {
                violations.push(ValidationViolation::new(
                    format!("{}.id", prefix),
                    format!("明细 id 必须为正整数: {}", id),
                ));
                id
            }
            Some(id) => id,
            None => match next_id.checked_add(1) {
                Some(id) => {
                    next_id = id;
                    id
                }
                None => {
                    violations.push(ValidationViolation::new(
                        format!("{}.id", prefix),
                        "明细 id 已达上限,无法顺延分配",
                    ));
                    continue;
                }
            },
        };
        if !seen.insert(id) {
            violations.push(ValidationViolation::new(
                format!("{}.id", prefix),
                format!("明细 id 重复: {}", id),
            ));
        }
        lines.push(validate_detail(draft, &prefix, id, violations));
    }
    lines
}

fn validate_detail(
    draft: &DetailDraft,
    prefix: &str,
    id: i64,
    violations: &mut Vec<ValidationViolation>,
) -> DetailLine {
    let item = required(&draft.item, &format!("{}.item", prefix), violations);
    let quantity = parse_quantity(draft.quantity.as_ref()).unwrap_or_else(|reason| {
        violations.push(ValidationViolation::new(format!("{}.quantity", prefix), reason));
        0
    });
    let item_codes = draft
        .item_codes
        .iter()
        .map(|code| code.trim())
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect();

    DetailLine {
        id,
        item,
        item_codes,
        quantity,
        return_date: draft.return_date,
        approver: clean(&draft.approver),
        comment: clean(&draft.comment),
        description: clean(&draft.description),
    }
}

fn finish(violations: Vec<ValidationViolation>) -> ApiResult<()> {
    if violations.is_empty() {
        return Ok(());
    }
    let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
    Err(ApiError::ValidationError {
        reason: format!("字段校验未通过: {}", fields.join(", ")),
        violations,
    })
}
