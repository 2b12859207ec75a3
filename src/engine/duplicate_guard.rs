// ==========================================
// 仓库出入库单据系统 - 重复单据校验
// ==========================================
// 各族唯一键（大小写不敏感,首尾空白忽略）:
// - Order : date + description
// - Borrow: borrower
// - Export: user
// - Repair: item
// - Import: 不校验
// 仅在创建时校验,不回溯约束后续编辑
// ==========================================

use crate::domain::record::{HeaderFields, RecordHeader};
use chrono::NaiveDate;

/// 键值规范化
pub fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// 计算单据族唯一键
///
/// # 返回
/// - None: 该族不做重复校验 (Import)
pub fn uniqueness_key(
    date: NaiveDate,
    description: Option<&str>,
    fields: &HeaderFields,
) -> Option<String> {
    match fields {
        HeaderFields::Order(_) => Some(format!(
            "{}|{}",
            date.format("%Y-%m-%d"),
            normalize_key(description.unwrap_or_default())
        )),
        HeaderFields::Borrow(f) => Some(normalize_key(&f.borrower)),
        HeaderFields::Export(f) => Some(normalize_key(&f.user)),
        HeaderFields::Repair(f) => Some(normalize_key(&f.item)),
        HeaderFields::Import(_) => None,
    }
}

/// 已存储单据的唯一键
pub fn header_key(header: &RecordHeader) -> Option<String> {
    uniqueness_key(header.date, header.description.as_deref(), &header.fields)
}

/// 在已加载的同族单据中查找与候选键冲突的单据
pub fn find_collision<'a>(key: &str, existing: &'a [RecordHeader]) -> Option<&'a RecordHeader> {
    existing
        .iter()
        .find(|header| header_key(header).as_deref() == Some(key))
}
