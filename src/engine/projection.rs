// ==========================================
// 仓库出入库单据系统 - 列表投影
// ==========================================
// 职责: 过滤 / 分页 / CSV 导出,纯内存计算,不访问存储
// 过滤: 大小写不敏感的子串匹配,空过滤条件匹配全部
// ==========================================

use crate::domain::record::{RawQuantity, RecordHeader};
use serde::Serialize;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("分页大小必须为正整数")]
    InvalidPageSize,
}

/// 列表投影参数
#[derive(Debug, Clone, Copy)]
pub struct ListingProjection {
    /// 过滤是否同时检索明细 (item / item_codes / comment)
    pub search_details: bool,
    /// 单页上限,超出时截断
    pub max_page_size: usize,
}

impl Default for ListingProjection {
    fn default() -> Self {
        Self {
            search_details: false,
            max_page_size: 200,
        }
    }
}

/// 单页结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingPage {
    pub items: Vec<RecordHeader>,
    pub total: usize,
    pub page: usize,
    pub size: usize,
    pub page_count: usize,
}

impl ListingProjection {
    pub fn new(search_details: bool, max_page_size: usize) -> Self {
        Self {
            search_details,
            max_page_size,
        }
    }

    /// 单据头参与检索的文本
    pub fn searchable_text(&self, header: &RecordHeader) -> Vec<String> {
        let mut values = vec![
            header.id.to_string(),
            header.date.format("%Y-%m-%d").to_string(),
        ];
        if let Some(status) = header.status {
            values.push(status.as_str().to_string());
        }
        if let Some(description) = &header.description {
            values.push(description.clone());
        }
        values.extend(header.fields.searchable_values());

        if self.search_details {
            for line in &header.details {
                values.push(line.item.clone());
                values.extend(line.item_codes.iter().cloned());
                if let Some(comment) = &line.comment {
                    values.push(comment.clone());
                }
            }
        }
        values
    }

    pub fn matches(&self, header: &RecordHeader, filter: &str) -> bool {
        let needle = filter.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.searchable_text(header)
            .iter()
            .any(|value| value.to_lowercase().contains(&needle))
    }

    /// 过滤,保持原有顺序
    pub fn filter(&self, headers: Vec<RecordHeader>, filter: Option<&str>) -> Vec<RecordHeader> {
        match filter {
            Some(f) if !f.trim().is_empty() => headers
                .into_iter()
                .filter(|h| self.matches(h, f))
                .collect(),
            _ => headers,
        }
    }

    /// 分页（page 从 0 开始）
    ///
    /// 超出末页返回空 items,但 total / page_count 仍然有效
    pub fn paginate(
        &self,
        headers: Vec<RecordHeader>,
        page: usize,
        size: usize,
    ) -> Result<ListingPage, ProjectionError> {
        if size == 0 {
            return Err(ProjectionError::InvalidPageSize);
        }
        let size = size.min(self.max_page_size.max(1));
        let total = headers.len();
        let page_count = total.div_ceil(size);
        let items = headers
            .into_iter()
            .skip(page.saturating_mul(size))
            .take(size)
            .collect();

        Ok(ListingPage {
            items,
            total,
            page,
            size,
            page_count,
        })
    }
}

const CSV_COLUMNS: [&str; 14] = [
    "id",
    "family",
    "date",
    "status",
    "description",
    "requester",
    "supplier",
    "user",
    "borrower",
    "item",
    "approver",
    "quantity",
    "detail_count",
    "detail_quantity",
];

/// 导出单据头为 CSV（每张单据一行,明细汇总为行数和数量合计）
pub fn write_csv<W: Write>(headers: &[RecordHeader], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_COLUMNS)?;

    for header in headers {
        let draft = header.to_draft();
        let quantity = match draft.quantity {
            Some(RawQuantity::Integer(q)) => q.to_string(),
            Some(RawQuantity::Text(t)) => t,
            None => String::new(),
        };
        let detail_quantity: i64 = header.details.iter().map(|d| d.quantity).sum();

        wtr.write_record([
            header.id.to_string(),
            header.family.as_str().to_string(),
            header.date.format("%Y-%m-%d").to_string(),
            header.status.map(|s| s.as_str().to_string()).unwrap_or_default(),
            header.description.clone().unwrap_or_default(),
            draft.requester.unwrap_or_default(),
            draft.supplier.unwrap_or_default(),
            draft.user.unwrap_or_default(),
            draft.borrower.unwrap_or_default(),
            draft.item.unwrap_or_default(),
            draft.approver.unwrap_or_default(),
            quantity,
            header.details.len().to_string(),
            detail_quantity.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
