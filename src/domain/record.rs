// ==========================================
// 仓库出入库单据系统 - 单据头/明细领域模型
// ==========================================
// 聚合根: RecordHeader 独占其明细 (DetailLine)
// 红线: 明细不能脱离单据头独立存在,删除单据头即删除其明细
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::types::{RecordFamily, RecordStatus};

// ==========================================
// 各族单据头字段
// ==========================================
// 字段名即持久化名称,不可随意改名

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFields {
    pub requester: Option<String>, // 申请人
    pub supplier: Option<String>,  // 供应商
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFields {
    pub user: Option<String>, // 入库人
    pub quantity: i64,        // 入库数量
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFields {
    pub user: String,             // 领用人
    pub approver: Option<String>, // 审批人
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowFields {
    pub borrower: String,         // 借用人
    pub item: String,             // 借用物品
    pub approver: Option<String>, // 审批人
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairFields {
    pub item: String,              // 报修物品
    pub requester: Option<String>, // 报修人
    pub approver: Option<String>,  // 审批人
}

/// 单据头的族专属字段
///
/// 序列化时展开为平铺字段 (borrower / item / ...),不带额外标签
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HeaderFields {
    Order(OrderFields),
    Import(ImportFields),
    Export(ExportFields),
    Borrow(BorrowFields),
    Repair(RepairFields),
}

impl HeaderFields {
    pub fn family(&self) -> RecordFamily {
        match self {
            HeaderFields::Order(_) => RecordFamily::Order,
            HeaderFields::Import(_) => RecordFamily::Import,
            HeaderFields::Export(_) => RecordFamily::Export,
            HeaderFields::Borrow(_) => RecordFamily::Borrow,
            HeaderFields::Repair(_) => RecordFamily::Repair,
        }
    }

    /// 序列化为 fields_json 列
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// 按单据族从 fields_json 列还原
    pub fn from_json(family: RecordFamily, raw: &str) -> serde_json::Result<Self> {
        Ok(match family {
            RecordFamily::Order => HeaderFields::Order(serde_json::from_str(raw)?),
            RecordFamily::Import => HeaderFields::Import(serde_json::from_str(raw)?),
            RecordFamily::Export => HeaderFields::Export(serde_json::from_str(raw)?),
            RecordFamily::Borrow => HeaderFields::Borrow(serde_json::from_str(raw)?),
            RecordFamily::Repair => HeaderFields::Repair(serde_json::from_str(raw)?),
        })
    }

    /// 可检索字段的文本值（按展示顺序）
    pub fn searchable_values(&self) -> Vec<String> {
        let mut values = Vec::new();
        match self {
            HeaderFields::Order(f) => {
                values.extend(f.requester.clone());
                values.extend(f.supplier.clone());
            }
            HeaderFields::Import(f) => {
                values.extend(f.user.clone());
                values.push(f.quantity.to_string());
            }
            HeaderFields::Export(f) => {
                values.push(f.user.clone());
                values.extend(f.approver.clone());
            }
            HeaderFields::Borrow(f) => {
                values.push(f.borrower.clone());
                values.push(f.item.clone());
                values.extend(f.approver.clone());
            }
            HeaderFields::Repair(f) => {
                values.push(f.item.clone());
                values.extend(f.requester.clone());
                values.extend(f.approver.clone());
            }
        }
        values
    }
}

// ==========================================
// DetailLine - 明细行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailLine {
    pub id: i64,                          // 单据内唯一
    pub item: String,                     // 主物品标识
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item_codes: Vec<String>,          // 附加物品标识（序列号/资产编号）
    pub quantity: i64,                    // 正整数
    pub return_date: Option<NaiveDate>,   // 归还日期
    pub approver: Option<String>,         // 审批人
    pub comment: Option<String>,          // 备注
    pub description: Option<String>,      // 说明
}

// ==========================================
// RecordHeader - 单据头 (聚合根)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordHeader {
    pub id: i64,                          // 服务端分配,创建后不可变
    pub family: RecordFamily,             // 单据族
    pub date: NaiveDate,                  // 提交日期,创建后不可改
    pub status: Option<RecordStatus>,     // Import 为 None
    pub description: Option<String>,      // 说明
    #[serde(flatten)]
    pub fields: HeaderFields,             // 族专属字段
    pub details: Vec<DetailLine>,         // 明细（有序,独占）
    pub revision: i32,                    // 乐观锁：修订号
    pub updated_at: NaiveDateTime,        // 最后写入时间
}

impl RecordHeader {
    /// 当前明细最大 id（无明细为 0）
    pub fn max_detail_id(&self) -> i64 {
        self.details.iter().map(|d| d.id).max().unwrap_or(0)
    }

    /// 列表展示用: 去掉明细的浅拷贝
    pub fn without_details(&self) -> Self {
        Self {
            details: Vec::new(),
            ..self.clone()
        }
    }

    /// 转回可再次提交的草稿（用于读-改-写）
    pub fn to_draft(&self) -> HeaderDraft {
        let mut draft = HeaderDraft {
            status: self.status.map(|s| s.as_str().to_string()),
            description: self.description.clone(),
            revision: Some(self.revision),
            details: self.details.iter().map(DetailDraft::from).collect(),
            ..Default::default()
        };
        match &self.fields {
            HeaderFields::Order(f) => {
                draft.requester = f.requester.clone();
                draft.supplier = f.supplier.clone();
            }
            HeaderFields::Import(f) => {
                draft.user = f.user.clone();
                draft.quantity = Some(RawQuantity::Integer(f.quantity));
            }
            HeaderFields::Export(f) => {
                draft.user = Some(f.user.clone());
                draft.approver = f.approver.clone();
            }
            HeaderFields::Borrow(f) => {
                draft.borrower = Some(f.borrower.clone());
                draft.item = Some(f.item.clone());
                draft.approver = f.approver.clone();
            }
            HeaderFields::Repair(f) => {
                draft.item = Some(f.item.clone());
                draft.requester = f.requester.clone();
                draft.approver = f.approver.clone();
            }
        }
        draft
    }
}

// ==========================================
// 提交草稿（未校验的调用方输入）
// ==========================================

/// 数量输入: 允许数字或数字字符串
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawQuantity {
    Integer(i64),
    Text(String),
}

impl From<i64> for RawQuantity {
    fn from(value: i64) -> Self {
        RawQuantity::Integer(value)
    }
}

impl From<&str> for RawQuantity {
    fn from(value: &str) -> Self {
        RawQuantity::Text(value.to_string())
    }
}

/// 明细草稿
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailDraft {
    pub id: Option<i64>,
    pub item: Option<String>,
    #[serde(default)]
    pub item_codes: Vec<String>,
    pub quantity: Option<RawQuantity>,
    pub return_date: Option<NaiveDate>,
    pub approver: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,
}

impl DetailDraft {
    pub fn new(item: &str, quantity: impl Into<RawQuantity>) -> Self {
        Self {
            item: Some(item.to_string()),
            quantity: Some(quantity.into()),
            ..Default::default()
        }
    }
}

impl From<&DetailLine> for DetailDraft {
    fn from(line: &DetailLine) -> Self {
        Self {
            id: Some(line.id),
            item: Some(line.item.clone()),
            item_codes: line.item_codes.clone(),
            quantity: Some(RawQuantity::Integer(line.quantity)),
            return_date: line.return_date,
            approver: line.approver.clone(),
            comment: line.comment.clone(),
            description: line.description.clone(),
        }
    }
}

/// 单据头草稿
///
/// 所有族共用一个平铺结构;哪些字段必填由校验器按族决定。
/// `id` / `date` 即使出现在请求体中也会被忽略。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderDraft {
    pub status: Option<String>,
    pub description: Option<String>,
    pub requester: Option<String>,
    pub supplier: Option<String>,
    pub user: Option<String>,
    pub approver: Option<String>,
    pub borrower: Option<String>,
    pub item: Option<String>,
    pub quantity: Option<RawQuantity>,
    /// 乐观锁：期望的修订号（仅更新时使用,缺省则后写覆盖）
    pub revision: Option<i32>,
    #[serde(default)]
    pub details: Vec<DetailDraft>,
}

// ==========================================
// HeaderPayload - 校验通过的写入载荷
// ==========================================
// 由 api::validator 产生,仓储只接受该类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPayload {
    pub status: Option<RecordStatus>,
    pub description: Option<String>,
    pub fields: HeaderFields,
    pub details: Vec<DetailLine>,
    pub expected_revision: Option<i32>,
}

impl HeaderPayload {
    pub fn family(&self) -> RecordFamily {
        self.fields.family()
    }

    /// 以已存储单据为底稿,携带其修订号作为期望值
    pub fn from_header(header: &RecordHeader) -> Self {
        Self {
            status: header.status,
            description: header.description.clone(),
            fields: header.fields.clone(),
            details: header.details.clone(),
            expected_revision: Some(header.revision),
        }
    }
}
