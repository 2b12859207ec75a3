// ==========================================
// 仓库出入库单据系统 - 领域类型定义
// ==========================================
// 单据族 (Family) 与各族状态词表
// 红线: 状态值必须属于所属单据族的状态集合,其他值不可表示
// 持久化格式: 与既有数据保持一致 ("Pending" / "In Progress" ...)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 单据族 (Record Family)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFamily {
    Order,  // 采购订单
    Import, // 入库
    Export, // 出库
    Borrow, // 借用
    Repair, // 维修
}

impl RecordFamily {
    /// 全部单据族（固定顺序）
    pub const ALL: [RecordFamily; 5] = [
        RecordFamily::Order,
        RecordFamily::Import,
        RecordFamily::Export,
        RecordFamily::Borrow,
        RecordFamily::Repair,
    ];

    /// 存储/路由使用的小写名称
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordFamily::Order => "order",
            RecordFamily::Import => "import",
            RecordFamily::Export => "export",
            RecordFamily::Borrow => "borrow",
            RecordFamily::Repair => "repair",
        }
    }

    /// 该族是否建模状态 (Import 不建模)
    pub fn has_status(&self) -> bool {
        !matches!(self, RecordFamily::Import)
    }
}

impl fmt::Display for RecordFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 单据族解析失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFamily(pub String);

impl fmt::Display for UnknownFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "未知单据族: {}", self.0)
    }
}

impl std::error::Error for UnknownFamily {}

impl FromStr for RecordFamily {
    type Err = UnknownFamily;

    /// 大小写不敏感,接受复数形式 (orders / borrows ...)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let singular = normalized.strip_suffix('s').unwrap_or(&normalized);
        match singular {
            "order" => Ok(RecordFamily::Order),
            "import" => Ok(RecordFamily::Import),
            "export" => Ok(RecordFamily::Export),
            "borrow" => Ok(RecordFamily::Borrow),
            "repair" => Ok(RecordFamily::Repair),
            _ => Err(UnknownFamily(s.to_string())),
        }
    }
}

// ==========================================
// 各族状态词表
// ==========================================
// 每个状态枚举提供: 规范拼写 as_str / 全集 ALL / 宽松解析 parse

/// 按规范拼写宽松匹配（忽略首尾空白与大小写）
fn match_vocabulary<T: Copy>(value: &str, all: &[T], spell: fn(&T) -> &'static str) -> Option<T> {
    let wanted = value.trim();
    all.iter()
        .find(|candidate| spell(candidate).eq_ignore_ascii_case(wanted))
        .copied()
}

// ===== 采购订单状态 =====
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match_vocabulary(value, &Self::ALL, Self::as_str)
    }
}

// ===== 出库状态 =====
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportStatus {
    Pending,
    Exported,
    Received,
    Overdue,
}

impl ExportStatus {
    pub const ALL: [ExportStatus; 4] = [
        ExportStatus::Pending,
        ExportStatus::Exported,
        ExportStatus::Received,
        ExportStatus::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::Pending => "Pending",
            ExportStatus::Exported => "Exported",
            ExportStatus::Received => "Received",
            ExportStatus::Overdue => "Overdue",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match_vocabulary(value, &Self::ALL, Self::as_str)
    }
}

// ===== 借用状态 =====
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BorrowStatus {
    Pending,
    Borrowed,
    Returned,
    Overdue,
}

impl BorrowStatus {
    pub const ALL: [BorrowStatus; 4] = [
        BorrowStatus::Pending,
        BorrowStatus::Borrowed,
        BorrowStatus::Returned,
        BorrowStatus::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Pending => "Pending",
            BorrowStatus::Borrowed => "Borrowed",
            BorrowStatus::Returned => "Returned",
            BorrowStatus::Overdue => "Overdue",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match_vocabulary(value, &Self::ALL, Self::as_str)
    }
}

// ===== 维修状态 =====
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepairStatus {
    Pending,
    Approved,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Rejected,
}

impl RepairStatus {
    pub const ALL: [RepairStatus; 5] = [
        RepairStatus::Pending,
        RepairStatus::Approved,
        RepairStatus::InProgress,
        RepairStatus::Completed,
        RepairStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RepairStatus::Pending => "Pending",
            RepairStatus::Approved => "Approved",
            RepairStatus::InProgress => "In Progress",
            RepairStatus::Completed => "Completed",
            RepairStatus::Rejected => "Rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match_vocabulary(value, &Self::ALL, Self::as_str)
    }
}

// ==========================================
// RecordStatus - 单据族 × 状态 (tagged union)
// ==========================================
// 构造只能经由 RecordStatus::parse / initial,族与状态不会错配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordStatus {
    Order(OrderStatus),
    Export(ExportStatus),
    Borrow(BorrowStatus),
    Repair(RepairStatus),
}

impl RecordStatus {
    /// 按单据族解析状态文本
    ///
    /// # 返回
    /// - Some(RecordStatus): 属于该族状态集合
    /// - None: 不属于该族,或该族不建模状态 (Import)
    pub fn parse(family: RecordFamily, value: &str) -> Option<Self> {
        match family {
            RecordFamily::Order => OrderStatus::parse(value).map(RecordStatus::Order),
            RecordFamily::Export => ExportStatus::parse(value).map(RecordStatus::Export),
            RecordFamily::Borrow => BorrowStatus::parse(value).map(RecordStatus::Borrow),
            RecordFamily::Repair => RepairStatus::parse(value).map(RecordStatus::Repair),
            RecordFamily::Import => None,
        }
    }

    /// 单据族的初始状态 (Import 无)
    pub fn initial(family: RecordFamily) -> Option<Self> {
        match family {
            RecordFamily::Order => Some(RecordStatus::Order(OrderStatus::Pending)),
            RecordFamily::Export => Some(RecordStatus::Export(ExportStatus::Pending)),
            RecordFamily::Borrow => Some(RecordStatus::Borrow(BorrowStatus::Pending)),
            RecordFamily::Repair => Some(RecordStatus::Repair(RepairStatus::Pending)),
            RecordFamily::Import => None,
        }
    }

    /// 单据族的全部合法状态（规范拼写）
    pub fn vocabulary(family: RecordFamily) -> Vec<&'static str> {
        match family {
            RecordFamily::Order => OrderStatus::ALL.iter().map(OrderStatus::as_str).collect(),
            RecordFamily::Export => ExportStatus::ALL.iter().map(ExportStatus::as_str).collect(),
            RecordFamily::Borrow => BorrowStatus::ALL.iter().map(BorrowStatus::as_str).collect(),
            RecordFamily::Repair => RepairStatus::ALL.iter().map(RepairStatus::as_str).collect(),
            RecordFamily::Import => Vec::new(),
        }
    }

    pub fn family(&self) -> RecordFamily {
        match self {
            RecordStatus::Order(_) => RecordFamily::Order,
            RecordStatus::Export(_) => RecordFamily::Export,
            RecordStatus::Borrow(_) => RecordFamily::Borrow,
            RecordStatus::Repair(_) => RecordFamily::Repair,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Order(s) => s.as_str(),
            RecordStatus::Export(s) => s.as_str(),
            RecordStatus::Borrow(s) => s.as_str(),
            RecordStatus::Repair(s) => s.as_str(),
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// 序列化为规范拼写的纯字符串;反序列化需要族上下文,由 RecordHeader 负责
impl Serialize for RecordStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
