// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的临时数据库、API 实例与草稿构造
// ==========================================
#![allow(dead_code)]

use std::error::Error;
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;
use warehouse_records::api::RecordApi;
use warehouse_records::config::EngineSettings;
use warehouse_records::db::{init_schema, open_sqlite_connection};
use warehouse_records::logging;
use warehouse_records::domain::{DetailDraft, HeaderDraft};
use warehouse_records::repository::{ActionLogRepository, SqliteRecordRepository};

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    logging::init_test();

    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是 UTF-8")?
        .to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 基于临时数据库创建 RecordApi（单据仓储与操作日志共享连接）
pub fn create_test_api(settings: EngineSettings) -> (NamedTempFile, Arc<RecordApi>) {
    let (temp_file, db_path) = create_test_db().unwrap();
    let conn = Arc::new(Mutex::new(open_sqlite_connection(&db_path).unwrap()));

    let api = RecordApi::new(
        Arc::new(SqliteRecordRepository::new(conn.clone())),
        Arc::new(ActionLogRepository::new(conn)),
        settings,
    );
    (temp_file, Arc::new(api))
}

// ==========================================
// 草稿构造
// ==========================================

pub fn order_draft(description: &str) -> HeaderDraft {
    HeaderDraft {
        description: Some(description.to_string()),
        requester: Some("Lin".to_string()),
        ..Default::default()
    }
}

pub fn import_draft(quantity: i64) -> HeaderDraft {
    HeaderDraft {
        user: Some("Ken".to_string()),
        quantity: Some(quantity.into()),
        ..Default::default()
    }
}

pub fn export_draft(user: &str) -> HeaderDraft {
    HeaderDraft {
        user: Some(user.to_string()),
        ..Default::default()
    }
}

pub fn borrow_draft(borrower: &str, item: &str) -> HeaderDraft {
    HeaderDraft {
        borrower: Some(borrower.to_string()),
        item: Some(item.to_string()),
        ..Default::default()
    }
}

pub fn repair_draft(item: &str) -> HeaderDraft {
    HeaderDraft {
        item: Some(item.to_string()),
        ..Default::default()
    }
}

pub fn detail(item: &str, quantity: i64) -> DetailDraft {
    DetailDraft::new(item, quantity)
}
