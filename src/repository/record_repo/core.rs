use super::queries::{self, DATE_FORMAT, TIMESTAMP_FORMAT};
use super::RecordRepository;
use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::record::{DetailLine, HeaderPayload, RecordHeader};
use crate::domain::types::RecordFamily;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::debug;

// ==========================================
// SqliteRecordRepository - 单据仓储 (SQLite)
// ==========================================
pub struct SqliteRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordRepository {
    /// 基于共享连接创建仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 打开数据库文件并确保表结构存在
    pub fn from_path(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

fn now_timestamp() -> String {
    chrono::Local::now()
        .naive_local()
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// 按顺序写入明细 (seq_no 保持提交顺序)
fn insert_details(
    conn: &Connection,
    header_id: i64,
    details: &[DetailLine],
) -> RepositoryResult<()> {
    let mut stmt = conn.prepare(
        r#"INSERT INTO record_detail (
            header_id, line_id, seq_no, item, item_codes_json, quantity,
            return_date, approver, comment, description
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
    )?;

    for (seq_no, line) in details.iter().enumerate() {
        let item_codes_json = if line.item_codes.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&line.item_codes)?)
        };
        stmt.execute(params![
            header_id,
            line.id,
            seq_no as i64,
            &line.item,
            item_codes_json,
            line.quantity,
            line.return_date.map(|d| d.format(DATE_FORMAT).to_string()),
            &line.approver,
            &line.comment,
            &line.description,
        ])?;
    }

    Ok(())
}

impl RecordRepository for SqliteRecordRepository {
    fn list(&self, family: RecordFamily) -> RepositoryResult<Vec<RecordHeader>> {
        let conn = self.get_conn()?;
        queries::load_family(&conn, family)
    }

    fn find_by_id(&self, family: RecordFamily, id: i64) -> RepositoryResult<Option<RecordHeader>> {
        let conn = self.get_conn()?;
        queries::load_header(&conn, family, id)
    }

    fn insert(
        &self,
        payload: &HeaderPayload,
        date: NaiveDate,
        dup_key: Option<&str>,
    ) -> RepositoryResult<RecordHeader> {
        let family = payload.family();
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        // 重复校验与插入在同一事务内
        if let Some(key) = dup_key {
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM record_header WHERE family = ?1 AND dup_key = ?2 LIMIT 1",
                    params![family.as_str(), key],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(existing_id) = existing {
                debug!(family = %family, existing_id, key, "重复键命中");
                return Err(RepositoryError::DuplicateRecord {
                    family: family.to_string(),
                    key: key.to_string(),
                });
            }
        }

        tx.execute(
            r#"INSERT INTO record_header (
                family, record_date, status, description, fields_json,
                dup_key, revision, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)"#,
            params![
                family.as_str(),
                date.format(DATE_FORMAT).to_string(),
                payload.status.map(|s| s.as_str()),
                &payload.description,
                payload.fields.to_json()?,
                dup_key,
                now_timestamp(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        insert_details(&tx, id, &payload.details)?;

        let stored = queries::load_header(&tx, family, id)?.ok_or_else(|| {
            RepositoryError::DatabaseTransactionError(format!("新建单据回读失败: id={}", id))
        })?;
        tx.commit()?;

        Ok(stored)
    }

    fn update(
        &self,
        id: i64,
        payload: &HeaderPayload,
        dup_key: Option<&str>,
    ) -> RepositoryResult<RecordHeader> {
        let family = payload.family();
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let actual: i32 = tx
            .query_row(
                "SELECT revision FROM record_header WHERE id = ?1 AND family = ?2",
                params![id, family.as_str()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| RepositoryError::record_not_found(family, id))?;

        if let Some(expected) = payload.expected_revision {
            if expected != actual {
                return Err(RepositoryError::OptimisticLockFailure {
                    record_id: id,
                    expected,
                    actual,
                });
            }
        }

        tx.execute(
            r#"UPDATE record_header
               SET status = ?1, description = ?2, fields_json = ?3, dup_key = ?4,
                   revision = revision + 1, updated_at = ?5
               WHERE id = ?6 AND family = ?7"#,
            params![
                payload.status.map(|s| s.as_str()),
                &payload.description,
                payload.fields.to_json()?,
                dup_key,
                now_timestamp(),
                id,
                family.as_str(),
            ],
        )?;

        // 明细整体替换,不做合并
        tx.execute("DELETE FROM record_detail WHERE header_id = ?1", params![id])?;
        insert_details(&tx, id, &payload.details)?;

        let stored = queries::load_header(&tx, family, id)?
            .ok_or_else(|| RepositoryError::record_not_found(family, id))?;
        tx.commit()?;

        Ok(stored)
    }

    fn delete(&self, family: RecordFamily, id: i64) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM record_header WHERE id = ?1 AND family = ?2",
                params![id, family.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(RepositoryError::record_not_found(family, id));
        }

        // 外键级联之外显式删除明细,连接未开启 foreign_keys 时同样成立
        let removed = tx.execute("DELETE FROM record_detail WHERE header_id = ?1", params![id])?;
        tx.execute(
            "DELETE FROM record_header WHERE id = ?1 AND family = ?2",
            params![id, family.as_str()],
        )?;
        tx.commit()?;

        debug!(family = %family, record_id = id, removed_details = removed, "单据已删除");
        Ok(())
    }

    fn count_details(&self, header_id: i64) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM record_detail WHERE header_id = ?1",
            params![header_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
