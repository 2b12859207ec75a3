use super::core::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::types::RecordFamily;
use crate::repository::error::RepositoryResult;
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str =
    "action_id, family, record_id, action_type, action_ts, actor, payload_json, detail";

impl ActionLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 查询某张单据的全部操作日志（按时间升序）
    pub fn find_by_record(
        &self,
        family: RecordFamily,
        record_id: i64,
    ) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;

        let sql = format!(
            "SELECT {} FROM action_log WHERE family = ? AND record_id = ? \
             ORDER BY action_ts, rowid",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let logs = stmt
            .query_map(params![family.as_str(), record_id], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    /// 查询指定操作人的日志
    pub fn find_by_actor(&self, actor: &str, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;

        let sql = format!(
            "SELECT {} FROM action_log WHERE actor = ? ORDER BY action_ts DESC, rowid DESC LIMIT ?",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let logs = stmt
            .query_map(params![actor, limit], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    /// 查询最近的 N 条日志
    pub fn find_recent(&self, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;

        let sql = format!(
            "SELECT {} FROM action_log ORDER BY action_ts DESC, rowid DESC LIMIT ?",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let logs = stmt
            .query_map(params![limit], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    /// 统计日志总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM action_log", [], |row| row.get(0))?;
        Ok(count)
    }

    /// 映射数据库行到ActionLog对象
    fn map_row(&self, row: &Row) -> SqliteResult<ActionLog> {
        let family_raw: String = row.get(1)?;
        let family = family_raw
            .parse::<RecordFamily>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

        let action_type_raw: String = row.get(3)?;
        let action_type = ActionType::parse(&action_type_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Text,
                format!("未知操作类型: {}", action_type_raw).into(),
            )
        })?;

        let action_ts_str: String = row.get(4)?;
        let action_ts = NaiveDateTime::parse_from_str(&action_ts_str, "%Y-%m-%d %H:%M:%S")
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

        let payload_json = row
            .get::<_, Option<String>>(6)?
            .and_then(|s| serde_json::from_str(&s).ok());

        Ok(ActionLog {
            action_id: row.get(0)?,
            family,
            record_id: row.get(2)?,
            action_type,
            action_ts,
            actor: row.get(5)?,
            payload_json,
            detail: row.get(7)?,
        })
    }
}
