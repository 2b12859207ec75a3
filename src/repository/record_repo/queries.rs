use crate::domain::record::{DetailLine, HeaderFields, RecordHeader};
use crate::domain::types::{RecordFamily, RecordStatus};
use crate::repository::error::RepositoryResult;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::collections::HashMap;

pub(super) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(super) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const HEADER_COLUMNS: &str =
    "id, record_date, status, description, fields_json, revision, updated_at";

const DETAIL_COLUMNS: &str = "d.header_id, d.line_id, d.item, d.item_codes_json, d.quantity, \
                              d.return_date, d.approver, d.comment, d.description";

fn conversion_error(
    col: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, Type::Text, Box::new(err))
}

/// 存储中的状态文本不属于该族词表
#[derive(Debug)]
struct StoredStatusError(String);

impl std::fmt::Display for StoredStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "存储状态值不合法: {}", self.0)
    }
}

impl std::error::Error for StoredStatusError {}

/// 映射数据库行到单据头（不含明细）
fn map_header_row(family: RecordFamily, row: &Row) -> SqliteResult<RecordHeader> {
    let status = match row.get::<_, Option<String>>(2)? {
        Some(raw) => Some(
            RecordStatus::parse(family, &raw)
                .ok_or_else(|| conversion_error(2, StoredStatusError(raw)))?,
        ),
        None => None,
    };

    let fields_json: String = row.get(4)?;
    let fields = HeaderFields::from_json(family, &fields_json).map_err(|e| conversion_error(4, e))?;

    Ok(RecordHeader {
        id: row.get(0)?,
        family,
        date: NaiveDate::parse_from_str(&row.get::<_, String>(1)?, DATE_FORMAT)
            .map_err(|e| conversion_error(1, e))?,
        status,
        description: row.get(3)?,
        fields,
        details: Vec::new(),
        revision: row.get(5)?,
        updated_at: NaiveDateTime::parse_from_str(&row.get::<_, String>(6)?, TIMESTAMP_FORMAT)
            .map_err(|e| conversion_error(6, e))?,
    })
}

/// 映射数据库行到 (header_id, 明细)
fn map_detail_row(row: &Row) -> SqliteResult<(i64, DetailLine)> {
    let item_codes = match row.get::<_, Option<String>>(3)? {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| conversion_error(3, e))?,
        None => Vec::new(),
    };

    let line = DetailLine {
        id: row.get(1)?,
        item: row.get(2)?,
        item_codes,
        quantity: row.get(4)?,
        return_date: row
            .get::<_, Option<String>>(5)?
            .map(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT))
            .transpose()
            .map_err(|e| conversion_error(5, e))?,
        approver: row.get(6)?,
        comment: row.get(7)?,
        description: row.get(8)?,
    };

    Ok((row.get(0)?, line))
}

/// 查询单个单据头及其明细
pub(super) fn load_header(
    conn: &Connection,
    family: RecordFamily,
    id: i64,
) -> RepositoryResult<Option<RecordHeader>> {
    let sql = format!(
        "SELECT {} FROM record_header WHERE id = ?1 AND family = ?2",
        HEADER_COLUMNS
    );
    let header = conn
        .query_row(&sql, params![id, family.as_str()], |row| map_header_row(family, row))
        .optional()?;

    let Some(mut header) = header else {
        return Ok(None);
    };

    let sql = format!(
        "SELECT {} FROM record_detail d WHERE d.header_id = ?1 ORDER BY d.seq_no",
        DETAIL_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    header.details = stmt
        .query_map(params![id], map_detail_row)?
        .map(|r| r.map(|(_, line)| line))
        .collect::<SqliteResult<Vec<_>>>()?;

    Ok(Some(header))
}

/// 查询单据族下全部单据头及明细（两次查询后按 header_id 归并）
pub(super) fn load_family(
    conn: &Connection,
    family: RecordFamily,
) -> RepositoryResult<Vec<RecordHeader>> {
    let sql = format!(
        "SELECT {} FROM record_header WHERE family = ?1 ORDER BY id",
        HEADER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut headers = stmt
        .query_map(params![family.as_str()], |row| map_header_row(family, row))?
        .collect::<SqliteResult<Vec<_>>>()?;

    let sql = format!(
        r#"SELECT {} FROM record_detail d
           INNER JOIN record_header h ON h.id = d.header_id
           WHERE h.family = ?1
           ORDER BY d.header_id, d.seq_no"#,
        DETAIL_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut details_by_header: HashMap<i64, Vec<DetailLine>> = HashMap::new();
    for row in stmt.query_map(params![family.as_str()], map_detail_row)? {
        let (header_id, line) = row?;
        details_by_header.entry(header_id).or_default().push(line);
    }

    for header in headers.iter_mut() {
        if let Some(details) = details_by_header.remove(&header.id) {
            header.details = details;
        }
    }

    Ok(headers)
}
