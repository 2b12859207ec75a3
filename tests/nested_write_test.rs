// ==========================================
// 明细追加协调器集成测试
// ==========================================
// 职责: 验证追加明细的 id 分配、不存在单据、读后被改的冲突
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod nested_write_test {
    use std::sync::{Arc, Mutex};

    use chrono::NaiveDate;
    use warehouse_records::api::RecordValidator;
    use warehouse_records::db::open_sqlite_connection;
    use warehouse_records::domain::{
        DetailLine, HeaderDraft, HeaderPayload, RecordFamily, RecordHeader,
    };
    use warehouse_records::engine::NestedWriteCoordinator;
    use warehouse_records::repository::{
        RecordRepository, RepositoryError, RepositoryResult, SqliteRecordRepository,
    };

    use crate::test_helpers::create_test_db;

    fn open_repo(db_path: &str) -> SqliteRecordRepository {
        let conn = open_sqlite_connection(db_path).unwrap();
        SqliteRecordRepository::new(Arc::new(Mutex::new(conn)))
    }

    /// 未分配 id 的新明细（由协调器分配）
    fn line(item: &str, quantity: i64) -> DetailLine {
        line_with_id(0, item, quantity)
    }

    fn line_with_id(id: i64, item: &str, quantity: i64) -> DetailLine {
        DetailLine {
            id,
            item: item.to_string(),
            item_codes: Vec::new(),
            quantity,
            return_date: None,
            approver: None,
            comment: None,
            description: None,
        }
    }

    fn seed_borrow(repo: &SqliteRecordRepository, details: Vec<DetailLine>) -> RecordHeader {
        let draft = HeaderDraft {
            borrower: Some("Nana".to_string()),
            item: Some("Camera".to_string()),
            ..Default::default()
        };
        let mut payload = RecordValidator::validate_create(RecordFamily::Borrow, &draft).unwrap();
        payload.details = details;
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        repo.insert(&payload, date, None).unwrap()
    }

    /// 读取之后、写入之前插入一次并发修改
    struct InterleavingRepo {
        inner: SqliteRecordRepository,
    }

    impl RecordRepository for InterleavingRepo {
        fn list(&self, family: RecordFamily) -> RepositoryResult<Vec<RecordHeader>> {
            self.inner.list(family)
        }

        fn find_by_id(
            &self,
            family: RecordFamily,
            id: i64,
        ) -> RepositoryResult<Option<RecordHeader>> {
            let snapshot = self.inner.find_by_id(family, id)?;
            if let Some(header) = &snapshot {
                let mut payload = HeaderPayload::from_header(header);
                payload.expected_revision = None;
                payload.description = Some("并发修改".to_string());
                self.inner.update(id, &payload, None)?;
            }
            Ok(snapshot)
        }

        fn insert(
            &self,
            payload: &HeaderPayload,
            date: NaiveDate,
            dup_key: Option<&str>,
        ) -> RepositoryResult<RecordHeader> {
            self.inner.insert(payload, date, dup_key)
        }

        fn update(
            &self,
            id: i64,
            payload: &HeaderPayload,
            dup_key: Option<&str>,
        ) -> RepositoryResult<RecordHeader> {
            self.inner.update(id, payload, dup_key)
        }

        fn delete(&self, family: RecordFamily, id: i64) -> RepositoryResult<()> {
            self.inner.delete(family, id)
        }

        fn count_details(&self, header_id: i64) -> RepositoryResult<usize> {
            self.inner.count_details(header_id)
        }
    }

    #[test]
    fn test_append_assigns_next_id_and_keeps_existing_lines() {
        let (_temp, db_path) = create_test_db().unwrap();
        let repo = open_repo(&db_path);
        let header = seed_borrow(
            &repo,
            vec![line_with_id(1, "Camera", 1), line_with_id(2, "Lens", 2)],
        );
        assert_eq!(header.max_detail_id(), 2);

        let coordinator = NestedWriteCoordinator::new(&repo);
        let outcome = coordinator
            .append(RecordFamily::Borrow, header.id, line("Tripod", 1))
            .unwrap();

        assert_eq!(outcome.line_id, 3);
        assert_eq!(outcome.header.details.len(), 3);
        assert_eq!(outcome.header.details[0].item, "Camera");
        assert_eq!(outcome.header.details[1].item, "Lens");
        assert_eq!(outcome.header.details[2].item, "Tripod");
        assert_eq!(outcome.header.revision, header.revision + 1);

        let second = coordinator
            .append(RecordFamily::Borrow, header.id, line("Flash", 4))
            .unwrap();
        assert_eq!(second.line_id, 4);
        assert_eq!(repo.count_details(header.id).unwrap(), 4);
    }

    #[test]
    fn test_append_to_missing_header_is_not_found() {
        let (_temp, db_path) = create_test_db().unwrap();
        let repo = open_repo(&db_path);

        let result =
            NestedWriteCoordinator::new(&repo).append(RecordFamily::Borrow, 42, line("Camera", 1));
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }

    #[test]
    fn test_append_to_other_family_is_not_found() {
        let (_temp, db_path) = create_test_db().unwrap();
        let repo = open_repo(&db_path);
        let header = seed_borrow(&repo, Vec::new());

        let result = NestedWriteCoordinator::new(&repo).append(
            RecordFamily::Repair,
            header.id,
            line("Camera", 1),
        );
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
        assert_eq!(repo.count_details(header.id).unwrap(), 0);
    }

    #[test]
    fn test_append_conflicts_when_header_changed_after_read() {
        let (_temp, db_path) = create_test_db().unwrap();
        let repo = InterleavingRepo {
            inner: open_repo(&db_path),
        };
        let header = seed_borrow(&repo.inner, vec![line_with_id(1, "Camera", 1)]);

        let result = NestedWriteCoordinator::new(&repo).append(
            RecordFamily::Borrow,
            header.id,
            line("Lens", 1),
        );
        assert!(matches!(
            result,
            Err(RepositoryError::OptimisticLockFailure { .. })
        ));

        // 并发修改生效,追加未写入
        let stored = repo.inner.find_by_id(RecordFamily::Borrow, header.id).unwrap().unwrap();
        assert_eq!(stored.details.len(), 1);
        assert_eq!(stored.description.as_deref(), Some("并发修改"));
    }
}
