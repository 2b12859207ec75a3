// ==========================================
// 单据 API 集成测试
// ==========================================
// 职责: 验证五个单据族的增删改查、校验、重复拦截、级联删除
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod record_api_test {
    use chrono::Local;
    use warehouse_records::api::ApiError;
    use warehouse_records::config::EngineSettings;
    use warehouse_records::domain::{
        ActionType, DetailDraft, HeaderDraft, HeaderFields, RawQuantity, RecordFamily, RecordStatus,
    };

    use crate::test_helpers::{
        borrow_draft, create_test_api, detail, export_draft, import_draft, order_draft,
        repair_draft,
    };

    // ==========================================
    // 往返一致性
    // ==========================================

    #[test]
    fn test_get_returns_what_create_stored() {
        let (_temp, api) = create_test_api(EngineSettings::default());

        let drafts = [
            (RecordFamily::Order, order_draft("Office chairs")),
            (RecordFamily::Import, import_draft(40)),
            (RecordFamily::Export, export_draft("Ken")),
            (RecordFamily::Borrow, borrow_draft("Nana", "Camera")),
            (RecordFamily::Repair, repair_draft("Printer")),
        ];

        for (family, mut draft) in drafts {
            draft.details = vec![detail("Camera", 2), detail("Tripod", 1)];
            let created = api.create(family, &draft, "alice").unwrap();
            let fetched = api.get(family, created.id).unwrap();
            assert_eq!(fetched, created, "family={}", family);
            assert_eq!(fetched.details.len(), 2);
            assert_eq!(fetched.details[0].id, 1);
            assert_eq!(fetched.details[1].id, 2);
        }
    }

    #[test]
    fn test_create_assigns_id_and_today() {
        let (_temp, api) = create_test_api(EngineSettings::default());

        let first = api.create(RecordFamily::Export, &export_draft("Ken"), "alice").unwrap();
        let second = api.create(RecordFamily::Export, &export_draft("Mia"), "alice").unwrap();

        assert!(first.id > 0);
        assert!(second.id > first.id);
        assert_eq!(first.date, Local::now().date_naive());
        assert_eq!(first.revision, 1);
    }

    // ==========================================
    // 状态词表
    // ==========================================

    #[test]
    fn test_stored_status_belongs_to_family_vocabulary() {
        let (_temp, api) = create_test_api(EngineSettings::default());

        let cases = [
            (RecordFamily::Order, order_draft("Desks"), "Shipped"),
            (RecordFamily::Export, export_draft("Ken"), "Received"),
            (RecordFamily::Borrow, borrow_draft("Nana", "Camera"), "Borrowed"),
            (RecordFamily::Repair, repair_draft("Printer"), "In Progress"),
        ];
        for (family, mut draft, status) in cases {
            draft.status = Some(status.to_lowercase());
            let created = api.create(family, &draft, "alice").unwrap();
            assert_eq!(created.status.map(|s| s.as_str()), Some(status));
        }

        for family in RecordFamily::ALL {
            for header in api.list(family, None).unwrap() {
                match header.status {
                    Some(status) => {
                        assert_eq!(status.family(), family);
                        assert!(RecordStatus::vocabulary(family).contains(&status.as_str()));
                    }
                    None => assert_eq!(family, RecordFamily::Import),
                }
            }
        }
    }

    #[test]
    fn test_status_outside_vocabulary_is_rejected_without_write() {
        let (_temp, api) = create_test_api(EngineSettings::default());

        let mut draft = order_draft("Desks");
        draft.status = Some("Returned".to_string());
        let err = api.create(RecordFamily::Order, &draft, "alice").unwrap_err();
        assert!(matches!(err, ApiError::ValidationError { .. }));
        assert!(api.list(RecordFamily::Order, None).unwrap().is_empty());
    }

    #[test]
    fn test_import_rejects_any_status() {
        let (_temp, api) = create_test_api(EngineSettings::default());

        let mut draft = import_draft(3);
        draft.status = Some("Pending".to_string());
        let err = api.create(RecordFamily::Import, &draft, "alice").unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(err.violations().iter().any(|v| v.field == "status"));

        // 空白视为未提供
        draft.status = Some("  ".to_string());
        assert!(api.create(RecordFamily::Import, &draft, "alice").is_ok());
    }

    #[test]
    fn test_status_moves_freely_within_vocabulary() {
        let (_temp, api) = create_test_api(EngineSettings::default());
        let created = api.create(RecordFamily::Repair, &repair_draft("Printer"), "alice").unwrap();

        let mut draft = created.to_draft();
        draft.status = Some("Completed".to_string());
        api.update(RecordFamily::Repair, created.id, &draft, "alice").unwrap();

        // 已完成的单据可以退回待处理
        let mut draft = api.get(RecordFamily::Repair, created.id).unwrap().to_draft();
        draft.status = Some("Pending".to_string());
        let updated = api.update(RecordFamily::Repair, created.id, &draft, "alice").unwrap();
        assert_eq!(updated.status.map(|s| s.as_str()), Some("Pending"));
    }

    // ==========================================
    // 数量为正
    // ==========================================

    #[test]
    fn test_non_positive_quantity_rejected_everywhere() {
        let (_temp, api) = create_test_api(EngineSettings::default());

        let mut draft = borrow_draft("Nana", "Camera");
        draft.details = vec![detail("Camera", 0)];
        let err = api.create(RecordFamily::Borrow, &draft, "alice").unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(api.list(RecordFamily::Borrow, None).unwrap().is_empty());

        let created = api
            .create(RecordFamily::Borrow, &borrow_draft("Nana", "Camera"), "alice")
            .unwrap();

        let mut draft = created.to_draft();
        draft.details = vec![DetailDraft::new("Camera", "-3")];
        let err = api.update(RecordFamily::Borrow, created.id, &draft, "alice").unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let err = api
            .append_detail(RecordFamily::Borrow, created.id, &detail("Lens", 0), "alice")
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let stored = api.get(RecordFamily::Borrow, created.id).unwrap();
        assert_eq!(stored, created);

        let err = api.create(RecordFamily::Import, &import_draft(0), "alice").unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_append_rejected_when_detail_id_exhausted() {
        let (_temp, api) = create_test_api(EngineSettings::default());
        let mut draft = borrow_draft("Nana", "Camera");
        draft.details = vec![DetailDraft {
            id: Some(i64::MAX),
            ..detail("Camera", 1)
        }];
        let created = api.create(RecordFamily::Borrow, &draft, "alice").unwrap();

        let err = api
            .append_detail(RecordFamily::Borrow, created.id, &detail("Lens", 1), "alice")
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(err.violations().iter().any(|v| v.field == "detail.id"));
        assert_eq!(api.get(RecordFamily::Borrow, created.id).unwrap(), created);
    }

    #[test]
    fn test_quantity_accepts_numeric_text() {
        let (_temp, api) = create_test_api(EngineSettings::default());

        let draft = HeaderDraft {
            quantity: Some(RawQuantity::Text(" 12 ".to_string())),
            ..Default::default()
        };
        let created = api.create(RecordFamily::Import, &draft, "alice").unwrap();
        match created.fields {
            HeaderFields::Import(fields) => assert_eq!(fields.quantity, 12),
            other => panic!("Expected Import fields, got {:?}", other),
        }
        assert_eq!(created.status, None);
    }

    // ==========================================
    // 重复拦截
    // ==========================================

    #[test]
    fn test_order_duplicate_on_same_date_and_description() {
        let (_temp, api) = create_test_api(EngineSettings::default());
        api.create(RecordFamily::Order, &order_draft("X"), "alice").unwrap();

        let err = api.create(RecordFamily::Order, &order_draft("x"), "bob").unwrap_err();
        assert!(matches!(err, ApiError::DuplicateRecord(_)));
        assert_eq!(api.list(RecordFamily::Order, None).unwrap().len(), 1);

        // 不同说明不冲突
        api.create(RecordFamily::Order, &order_draft("Y"), "bob").unwrap();
        assert_eq!(api.list(RecordFamily::Order, None).unwrap().len(), 2);
    }

    #[test]
    fn test_repair_duplicate_item_case_insensitive() {
        let (_temp, api) = create_test_api(EngineSettings::default());
        api.create(RecordFamily::Repair, &repair_draft("Printer"), "alice").unwrap();

        let err = api
            .create(RecordFamily::Repair, &repair_draft("PRINTER"), "alice")
            .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_RECORD");
    }

    #[test]
    fn test_import_has_no_duplicate_guard() {
        let (_temp, api) = create_test_api(EngineSettings::default());
        api.create(RecordFamily::Import, &import_draft(5), "alice").unwrap();
        api.create(RecordFamily::Import, &import_draft(5), "alice").unwrap();
        assert_eq!(api.list(RecordFamily::Import, None).unwrap().len(), 2);
    }

    #[test]
    fn test_update_is_not_blocked_by_duplicate_guard() {
        let (_temp, api) = create_test_api(EngineSettings::default());
        api.create(RecordFamily::Borrow, &borrow_draft("Nana", "Camera"), "alice").unwrap();
        let other = api
            .create(RecordFamily::Borrow, &borrow_draft("Ken", "Camera"), "alice")
            .unwrap();

        let mut draft = other.to_draft();
        draft.borrower = Some("nana".to_string());
        let updated = api.update(RecordFamily::Borrow, other.id, &draft, "alice").unwrap();
        assert_eq!(updated.revision, 2);
    }

    // ==========================================
    // 编辑 / 删除
    // ==========================================

    #[test]
    fn test_update_replaces_details_and_keeps_date() {
        let (_temp, api) = create_test_api(EngineSettings::default());
        let mut draft = borrow_draft("Nana", "Camera");
        draft.details = vec![detail("Camera", 1), detail("Lens", 1)];
        let created = api.create(RecordFamily::Borrow, &draft, "alice").unwrap();

        let mut draft = created.to_draft();
        draft.details = vec![detail("Flash", 3)];
        draft.approver = Some("Boss".to_string());
        let updated = api.update(RecordFamily::Borrow, created.id, &draft, "bob").unwrap();

        assert_eq!(updated.date, created.date);
        assert_eq!(updated.details.len(), 1);
        assert_eq!(updated.details[0].item, "Flash");
        assert_eq!(api.count_details(created.id).unwrap(), 1);
        assert_eq!(api.get(RecordFamily::Borrow, created.id).unwrap(), updated);
    }

    #[test]
    fn test_missing_id_is_not_found() {
        let (_temp, api) = create_test_api(EngineSettings::default());

        assert_eq!(api.get(RecordFamily::Export, 99).unwrap_err().code(), "NOT_FOUND");
        assert_eq!(
            api.update(RecordFamily::Export, 99, &export_draft("Ken"), "alice")
                .unwrap_err()
                .code(),
            "NOT_FOUND"
        );
        assert_eq!(
            api.delete(RecordFamily::Export, 99, "alice").unwrap_err().code(),
            "NOT_FOUND"
        );
        assert!(api.list(RecordFamily::Export, None).unwrap().is_empty());
    }

    #[test]
    fn test_ids_are_family_scoped() {
        let (_temp, api) = create_test_api(EngineSettings::default());
        let borrow = api
            .create(RecordFamily::Borrow, &borrow_draft("Nana", "Camera"), "alice")
            .unwrap();

        assert!(api.get(RecordFamily::Repair, borrow.id).is_err());
        assert!(api.delete(RecordFamily::Repair, borrow.id, "alice").is_err());
        assert!(api.get(RecordFamily::Borrow, borrow.id).is_ok());
    }

    #[test]
    fn test_delete_cascades_details() {
        let (_temp, api) = create_test_api(EngineSettings::default());
        let mut draft = repair_draft("Printer");
        draft.details = vec![detail("Toner", 1), detail("Drum", 1)];
        let created = api.create(RecordFamily::Repair, &draft, "alice").unwrap();
        assert_eq!(api.count_details(created.id).unwrap(), 2);

        api.delete(RecordFamily::Repair, created.id, "alice").unwrap();

        assert!(matches!(
            api.get(RecordFamily::Repair, created.id),
            Err(ApiError::NotFound(_))
        ));
        assert_eq!(api.count_details(created.id).unwrap(), 0);
    }

    // ==========================================
    // 列表
    // ==========================================

    #[test]
    fn test_listing_is_idempotent() {
        let (_temp, api) = create_test_api(EngineSettings::default());
        for user in ["Ken", "Mia", "Lin"] {
            api.create(RecordFamily::Export, &export_draft(user), "alice").unwrap();
        }

        let first = api.list(RecordFamily::Export, None).unwrap();
        let second = api.list(RecordFamily::Export, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_filter_and_pagination() {
        let (_temp, api) = create_test_api(EngineSettings::default());
        for (borrower, item) in [("Nana", "Camera"), ("Ken", "Tripod"), ("Nanami", "Lens")] {
            api.create(RecordFamily::Borrow, &borrow_draft(borrower, item), "alice")
                .unwrap();
        }

        let hits = api.list(RecordFamily::Borrow, Some("NANA")).unwrap();
        assert_eq!(hits.len(), 2);

        let page = api
            .list_page(RecordFamily::Borrow, Some("nana"), 1, Some(1))
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.page_count, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, hits[1].id);

        // 分页不影响存储
        assert_eq!(api.list(RecordFamily::Borrow, None).unwrap().len(), 3);
    }

    #[test]
    fn test_filter_searches_details_when_enabled() {
        let (_temp, api) = create_test_api(EngineSettings {
            search_details: true,
            ..Default::default()
        });
        let mut draft = borrow_draft("Nana", "Camera");
        draft.details = vec![DetailDraft {
            item_codes: vec!["SN-4411".to_string()],
            ..detail("Camera", 1)
        }];
        api.create(RecordFamily::Borrow, &draft, "alice").unwrap();

        assert_eq!(api.list(RecordFamily::Borrow, Some("sn-44")).unwrap().len(), 1);
    }

    // ==========================================
    // 操作日志
    // ==========================================

    #[test]
    fn test_writes_are_audited() {
        let (_temp, api) = create_test_api(EngineSettings::default());
        let created = api
            .create(RecordFamily::Borrow, &borrow_draft("Nana", "Camera"), "alice")
            .unwrap();

        let mut draft = created.to_draft();
        draft.status = Some("Borrowed".to_string());
        api.update(RecordFamily::Borrow, created.id, &draft, "bob").unwrap();
        api.append_detail(RecordFamily::Borrow, created.id, &detail("Lens", 1), "bob")
            .unwrap();
        api.delete(RecordFamily::Borrow, created.id, "carol").unwrap();

        let trail = api.audit_trail(RecordFamily::Borrow, created.id).unwrap();
        let types: Vec<ActionType> = trail.iter().map(|log| log.action_type).collect();
        assert_eq!(types.len(), 4);
        assert!(types.contains(&ActionType::CreateRecord));
        assert!(types.contains(&ActionType::UpdateRecord));
        assert!(types.contains(&ActionType::AppendDetail));
        assert!(types.contains(&ActionType::DeleteRecord));

        let update = trail
            .iter()
            .find(|log| log.action_type == ActionType::UpdateRecord)
            .unwrap();
        assert_eq!(update.actor, "bob");
        assert!(update.detail.as_deref().unwrap_or_default().contains("Borrowed"));
    }

    // ==========================================
    // 场景
    // ==========================================

    #[test]
    fn test_scenario_borrow_then_append_detail() {
        let (_temp, api) = create_test_api(EngineSettings::default());

        let mut draft = borrow_draft("Nana", "Camera");
        draft.status = Some("Pending".to_string());
        let created = api.create(RecordFamily::Borrow, &draft, "alice").unwrap();

        assert!(created.id > 0);
        assert_eq!(created.date, Local::now().date_naive());
        assert!(created.details.is_empty());

        api.append_detail(RecordFamily::Borrow, created.id, &detail("Camera", 2), "alice")
            .unwrap();

        let fetched = api.get(RecordFamily::Borrow, created.id).unwrap();
        assert_eq!(fetched.details.len(), 1);
        assert_eq!(fetched.details[0].quantity, 2);
        assert_eq!(fetched.details[0].item, "Camera");
    }

    #[test]
    fn test_scenario_two_repairs_same_printer() {
        let (_temp, api) = create_test_api(EngineSettings::default());

        api.create(RecordFamily::Repair, &repair_draft("Printer"), "alice").unwrap();
        let err = api
            .create(RecordFamily::Repair, &repair_draft("printer"), "bob")
            .unwrap_err();
        assert!(matches!(err, ApiError::DuplicateRecord(_)));
        assert_eq!(api.list(RecordFamily::Repair, None).unwrap().len(), 1);
    }
}
