use crate::{Store, StorageError};
use chrono::{Datelike, Local, NaiveDate};
use tempfile::TempDir;
use vigia_common::status::{ActionStatus, CatalogKind, ReportStatus, Role};
use vigia_common::types::{
    ActionFollowUpForm, ActionForm, CatalogSeedItem, CommitmentFollowUpRequest,
    CreateUserRequest, RegisterReportRequest, UpdateReportRequest, UpdateUserRequest,
};

fn seed(kind: CatalogKind, name: &str) -> CatalogSeedItem {
    CatalogSeedItem {
        kind,
        name: name.to_string(),
        abbreviation: None,
        parent: None,
        group_key: None,
        sort_order: None,
    }
}

fn test_catalog() -> Vec<CatalogSeedItem> {
    vec![
        CatalogSeedItem {
            abbreviation: Some("ORC".to_string()),
            ..seed(CatalogKind::RegionalOffice, "Oficina Regional Centro")
        },
        CatalogSeedItem {
            abbreviation: Some("ORN".to_string()),
            ..seed(CatalogKind::RegionalOffice, "Oficina Regional Norte")
        },
        seed(CatalogKind::ReportType, "Acción Preventiva"),
        seed(CatalogKind::ReportType, "Problemática Social"),
        CatalogSeedItem {
            parent: Some("Oficina Regional Centro".to_string()),
            ..seed(CatalogKind::FederalEntity, "Ciudad de México")
        },
        CatalogSeedItem {
            parent: Some("Oficina Regional Norte".to_string()),
            ..seed(CatalogKind::FederalEntity, "Nuevo León")
        },
        CatalogSeedItem {
            parent: Some("Ciudad de México".to_string()),
            ..seed(CatalogKind::Municipality, "Cuauhtémoc")
        },
        CatalogSeedItem {
            parent: Some("Nuevo León".to_string()),
            ..seed(CatalogKind::Municipality, "Monterrey")
        },
        seed(CatalogKind::InternalActor, "Gerencia Regional"),
        seed(CatalogKind::AttentionType, "Reunión de trabajo"),
        seed(CatalogKind::IssueType, "Bloqueo"),
        seed(CatalogKind::ClassificationGrade, "Alto"),
        CatalogSeedItem {
            group_key: Some("compliance".to_string()),
            sort_order: Some(1),
            ..seed(CatalogKind::GeneralStatus, "En proceso")
        },
        CatalogSeedItem {
            group_key: Some("compliance".to_string()),
            sort_order: Some(2),
            ..seed(CatalogKind::GeneralStatus, "Cumplido")
        },
    ]
}

async fn setup() -> (TempDir, Store, i32) {
    let dir = TempDir::new().unwrap();
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("vigia.db").display()
    );
    let store = Store::new(&url, dir.path()).await.unwrap();
    store.sync_catalog(&test_catalog(), false).await.unwrap();
    let user = store
        .create_user(&user_request("capturista", "capturista@example.com"))
        .await
        .unwrap();
    (dir, store, user.id)
}

fn user_request(username: &str, email: &str) -> CreateUserRequest {
    CreateUserRequest {
        username: username.to_string(),
        password: "secreto123".to_string(),
        email: email.to_string(),
        first_name: "Ana".to_string(),
        paternal_surname: "López".to_string(),
        maternal_surname: Some("García".to_string()),
        phone: None,
        position: None,
        role: None,
    }
}

fn full_report() -> RegisterReportRequest {
    RegisterReportRequest {
        report_type: Some("Acción Preventiva".to_string()),
        regional_office: Some("Oficina Regional Centro".to_string()),
        federal_entity: Some("Ciudad de México".to_string()),
        municipality: Some("Cuauhtémoc".to_string()),
        request_date: Some("2024-05-10".to_string()),
        internal_actor: Some("Gerencia Regional".to_string()),
        attention_type: Some("Reunión de trabajo".to_string()),
        issue_type: Some("Bloqueo".to_string()),
        classification_grade: Some("Alto".to_string()),
        commitment_date: Some("2024-06-30".to_string()),
        requester: Some("Comité vecinal".to_string()),
        event_description: Some("Bloqueo de acceso a la subestación".to_string()),
        ..Default::default()
    }
}

fn full_action() -> ActionForm {
    ActionForm {
        registration_date: Some("2024-05-02".to_string()),
        region: Some("Centro".to_string()),
        asset: Some("Línea de transmisión".to_string()),
        facility: Some("Subestación Norte".to_string()),
        state: Some("Ciudad de México".to_string()),
        municipality: Some("Cuauhtémoc".to_string()),
        locality: Some("Centro".to_string()),
        coordinate_x: Some("-99.1332".to_string()),
        coordinate_y: Some("19.4326".to_string()),
        issue_type: Some("Bloqueo".to_string()),
        issue_description: Some("Vecinos impiden el acceso".to_string()),
        social_actor: Some("Comité vecinal".to_string()),
        impact_level: Some("Alto".to_string()),
        preventive_action: Some("Mesa de diálogo".to_string()),
        start_date: Some("2024-05-03".to_string()),
        end_date: Some("2024-06-03".to_string()),
        budget: Some("25000.00".to_string()),
        responsible: Some("Ing. Pérez".to_string()),
        responsible_area: Some("Gestión Social".to_string()),
        ..Default::default()
    }
}

fn action_follow_up(action_id: i32, percentage: i32, new_status: Option<&str>) -> ActionFollowUpForm {
    ActionFollowUpForm {
        action_id,
        follow_up_date: "2024-05-20".to_string(),
        new_status: new_status.map(str::to_string),
        progress_percentage: percentage,
        observations: Some("Revisión semanal".to_string()),
        responsible: Some("Ing. Pérez".to_string()),
        evidence_document: None,
    }
}

// ---- Users ----

#[tokio::test]
async fn create_user_defaults_to_clerk() {
    let (_dir, store, user_id) = setup().await;
    let user = store.get_user_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(user.role, Role::Clerk);
    assert!(user.active);
    assert_eq!(user.display_name(), "Ana López García");
    assert!(crate::auth::verify_password("secreto123", &user.password_hash));
}

#[tokio::test]
async fn duplicate_username_or_email_is_conflict() {
    let (_dir, store, _) = setup().await;

    let err = store
        .create_user(&user_request("capturista", "otro@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)), "{err:?}");

    let err = store
        .create_user(&user_request("otro", "capturista@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)), "{err:?}");

    assert_eq!(store.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn deactivation_keeps_the_row() {
    let (_dir, store, clerk_id) = setup().await;
    let admin = store
        .create_user(&CreateUserRequest {
            role: Some(Role::Administrator),
            ..user_request("admin", "admin@example.com")
        })
        .await
        .unwrap();

    let before = store.get_user_by_id(clerk_id).await.unwrap().unwrap();
    let user = store.deactivate_user(clerk_id, admin.id).await.unwrap();
    assert!(!user.active);
    assert_eq!(user.token_version, before.token_version + 1);

    assert_eq!(store.count_users().await.unwrap(), 2);
    assert_eq!(store.count_active_users().await.unwrap(), 1);
    assert_eq!(store.list_users(true, 100, 0).await.unwrap().len(), 2);
    assert_eq!(store.list_users(false, 100, 0).await.unwrap().len(), 1);
    let summaries = store.list_active_user_summaries().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].username, "admin");
}

#[tokio::test]
async fn cannot_deactivate_self() {
    let (_dir, store, user_id) = setup().await;
    let err = store.deactivate_user(user_id, user_id).await.unwrap_err();
    assert!(matches!(err, StorageError::Validation(_)));
    assert!(store.get_user_by_id(user_id).await.unwrap().unwrap().active);
}

#[tokio::test]
async fn password_change_revokes_tokens() {
    let (_dir, store, user_id) = setup().await;
    let updated = store
        .update_user(
            user_id,
            user_id,
            &UpdateUserRequest {
                password: Some("nueva-clave".to_string()),
                phone: Some("5555555555".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.token_version, 1);
    assert_eq!(updated.phone.as_deref(), Some("5555555555"));
    assert!(crate::auth::verify_password("nueva-clave", &updated.password_hash));
}

#[tokio::test]
async fn update_user_to_taken_email_is_conflict() {
    let (_dir, store, user_id) = setup().await;
    store
        .create_user(&user_request("segundo", "segundo@example.com"))
        .await
        .unwrap();
    let err = store
        .update_user(
            user_id,
            user_id,
            &UpdateUserRequest {
                email: Some("segundo@example.com".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));
}

#[tokio::test]
async fn sole_admin_cannot_be_demoted() {
    let (_dir, store, clerk_id) = setup().await;
    let admin = store
        .create_user(&CreateUserRequest {
            role: Some(Role::Administrator),
            ..user_request("admin", "admin@example.com")
        })
        .await
        .unwrap();

    let err = store
        .update_user(
            admin.id,
            admin.id,
            &UpdateUserRequest {
                role: Some(Role::Clerk),
                phone: Some("5550000000".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)), "{err:?}");

    let unchanged = store.get_user_by_id(admin.id).await.unwrap().unwrap();
    assert_eq!(unchanged.role, Role::Administrator);
    assert_eq!(unchanged.phone, None);

    // Keeping the role is not a demotion.
    store
        .update_user(
            admin.id,
            admin.id,
            &UpdateUserRequest {
                role: Some(Role::Administrator),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = store.deactivate_user(admin.id, clerk_id).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)), "{err:?}");
    assert!(store.get_user_by_id(admin.id).await.unwrap().unwrap().active);
}

#[tokio::test]
async fn admin_can_step_down_when_another_remains() {
    let (_dir, store, _) = setup().await;
    let first = store
        .create_user(&CreateUserRequest {
            role: Some(Role::Administrator),
            ..user_request("admin", "admin@example.com")
        })
        .await
        .unwrap();
    let second = store
        .create_user(&CreateUserRequest {
            role: Some(Role::Administrator),
            ..user_request("admin2", "admin2@example.com")
        })
        .await
        .unwrap();

    let demoted = store
        .update_user(
            first.id,
            first.id,
            &UpdateUserRequest {
                role: Some(Role::Clerk),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(demoted.role, Role::Clerk);

    let err = store
        .update_user(
            second.id,
            second.id,
            &UpdateUserRequest {
                role: Some(Role::Clerk),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)), "{err:?}");
}

#[tokio::test]
async fn update_of_missing_user_is_not_found() {
    let (_dir, store, user_id) = setup().await;
    let err = store
        .update_user(9999, user_id, &UpdateUserRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }), "{err:?}");
    let err = store.bump_token_version(9999).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }), "{err:?}");
}

// ---- Catalogs ----

#[tokio::test]
async fn catalog_sync_is_idempotent() {
    let (_dir, store, _) = setup().await;
    let again = store.sync_catalog(&test_catalog(), false).await.unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(again.skipped, test_catalog().len());

    let offices = store
        .list_catalog(CatalogKind::RegionalOffice, None, None)
        .await
        .unwrap();
    assert_eq!(offices.len(), 2);
}

#[tokio::test]
async fn nested_catalogs_filter_by_parent() {
    let (_dir, store, _) = setup().await;
    let cdmx = store
        .find_catalog_item(CatalogKind::FederalEntity, "Ciudad de México", None)
        .await
        .unwrap();
    let municipalities = store
        .list_catalog(CatalogKind::Municipality, Some(cdmx.id), None)
        .await
        .unwrap();
    assert_eq!(municipalities.len(), 1);
    assert_eq!(municipalities[0].name, "Cuauhtémoc");

    let compliance = store
        .list_catalog(CatalogKind::GeneralStatus, None, Some("compliance"))
        .await
        .unwrap();
    let names: Vec<_> = compliance.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["En proceso", "Cumplido"]);
}

// ---- Reports ----

#[tokio::test]
async fn report_folios_are_sequential_per_office_and_type() {
    let (_dir, store, user_id) = setup().await;

    let first = store.register_report(user_id, &full_report()).await.unwrap();
    let second = store.register_report(user_id, &full_report()).await.unwrap();
    assert_eq!(first.folio, "ORC-AP-001");
    assert_eq!(second.folio, "ORC-AP-002");

    let social = store
        .register_report(
            user_id,
            &RegisterReportRequest {
                report_type: Some("Problemática Social".to_string()),
                ..full_report()
            },
        )
        .await
        .unwrap();
    assert_eq!(social.folio, "ORC-PS-001");

    let report = store.get_report(first.id).await.unwrap().unwrap();
    assert_eq!(report.status, ReportStatus::Registered);
    assert_eq!(report.progress_percentage, 0);
    assert_eq!(report.report_year, Local::now().year());
    assert_eq!(report.request_date, NaiveDate::from_ymd_opt(2024, 5, 10));
}

#[tokio::test]
async fn concurrent_registrations_get_distinct_folios() {
    let (_dir, store, user_id) = setup().await;
    let store = std::sync::Arc::new(store);

    let mut handles = Vec::new();
    for _ in 0..5 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.register_report(user_id, &full_report()).await
        }));
    }
    let mut folios = Vec::new();
    for handle in handles {
        folios.push(handle.await.unwrap().unwrap().folio);
    }
    folios.sort();
    assert_eq!(
        folios,
        ["ORC-AP-001", "ORC-AP-002", "ORC-AP-003", "ORC-AP-004", "ORC-AP-005"]
    );
    assert_eq!(store.count_reports(None).await.unwrap(), 5);
}

#[tokio::test]
async fn missing_required_field_is_named() {
    let (_dir, store, user_id) = setup().await;
    let err = store
        .register_report(
            user_id,
            &RegisterReportRequest {
                request_date: Some("   ".to_string()),
                internal_actor: None,
                ..full_report()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "request_date is required");
    assert_eq!(store.count_reports(None).await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_catalog_value_is_not_found() {
    let (_dir, store, user_id) = setup().await;
    let err = store
        .register_report(
            user_id,
            &RegisterReportRequest {
                regional_office: Some("Oficina Regional Atlántida".to_string()),
                ..full_report()
            },
        )
        .await
        .unwrap_err();
    assert!(
        matches!(&err, StorageError::NotFound { key, .. } if key == "Oficina Regional Atlántida"),
        "{err:?}"
    );

    // Municipality exists, but not inside the given federal entity.
    let err = store
        .register_report(
            user_id,
            &RegisterReportRequest {
                municipality: Some("Monterrey".to_string()),
                ..full_report()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn failed_registration_does_not_consume_a_folio() {
    let (_dir, store, user_id) = setup().await;
    store
        .register_report(
            user_id,
            &RegisterReportRequest {
                attention_type: Some("Inexistente".to_string()),
                ..full_report()
            },
        )
        .await
        .unwrap_err();
    let created = store.register_report(user_id, &full_report()).await.unwrap();
    assert_eq!(created.folio, "ORC-AP-001");
}

#[tokio::test]
async fn draft_report_needs_only_type_and_office() {
    let (_dir, store, user_id) = setup().await;
    let created = store
        .register_report(
            user_id,
            &RegisterReportRequest {
                report_type: Some("Acción Preventiva".to_string()),
                regional_office: Some("Oficina Regional Norte".to_string()),
                save_as_draft: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(created.folio, "ORN-AP-001");
    let report = store.get_report(created.id).await.unwrap().unwrap();
    assert_eq!(report.status, ReportStatus::Draft);
    assert_eq!(report.federal_entity_id, None);

    let err = store
        .register_report(
            user_id,
            &RegisterReportRequest {
                report_type: Some("Acción Preventiva".to_string()),
                save_as_draft: true,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "regional_office is required");
}

#[tokio::test]
async fn find_by_unknown_folio_is_not_found() {
    let (_dir, store, _) = setup().await;
    let err = store.find_report_by_folio("ORC-AP-999").await.unwrap_err();
    assert_eq!(err.to_string(), "report not found: ORC-AP-999");
}

#[tokio::test]
async fn report_edits_are_recorded_per_field() {
    let (_dir, store, user_id) = setup().await;
    let created = store.register_report(user_id, &full_report()).await.unwrap();

    let updated = store
        .update_report(
            created.id,
            user_id,
            &UpdateReportRequest {
                cause: Some("Falta de información".to_string()),
                requester: Some("Comité vecinal".to_string()),
                commitment_date: Some("2024-07-15".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.cause, "Falta de información");

    let history = store.list_edit_history(created.id).await.unwrap();
    let fields: Vec<_> = history.iter().map(|h| h.field.as_str()).collect();
    assert_eq!(fields, vec!["cause", "commitment_date"]);
    assert_eq!(history[0].old_value.as_deref(), Some(""));
    assert_eq!(history[1].old_value.as_deref(), Some("2024-06-30"));
    assert_eq!(history[1].new_value.as_deref(), Some("2024-07-15"));
    assert!(history.iter().all(|h| h.editor_id == user_id));
}

#[tokio::test]
async fn edit_without_changes_leaves_report_untouched() {
    let (_dir, store, user_id) = setup().await;
    let created = store.register_report(user_id, &full_report()).await.unwrap();
    let before = store.get_report(created.id).await.unwrap().unwrap();

    let same = store
        .update_report(
            created.id,
            user_id,
            &UpdateReportRequest {
                requester: Some(" Comité vecinal ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(same.updated_at, before.updated_at);
    assert!(store.list_edit_history(created.id).await.unwrap().is_empty());

    let err = store
        .update_report(404, user_id, &UpdateReportRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn concurrent_edits_and_follow_ups_all_commit() {
    let (_dir, store, user_id) = setup().await;
    let store = std::sync::Arc::new(store);
    let created = store.register_report(user_id, &full_report()).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..4 {
        let edit_store = store.clone();
        handles.push(tokio::spawn(async move {
            edit_store
                .update_report(
                    created.id,
                    user_id,
                    &UpdateReportRequest {
                        observations: Some(format!("Visita {i}")),
                        ..Default::default()
                    },
                )
                .await
                .map(|_| ())
        }));
        let follow_up_store = store.clone();
        handles.push(tokio::spawn(async move {
            follow_up_store
                .record_commitment_follow_up(
                    user_id,
                    &CommitmentFollowUpRequest {
                        report_id: created.id,
                        progress_percentage: 10 * (i + 1),
                        evidence: None,
                        observations: None,
                    },
                )
                .await
                .map(|_| ())
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.list_edit_history(created.id).await.unwrap().len(), 4);
    assert_eq!(
        store.list_commitment_follow_ups(created.id).await.unwrap().len(),
        4
    );
    let report = store.get_report(created.id).await.unwrap().unwrap();
    assert_eq!(report.status, ReportStatus::InProgress);
}

#[tokio::test]
async fn edit_history_of_missing_report_is_not_found() {
    let (_dir, store, _) = setup().await;
    let err = store.list_edit_history(404).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

// ---- Follow-ups ----

#[tokio::test]
async fn commitment_follow_up_moves_report_status() {
    let (_dir, store, user_id) = setup().await;
    let created = store.register_report(user_id, &full_report()).await.unwrap();

    let untouched = store
        .record_commitment_follow_up(
            user_id,
            &CommitmentFollowUpRequest {
                report_id: created.id,
                progress_percentage: 0,
                evidence: None,
                observations: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(untouched.new_status, ReportStatus::Registered);

    let partial = store
        .record_commitment_follow_up(
            user_id,
            &CommitmentFollowUpRequest {
                report_id: created.id,
                progress_percentage: 45,
                evidence: Some("minuta.pdf".to_string()),
                observations: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(partial.previous_status, ReportStatus::Registered);
    assert_eq!(partial.new_status, ReportStatus::InProgress);

    store
        .record_commitment_follow_up(
            user_id,
            &CommitmentFollowUpRequest {
                report_id: created.id,
                progress_percentage: 100,
                evidence: None,
                observations: Some("Compromiso cumplido".to_string()),
            },
        )
        .await
        .unwrap();

    let detail = store.find_report_by_folio(&created.folio).await.unwrap();
    assert_eq!(detail.report.status, ReportStatus::Completed);
    assert_eq!(detail.report.progress_percentage, 100);
    assert_eq!(detail.follow_ups.len(), 3);

    let cumplido = store
        .find_catalog_item(CatalogKind::GeneralStatus, "Cumplido", None)
        .await
        .unwrap();
    assert_eq!(detail.report.current_status_id, Some(cumplido.id));
}

#[tokio::test]
async fn commitment_follow_up_rejects_bad_input() {
    let (_dir, store, user_id) = setup().await;
    let created = store.register_report(user_id, &full_report()).await.unwrap();

    let err = store
        .record_commitment_follow_up(
            user_id,
            &CommitmentFollowUpRequest {
                report_id: created.id,
                progress_percentage: 101,
                evidence: None,
                observations: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Validation(_)));

    let err = store
        .record_commitment_follow_up(
            user_id,
            &CommitmentFollowUpRequest {
                report_id: 9999,
                progress_percentage: 50,
                evidence: None,
                observations: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
    assert!(store.list_commitment_follow_ups(created.id).await.unwrap().is_empty());
}

// ---- Actions ----

#[tokio::test]
async fn create_action_generates_folio_and_parses_numbers() {
    let (_dir, store, user_id) = setup().await;
    let created = store.create_action(user_id, &full_action()).await.unwrap();
    assert!(created.folio.starts_with("AP-"));
    assert!(!created.folio.starts_with("AP-DRAFT-"));

    let detail = store.get_action_detail(created.id).await.unwrap();
    assert_eq!(detail.action.status, ActionStatus::Registered);
    assert_eq!(detail.action.budget, Some(25000.0));
    assert_eq!(detail.action.coordinate_x, Some(-99.1332));
    assert!(detail.follow_ups.is_empty());

    // Same second: the generated folio still has to be unique.
    let again = store.create_action(user_id, &full_action()).await.unwrap();
    assert_ne!(again.folio, created.folio);
}

#[tokio::test]
async fn create_action_validates_fields() {
    let (_dir, store, user_id) = setup().await;

    let err = store
        .create_action(
            user_id,
            &ActionForm {
                locality: None,
                ..full_action()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "locality is required");

    let err = store
        .create_action(
            user_id,
            &ActionForm {
                budget: Some("mucho".to_string()),
                ..full_action()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "budget must be a number");

    let err = store
        .create_action(
            user_id,
            &ActionForm {
                start_date: Some("03/05/2024".to_string()),
                ..full_action()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Validation(_)));
    assert_eq!(store.count_actions(None).await.unwrap(), 0);
}

#[tokio::test]
async fn explicit_action_folio_must_be_unique() {
    let (_dir, store, user_id) = setup().await;
    let form = ActionForm {
        folio: Some("AP-MANUAL-1".to_string()),
        ..full_action()
    };
    let created = store.create_action(user_id, &form).await.unwrap();
    assert_eq!(created.folio, "AP-MANUAL-1");
    let err = store.create_action(user_id, &form).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));
}

#[tokio::test]
async fn action_draft_accepts_blank_form() {
    let (_dir, store, user_id) = setup().await;
    let created = store
        .create_action_draft(user_id, &ActionForm::default())
        .await
        .unwrap();
    assert!(created.folio.starts_with("AP-DRAFT-"));

    let action = store.get_action(created.id).await.unwrap().unwrap();
    assert_eq!(action.status, ActionStatus::Draft);
    assert_eq!(action.region, "");
    assert_eq!(action.registration_date, Local::now().date_naive());
    assert_eq!(action.start_date, None);
}

#[tokio::test]
async fn action_follow_up_follows_the_lifecycle() {
    let (_dir, store, user_id) = setup().await;
    let created = store.create_action(user_id, &full_action()).await.unwrap();

    let first = store
        .record_action_follow_up(user_id, &action_follow_up(created.id, 40, None))
        .await
        .unwrap();
    assert_eq!(first.previous_status, ActionStatus::Registered);
    assert_eq!(first.new_status, ActionStatus::InProcess);

    let done = store
        .record_action_follow_up(user_id, &action_follow_up(created.id, 100, Some("completed")))
        .await
        .unwrap();
    assert_eq!(done.new_status, ActionStatus::Completed);

    let err = store
        .record_action_follow_up(user_id, &action_follow_up(created.id, 10, Some("registered")))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidTransition { .. }), "{err:?}");

    let detail = store.get_action_detail(created.id).await.unwrap();
    assert_eq!(detail.action.status, ActionStatus::Completed);
    assert_eq!(detail.action.progress_percentage, 100);
    assert_eq!(detail.action.last_update_date, NaiveDate::from_ymd_opt(2024, 5, 20));
    assert_eq!(detail.follow_ups.len(), 2);
}

#[tokio::test]
async fn action_can_be_cancelled_from_any_open_state() {
    let (_dir, store, user_id) = setup().await;
    let draft = store
        .create_action_draft(user_id, &ActionForm::default())
        .await
        .unwrap();
    let cancelled = store
        .record_action_follow_up(user_id, &action_follow_up(draft.id, 0, Some("Cancelado")))
        .await
        .unwrap();
    assert_eq!(cancelled.new_status, ActionStatus::Cancelled);

    let err = store
        .record_action_follow_up(user_id, &action_follow_up(draft.id, 50, None))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidTransition { .. }));
}

#[tokio::test]
async fn action_follow_up_on_missing_action_is_not_found() {
    let (_dir, store, user_id) = setup().await;
    let err = store
        .record_action_follow_up(user_id, &action_follow_up(77, 50, None))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

// ---- Dashboards ----

#[tokio::test]
async fn dashboards_count_current_state() {
    let (_dir, store, user_id) = setup().await;
    let today = Local::now().date_naive();

    let report = store.register_report(user_id, &full_report()).await.unwrap();
    store.register_report(user_id, &full_report()).await.unwrap();
    store
        .record_commitment_follow_up(
            user_id,
            &CommitmentFollowUpRequest {
                report_id: report.id,
                progress_percentage: 100,
                evidence: None,
                observations: None,
            },
        )
        .await
        .unwrap();

    // Registered this month, past its end date and still open.
    let overdue_form = ActionForm {
        registration_date: Some(today.format("%Y-%m-%d").to_string()),
        start_date: Some("2020-01-01".to_string()),
        end_date: Some("2020-02-01".to_string()),
        ..full_action()
    };
    store.create_action(user_id, &overdue_form).await.unwrap();
    let finished = store.create_action(user_id, &full_action()).await.unwrap();
    store
        .record_action_follow_up(user_id, &action_follow_up(finished.id, 100, None))
        .await
        .unwrap();

    let summary = store.dashboard_summary(today).await.unwrap();
    assert_eq!(summary.reports.total, 2);
    assert_eq!(summary.reports.completed, 1);
    assert_eq!(summary.reports.in_progress, 0);
    assert_eq!(summary.reports.this_month, 2);
    assert_eq!(summary.actions.total, 2);
    assert_eq!(summary.actions.completed, 1);
    assert_eq!(summary.actions.registered, 1);
    assert_eq!(summary.actions.this_month, 1);
    assert_eq!(summary.recent_reports.len(), 2);

    let admin = store.admin_dashboard(today).await.unwrap();
    assert_eq!(admin.total, 2);
    assert_eq!(admin.pending, 1);
    assert_eq!(admin.overdue, 1);
    assert_eq!(admin.monthly.len(), 6);
    assert_eq!(admin.monthly[5].month, today.format("%Y-%m").to_string());
    assert_eq!(admin.monthly[5].count, 1);

    let stats = store.admin_stats(today).await.unwrap();
    assert_eq!(stats.active_users, 1);
    assert_eq!(stats.reports_this_month, 2);
    assert_eq!(stats.pending_commitments, 1);
}
