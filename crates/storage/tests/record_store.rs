#![forbid(unsafe_code)]

use reg_core::{
    DEFAULT_REFERRER, FilterParams, FilterSpec, OfficeScope, TextField, TextFilter,
};
use reg_storage::{
    CreateRecordRequest, OfficeTarget, RecordInput, RecordPatch, SqliteStore, StoreError,
    SubmitRecordRequest,
};
use tempfile::TempDir;

fn open_store() -> (TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = SqliteStore::open(dir.path()).expect("open store");
    (dir, store)
}

fn input(name: &str, tax_id: &str) -> RecordInput {
    RecordInput {
        name: name.to_string(),
        tax_id: tax_id.to_string(),
        action_type: "TRABALHISTA".to_string(),
        ..RecordInput::default()
    }
}

fn create_in(store: &SqliteStore, office_key: &str, input: RecordInput) -> i64 {
    store
        .record_create(CreateRecordRequest {
            office_key: office_key.to_string(),
            input,
        })
        .expect("create record")
        .id
}

#[test]
fn create_and_get_round_trip_all_fields() {
    let (_dir, store) = open_store();
    store.office_register("RIO", "Rio").expect("register");

    let created = store
        .record_create(CreateRecordRequest {
            office_key: "RIO".to_string(),
            input: RecordInput {
                name: "  Ana Souza ".to_string(),
                tax_id: "123.456.789-00".to_string(),
                action_type: "PREVIDENCIARIA".to_string(),
                closing_date: "2024-03-15".to_string(),
                pending_notes: "docs pendentes".to_string(),
                process_number: "0001234-56.2024".to_string(),
                filing_date: "".to_string(),
                remarks: "ligar segunda".to_string(),
                referrer: "Carlos".to_string(),
            },
        })
        .expect("create record");

    assert_eq!(created.office_key, "RIO");
    assert_eq!(created.office_display, "Rio");
    assert_eq!(created.fields.name, "Ana Souza");
    assert!(created.created_at_ms > 0);

    let fetched = store.record_get(created.id).expect("get record");
    assert_eq!(fetched, created);
    assert_eq!(
        fetched.fields.closing_date.map(|d| d.to_string()).as_deref(),
        Some("2024-03-15")
    );
    assert_eq!(fetched.fields.filing_date, None);
}

#[test]
fn create_requires_registered_office_and_valid_fields() {
    let (_dir, store) = open_store();

    let err = store
        .record_create(CreateRecordRequest {
            office_key: "NOWHERE".to_string(),
            input: input("Ana", "1"),
        })
        .expect_err("unregistered office");
    assert!(matches!(err, StoreError::UnknownOffice(ref key) if key == "NOWHERE"));

    let err = store
        .record_create(CreateRecordRequest {
            office_key: "CENTRAL".to_string(),
            input: input("   ", "1"),
        })
        .expect_err("blank name");
    assert_eq!(err.code(), "VALIDATION");

    let err = store
        .record_create(CreateRecordRequest {
            office_key: "CENTRAL".to_string(),
            input: RecordInput {
                closing_date: "15/03/2024".to_string(),
                ..input("Ana", "1")
            },
        })
        .expect_err("bad date");
    assert!(matches!(err, StoreError::InvalidInput(_)));
    assert_eq!(store.record_count().expect("count"), 0);
}

#[test]
fn ids_are_monotonic() {
    let (_dir, store) = open_store();
    let a = create_in(&store, "CENTRAL", input("A", "1"));
    let b = create_in(&store, "CENTRAL", input("B", "2"));
    store.soft_delete(b).expect("quarantine b");
    let c = create_in(&store, "CENTRAL", input("C", "3"));
    assert!(a < b && b < c, "ids must never be reused: {a} {b} {c}");
}

#[test]
fn submit_resolves_labels_and_defaults() {
    let (_dir, store) = open_store();

    let record = store
        .submit_record(SubmitRecordRequest {
            office_label: "  São Paulo ".to_string(),
            input: input("Ana", "1"),
        })
        .expect("submit");
    assert_eq!(record.office_key, "SAO_PAULO");
    assert_eq!(record.office_display, "SÃO PAULO");
    assert_eq!(record.fields.referrer, DEFAULT_REFERRER);

    let office = store.office_get("SAO_PAULO").expect("office registered");
    assert_eq!(office.display_name, "SÃO PAULO");

    let central = store
        .submit_record(SubmitRecordRequest {
            office_label: "".to_string(),
            input: input("Bia", "2"),
        })
        .expect("submit blank office");
    assert_eq!(central.office_key, "CENTRAL");
}

#[test]
fn submit_prefers_existing_display_match() {
    let (_dir, store) = open_store();
    store.office_register("FILIAL_NORTE", "ZONA NORTE").expect("register");

    let record = store
        .submit_record(SubmitRecordRequest {
            office_label: "zona norte".to_string(),
            input: input("Ana", "1"),
        })
        .expect("submit");
    assert_eq!(record.office_key, "FILIAL_NORTE");
    assert_eq!(record.office_display, "ZONA NORTE");
    assert!(store.office_get("ZONA_NORTE").is_err());
}

#[test]
fn update_applies_partial_changes() {
    let (_dir, store) = open_store();
    let id = create_in(
        &store,
        "CENTRAL",
        RecordInput {
            closing_date: "2024-01-10".to_string(),
            ..input("Ana", "111")
        },
    );

    let updated = store
        .record_update(
            id,
            RecordPatch {
                tax_id: Some("222".to_string()),
                closing_date: Some("".to_string()),
                filing_date: Some("2024-02-01".to_string()),
                ..RecordPatch::default()
            },
        )
        .expect("update");
    assert_eq!(updated.fields.name, "Ana");
    assert_eq!(updated.fields.tax_id, "222");
    assert_eq!(updated.fields.closing_date, None);
    assert_eq!(
        updated.fields.filing_date.map(|d| d.to_string()).as_deref(),
        Some("2024-02-01")
    );
    assert_eq!(store.record_get(id).expect("get"), updated);
}

#[test]
fn update_retags_office_key_and_display_together() {
    let (_dir, store) = open_store();
    store.office_register("RIO", "Rio").expect("register");
    let id = create_in(&store, "CENTRAL", input("Ana", "1"));

    let by_key = store
        .record_update(
            id,
            RecordPatch {
                office: Some(OfficeTarget::Key("RIO".to_string())),
                ..RecordPatch::default()
            },
        )
        .expect("retag by key");
    assert_eq!(by_key.office_key, "RIO");
    assert_eq!(by_key.office_display, "Rio");

    let by_label = store
        .record_update(
            id,
            RecordPatch {
                office: Some(OfficeTarget::Label("Belo Horizonte".to_string())),
                ..RecordPatch::default()
            },
        )
        .expect("retag by label");
    assert_eq!(by_label.office_key, "BELO_HORIZONTE");
    assert_eq!(by_label.office_display, "BELO HORIZONTE");

    let err = store
        .record_update(
            id,
            RecordPatch {
                office: Some(OfficeTarget::Key("GHOST".to_string())),
                name: Some("Changed".to_string()),
                ..RecordPatch::default()
            },
        )
        .expect_err("unknown key");
    assert!(matches!(err, StoreError::UnknownOffice(_)));
    assert_eq!(store.record_get(id).expect("get").fields.name, "Ana");
}

#[test]
fn update_refreshes_display_after_office_rename() {
    let (_dir, store) = open_store();
    store.office_register("RIO", "Rio").expect("register");
    let id = create_in(&store, "RIO", input("Ana", "1"));

    store.office_rename("RIO", "Rio de Janeiro").expect("rename");
    assert_eq!(store.record_get(id).expect("get").office_display, "Rio");

    let updated = store
        .record_update(
            id,
            RecordPatch {
                remarks: Some("touched".to_string()),
                ..RecordPatch::default()
            },
        )
        .expect("update");
    assert_eq!(updated.office_display, "Rio de Janeiro");
}

#[test]
fn update_unknown_record_is_not_found() {
    let (_dir, store) = open_store();
    let err = store
        .record_update(42, RecordPatch::default())
        .expect_err("unknown record");
    assert!(matches!(err, StoreError::UnknownRecord(42)));
}

#[test]
fn pagination_clamps_to_last_page() {
    let (_dir, store) = open_store();
    let ids: Vec<i64> = (0..25)
        .map(|i| create_in(&store, "CENTRAL", input(&format!("Client {i:02}"), "0")))
        .collect();

    let page = store
        .record_list(&FilterSpec {
            page: 5,
            page_size: 10,
            ..FilterSpec::default()
        })
        .expect("list");
    assert_eq!(page.window.total_count, 25);
    assert_eq!(page.window.total_pages, 3);
    assert_eq!(page.window.page, 3);
    assert_eq!(page.rows.len(), 5);

    let expected: Vec<i64> = ids.iter().take(5).rev().copied().collect();
    let got: Vec<i64> = page.rows.iter().map(|r| r.id).collect();
    assert_eq!(got, expected);

    let first = store
        .record_list(&FilterSpec {
            page_size: 33,
            ..FilterSpec::default()
        })
        .expect("list");
    assert_eq!(first.window.page_size, 10);
    assert_eq!(first.rows.first().map(|r| r.id), ids.last().copied());
}

#[test]
fn empty_listing_reports_one_page() {
    let (_dir, store) = open_store();
    let page = store
        .record_list(&FilterSpec {
            page: 3,
            ..FilterSpec::default()
        })
        .expect("list");
    assert!(page.rows.is_empty());
    assert_eq!(page.window.page, 1);
    assert_eq!(page.window.total_pages, 1);
    assert_eq!(page.window.total_count, 0);
}

#[test]
fn filters_by_office_text_and_dates() {
    let (_dir, store) = open_store();
    store.office_register("RIO", "Rio").expect("register");

    let ana = create_in(
        &store,
        "RIO",
        RecordInput {
            closing_date: "2024-01-15".to_string(),
            ..input("Ana Conceição", "123.456")
        },
    );
    let bruno = create_in(
        &store,
        "RIO",
        RecordInput {
            closing_date: "2024-03-01".to_string(),
            ..input("Bruno", "999.111")
        },
    );
    let carla = create_in(&store, "CENTRAL", input("CONCEIÇÃO Carla", "123.999"));

    let ids = |spec: FilterSpec| -> Vec<i64> {
        store
            .record_list(&spec)
            .expect("list")
            .rows
            .into_iter()
            .map(|r| r.id)
            .collect()
    };

    assert_eq!(
        ids(FilterSpec {
            office_scope: OfficeScope::Office("RIO".to_string()),
            ..FilterSpec::default()
        }),
        vec![bruno, ana]
    );

    assert_eq!(
        ids(FilterSpec {
            text: Some(TextFilter {
                field: TextField::Name,
                value: "conceição".to_string(),
            }),
            ..FilterSpec::default()
        }),
        vec![carla, ana]
    );

    assert_eq!(
        ids(FilterSpec {
            text: Some(TextFilter {
                field: TextField::TaxId,
                value: "123".to_string(),
            }),
            ..FilterSpec::default()
        }),
        vec![carla, ana]
    );

    assert_eq!(
        ids(FilterSpec {
            text: Some(TextFilter {
                field: TextField::Id,
                value: bruno.to_string(),
            }),
            ..FilterSpec::default()
        }),
        vec![bruno]
    );

    assert!(
        ids(FilterSpec {
            text: Some(TextFilter {
                field: TextField::Id,
                value: "abc".to_string(),
            }),
            ..FilterSpec::default()
        })
        .is_empty()
    );

    let spec = FilterSpec::from_params(&FilterParams {
        office: Some("all"),
        date_field: Some("closing_date"),
        date_from: Some("2024-01-15"),
        date_to: Some("2024-02-28"),
        ..FilterParams::default()
    })
    .expect("params");
    assert_eq!(ids(spec), vec![ana]);

    let spec = FilterSpec::from_params(&FilterParams {
        date_field: Some("closing_date"),
        date_from: Some("2024-02-01"),
        ..FilterParams::default()
    })
    .expect("params");
    assert_eq!(ids(spec), vec![bruno]);
}

#[test]
fn update_of_orphaned_record_registers_its_office_again() {
    let (_dir, store) = open_store();
    store.office_register("SAO_PAULO", "SÃO PAULO").expect("register");
    let id = create_in(&store, "SAO_PAULO", input("Ana", "1"));
    store.office_delete("SAO_PAULO").expect("delete office");

    let updated = store
        .record_update(
            id,
            RecordPatch {
                remarks: Some("ligar".to_string()),
                ..RecordPatch::default()
            },
        )
        .expect("update");
    assert_eq!(updated.office_key, "SAO_PAULO");
    assert_eq!(updated.office_display, "SÃO PAULO");

    let office = store.office_get("SAO_PAULO").expect("office registered again");
    assert_eq!(office.display_name, "SÃO PAULO");
}
