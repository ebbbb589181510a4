use datatable::prelude::*;
use datatable::{ConnectInfo, FlatFileTable};

fn orders_descriptor(dir: &std::path::Path) -> EntityDescriptor {
    let info = ConnectInfo {
        db: dir.to_string_lossy().into_owned(),
        ..ConnectInfo::default()
    };
    EntityDescriptor::new("orders", info).with_key_columns(["orderNumber"])
}

fn order(number: i64, customer: i64, status: &str) -> Record {
    template([
        ("orderNumber", Value::from(number)),
        ("customerNumber", Value::from(customer)),
        ("status", Value::from(status)),
    ])
}

async fn open_with(dir: &std::path::Path, rows: Vec<Record>) -> FlatFileTable {
    let table = FlatFileTable::open(orders_descriptor(dir)).await.unwrap();
    table.load(Some(rows), None).await.unwrap();
    table
}

#[tokio::test]
async fn test_requires_key_columns() {
    let dir = tempfile::tempdir().unwrap();
    let info = ConnectInfo {
        db: dir.path().to_string_lossy().into_owned(),
        ..ConnectInfo::default()
    };
    let err = FlatFileTable::open(EntityDescriptor::new("orders", info))
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn test_order_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let table = FlatFileTable::open(orders_descriptor(dir.path())).await.unwrap();

    table.insert(&order(1, 5, "open"), None).await.unwrap();
    assert_eq!(
        table.find_by_primary_key(&[Value::from(1)], None, None).await.unwrap(),
        Some(order(1, 5, "open"))
    );

    let updated = table
        .update_by_key(&[Value::from(1)], &template([("status", "shipped")]), None)
        .await
        .unwrap();
    assert_eq!(updated, 1);
    let found = table
        .find_by_primary_key(&[Value::from(1)], None, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found["status"], Value::from("shipped"));

    assert_eq!(table.delete_by_key(&[Value::from(1)], None).await.unwrap(), 1);
    assert_eq!(table.delete_by_key(&[Value::from(1)], None).await.unwrap(), 0);
    assert!(table
        .find_by_primary_key(&[Value::from(1)], None, None)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_duplicate_insert_leaves_table_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let table = open_with(dir.path(), vec![order(1, 5, "open"), order(2, 5, "open")]).await;

    let err = table.insert(&order(1, 9, "other"), None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateKey);
    let all = table.find_by_template(&Template::new(), &FindOptions::default(), None).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_conflicting_update_modifies_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let table = open_with(
        dir.path(),
        vec![order(1, 5, "open"), order(2, 5, "open"), order(3, 6, "open")],
    )
    .await;
    let before = table.find_by_template(&Template::new(), &FindOptions::default(), None).await.unwrap();

    let err = table
        .update_by_template(&template([("customerNumber", 5)]), &template([("orderNumber", 3)]), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateKey);

    let after = table.find_by_template(&Template::new(), &FindOptions::default(), None).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_refinements() {
    let dir = tempfile::tempdir().unwrap();
    let table = open_with(
        dir.path(),
        (1..=5).map(|n| order(n, 5, "open")).collect(),
    )
    .await;

    let page = table
        .find_by_template(
            &template([("customerNumber", 5)]),
            &FindOptions::default().fields(["orderNumber"]).offset(1).limit(2),
            None,
        )
        .await
        .unwrap();
    assert_eq!(
        page,
        vec![
            template([("orderNumber", 2)]),
            template([("orderNumber", 3)]),
        ]
    );

    let err = table
        .find_by_template(
            &Template::new(),
            &FindOptions::default().order_by(OrderBy::desc("orderNumber")),
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotImplemented);

    let err = table.query("SELECT 1", &[], None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotImplemented);
}

#[tokio::test]
async fn test_delete_by_empty_template_deletes_everything() {
    let dir = tempfile::tempdir().unwrap();
    let table = open_with(dir.path(), (1..=4).map(|n| order(n, n, "open")).collect()).await;
    assert_eq!(table.delete_by_template(&Template::new(), None).await.unwrap(), 4);
    assert!(table
        .find_by_template(&Template::new(), &FindOptions::default(), None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_load_is_all_or_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let table = open_with(dir.path(), vec![order(1, 5, "open")]).await;

    let err = table
        .load(Some(vec![order(2, 5, "open"), order(1, 5, "dup")]), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateKey);
    assert!(table.find_by_primary_key(&[Value::from(2)], None, None).await.unwrap().is_none());
    assert_eq!(table.load(None, None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_save_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let table = open_with(dir.path(), vec![order(1, 5, "open"), order(2, 7, "shipped")]).await;
    table.save(Some(&Context::with_request_id("req-1"))).await.unwrap();
    assert!(table.path().exists());

    let reopened = FlatFileTable::open(orders_descriptor(dir.path())).await.unwrap();
    assert_eq!(
        reopened.find_by_primary_key(&[Value::from(2)], None, None).await.unwrap(),
        Some(order(2, 7, "shipped"))
    );
}

#[tokio::test]
async fn test_dates_survive_save_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let ordered = chrono::NaiveDate::from_ymd_opt(2003, 1, 6).unwrap();
    let shipped = ordered.and_hms_opt(10, 30, 0).unwrap();
    let row = template([
        ("orderNumber", Value::from(1)),
        ("orderDate", Value::Date(ordered)),
        ("shippedAt", Value::DateTime(shipped)),
        ("comments", Value::from("2003-01-07")),
    ]);
    let table = open_with(dir.path(), vec![row.clone()]).await;
    table.save(None).await.unwrap();

    let reopened = FlatFileTable::open(orders_descriptor(dir.path())).await.unwrap();
    let by_date = reopened
        .find_by_template(
            &template([("orderDate", Value::Date(ordered))]),
            &FindOptions::default(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(by_date, vec![row.clone()]);
    let by_timestamp = reopened
        .find_by_template(
            &template([("shippedAt", Value::DateTime(shipped))]),
            &FindOptions::default(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(by_timestamp.len(), 1);
    // Plain strings that look like dates stay text.
    assert_eq!(by_date[0]["comments"], Value::from("2003-01-07"));
}

#[tokio::test]
async fn test_update_cannot_clear_key_column() {
    let dir = tempfile::tempdir().unwrap();
    let table = open_with(dir.path(), vec![order(1, 5, "open"), order(2, 7, "open")]).await;

    let err = table
        .update_by_key(&[Value::from(1)], &template([("orderNumber", Value::Null)]), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = table
        .update_by_template(
            &template([("status", "open")]),
            &template([("orderNumber", Value::Null), ("status", Value::from("void"))]),
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    assert_eq!(
        table.find_by_primary_key(&[Value::from(1)], None, None).await.unwrap(),
        Some(order(1, 5, "open"))
    );
    assert_eq!(
        table.find_by_primary_key(&[Value::from(2)], None, None).await.unwrap(),
        Some(order(2, 7, "open"))
    );
}

#[tokio::test]
async fn test_entity_name_must_be_a_plain_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let info = ConnectInfo {
        db: dir.path().to_string_lossy().into_owned(),
        ..ConnectInfo::default()
    };
    for name in ["../orders", "a/b", "..", ""] {
        let descriptor = EntityDescriptor::new(name, info.clone()).with_key_columns(["orderNumber"]);
        let err = FlatFileTable::open(descriptor).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{name:?}");
    }
}
