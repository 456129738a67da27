//! Integration tests for sessions: autocommit, transactions and persistence

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use strata::catalog::Context;
use strata::common::{StorageConfig, StrataError};
use strata::concurrency::LockMode;
use strata::execution::{ColumnSelector, CompareOp, Comparer, Condition, Logic};
use strata::service::Session;
use strata::tuple::{ColumnType, Entry, Row, Schema, SchemaBuilder};
use tempfile::TempDir;

fn create_context(dir: &TempDir) -> Arc<Context> {
    let config = StorageConfig::new(dir.path())
        .with_page_byte_budget(32)
        .with_max_resident_pages(2);
    let context = Arc::new(Context::new(config).unwrap());
    context.create_database_if_not_exists("school");
    context
}

fn create_small_context(dir: &TempDir) -> Arc<Context> {
    let config = StorageConfig::new(dir.path())
        .with_page_byte_budget(8)
        .with_max_resident_pages(1);
    let context = Arc::new(Context::new(config).unwrap());
    context.create_database_if_not_exists("school");
    context
}

fn person() -> Schema {
    SchemaBuilder::new()
        .primary("id", ColumnType::Int)
        .string("name", 16)
        .build()
        .unwrap()
}

fn id_cmp(op: CompareOp, value: i32) -> Logic {
    Logic::condition(Condition::new(Comparer::column("id"), op, value.into()))
}

fn all_rows(session: &Session, table: &str) -> Vec<Row> {
    session
        .select(&[table], None, &[ColumnSelector::all()], None)
        .unwrap()
        .rows
}

#[test]
fn test_delete_where() {
    let dir = TempDir::new().unwrap();
    let context = create_context(&dir);
    let session = Session::connect(Arc::clone(&context), "school").unwrap();
    session.create_table("person", person()).unwrap();

    let inserted = session
        .insert(
            "person",
            None,
            &[&["0", "'hi'"], &["1", "'hello'"], &["2", "'hello'"]],
        )
        .unwrap();
    assert_eq!(inserted, 3);

    let deleted = session
        .delete("person", Some(&id_cmp(CompareOp::Gt, 1)))
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(
        all_rows(&session, "person"),
        vec![
            Row::new(vec![Entry::Int(0), Entry::from("hi")]),
            Row::new(vec![Entry::Int(1), Entry::from("hello")]),
        ]
    );
}

#[test]
fn test_update_and_select_headers() {
    let dir = TempDir::new().unwrap();
    let context = create_context(&dir);
    let session = Session::connect(Arc::clone(&context), "school").unwrap();
    session.create_table("person", person()).unwrap();
    session
        .insert("person", Some(&["name", "id"][..]), &[&["'a'", "1"], &["'b'", "2"]])
        .unwrap();

    let updated = session
        .update(
            "person",
            "name",
            &Comparer::string("z"),
            Some(&id_cmp(CompareOp::Eq, 2)),
        )
        .unwrap();
    assert_eq!(updated, 1);

    let output = session
        .select(&["person"], None, &[ColumnSelector::column("name")], None)
        .unwrap();
    assert_eq!(output.columns, vec!["name"]);
    assert_eq!(
        output.rows,
        vec![Row::new(vec![Entry::from("a")]), Row::new(vec![Entry::from("z")])]
    );
}

#[test]
fn test_failed_statement_releases_lock() {
    let dir = TempDir::new().unwrap();
    let context = create_context(&dir);
    let first = Session::connect(Arc::clone(&context), "school").unwrap();
    let second = Session::connect(Arc::clone(&context), "school").unwrap();
    first.create_table("person", person()).unwrap();
    first.insert("person", None, &[&["1", "'a'"]]).unwrap();

    assert!(matches!(
        first.insert("person", None, &[&["1", "'again'"]]),
        Err(StrataError::DuplicateKey(_))
    ));
    assert!(context.lock_manager().exclusive_targets(first.id()).is_empty());

    // a second session can write straight away
    second.insert("person", None, &[&["2", "'b'"]]).unwrap();
    assert_eq!(all_rows(&second, "person").len(), 2);
}

#[test]
fn test_transaction_holds_exclusive_lock_until_commit() {
    let dir = TempDir::new().unwrap();
    let context = create_context(&dir);
    let mut writer = Session::connect(Arc::clone(&context), "school").unwrap();
    let table = writer.create_table("person", person()).unwrap();

    writer.begin();
    for id in 0..6 {
        let id = id.to_string();
        writer.insert("person", None, &[&[id.as_str(), "'x'"]]).unwrap();
    }
    assert_eq!(context.lock_manager().exclusive_targets(writer.id()), vec!["school.person"]);
    assert!(table.stats().pinned_pages > 0);

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let context = Arc::clone(&context);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let reader = Session::connect(context, "school").unwrap();
            let rows = all_rows(&reader, "person");
            done.store(true, Ordering::SeqCst);
            rows.len()
        })
    };

    while context.lock_manager().waiting("school.person", LockMode::Shared) == 0 {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(!done.load(Ordering::SeqCst));

    writer.commit();
    assert_eq!(reader.join().unwrap(), 6);
    assert_eq!(table.stats().pinned_pages, 0);
    assert!(!writer.in_transaction());
}

#[test]
fn test_disconnect_releases_locks() {
    let dir = TempDir::new().unwrap();
    let context = create_context(&dir);
    let mut session = Session::connect(Arc::clone(&context), "school").unwrap();
    session.create_table("person", person()).unwrap();
    session.begin();
    session.insert("person", None, &[&["1", "'a'"]]).unwrap();
    let id = session.id();

    session.disconnect();
    assert!(context.lock_manager().exclusive_targets(id).is_empty());

    let other = Session::connect(Arc::clone(&context), "school").unwrap();
    assert_eq!(other.delete("person", None).unwrap(), 1);
}

#[test]
fn test_join_through_session() {
    let dir = TempDir::new().unwrap();
    let context = create_context(&dir);
    let session = Session::connect(Arc::clone(&context), "school").unwrap();
    session.create_table("person", person()).unwrap();
    session
        .create_table(
            "course",
            SchemaBuilder::new()
                .primary("cid", ColumnType::Int)
                .column("lecturer", ColumnType::Int)
                .build()
                .unwrap(),
        )
        .unwrap();
    session
        .insert("person", None, &[&["1", "'ada'"], &["2", "'bob'"]])
        .unwrap();
    session
        .insert("course", None, &[&["10", "2"], &["11", "null"], &["12", "1"]])
        .unwrap();

    let join = Logic::condition(Condition::eq(
        Comparer::column("course.lecturer"),
        Comparer::column("person.id"),
    ));
    let output = session
        .select(
            &["course", "person"],
            Some(join),
            &[ColumnSelector::qualified("course", "cid"), ColumnSelector::column("name")],
            None,
        )
        .unwrap();
    assert_eq!(output.columns, vec!["cid", "name"]);
    assert_eq!(
        output.rows,
        vec![
            Row::new(vec![Entry::Int(10), Entry::from("bob")]),
            Row::new(vec![Entry::Int(12), Entry::from("ada")]),
        ]
    );
}

#[test]
fn test_quit_and_recover() {
    let dir = TempDir::new().unwrap();
    {
        let context = create_context(&dir);
        let session = Session::connect(Arc::clone(&context), "school").unwrap();
        session.create_table("person", person()).unwrap();
        let rows: Vec<[String; 2]> = (0..20)
            .map(|id| [id.to_string(), format!("'p{}'", id)])
            .collect();
        for row in &rows {
            session
                .insert("person", None, &[&[row[0].as_str(), row[1].as_str()]])
                .unwrap();
        }
        session.delete("person", Some(&id_cmp(CompareOp::Lt, 5))).unwrap();
        context.quit().unwrap();
    }

    let context = create_context(&dir);
    let table = context
        .database("school")
        .unwrap()
        .open_table("person", person())
        .unwrap();
    assert_eq!(table.len(), 15);
    let session = Session::connect(Arc::clone(&context), "school").unwrap();
    let rows = all_rows(&session, "person");
    assert_eq!(rows.first().unwrap().entries()[0], Entry::Int(5));
    assert_eq!(rows.last().unwrap().entries()[1], Entry::from("p19"));

    assert!(matches!(
        Session::connect(Arc::clone(&context), "missing"),
        Err(StrataError::DatabaseNotExist(_))
    ));
}

#[test]
fn test_autocommit_statements_leave_pages_evictable() {
    let dir = TempDir::new().unwrap();
    let context = create_small_context(&dir);
    let session = Session::connect(Arc::clone(&context), "school").unwrap();
    let table = session.create_table("person", person()).unwrap();

    for id in 0..6 {
        let id = id.to_string();
        session.insert("person", None, &[&[id.as_str(), "'x'"]]).unwrap();
        assert_eq!(table.stats().pinned_pages, 0);
    }
    let stats = table.stats();
    assert!(stats.pages > 1);
    assert_eq!(stats.resident_pages, 1);

    let rows = all_rows(&session, "person");
    assert_eq!(rows.len(), 6);
    let stats = table.stats();
    assert_eq!(stats.pinned_pages, 0);
    assert_eq!(stats.resident_pages, 1);
    assert!(stats.resurrections > 0);
    assert!(context.lock_manager().shared_targets(session.id()).is_empty());
}
