use std::sync::Arc;

use strata::catalog::Context;
use strata::common::StorageConfig;
use strata::execution::{ColumnSelector, CompareOp, Comparer, Condition, Logic};
use strata::service::Session;
use strata::tuple::{ColumnType, SchemaBuilder};

fn main() {
    println!("Strata - a page-cached relational engine in Rust");
    println!("================================================\n");

    let data_dir = std::env::temp_dir().join("strata-demo");
    let config = StorageConfig::new(&data_dir)
        .with_page_byte_budget(64)
        .with_max_resident_pages(2);
    let context = Arc::new(Context::new(config).expect("Failed to open data directory"));
    println!("Data directory: {}", data_dir.display());

    context.create_database_if_not_exists("school");
    let mut session =
        Session::connect(Arc::clone(&context), "school").expect("Failed to connect");

    let person = SchemaBuilder::new()
        .primary("id", ColumnType::Int)
        .string("name", 32)
        .build()
        .expect("Invalid schema");
    let table = session
        .create_table("person", person)
        .expect("Failed to create table");

    let course = SchemaBuilder::new()
        .primary("cid", ColumnType::Int)
        .not_null_column("lecturer", ColumnType::Int)
        .string("title", 32)
        .build()
        .expect("Invalid schema");
    session
        .create_table("course", course)
        .expect("Failed to create table");

    // Insert inside a transaction, pinning the touched pages until commit
    session.begin();
    let people: Vec<[String; 2]> = (0..12)
        .map(|id| [id.to_string(), format!("'person {}'", id)])
        .collect();
    for row in &people {
        let values = [row[0].as_str(), row[1].as_str()];
        session
            .insert("person", None, &[&values])
            .expect("Failed to insert person");
    }
    session
        .insert(
            "course",
            Some(&["cid", "lecturer", "title"][..]),
            &[&["100", "3", "'databases'"], &["101", "7", "'compilers'"], &["102", "42", "'nobody'"]],
        )
        .expect("Failed to insert course");
    session.commit();

    let stats = table.stats();
    println!(
        "person: {} rows on {} pages, {} resident",
        stats.rows, stats.pages, stats.resident_pages
    );

    // Point lookup on the primary key
    let by_id = Logic::condition(Condition::eq(Comparer::column("id"), 7.into()));
    let output = session
        .select(&["person"], None, &[ColumnSelector::all()], Some(by_id))
        .expect("Failed to query");
    println!("\n{}", output.columns.join(" | "));
    for row in &output.rows {
        println!("{}", row);
    }

    // Join resolved through the primary key of person
    let join = Logic::condition(Condition::eq(
        Comparer::column("person.id"),
        Comparer::column("course.lecturer"),
    ));
    let output = session
        .select(
            &["course", "person"],
            Some(join),
            &[ColumnSelector::column("title"), ColumnSelector::column("name")],
            None,
        )
        .expect("Failed to join");
    println!("\n{}", output.columns.join(" | "));
    for row in &output.rows {
        println!("{}", row);
    }

    let filter = Logic::condition(Condition::new(
        Comparer::column("id"),
        CompareOp::Ge,
        10.into(),
    ));
    let deleted = session
        .delete("person", Some(&filter))
        .expect("Failed to delete");
    println!("\nDeleted {} rows", deleted);

    let stats = table.stats();
    println!(
        "person: {} rows, {} resurrections so far",
        stats.rows, stats.resurrections
    );

    session.disconnect();
    context.quit().expect("Failed to persist");
    println!("\nPersisted all tables");

    std::fs::remove_dir_all(&data_dir).ok();
    println!("\nDemo completed successfully!");
}
