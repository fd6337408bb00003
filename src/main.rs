use std::sync::Arc;

use rookdb::buffer::BufferPoolManager;
use rookdb::catalog::Catalog;
use rookdb::execution::{build_executor, Executor, ExecutorContext, Expression, PlanNode};
use rookdb::optimizer::optimize_seq_scan_as_index_scan;
use rookdb::storage::disk::DiskManager;
use rookdb::tuple::{Column, DataType, Schema, Value};

fn main() {
    env_logger::init();

    println!("rookdb - a disk-oriented relational engine core");
    println!("===============================================\n");

    let db_path = "demo.db";
    let disk_manager = Arc::new(DiskManager::new(db_path).expect("failed to open database file"));
    let bpm = Arc::new(BufferPoolManager::new(64, 2, disk_manager));
    let catalog = Arc::new(Catalog::new(Arc::clone(&bpm)));
    println!("opened {} with a 64-frame buffer pool", db_path);

    let schema = Schema::new(vec![
        Column::new("id", DataType::Integer),
        Column::new("name", DataType::VarChar(32)),
    ]);
    let table = catalog
        .create_table("users", Arc::clone(&schema))
        .expect("failed to create table");
    catalog
        .create_index("users_id", "users", "id")
        .expect("failed to create index");
    println!("created table 'users' with a hash index on 'id'\n");

    let ctx = Arc::new(ExecutorContext::new(Arc::clone(&catalog), Arc::clone(&bpm)));

    let rows = vec![
        vec![Value::Integer(1), Value::String("ada".into())],
        vec![Value::Integer(2), Value::String("grace".into())],
        vec![Value::Integer(3), Value::String("edsger".into())],
    ];
    let insert_plan = PlanNode::Insert {
        table_oid: table.oid,
        child: Box::new(PlanNode::Values {
            schema: Arc::clone(&schema),
            rows,
        }),
    };
    let mut insert = build_executor(&insert_plan, &ctx).expect("plan failed");
    insert.init().expect("init failed");
    if let Some((tuple, _)) = insert.next().expect("insert failed") {
        println!("inserted {} rows", tuple.value(0).unwrap());
    }

    // An equality scan that the optimizer turns into an index probe.
    let scan_plan = PlanNode::SeqScan {
        table_oid: table.oid,
        filter: Some(Expression::column_equals(0, Value::Integer(2))),
    };
    let optimized = optimize_seq_scan_as_index_scan(&scan_plan, &catalog);
    match &optimized {
        PlanNode::IndexScan { .. } => println!("optimizer chose the index probe"),
        _ => println!("optimizer left the sequential scan"),
    }

    let mut scan = build_executor(&optimized, &ctx).expect("plan failed");
    scan.init().expect("init failed");
    while let Some((tuple, rid)) = scan.next().expect("scan failed") {
        println!("  {} -> id={}, name={}", rid, tuple.value(0).unwrap(), tuple.value(1).unwrap());
    }

    bpm.flush_all_pages().expect("flush failed");
    println!("\nflushed all pages; demo complete");
}
