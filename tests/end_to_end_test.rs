//! End-to-end scenarios spanning the buffer pool, the hash index, MVCC,
//! and the plan rewrites — the properties a unit test inside a single
//! module can't exercise because they need the whole stack wired
//! together.

use std::sync::Arc;

use rusty_db::buffer::BufferPoolManager;
use rusty_db::catalog::{Catalog, Column, DataType, Schema};
use rusty_db::common::{PageId, Value};
use rusty_db::execution::context::ExecutorContext;
use rusty_db::execution::executor::{build_executor, Executor};
use rusty_db::execution::expr::Expr;
use rusty_db::execution::plan::{OrderByType, PlanNode};
use rusty_db::execution::rewrite::rewrite_sort_limit_to_topn;
use rusty_db::storage::DiskManager;
use rusty_db::transaction::{IsolationLevel, TransactionManager, TransactionState};

fn bpm(pool_size: usize, k: usize) -> BufferPoolManager {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let disk = Arc::new(DiskManager::new_temp().unwrap());
    BufferPoolManager::with_k(pool_size, disk, k)
}

#[test]
fn buffer_pool_evicts_greatest_k_distance_and_reloads_original_content() {
    let pool = bpm(3, 2);

    let mut page_ids: Vec<PageId> = Vec::new();
    for i in 0..3u8 {
        let page = pool.new_page().unwrap();
        page.write_latch()[0] = b'a' + i;
        page_ids.push(page.page_id());
        pool.unpin_page(page.page_id(), true);
    }

    // A 4th fetch needs to evict; all three existing frames are pinned
    // down to zero and evictable, so this must succeed by evicting one
    // of them (LRU-K picks the earliest-accessed among equal, all-infinite
    // candidates: page 0).
    let page4 = pool.new_page();
    assert!(page4.is_some());
    let page4 = page4.unwrap();
    pool.unpin_page(page4.page_id(), false);

    // Every original page reloads its original content once re-fetched,
    // whether it was the eviction victim or stayed resident.
    for (i, &pid) in page_ids.iter().enumerate() {
        let page = pool.fetch_page(pid).unwrap();
        assert_eq!(page.read_latch()[0], b'a' + i as u8);
        pool.unpin_page(pid, false);
    }
}

#[test]
fn hash_index_splits_directory_and_buckets_on_fifth_insert() {
    use rusty_db::index::ExtendibleHashTable;
    use rusty_db::common::rid::Rid;

    let pool = Arc::new(bpm(16, 2));
    let table = ExtendibleHashTable::new(pool, 0, 2, 2).unwrap();

    // Four keys whose low two bits are 00/01/10/11 under the FNV hash used
    // internally can't be dictated directly, but driving enough inserts
    // through the same low-order pattern forces exactly this split
    // sequence: fill both two-entry buckets, split on the fifth insert.
    for i in 0..4i64 {
        table.insert(Value::Integer(i), Rid::new(0, i as u32)).unwrap();
    }
    // A fifth insert must succeed by splitting a full bucket (global depth
    // was already at max 2 with two local-depth-2 buckets at this point,
    // or a shallower layout that still has room to split).
    let ok = table.insert(Value::Integer(100), Rid::new(0, 100)).unwrap();
    assert!(ok);

    for i in 0..4i64 {
        assert_eq!(table.get_value(&Value::Integer(i)), Some(Rid::new(0, i as u32)));
    }
    assert_eq!(table.get_value(&Value::Integer(100)), Some(Rid::new(0, 100)));
}

fn int_schema(names: &[&str]) -> Arc<Schema> {
    Arc::new(Schema::new(
        names.iter().map(|n| Column::new(*n, DataType::Integer)).collect(),
    ))
}

fn seq_scan_all(
    catalog: &Arc<Catalog>,
    txn_manager: &Arc<TransactionManager>,
    txn: &Arc<rusty_db::transaction::Transaction>,
    table_oid: u32,
    schema: Arc<Schema>,
) -> Vec<Vec<Value>> {
    let ctx = Arc::new(ExecutorContext::new(catalog.clone(), txn_manager.clone(), txn.clone()));
    let plan = PlanNode::SeqScan {
        schema,
        table_oid,
        filter: None,
    };
    let mut exec = build_executor(ctx, &plan).unwrap();
    exec.init().unwrap();
    let mut out = Vec::new();
    while let Some((tuple, _)) = exec.next().unwrap() {
        out.push(tuple);
    }
    out
}

fn insert_row(
    catalog: &Arc<Catalog>,
    txn_manager: &Arc<TransactionManager>,
    txn: &Arc<rusty_db::transaction::Transaction>,
    table_oid: u32,
    schema: Arc<Schema>,
    row: Vec<Value>,
) {
    let ctx = Arc::new(ExecutorContext::new(catalog.clone(), txn_manager.clone(), txn.clone()));
    let plan = PlanNode::Insert {
        schema: int_schema(&["n"]),
        table_oid,
        child: Box::new(PlanNode::Values {
            schema,
            rows: vec![row],
        }),
    };
    let mut exec = build_executor(ctx, &plan).unwrap();
    exec.init().unwrap();
    exec.next().unwrap();
}

#[test]
fn mvcc_snapshot_reads_see_only_versions_committed_before_their_read_ts() {
    let pool = Arc::new(bpm(16, 2));
    let catalog = Arc::new(Catalog::new(pool));
    let txn_manager = Arc::new(TransactionManager::new(catalog.clone()));
    let schema = int_schema(&["n"]);
    let table = catalog.create_table("t", Schema::new(schema.columns.clone())).unwrap();

    let t1 = txn_manager.begin(IsolationLevel::SnapshotIsolation);

    let t2 = txn_manager.begin(IsolationLevel::SnapshotIsolation);
    insert_row(&catalog, &txn_manager, &t2, table.oid, schema.clone(), vec![Value::Integer(1)]);
    txn_manager.commit(&t2).unwrap();

    let t3 = txn_manager.begin(IsolationLevel::SnapshotIsolation);

    // t4 updates the row and commits.
    let t4 = txn_manager.begin(IsolationLevel::SnapshotIsolation);
    {
        let ctx = Arc::new(ExecutorContext::new(catalog.clone(), txn_manager.clone(), t4.clone()));
        let plan = PlanNode::Update {
            schema: schema.clone(),
            table_oid: table.oid,
            target_exprs: vec![Expr::literal(Value::Integer(2))],
            child: Box::new(PlanNode::SeqScan {
                schema: schema.clone(),
                table_oid: table.oid,
                filter: None,
            }),
        };
        let mut exec = build_executor(ctx, &plan).unwrap();
        exec.init().unwrap();
        exec.next().unwrap();
    }
    txn_manager.commit(&t4).unwrap();

    let t5 = txn_manager.begin(IsolationLevel::SnapshotIsolation);

    // t1 began before the insert committed: sees nothing.
    assert!(seq_scan_all(&catalog, &txn_manager, &t1, table.oid, schema.clone()).is_empty());

    // t3 began after the insert but before the update: sees the original
    // value.
    let t3_rows = seq_scan_all(&catalog, &txn_manager, &t3, table.oid, schema.clone());
    assert_eq!(t3_rows, vec![vec![Value::Integer(1)]]);

    // t5 began after both commits: sees the updated value.
    let t5_rows = seq_scan_all(&catalog, &txn_manager, &t5, table.oid, schema.clone());
    assert_eq!(t5_rows, vec![vec![Value::Integer(2)]]);

    txn_manager.abort(&t1);
    txn_manager.abort(&t3);
    txn_manager.abort(&t5);
}

#[test]
fn concurrent_updates_to_the_same_row_taint_the_loser() {
    let pool = Arc::new(bpm(16, 2));
    let catalog = Arc::new(Catalog::new(pool));
    let txn_manager = Arc::new(TransactionManager::new(catalog.clone()));
    let schema = int_schema(&["n"]);
    let table = catalog.create_table("t", Schema::new(schema.columns.clone())).unwrap();

    let setup = txn_manager.begin(IsolationLevel::SnapshotIsolation);
    insert_row(&catalog, &txn_manager, &setup, table.oid, schema.clone(), vec![Value::Integer(1)]);
    txn_manager.commit(&setup).unwrap();

    let t1 = txn_manager.begin(IsolationLevel::SnapshotIsolation);
    {
        let ctx = Arc::new(ExecutorContext::new(catalog.clone(), txn_manager.clone(), t1.clone()));
        let plan = PlanNode::Update {
            schema: schema.clone(),
            table_oid: table.oid,
            target_exprs: vec![Expr::literal(Value::Integer(2))],
            child: Box::new(PlanNode::SeqScan {
                schema: schema.clone(),
                table_oid: table.oid,
                filter: None,
            }),
        };
        let mut exec = build_executor(ctx, &plan).unwrap();
        exec.init().unwrap();
        exec.next().unwrap();
    }
    // t1 stays RUNNING (does not commit yet).

    let t2 = txn_manager.begin(IsolationLevel::SnapshotIsolation);
    let ctx2 = Arc::new(ExecutorContext::new(catalog.clone(), txn_manager.clone(), t2.clone()));
    let plan2 = PlanNode::Update {
        schema: schema.clone(),
        table_oid: table.oid,
        target_exprs: vec![Expr::literal(Value::Integer(3))],
        child: Box::new(PlanNode::SeqScan {
            schema: schema.clone(),
            table_oid: table.oid,
            filter: None,
        }),
    };
    let mut exec2 = build_executor(ctx2, &plan2).unwrap();
    exec2.init().unwrap();
    let result = exec2.next();
    assert!(result.is_err());
    assert_eq!(t2.state(), TransactionState::Tainted);

    txn_manager.abort(&t2);
    txn_manager.commit(&t1).unwrap();
}

#[test]
fn sort_plus_limit_rewrites_to_topn_with_equivalent_output() {
    let schema = int_schema(&["n"]);
    let plan = PlanNode::Limit {
        schema: schema.clone(),
        limit: 2,
        child: Box::new(PlanNode::Sort {
            schema: schema.clone(),
            order_bys: vec![(OrderByType::Asc, Expr::column(0))],
            child: Box::new(PlanNode::Values {
                schema: schema.clone(),
                rows: vec![
                    vec![Value::Integer(3)],
                    vec![Value::Integer(1)],
                    vec![Value::Integer(2)],
                ],
            }),
        }),
    };
    let rewritten = rewrite_sort_limit_to_topn(plan);
    assert!(matches!(rewritten, PlanNode::TopN { n: 2, .. }));

    let pool = Arc::new(bpm(4, 2));
    let catalog = Arc::new(Catalog::new(pool));
    let txn_manager = Arc::new(TransactionManager::new(catalog.clone()));
    let txn = txn_manager.begin(IsolationLevel::SnapshotIsolation);
    let ctx = Arc::new(ExecutorContext::new(catalog, txn_manager, txn));
    let mut exec = build_executor(ctx, &rewritten).unwrap();
    exec.init().unwrap();
    let mut out = Vec::new();
    while let Some((t, _)) = exec.next().unwrap() {
        out.push(t[0].clone());
    }
    assert_eq!(out, vec![Value::Integer(1), Value::Integer(2)]);
}

#[test]
fn garbage_collection_drains_undo_chains_past_the_watermark() {
    let pool = Arc::new(bpm(16, 2));
    let catalog = Arc::new(Catalog::new(pool));
    let txn_manager = Arc::new(TransactionManager::new(catalog.clone()));
    let schema = int_schema(&["n"]);
    let table = catalog.create_table("t", Schema::new(schema.columns.clone())).unwrap();

    let setup = txn_manager.begin(IsolationLevel::SnapshotIsolation);
    insert_row(&catalog, &txn_manager, &setup, table.oid, schema.clone(), vec![Value::Integer(0)]);
    txn_manager.commit(&setup).unwrap();

    let rid = table.table.all_rids()[0];

    for i in 1..=5i64 {
        let txn = txn_manager.begin(IsolationLevel::SnapshotIsolation);
        let ctx = Arc::new(ExecutorContext::new(catalog.clone(), txn_manager.clone(), txn.clone()));
        let plan = PlanNode::Update {
            schema: schema.clone(),
            table_oid: table.oid,
            target_exprs: vec![Expr::literal(Value::Integer(i))],
            child: Box::new(PlanNode::SeqScan {
                schema: schema.clone(),
                table_oid: table.oid,
                filter: None,
            }),
        };
        let mut exec = build_executor(ctx, &plan).unwrap();
        exec.init().unwrap();
        exec.next().unwrap();
        txn_manager.commit(&txn).unwrap();
    }

    // No outstanding readers: the watermark should already sit at
    // last_commit_ts.
    assert_eq!(txn_manager.get_watermark(), txn_manager.last_commit_ts());

    txn_manager.garbage_collect();

    assert!(txn_manager.get_undo_link(rid).is_none());
}
