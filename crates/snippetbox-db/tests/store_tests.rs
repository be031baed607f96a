//! Store handle lifecycle and concurrency.

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use common::TestDb;
use snippetbox_db::{Database, ModelError, SnippetModel, SqliteSnippetModel, StoreError};

#[test]
fn test_parallel_inserts_get_distinct_ids() {
    const CALLERS: usize = 50;
    const INSERTS: usize = 100;

    let t = TestDb::with_readers(4);
    let handles: Vec<_> = (0..CALLERS)
        .map(|caller| {
            let snippets = t.snippets();
            thread::spawn(move || {
                let mut ids = Vec::with_capacity(INSERTS);
                for i in 0..INSERTS {
                    let id = snippets
                        .insert(&format!("caller {} #{}", caller, i), "content", 1)
                        .expect("insert failed");
                    // Each caller sees its own inserts in commit order.
                    if let Some(&prev) = ids.last() {
                        assert!(id > prev);
                    }
                    ids.push(id);
                }
                ids
            })
        })
        .collect();

    let mut all = HashSet::new();
    for h in handles {
        for id in h.join().expect("caller panicked") {
            assert!(all.insert(id), "duplicate id {}", id);
        }
    }
    assert_eq!(all.len(), CALLERS * INSERTS);
}

#[test]
fn test_reads_run_while_writing() {
    let t = TestDb::with_readers(4);
    let snippets = Arc::new(t.snippets());
    snippets.insert("seed", "seed", 1).unwrap();

    let writer = {
        let snippets = snippets.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                snippets.insert("w", "w", 1).unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let snippets = snippets.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let latest = snippets.latest().unwrap();
                    assert!(!latest.is_empty() && latest.len() <= 10);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
}

#[test]
fn test_close_invalidates_models() {
    let t = TestDb::new();
    let snippets = t.snippets();
    let id = snippets.insert("t", "c", 1).unwrap();

    t.db.close();

    assert!(matches!(
        snippets.get(id),
        Err(ModelError::Store(StoreError::Closed))
    ));
    assert!(matches!(
        snippets.insert("t", "c", 1),
        Err(ModelError::Store(StoreError::Closed))
    ));
    assert!(matches!(
        snippets.latest(),
        Err(ModelError::Store(StoreError::Closed))
    ));
}

#[test]
fn test_reopen_keeps_data_and_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snippetbox.db");
    let dsn = path.to_str().unwrap();

    let id = {
        let db = Arc::new(Database::open(dsn, 1).unwrap());
        let id = SqliteSnippetModel::new(db.clone()).insert("kept", "kept", 3).unwrap();
        db.close();
        id
    };

    let db = Arc::new(Database::open(dsn, 1).unwrap());
    let s = SqliteSnippetModel::new(db).get(id).unwrap();
    assert_eq!(s.title, "kept");
}

#[test]
fn test_open_accepts_file_uri() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = format!("file:{}", dir.path().join("uri.db").display());

    let db = Database::open(&dsn, 2).unwrap();
    assert_eq!(db.reader_pool_size(), 2);
    db.ping().unwrap();
}

#[test]
fn test_open_fails_on_unreachable_path() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = dir.path().join("missing").join("nested").join("x.db");
    assert!(Database::open(dsn.to_str().unwrap(), 1).is_err());
}
