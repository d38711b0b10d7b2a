//! The global store is process-wide, so every check that touches it lives in
//! one test function.

use scaffold_core::{AppContext, Contact, ContactDao, DbError, RepoError, Store, StoreLocation};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;

#[test]
fn global_store_initializes_once_and_rejects_other_paths() {
    assert!(Store::try_global().is_none());

    let dir = tempfile::tempdir().unwrap();
    let ctx = AppContext::new(dir.path().join("nested")).unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let ctx = ctx.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                Store::global(&ctx).unwrap()
            })
        })
        .collect();
    let stores: Vec<Arc<Store>> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let first = &stores[0];
    assert!(stores.iter().all(|store| Arc::ptr_eq(store, first)));
    assert_eq!(
        first.location(),
        &StoreLocation::File(ctx.database_path())
    );
    assert!(ctx.database_path().exists());

    // DAOs built from the same context share the global store.
    let writer = ContactDao::from_context(&ctx).unwrap();
    let reader = ContactDao::from_context(&ctx).unwrap();
    assert!(Arc::ptr_eq(writer.store(), first));
    let mut contact = Contact::new("Shared", Some(9));
    writer.create(&mut contact).unwrap();
    assert_eq!(reader.query_by_name("Shared").unwrap(), vec![contact]);

    let other_dir = tempfile::tempdir().unwrap();
    let other_ctx = AppContext::new(other_dir.path()).unwrap();
    match Store::global(&other_ctx) {
        Err(DbError::StoreConflict { requested, .. }) => {
            assert_eq!(requested, other_ctx.database_path());
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("global store switched databases"),
    }
    assert!(matches!(
        ContactDao::from_context(&other_ctx),
        Err(RepoError::Db(DbError::StoreConflict { .. }))
    ));

    assert!(Arc::ptr_eq(&Store::try_global().unwrap(), first));
}

#[test]
fn invalid_context_is_an_invalid_argument() {
    let err = AppContext::new("relative/dir").unwrap_err();
    assert!(matches!(err, DbError::InvalidArgument(_)));

    let repo_err: RepoError = err.into();
    assert!(matches!(repo_err, RepoError::InvalidArgument(_)));
}
