//! Savepoint stack discipline and the nested-transaction helper.

use rosterdb::prelude::*;

use crate::common::*;

#[test]
fn restore_round_trips_to_the_state_before_the_push() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        seed_user(&mut tx, 1);
        let before = tx.load(Entity::User, 1).unwrap().unwrap();

        tx.push_sp().unwrap();
        seed_user(&mut tx, 2);
        tx.alter(Entity::User, 1, &record! { "address" => "moved" }).unwrap();
        tx.delete(Entity::User, 1).unwrap();
        tx.restore_sp().unwrap();

        assert_eq!(tx.load(Entity::User, 1).unwrap().unwrap(), before, "{}", backend.label);
        assert!(tx.load(Entity::User, 2).unwrap().is_none(), "{}", backend.label);
        tx.rollback().unwrap();
    }
}

#[test]
fn release_keeps_the_changes() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        tx.push_sp().unwrap();
        seed_user(&mut tx, 3);
        tx.release_sp().unwrap();
        assert!(tx.load(Entity::User, 3).unwrap().is_some(), "{}", backend.label);
        tx.rollback().unwrap();
    }
}

#[test]
fn pop_pop_keeps_both_the_insert_and_the_alter() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        tx.push_sp().unwrap();
        seed_user(&mut tx, 4);
        tx.push_sp().unwrap();
        tx.alter(Entity::User, 4, &record! { "address" => "2 Oak" }).unwrap();
        tx.pop_sp().unwrap();
        tx.pop_sp().unwrap();

        let row = tx.load(Entity::User, 4).unwrap().unwrap();
        assert_eq!(row.get("address").unwrap().as_str(), Some("2 Oak"), "{}", backend.label);
        tx.rollback().unwrap();
    }
}

#[test]
fn restore_then_pop_undoes_only_the_alter() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        tx.push_sp().unwrap();
        seed_user(&mut tx, 5);
        tx.push_sp().unwrap();
        tx.alter(Entity::User, 5, &record! { "address" => "9 Pine" }).unwrap();
        // Undo back to the inner savepoint, then discard the outer one.
        tx.restore_sp().unwrap();
        tx.pop_sp().unwrap();

        let row = tx.load(Entity::User, 5).unwrap().unwrap();
        assert_eq!(row.get("address"), Some(&Value::Null), "{}", backend.label);
        tx.rollback().unwrap();
    }
}

#[test]
fn pop_then_restore_rewinds_to_the_outer_savepoint() {
    // Releasing the inner frame folds its changes into the outer scope, so
    // a subsequent restore of the outer frame takes everything with it —
    // identical to the native SAVEPOINT semantics of the SQL engine.
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        tx.push_sp().unwrap();
        seed_user(&mut tx, 6);
        tx.push_sp().unwrap();
        tx.alter(Entity::User, 6, &record! { "address" => "5 Birch" }).unwrap();
        tx.pop_sp().unwrap();
        tx.restore_sp().unwrap();

        assert!(tx.load(Entity::User, 6).unwrap().is_none(), "{}", backend.label);
        tx.rollback().unwrap();
    }
}

#[test]
fn savepoint_names_count_upward_per_transaction() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        assert_eq!(tx.push_sp().unwrap(), "sp1");
        assert_eq!(tx.push_sp().unwrap(), "sp2");
        tx.pop_sp().unwrap();
        // Names are never recycled while the transaction lives.
        assert_eq!(tx.push_sp().unwrap(), "sp3", "{}", backend.label);
        tx.rollback().unwrap();
    }
}

#[test]
fn underflow_is_an_error_not_a_crash() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        assert!(tx.restore_sp().is_err(), "{}", backend.label);
        assert!(tx.pop_sp().is_err(), "{}", backend.label);
        // The transaction itself is still usable.
        seed_user(&mut tx, 7);
        tx.rollback().unwrap();
    }
}

#[test]
fn nested_transaction_commits_on_truthy_results() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        let inserted = tx
            .do_nested(|tx| tx.insert(Entity::User, 8, &record! { "email" => "n@roster.io" }))
            .unwrap();
        assert!(inserted);
        assert!(tx.load(Entity::User, 8).unwrap().is_some(), "{}", backend.label);
        tx.rollback().unwrap();
    }
}

#[test]
fn nested_transaction_restores_on_falsy_results() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        seed_user(&mut tx, 9);
        let outcome = tx
            .do_nested(|tx| {
                seed_user(tx, 10);
                tx.alter(Entity::User, 9, &record! { "address" => "lost" }).unwrap();
                Ok(false)
            })
            .unwrap();
        assert!(!outcome);
        assert!(tx.load(Entity::User, 10).unwrap().is_none(), "{}", backend.label);
        let row = tx.load(Entity::User, 9).unwrap().unwrap();
        assert_eq!(row.get("address"), Some(&Value::Null), "{}", backend.label);
        tx.rollback().unwrap();
    }
}

#[test]
fn nested_transaction_restores_and_rethrows_on_error() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        let err = tx
            .do_nested(|tx| -> Result<bool> {
                seed_user(tx, 11);
                Err(Error::Database("callback exploded".into()))
            })
            .unwrap_err();
        assert!(matches!(err.original(), Error::Database(_)), "{}", backend.label);
        assert!(tx.load(Entity::User, 11).unwrap().is_none(), "{}", backend.label);
        // The enclosing transaction survives a failed nested scope.
        seed_user(&mut tx, 12);
        tx.rollback().unwrap();
    }
}

#[test]
fn nested_transactions_nest() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        let kept = tx
            .do_nested(|tx| {
                seed_user(tx, 13);
                // Inner scope rolls back, outer still commits.
                let inner = tx.do_nested(|tx| {
                    seed_user(tx, 14);
                    Ok(false)
                })?;
                assert!(!inner);
                Ok(true)
            })
            .unwrap();
        assert!(kept);
        assert!(tx.load(Entity::User, 13).unwrap().is_some(), "{}", backend.label);
        assert!(tx.load(Entity::User, 14).unwrap().is_none(), "{}", backend.label);
        tx.rollback().unwrap();
    }
}
