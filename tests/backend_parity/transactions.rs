//! Transaction lifecycle: commit/rollback visibility, the validity state
//! machine, timeouts, and the closure-driven helpers.

use std::time::{Duration, Instant};

use rosterdb::prelude::*;

use crate::common::*;

#[test]
fn committed_writes_are_visible_to_later_transactions() {
    for backend in all_backends() {
        {
            let mut tx = begin(&backend.db);
            seed_user(&mut tx, 1);
            tx.commit().unwrap();
        }
        let mut tx = begin(&backend.db);
        assert!(tx.load(Entity::User, 1).unwrap().is_some(), "{}", backend.label);
        tx.rollback().unwrap();
    }
}

#[test]
fn rolled_back_writes_are_not() {
    for backend in all_backends() {
        {
            let mut tx = begin(&backend.db);
            seed_user(&mut tx, 2);
            tx.rollback().unwrap();
        }
        let mut tx = begin(&backend.db);
        assert!(tx.load(Entity::User, 2).unwrap().is_none(), "{}", backend.label);
        tx.rollback().unwrap();
    }
}

#[test]
fn every_operation_fails_after_commit() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        tx.commit().unwrap();
        assert!(tx.load(Entity::User, 1).unwrap_err().is_invalid_transaction());
        assert!(tx.insert(Entity::User, 1, &Record::new()).unwrap_err().is_invalid_transaction());
        assert!(tx.push_sp().unwrap_err().is_invalid_transaction());
        assert!(tx.commit().unwrap_err().is_invalid_transaction());
        assert!(
            tx.rollback().unwrap_err().is_invalid_transaction(),
            "{}: destruction is permanent",
            backend.label
        );
    }
}

#[test]
fn every_operation_fails_after_rollback() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        tx.rollback().unwrap();
        assert!(tx.find_all(Entity::User).unwrap_err().is_invalid_transaction());
        assert!(tx.delete(Entity::User, 1).unwrap_err().is_invalid_transaction());
        assert!(tx.rollback().unwrap_err().is_invalid_transaction(), "{}", backend.label);
    }
}

#[test]
fn do_transaction_commits_on_truthy_and_rolls_back_on_falsy() {
    for backend in all_backends() {
        let inserted = backend
            .db
            .do_transaction(Timeout::Infinite, |tx| {
                tx.insert(Entity::User, 3, &record! { "email" => "keep@roster.io" })
            })
            .unwrap();
        assert!(inserted);

        // Duplicate insert reports false, so this run must roll back its
        // side writes.
        let second = backend
            .db
            .do_transaction(Timeout::Infinite, |tx| {
                seed_user(tx, 4);
                tx.insert(Entity::User, 3, &record! { "email" => "dup@roster.io" })
            })
            .unwrap();
        assert!(!second);

        backend
            .db
            .do_rtransaction(Timeout::Infinite, |tx| {
                assert!(tx.load(Entity::User, 3).unwrap().is_some());
                assert!(
                    tx.load(Entity::User, 4).unwrap().is_none(),
                    "{}: falsy outcome must roll back",
                    backend.label
                );
                Ok(())
            })
            .unwrap();
    }
}

#[test]
fn do_rtransaction_never_commits() {
    for backend in all_backends() {
        let outcome = backend
            .db
            .do_rtransaction(Timeout::Infinite, |tx| {
                seed_user(tx, 5);
                Ok(true) // truthy, and still rolled back
            })
            .unwrap();
        assert!(outcome);
        backend
            .db
            .do_rtransaction(Timeout::Infinite, |tx| {
                assert!(tx.load(Entity::User, 5).unwrap().is_none(), "{}", backend.label);
                Ok(())
            })
            .unwrap();
    }
}

#[test]
fn body_error_rolls_back_and_propagates_the_original() {
    for backend in all_backends() {
        let err = backend
            .db
            .do_transaction(Timeout::Infinite, |tx| -> Result<bool> {
                seed_user(tx, 6);
                Err(Error::Database("body failure".into()))
            })
            .unwrap_err();
        assert!(matches!(err.original(), Error::Database(msg) if msg == "body failure"));
        backend
            .db
            .do_rtransaction(Timeout::Infinite, |tx| {
                assert!(tx.load(Entity::User, 6).unwrap().is_none(), "{}", backend.label);
                Ok(())
            })
            .unwrap();
    }
}

#[test]
fn secondary_rollback_failure_is_suppressed_not_primary() {
    for backend in all_backends() {
        // The body commits by hand and then fails; the helper's rollback
        // attempt hits a destroyed transaction, and that failure must ride
        // along without replacing the body's error.
        let err = backend
            .db
            .do_transaction(Timeout::Infinite, |tx| -> Result<bool> {
                tx.commit().unwrap();
                Err(Error::Database("body failure".into()))
            })
            .unwrap_err();
        assert!(
            matches!(&err, Error::RollbackFailed { .. }),
            "{}: got {}",
            backend.label,
            err
        );
        assert!(matches!(err.original(), Error::Database(msg) if msg == "body failure"));
    }
}

#[test]
fn immediate_timeout_fails_fast_when_busy() {
    for backend in all_backends() {
        let held = begin(&backend.db);
        let err = backend.db.begin_transaction(Timeout::Immediate).unwrap_err();
        assert!(err.is_timeout(), "{}: {}", backend.label, err);
        drop(held);
    }
}

#[test]
fn bounded_timeout_elapses_then_fails() {
    for backend in all_backends() {
        let held = begin(&backend.db);
        let started = Instant::now();
        let err = backend
            .db
            .begin_transaction(Timeout::Bounded(Duration::from_millis(50)))
            .unwrap_err();
        assert!(err.is_timeout(), "{}", backend.label);
        assert!(
            started.elapsed() >= Duration::from_millis(45),
            "{}: gave up too early",
            backend.label
        );
        drop(held);
    }
}

#[test]
fn the_resource_is_reusable_after_its_holder_is_dropped() {
    for backend in all_backends() {
        {
            let _abandoned = begin(&backend.db);
            // Dropped without commit or rollback.
        }
        let mut tx = backend
            .db
            .begin_transaction(Timeout::Bounded(Duration::from_millis(500)))
            .expect("slot/connection must come back");
        tx.rollback().unwrap();
    }
}

#[test]
fn close_refuses_new_transactions() {
    for backend in all_backends() {
        backend.db.close().unwrap();
        let err = backend.db.begin_transaction(Timeout::Infinite).unwrap_err();
        assert!(matches!(err, Error::Database(_)), "{}: {}", backend.label, err);
    }
}

#[test]
fn find_unique_id_never_returns_an_occupied_id() {
    for backend in all_backends() {
        let mut tx = begin(&backend.db);
        let mut taken = std::collections::HashSet::new();
        for uid in 1..=64i64 {
            seed_user(&mut tx, uid);
            taken.insert(uid);
        }
        for _ in 0..32 {
            let id = tx.find_unique_id(Entity::User).unwrap();
            assert!(id > 0);
            assert!(!taken.contains(&id), "{}: drew an occupied id", backend.label);
        }
        tx.rollback().unwrap();
    }
}
